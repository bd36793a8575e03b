//! Raw call command.

use mailrpc_protocol::Payload;
use mailrpc_protocol::api::JSON_CONTENT_TYPE;

use crate::client::{Call, Client};
use crate::error::{ClientError, ClientResult};

/// Builds a call from command-line pieces.
///
/// A body must be valid JSON; it gets a JSON `Content-Type` unless the
/// caller set one.
pub fn build(
    method: &str,
    path: &str,
    body: Option<&str>,
    headers: &[(String, String)],
) -> ClientResult<Call> {
    let mut call = Call::new(method.to_ascii_uppercase(), path);

    if let Some(body) = body {
        serde_json::from_str::<serde_json::Value>(body)
            .map_err(|e| ClientError::config(format!("--body is not valid JSON: {}", e)))?;
        call = call
            .header("Content-Type", JSON_CONTENT_TYPE)
            .body(Payload::new(body));
    }
    for (name, value) in headers {
        call = call.header(name, value);
    }
    Ok(call)
}

/// Sends the call and prints the response body, pretty-printed when it is
/// JSON.
pub async fn run(
    client: &Client,
    method: &str,
    path: &str,
    body: Option<&str>,
    headers: &[(String, String)],
) -> ClientResult<()> {
    let response = client.call(build(method, path, body, headers)?).await?;
    match serde_json::from_str::<serde_json::Value>(response.as_str()) {
        Ok(value) => super::print_json(&value),
        Err(_) => {
            println!("{}", response);
            Ok(())
        }
    }
}
