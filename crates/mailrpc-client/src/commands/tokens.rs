//! Token commands.

use mailrpc_protocol::Headers;
use mailrpc_protocol::api::TokensCreateRequest;
use tracing::info;

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret;

/// Logs in and prints the new token.
///
/// Flags take precedence over `[auth]` in the configuration.
pub async fn create(
    client: &Client,
    config: &ClientConfig,
    username: Option<String>,
    password: Option<String>,
    kind: String,
) -> ClientResult<()> {
    let (username, password) = credentials(config, username, password)?;
    let request = TokensCreateRequest {
        username,
        password,
        kind,
    };

    let token = client.create_token(&request).await?;
    info!(owner = %token.owner, "token created");
    super::print_json(&token)
}

/// Revokes the token the client is authorized with.
pub async fn delete(client: &Client) -> ClientResult<()> {
    if !has_authorization(&client.headers()) {
        return Err(ClientError::config(
            "no token configured; set [auth] token or pass -H 'Authorization: Bearer …'",
        ));
    }
    let message = client.delete_token().await?;
    println!("{}", message);
    Ok(())
}

// header names are case-insensitive on the server side
fn has_authorization(headers: &Headers) -> bool {
    headers
        .keys()
        .any(|name| name.eq_ignore_ascii_case("Authorization"))
}

fn credentials(
    config: &ClientConfig,
    username: Option<String>,
    password: Option<String>,
) -> ClientResult<(String, String)> {
    let username = match username {
        Some(username) => username,
        None => resolve(&config.auth.username)?
            .ok_or_else(|| ClientError::config("no username given (--username or [auth] username)"))?,
    };
    let password = match password {
        Some(password) => password,
        None => resolve(&config.auth.password)?
            .ok_or_else(|| ClientError::config("no password given (--password or [auth] password)"))?,
    };
    Ok((username, password))
}

fn resolve(value: &Option<String>) -> ClientResult<Option<String>> {
    value.as_deref().map(secret::resolve).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut config = ClientConfig::default();
        config.auth.username = Some("file-user".into());
        config.auth.password = Some("file-pass".into());

        assert_eq!(
            credentials(&config, None, None).unwrap(),
            ("file-user".to_string(), "file-pass".to_string())
        );
        assert_eq!(
            credentials(&config, Some("cli".into()), None).unwrap(),
            ("cli".to_string(), "file-pass".to_string())
        );
    }

    #[test]
    fn missing_password_is_a_config_error() {
        let config = ClientConfig::default();
        let err = credentials(&config, Some("alice".into()), None).unwrap_err();
        assert!(err.to_string().contains("no password"));
    }

    #[test]
    fn authorization_header_is_found_in_any_case() {
        let mut headers = Headers::new();
        assert!(!has_authorization(&headers));

        headers.insert("X-Client".into(), "cli".into());
        assert!(!has_authorization(&headers));

        headers.insert("authorization".into(), "Bearer abc".into());
        assert!(has_authorization(&headers));

        let mut headers = Headers::new();
        headers.insert("AUTHORIZATION".into(), "Bearer abc".into());
        assert!(has_authorization(&headers));
    }
}
