//! Typed wrappers for the webmail API routes.
//!
//! Each wrapper fixes the method, path and body shape of one route, checks
//! the `{success, message}` status of the response and decodes the rest.

use mailrpc_protocol::Payload;
use mailrpc_protocol::api::{
    AccountsCreateRequest, AccountsCreateResponse, AccountsGetResponse, ApiStatus, Email,
    EmailsCreateRequest, EmailsCreateResponse, EmailsGetResponse, EmailsListQuery,
    EmailsListResponse, JSON_CONTENT_TYPE, Key, KeysGetResponse, KeysListResponse, Token,
    TokensCreateRequest, TokensCreateResponse, User,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::form_urlencoded;

use crate::client::{Call, Client};
use crate::error::{ClientError, ClientResult};

impl Client {
    /// `POST /tokens`: logs in and returns the new token.
    pub async fn create_token(&self, request: &TokensCreateRequest) -> ClientResult<Token> {
        let response: TokensCreateResponse = self.api(json_call("POST", "/tokens", request)?).await?;
        Ok(response.token)
    }

    /// `DELETE /tokens`: revokes the token the call is authorized with.
    pub async fn delete_token(&self) -> ClientResult<String> {
        let status: ApiStatus = self.api(Call::delete("/tokens")).await?;
        Ok(status.message)
    }

    /// `POST /accounts`
    pub async fn create_account(&self, request: &AccountsCreateRequest) -> ClientResult<User> {
        let response: AccountsCreateResponse =
            self.api(json_call("POST", "/accounts", request)?).await?;
        Ok(response.user)
    }

    /// `GET /accounts/{id}`; `me` is the authorized account.
    pub async fn get_account(&self, id: &str) -> ClientResult<User> {
        let response: AccountsGetResponse = self.api(Call::get(format!("/accounts/{}", id))).await?;
        Ok(response.user)
    }

    /// `GET /emails`
    pub async fn list_emails(&self, query: &EmailsListQuery) -> ClientResult<Vec<Email>> {
        let path = with_query("/emails", query.pairs());
        let response: EmailsListResponse = self.api(Call::get(path)).await?;
        Ok(response.emails)
    }

    /// `POST /emails`: returns the ids of the stored emails.
    pub async fn create_email(&self, request: &EmailsCreateRequest) -> ClientResult<Vec<String>> {
        let response: EmailsCreateResponse =
            self.api(json_call("POST", "/emails", request)?).await?;
        Ok(response.created)
    }

    /// `GET /emails/{id}`: returns the delivery status.
    pub async fn get_email(&self, id: &str) -> ClientResult<String> {
        let response: EmailsGetResponse = self.api(Call::get(format!("/emails/{}", id))).await?;
        Ok(response.status)
    }

    /// `GET /keys?user=…`: key ids owned by `user`.
    pub async fn list_keys(&self, user: &str) -> ClientResult<Vec<String>> {
        let path = with_query("/keys", [("user", user)]);
        let response: KeysListResponse = self.api(Call::get(path)).await?;
        Ok(response.keys)
    }

    /// `GET /keys/{id}`
    pub async fn get_key(&self, id: &str) -> ClientResult<Key> {
        let response: KeysGetResponse = self.api(Call::get(format!("/keys/{}", id))).await?;
        Ok(response.key)
    }

    async fn api<T: DeserializeOwned>(&self, call: Call) -> ClientResult<T> {
        let route = format!("{} {}", call.method(), call.path());
        let body = self.call(call).await?;
        decode_api(&body).inspect_err(|e| debug!(%route, error = %e, "api call failed"))
    }
}

/// Checks the status of a response body, then decodes it as `T`.
pub fn decode_api<T: DeserializeOwned>(body: &Payload) -> ClientResult<T> {
    let status: ApiStatus = body.decode().map_err(ClientError::Decode)?;
    if !status.success {
        let message = if status.message.is_empty() {
            "request failed".to_string()
        } else {
            status.message
        };
        return Err(ClientError::Application(message));
    }
    body.decode().map_err(ClientError::Decode)
}

fn json_call<T: Serialize + ?Sized>(method: &str, path: &str, body: &T) -> ClientResult<Call> {
    Call::new(method, path)
        .header("Content-Type", JSON_CONTENT_TYPE)
        .json(body)
}

fn with_query<I, K, V>(path: &str, pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        query.append_pair(key.as_ref(), value.as_ref());
    }
    let query = query.finish();

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}
