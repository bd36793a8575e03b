//! Payload types for the webmail API routes.
//!
//! The envelope layer treats bodies as opaque; these types are only used by
//! the typed wrappers on top of the call facade. Every response body starts
//! with the same `{success, message}` pair ([`ApiStatus`]); the route specific
//! fields sit next to it.

use serde::{Deserialize, Serialize};

/// `Content-Type` sent with JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Status fields present in every API response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// An authentication (or invite) token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Token {
    pub id: String,
    pub name: String,
    pub owner: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub date_created: Option<String>,
    pub expiry_date: Option<String>,
}

/// Body of `POST /tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensCreateRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TokensCreateRequest {
    /// Creates a request for an `auth` token, the only kind the API issues.
    pub fn auth(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            kind: "auth".to_string(),
        }
    }
}

/// Successful body of `POST /tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokensCreateResponse {
    pub token: Token,
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Public part of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// Body of `POST /accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsCreateRequest {
    pub username: String,
    pub password: String,
    /// Invite token, required when classic registration is disabled.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

/// Successful body of `POST /accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountsCreateResponse {
    #[serde(rename = "data", alias = "account")]
    pub user: User,
}

/// Successful body of `GET /accounts/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountsGetResponse {
    pub user: User,
}

// ---------------------------------------------------------------------------
// Emails
// ---------------------------------------------------------------------------

/// A stored email as returned by the list route.
///
/// Only the fields the client reads are typed; the rest is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Email {
    pub id: String,
    pub owner: String,
    pub thread_id: String,
    pub title: String,
    pub preview: String,
    pub to: Vec<String>,
    pub date_created: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Query parameters of `GET /emails`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailsListQuery {
    /// Sort keys, `-field` for descending and `+field` (or `field`) for ascending.
    pub sort: Vec<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl EmailsListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a sort key.
    pub fn sort(mut self, key: impl Into<String>) -> Self {
        self.sort.push(key.into());
        self
    }

    /// Builder: set the offset.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Builder: set the limit.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query pairs in wire order; empty when nothing is set.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.sort.is_empty() {
            pairs.push(("sort", self.sort.join(",")));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Successful body of `GET /emails`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailsListResponse {
    #[serde(default)]
    pub emails: Vec<Email>,
}

/// Body of `POST /emails`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailsCreateRequest {
    pub to: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: String,
    pub thread_id: String,
    pub title: String,
    pub body: String,
    pub preview: String,
    pub attachments: Vec<String>,
    pub pgp_fingerprints: Vec<String>,
}

/// Successful body of `POST /emails`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailsCreateResponse {
    /// Ids of the stored emails.
    #[serde(default)]
    pub created: Vec<String>,
}

/// Successful body of `GET /emails/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailsGetResponse {
    #[serde(default)]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A public PGP key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Key {
    pub id: String,
    pub owner: String,
    /// Armored key material.
    pub key: String,
    pub key_id: String,
    pub algorithm: String,
    pub length: u32,
    pub date_created: Option<String>,
    pub expiry_date: Option<String>,
}

/// Successful body of `GET /keys?user=…`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeysListResponse {
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Successful body of `GET /keys/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeysGetResponse {
    pub key: Key,
}
