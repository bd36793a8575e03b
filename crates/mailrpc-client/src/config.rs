//! Client configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/mailrpc/config.toml`:
//!
//! ```toml
//! [server]
//! address = "https://api.example.org"
//! timeout = 30            # seconds, 0 means the default
//! transport = "sockjs"    # or "websocket"
//!
//! [headers]
//! X-Client = "mailrpc"
//!
//! [auth]
//! username = "alice"
//! password = "pass::mail/alice"
//! token = "env::MAILRPC_TOKEN"
//! ```
//!
//! `[auth]` values accept secret references (see [`crate::secret`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use mailrpc_protocol::Headers;
use serde::{Deserialize, Serialize};

use crate::channel::{Transport, websocket};
use crate::client::{ClientOptions, DEFAULT_ADDRESS, DEFAULT_TIMEOUT};
use crate::error::{ClientError, ClientResult};
use crate::secret;

const REDACTED: &str = "********";

/// Configuration for the mailrpc client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug logging.
    pub debug: bool,

    /// API endpoint settings.
    pub server: ServerSettings,

    /// Headers sent with every call.
    pub headers: Headers,

    /// Credentials.
    pub auth: AuthSettings,
}

/// API endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base address of the API.
    pub address: String,

    /// Call timeout in seconds.
    pub timeout: u64,

    /// Framing used on the websocket.
    pub transport: Transport,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            timeout: DEFAULT_TIMEOUT.as_secs(),
            transport: Transport::default(),
        }
    }
}

/// Credentials. Every field accepts `env::` and `pass::` references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Existing token, sent as `Authorization: Bearer <token>`.
    pub token: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults when the file
    /// does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::config(format!("{}: {}", path.display(), e)))
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> ClientResult<Self> {
        toml::from_str(content)
            .map_err(|e| ClientError::config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailrpc")
    }

    /// Checks everything that can be checked without connecting.
    pub fn validate(&self) -> ClientResult<()> {
        websocket::endpoint_url(&self.server.address, self.server.transport)?;

        if let Some(name) = self.headers.keys().find(|name| !is_header_name(name)) {
            return Err(ClientError::config(format!(
                "invalid header name '{}' in [headers]",
                name
            )));
        }

        if self.auth.username.is_some() != self.auth.password.is_some() {
            return Err(ClientError::config(
                "[auth] needs both username and password, or neither",
            ));
        }
        Ok(())
    }

    /// Call timeout, with zero meaning the default.
    pub fn timeout(&self) -> Duration {
        match self.server.timeout {
            0 => DEFAULT_TIMEOUT,
            secs => Duration::from_secs(secs),
        }
    }

    /// Builds client options, resolving the auth token if one is set.
    pub fn to_options(&self) -> ClientResult<ClientOptions> {
        let mut options = ClientOptions::new(&self.server.address)
            .with_timeout(self.timeout())
            .with_transport(self.server.transport);
        options.headers = self.headers.clone();

        if let Some(token) = self.token()? {
            options.headers.insert("Authorization".to_string(), bearer(&token));
        }
        Ok(options)
    }

    /// Resolved `[auth]` token.
    pub fn token(&self) -> ClientResult<Option<String>> {
        self.auth.token.as_deref().map(secret::resolve).transpose()
    }

    /// Resolved `[auth]` username and password, if both are set.
    pub fn credentials(&self) -> ClientResult<Option<(String, String)>> {
        match (&self.auth.username, &self.auth.password) {
            (Some(username), Some(password)) => Ok(Some((
                secret::resolve(username)?,
                secret::resolve(password)?,
            ))),
            _ => Ok(None),
        }
    }

    /// Serializes the configuration with literal secrets masked.
    pub fn to_redacted_toml(&self) -> ClientResult<String> {
        let mut redacted = self.clone();
        for value in [&mut redacted.auth.password, &mut redacted.auth.token]
            .into_iter()
            .flatten()
        {
            if !secret::is_reference(value) {
                *value = REDACTED.to_string();
            }
        }
        toml::to_string_pretty(&redacted)
            .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))
    }
}

/// `Authorization` header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server.address, DEFAULT_ADDRESS);
        assert_eq!(config.server.transport, Transport::SockJs);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.validate().is_ok());
        assert!(config.token().unwrap().is_none());
        assert!(config.credentials().unwrap().is_none());
    }

    #[test]
    fn default_path_ends_with_mailrpc_config() {
        let path = ClientConfig::default_path();
        assert!(path.ends_with("mailrpc/config.toml"));
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
debug = true

[server]
address = "https://api.example.org"
timeout = 5
transport = "websocket"

[headers]
X-Client = "mailrpc"

[auth]
token = "plain-token"
"#
        )
        .unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        assert!(config.debug);
        assert_eq!(config.server.transport, Transport::WebSocket);
        assert_eq!(config.timeout(), Duration::from_secs(5));

        let options = config.to_options().unwrap();
        assert_eq!(options.address, "https://api.example.org");
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.headers["X-Client"], "mailrpc");
        assert_eq!(options.headers["Authorization"], "Bearer plain-token");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ClientConfig::parse("[server]\ntimeout = 0\n").unwrap();
        assert_eq!(config.server.address, DEFAULT_ADDRESS);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn load_errors_name_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[server\naddress = ").unwrap();
        let err = ClientConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
        assert!(err.to_string().contains(&file.path().display().to_string()));

        let missing = file.path().with_extension("missing");
        assert!(ClientConfig::load_from(&missing).is_err());
    }

    #[test]
    fn unknown_transport_is_rejected() {
        assert!(ClientConfig::parse("[server]\ntransport = \"carrier-pigeon\"\n").is_err());
    }

    #[test]
    fn validate_catches_bad_values() {
        let mut config = ClientConfig::default();
        config.server.address = "mailto:alice@example.org".into();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.headers.insert("Bad Header".into(), "x".into());
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.auth.username = Some("alice".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn auth_references_resolve() {
        unsafe {
            std::env::set_var("_MAILRPC_CONFIG_TEST_TOKEN", "tok-from-env");
            std::env::set_var("_MAILRPC_CONFIG_TEST_PASSWORD", "pw-from-env");
        }

        let config = ClientConfig::parse(
            r#"
[auth]
username = "alice"
password = "env::_MAILRPC_CONFIG_TEST_PASSWORD"
token = "env::_MAILRPC_CONFIG_TEST_TOKEN"
"#,
        )
        .unwrap();

        assert_eq!(
            config.credentials().unwrap(),
            Some(("alice".to_string(), "pw-from-env".to_string()))
        );
        let options = config.to_options().unwrap();
        assert_eq!(options.headers["Authorization"], "Bearer tok-from-env");

        unsafe {
            std::env::remove_var("_MAILRPC_CONFIG_TEST_TOKEN");
            std::env::remove_var("_MAILRPC_CONFIG_TEST_PASSWORD");
        }
    }

    #[test]
    fn unresolvable_token_fails_options() {
        let mut config = ClientConfig::default();
        config.auth.token = Some("env::_MAILRPC_CONFIG_UNSET_4711".into());
        assert!(matches!(config.to_options(), Err(ClientError::Config(_))));
    }

    #[test]
    fn redacted_dump_hides_literal_secrets_only() {
        let mut config = ClientConfig::default();
        config.auth.username = Some("alice".into());
        config.auth.password = Some("hunter2".into());
        config.auth.token = Some("env::MAILRPC_TOKEN".into());

        let dump = config.to_redacted_toml().unwrap();
        assert!(!dump.contains("hunter2"));
        assert!(dump.contains(REDACTED));
        assert!(dump.contains("env::MAILRPC_TOKEN"));
        assert!(dump.contains("alice"));

        let reparsed = ClientConfig::parse(&dump).unwrap();
        assert_eq!(reparsed.server, config.server);
    }
}
