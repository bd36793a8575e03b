//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::channel::Transport;
use crate::config::ClientConfig;

/// mailrpc - talk to the webmail API over its socket endpoint
#[derive(Debug, Parser)]
#[command(name = "mailrpc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "MAILRPC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// API address (http, https, ws or wss)
    #[arg(long, env = "MAILRPC_ADDRESS")]
    pub address: Option<String>,

    /// Call timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Framing on top of the websocket (sockjs or websocket)
    #[arg(long)]
    pub transport: Option<Transport>,

    /// Header sent with every call, as NAME:VALUE (can be repeated)
    #[arg(long = "header", short = 'H', value_parser = parse_header, action = clap::ArgAction::Append)]
    pub headers: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply(&self, config: &mut ClientConfig) {
        if self.debug {
            config.debug = true;
        }
        if let Some(address) = &self.address {
            config.server.address = address.clone();
        }
        if let Some(timeout) = self.timeout {
            config.server.timeout = timeout;
        }
        if let Some(transport) = self.transport {
            config.server.transport = transport;
        }
        config.headers.extend(self.headers.iter().cloned());
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Issue a raw call and print the response body
    Call {
        /// Method, e.g. GET or POST
        method: String,

        /// Route path, e.g. /accounts/me
        path: String,

        /// JSON body
        #[arg(long)]
        body: Option<String>,

        /// Header for this call only, as NAME:VALUE (can be repeated)
        #[arg(long = "header", short = 'H', value_parser = parse_header, action = clap::ArgAction::Append)]
        headers: Vec<(String, String)>,
    },

    /// Token commands
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Account commands
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Email commands
    Email {
        #[command(subcommand)]
        action: EmailAction,
    },

    /// Key commands
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Token actions.
#[derive(Debug, Subcommand)]
pub enum TokenAction {
    /// Log in and print the new token
    Create {
        /// Username (defaults to [auth] username)
        #[arg(long)]
        username: Option<String>,

        /// Password (defaults to [auth] password)
        #[arg(long, env = "MAILRPC_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Token type
        #[arg(long = "type", default_value = "auth")]
        kind: String,
    },

    /// Revoke the current token
    Delete,
}

/// Account actions.
#[derive(Debug, Subcommand)]
pub enum AccountAction {
    /// Show an account
    Get {
        /// Account id
        #[arg(default_value = "me")]
        id: String,
    },
}

/// Email actions.
#[derive(Debug, Subcommand)]
pub enum EmailAction {
    /// List emails
    List {
        /// Sort key, prefix with - for descending (can be repeated)
        #[arg(long, action = clap::ArgAction::Append)]
        sort: Vec<String>,

        /// Number of emails to skip
        #[arg(long)]
        offset: Option<u32>,

        /// Maximum number of emails
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Send an email
    Send {
        /// Recipient (can be repeated)
        #[arg(long, required = true, action = clap::ArgAction::Append)]
        to: Vec<String>,

        /// Subject
        #[arg(long)]
        title: String,

        /// Body text
        #[arg(long)]
        body: String,

        /// Blind copy recipient (can be repeated)
        #[arg(long, action = clap::ArgAction::Append)]
        bcc: Vec<String>,

        /// Thread to reply in
        #[arg(long)]
        thread: Option<String>,
    },

    /// Show the delivery status of an email
    Status {
        /// Email id
        id: String,
    },
}

/// Key actions.
#[derive(Debug, Subcommand)]
pub enum KeyAction {
    /// List key ids of a user
    List {
        /// User name
        user: String,
    },

    /// Show a key
    Get {
        /// Key id
        id: String,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

/// Parses a `NAME:VALUE` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn header_parsing() {
        assert_eq!(
            parse_header("Authorization: Bearer abc").unwrap(),
            ("Authorization".to_string(), "Bearer abc".to_string())
        );
        assert_eq!(
            parse_header("X-Empty:").unwrap(),
            ("X-Empty".to_string(), String::new())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn global_flags_override_config() {
        let cli = Cli::try_parse_from([
            "mailrpc",
            "--address",
            "wss://api.example.org/socket",
            "--timeout",
            "3",
            "--transport",
            "websocket",
            "-H",
            "X-Client:cli",
            "key",
            "list",
            "alice",
        ])
        .unwrap();

        let mut config = ClientConfig::default();
        config.headers.insert("X-Client".into(), "file".into());
        cli.apply(&mut config);

        assert_eq!(config.server.address, "wss://api.example.org/socket");
        assert_eq!(config.server.timeout, 3);
        assert_eq!(config.server.transport, Transport::WebSocket);
        assert_eq!(config.headers["X-Client"], "cli");
        assert!(matches!(
            cli.command,
            Command::Key {
                action: KeyAction::List { ref user }
            } if user == "alice"
        ));
    }

    #[test]
    fn call_subcommand() {
        let cli = Cli::try_parse_from([
            "mailrpc",
            "call",
            "POST",
            "/tokens",
            "--body",
            r#"{"username":"a"}"#,
            "-H",
            "Content-Type: application/json",
        ])
        .unwrap();

        match cli.command {
            Command::Call {
                method,
                path,
                body,
                headers,
            } => {
                assert_eq!(method, "POST");
                assert_eq!(path, "/tokens");
                assert_eq!(body.as_deref(), Some(r#"{"username":"a"}"#));
                assert_eq!(headers[0].1, "application/json");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn account_get_defaults_to_me() {
        let cli = Cli::try_parse_from(["mailrpc", "account", "get"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Account {
                action: AccountAction::Get { ref id }
            } if id == "me"
        ));
    }

    #[test]
    fn email_send_requires_a_recipient() {
        assert!(
            Cli::try_parse_from(["mailrpc", "email", "send", "--title", "t", "--body", "b"])
                .is_err()
        );
    }
}
