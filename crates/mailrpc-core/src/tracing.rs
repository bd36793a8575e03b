//! Tracing setup for mailrpc.
//!
//! The client library only emits `tracing` events; installing a subscriber is
//! left to the binary (or to whoever embeds the client).
//!
//! ```ignore
//! use mailrpc_core::tracing::{init_tracing, TracingConfig};
//!
//! // `mailrpc` without --debug
//! init_tracing(TracingConfig::cli())?;
//!
//! // long-running embedding, structured output
//! init_tracing(TracingConfig::service())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Target prefix shared by every crate in the workspace.
const TARGET_PREFIX: &str = "mailrpc";

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line human readable output.
    Pretty,
    /// Single-line output (default, fits a terminal next to command output).
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level applied to `mailrpc*` targets when `RUST_LOG` is not set.
    pub default_level: Level,
    /// Output format for log messages.
    pub output_format: TracingOutputFormat,
    /// Include file and line of the call site.
    pub include_location: bool,
    /// Include the event target (module path).
    pub include_target: bool,
    /// Include timestamps.
    pub include_timestamp: bool,
    /// Log span open/close events.
    pub include_span_events: bool,
    /// Explicit filter directive; wins over both `RUST_LOG` and `default_level`.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::cli()
    }
}

impl TracingConfig {
    /// Quiet terminal output: warnings and errors only.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            include_timestamp: false,
            include_span_events: false,
            env_filter: None,
        }
    }

    /// Terminal output for `--debug`: every frame and call is visible.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_target: true,
            ..Self::cli()
        }
    }

    /// Structured output for long-running processes embedding the client.
    #[must_use]
    pub fn service() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Json,
            include_location: true,
            include_target: true,
            include_timestamp: true,
            include_span_events: true,
            env_filter: None,
        }
    }

    /// Picks [`cli_debug`](Self::cli_debug) or [`cli`](Self::cli).
    #[must_use]
    pub fn for_cli(debug: bool) -> Self {
        if debug { Self::cli_debug() } else { Self::cli() }
    }

    /// Set the default log level
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set a custom env filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Directive used when neither `env_filter` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        format!("{}={}", TARGET_PREFIX, self.default_level)
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(ref filter) = self.env_filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive())))
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Call once, early in `main`. Events go to stderr so command output on
/// stdout stays clean. `RUST_LOG` overrides the default level unless
/// the config carries an explicit filter.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or the filter directive
/// does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = config.build_filter()?;
    let span_events = config.span_events();

    let layer = match config.output_format {
        TracingOutputFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target)
            .with_span_events(span_events)
            .boxed(),
        TracingOutputFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target)
                .with_span_events(span_events);
            if config.include_timestamp {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
        TracingOutputFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target)
            .with_span_events(span_events)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_quiet_by_default() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::WARN);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(!config.include_timestamp);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn for_cli_switches_on_debug() {
        let config = TracingConfig::for_cli(true);
        assert_eq!(config.default_level, Level::DEBUG);
        assert!(config.include_location);
        assert_eq!(TracingConfig::for_cli(false).default_level, Level::WARN);
    }

    #[test]
    fn service_config_is_structured() {
        let config = TracingConfig::service();
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert!(config.include_span_events);
        assert!(config.include_timestamp);
    }

    #[test]
    fn default_directive_targets_workspace() {
        let config = TracingConfig::cli().with_level(Level::TRACE);
        assert_eq!(config.default_directive(), "mailrpc=TRACE");
    }

    #[test]
    fn explicit_filter_must_parse() {
        let config = TracingConfig::cli().with_env_filter("mailrpc_client=[");
        assert!(matches!(
            config.build_filter(),
            Err(TracingError::EnvFilter(_))
        ));

        let config = TracingConfig::cli()
            .with_format(TracingOutputFormat::Json)
            .with_env_filter("mailrpc_client=trace");
        assert!(config.build_filter().is_ok());
        assert_eq!(config.output_format, TracingOutputFormat::Json);
    }
}
