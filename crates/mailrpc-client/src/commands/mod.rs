//! Subcommand implementations.

pub mod accounts;
pub mod call;
pub mod config;
pub mod emails;
pub mod keys;
pub mod tokens;

use serde::Serialize;

use crate::error::{ClientError, ClientResult};

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> ClientResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Io(std::io::Error::other(e)))?;
    println!("{}", rendered);
    Ok(())
}
