//! Credential references in the configuration file.
//!
//! `[auth]` values may point at a secret kept elsewhere instead of holding
//! it in plain text:
//!
//! - `env::NAME` reads `$NAME`
//! - `pass::entry` runs `pass show entry` and keeps the first line
//!
//! Anything else is used verbatim.

use std::process::Command;

use crate::error::{ClientError, ClientResult};

const ENV_PREFIX: &str = "env::";
const PASS_PREFIX: &str = "pass::";

/// Returns true when `value` is a reference rather than a literal.
pub fn is_reference(value: &str) -> bool {
    value.starts_with(ENV_PREFIX) || value.starts_with(PASS_PREFIX)
}

/// Resolves `value` to the secret it stands for.
pub fn resolve(value: &str) -> ClientResult<String> {
    if let Some(name) = value.strip_prefix(ENV_PREFIX) {
        from_env(name)
    } else if let Some(entry) = value.strip_prefix(PASS_PREFIX) {
        from_pass(entry)
    } else {
        Ok(value.to_string())
    }
}

fn from_env(name: &str) -> ClientResult<String> {
    std::env::var(name)
        .map_err(|_| ClientError::config(format!("environment variable `{}` is not set", name)))
}

fn from_pass(entry: &str) -> ClientResult<String> {
    let output = Command::new("pass")
        .args(["show", entry])
        .output()
        .map_err(|e| ClientError::config(format!("cannot run `pass show {}`: {}", entry, e)))?;

    if !output.status.success() {
        return Err(ClientError::config(format!(
            "`pass show {}` exited with {}: {}",
            entry,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| ClientError::config(format!("`pass show {}` printed nothing", entry)))
}
