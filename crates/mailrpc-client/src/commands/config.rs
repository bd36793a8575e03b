//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Dumps the effective configuration, secrets masked.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", path.display());
    println!("{}", config.to_redacted_toml()?);
    Ok(())
}

/// Validates the configuration, including secret references.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;
    config.to_options()?;
    if config.credentials()?.is_some() {
        println!("Credentials resolve.");
    }
    println!("Configuration is valid.");
    Ok(())
}

/// Shows the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    let state = if path.exists() { "" } else { " (not found)" };
    println!("config: {}{}", path.display(), state);
    Ok(())
}
