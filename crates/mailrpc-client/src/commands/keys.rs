//! Key commands.

use crate::client::Client;
use crate::error::ClientResult;

/// Prints the key ids owned by `user`.
pub async fn list(client: &Client, user: &str) -> ClientResult<()> {
    let keys = client.list_keys(user).await?;
    super::print_json(&keys)
}

/// Prints a key.
pub async fn get(client: &Client, id: &str) -> ClientResult<()> {
    let key = client.get_key(id).await?;
    super::print_json(&key)
}
