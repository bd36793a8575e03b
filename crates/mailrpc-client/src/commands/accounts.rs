//! Account commands.

use crate::client::Client;
use crate::error::ClientResult;

/// Prints an account.
pub async fn get(client: &Client, id: &str) -> ClientResult<()> {
    let user = client.get_account(id).await?;
    super::print_json(&user)
}
