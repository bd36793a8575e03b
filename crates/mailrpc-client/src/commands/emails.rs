//! Email commands.

use mailrpc_protocol::api::{EmailsCreateRequest, EmailsListQuery};
use tracing::info;

use crate::client::Client;
use crate::error::ClientResult;

/// Lists emails.
pub async fn list(
    client: &Client,
    sort: Vec<String>,
    offset: Option<u32>,
    limit: Option<u32>,
) -> ClientResult<()> {
    let query = EmailsListQuery {
        sort,
        offset,
        limit,
    };
    let emails = client.list_emails(&query).await?;
    super::print_json(&emails)
}

/// Fields of `email send`.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub to: Vec<String>,
    pub bcc: Vec<String>,
    pub title: String,
    pub body: String,
    pub thread: Option<String>,
}

impl Draft {
    fn into_request(self) -> EmailsCreateRequest {
        let preview = preview(&self.body);
        EmailsCreateRequest {
            to: self.to,
            bcc: self.bcc,
            thread_id: self.thread.unwrap_or_default(),
            title: self.title,
            body: self.body,
            preview,
            ..Default::default()
        }
    }
}

/// Sends an email and prints the ids of what was stored.
pub async fn send(client: &Client, draft: Draft) -> ClientResult<()> {
    let created = client.create_email(&draft.into_request()).await?;
    info!(count = created.len(), "email stored");
    super::print_json(&created)
}

/// Prints the delivery status of an email.
pub async fn status(client: &Client, id: &str) -> ClientResult<()> {
    let status = client.get_email(id).await?;
    println!("{}", status);
    Ok(())
}

const PREVIEW_CHARS: usize = 100;

fn preview(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(PREVIEW_CHARS)
        .collect()
}
