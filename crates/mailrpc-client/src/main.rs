//! mailrpc CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use mailrpc_client::cli::{
    AccountAction, Cli, Command, ConfigAction, EmailAction, KeyAction, TokenAction,
};
use mailrpc_client::commands::{self, emails::Draft};
use mailrpc_client::config::ClientConfig;
use mailrpc_client::{Client, ClientResult};
use mailrpc_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let mut config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);

    if let Err(e) = init_tracing(TracingConfig::for_cli(config.debug)) {
        eprintln!("warning: {}", e);
    }

    match run(cli.command, config, &config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// An explicit `--config` must exist; the default path is optional.
fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    match &cli.config {
        Some(path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
}

async fn run(
    command: Command,
    config: ClientConfig,
    config_path: &std::path::Path,
) -> ClientResult<()> {
    // configuration commands never touch the network
    let command = match command {
        Command::Config { action } => {
            return match action {
                ConfigAction::Dump => commands::config::dump(&config, config_path),
                ConfigAction::Validate => commands::config::validate(&config),
                ConfigAction::Path => commands::config::path(config_path),
            };
        }
        other => other,
    };

    config.validate()?;
    let options = config.to_options()?;
    let client = Client::connect(&options).await?;

    let result = dispatch(&client, &config, command).await;

    let reason = client.shutdown().await;
    debug!(%reason, "client stopped");
    result
}

async fn dispatch(client: &Client, config: &ClientConfig, command: Command) -> ClientResult<()> {
    match command {
        Command::Call {
            method,
            path,
            body,
            headers,
        } => commands::call::run(client, &method, &path, body.as_deref(), &headers).await,
        Command::Token { action } => match action {
            TokenAction::Create {
                username,
                password,
                kind,
            } => commands::tokens::create(client, config, username, password, kind).await,
            TokenAction::Delete => commands::tokens::delete(client).await,
        },
        Command::Account { action } => match action {
            AccountAction::Get { id } => commands::accounts::get(client, &id).await,
        },
        Command::Email { action } => match action {
            EmailAction::List {
                sort,
                offset,
                limit,
            } => commands::emails::list(client, sort, offset, limit).await,
            EmailAction::Send {
                to,
                title,
                body,
                bcc,
                thread,
            } => {
                let draft = Draft {
                    to,
                    bcc,
                    title,
                    body,
                    thread,
                };
                commands::emails::send(client, draft).await
            }
            EmailAction::Status { id } => commands::emails::status(client, &id).await,
        },
        Command::Key { action } => match action {
            KeyAction::List { user } => commands::keys::list(client, &user).await,
            KeyAction::Get { id } => commands::keys::get(client, &id).await,
        },
        Command::Config { .. } => Ok(()),
    }
}
