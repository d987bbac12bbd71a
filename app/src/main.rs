mod command;
mod prompt;
mod render;
mod settings;
mod shell;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use todo_client_core::views::Router;
use todo_client_core::AppContext;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::prompt::TerminalPrompt;
use crate::settings::Overrides;
use crate::shell::Shell;

#[derive(Parser)]
#[command(name = "todo-client")]
#[command(about = "Terminal client for the todo service")]
struct Cli {
    /// TOML configuration file. Defaults to ./todo-client.toml when present.
    #[arg(short, long, env = "TODO_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the backend, e.g. http://localhost:5000
    #[arg(long)]
    api_url: Option<String>,

    /// OAuth client id used for Google sign-in.
    #[arg(long)]
    google_client_id: Option<String>,

    /// Query string from a reset link, e.g. "?token=abc".
    #[arg(long, conflicts_with = "reset_token")]
    query: Option<String>,

    /// Password-reset token, as an alternative to --query.
    #[arg(long)]
    reset_token: Option<String>,

    /// Log filter; takes precedence over RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = settings::load(
        cli.config.as_deref(),
        Overrides {
            api_url: cli.api_url,
            google_client_id: cli.google_client_id,
        },
    )?;
    info!(api_url = %config.api_url, clear_policy = ?config.clear_policy, "starting");

    let router = match (cli.query, cli.reset_token) {
        (Some(query), _) => Router::from_query(&query),
        (None, Some(token)) => Router::for_reset(token),
        (None, None) => Router::new(),
    };

    let ctx = AppContext::from_config(config);
    let status = ctx.auth.hydrate();
    info!(?status, "session hydrated");

    let mut shell = Shell::new(ctx, Arc::new(TerminalPrompt), router);
    shell.run(io::stdin().lock())
}
