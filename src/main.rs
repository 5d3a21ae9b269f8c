mod cli;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use msa_auth::AuthClient;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.uses_placeholder_credentials() {
        warn!("MSAL_CLIENT_ID or MSAL_CLIENT_SECRET not set, using placeholder credentials");
    }

    let client = AuthClient::new(cli.auth_config()).context("Failed to create auth client")?;
    let state = Arc::new(AppState::new(client, cli.surface_account_errors));

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;
    info!("MSAL example app listening at http://{}", cli.listen);

    axum::serve(listener, routes::router(state))
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
