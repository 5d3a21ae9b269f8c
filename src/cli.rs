use std::net::SocketAddr;

use clap::Parser;
use msa_auth::AuthConfig;
use msa_auth::config::placeholder;

#[derive(Debug, Parser)]
#[command(name = "msa-mc-web")]
#[command(about = "Sign in with a Microsoft account and fetch the Minecraft profile")]
pub struct Cli {
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Application (client) ID of the Azure app registration
    #[arg(long, env = "MSAL_CLIENT_ID", default_value = placeholder::CLIENT_ID)]
    pub client_id: String,

    /// Client secret from "Certificates & secrets"
    #[arg(
        long,
        env = "MSAL_CLIENT_SECRET",
        default_value = placeholder::CLIENT_SECRET,
        hide_env_values = true,
        hide_default_value = true
    )]
    pub client_secret: String,

    /// Include the Xbox account classification in error responses
    #[arg(long, env = "SURFACE_ACCOUNT_ERRORS")]
    pub surface_account_errors: bool,
}

impl Cli {
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.client_id.clone(), self.client_secret.clone())
    }

    pub fn uses_placeholder_credentials(&self) -> bool {
        self.client_id == placeholder::CLIENT_ID || self.client_secret == placeholder::CLIENT_SECRET
    }
}
