use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::config::AuthConfig;
use crate::errors::{ExchangeError, Result};
use crate::identity::{AuthCodeUrlParams, IdentityProvider};
use crate::models::MinecraftProfile;
use crate::pipeline::TokenExchange;
use crate::tokens::IdentityAccessToken;

/// Main client: the identity provider and the token exchange sharing one
/// HTTP client
#[derive(Debug, Clone)]
pub struct AuthClient {
    identity: IdentityProvider,
    exchange: TokenExchange,
}

impl AuthClient {
    /// Create a new authentication client
    pub fn new(config: AuthConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or("msa-mc-web"))
            .build()
            .map_err(ExchangeError::HttpClient)?;

        Ok(Self::with_http(config, http))
    }

    /// Build the client around an existing [`reqwest::Client`]
    pub fn with_http(config: AuthConfig, http: Client) -> Self {
        let exchange = TokenExchange::new(http.clone(), config.endpoints.clone());
        let identity = IdentityProvider::new(config, http);
        Self { identity, exchange }
    }

    pub fn config(&self) -> &AuthConfig {
        self.identity.config()
    }

    pub fn identity(&self) -> &IdentityProvider {
        &self.identity
    }

    pub fn token_exchange(&self) -> &TokenExchange {
        &self.exchange
    }

    /// Build the authorization URL for the user to visit
    pub fn build_authorize_url(&self, params: &AuthCodeUrlParams) -> Result<Url> {
        Ok(self.identity.build_authorize_url(params)?)
    }

    /// Exchange authorization code for a Microsoft access token
    pub async fn acquire_token_by_code(&self, code: &str) -> Result<IdentityAccessToken> {
        Ok(self.identity.acquire_token_by_code(code).await?)
    }

    /// Run the XBL → XSTS → Minecraft → profile chain
    pub async fn exchange(&self, token: IdentityAccessToken) -> Result<MinecraftProfile> {
        self.exchange.exchange(token).await
    }

    /// Complete login flow from authorization code to Minecraft profile
    #[instrument(skip(self, code))]
    pub async fn complete_login_with_code(&self, code: &str) -> Result<MinecraftProfile> {
        debug!("Starting complete login flow");

        let token = self.acquire_token_by_code(code).await?;
        self.exchange(token).await
    }
}
