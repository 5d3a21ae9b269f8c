use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::AuthConfig;
use crate::errors::IdentityAuthError;
use crate::models::{MsErrorResponse, MsTokenResponse};
use crate::tokens::IdentityAccessToken;

/// Optional parameters forwarded into the authorization URL.
///
/// Field names follow the query string of the start route (`loginHint`,
/// `domainHint`). Missing or empty values are left out of the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCodeUrlParams {
    pub state: Option<String>,
    pub prompt: Option<String>,
    pub login_hint: Option<String>,
    pub domain_hint: Option<String>,
}

/// Query parameters the authority sends back to the redirect URI
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Extract the authorization code, turning an error redirect into the
    /// matching [`IdentityAuthError`]
    pub fn into_code(self) -> Result<String, IdentityAuthError> {
        if let Some(error) = self.error {
            if error == "access_denied" {
                return Err(IdentityAuthError::UserCancelled);
            }
            return Err(IdentityAuthError::Denied {
                error,
                description: self.error_description,
            });
        }

        self.code
            .filter(|code| !code.is_empty())
            .ok_or(IdentityAuthError::MissingCode)
    }
}

/// Confidential-client side of the authorization-code grant against the
/// Microsoft identity platform
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    config: AuthConfig,
    http: Client,
}

impl IdentityProvider {
    pub fn new(config: AuthConfig, http: Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Build the authorization URL for the user to visit
    #[instrument(skip(self))]
    pub fn build_authorize_url(&self, params: &AuthCodeUrlParams) -> Result<Url, IdentityAuthError> {
        let mut url = Url::parse(&self.config.endpoints.authorize_url())?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("scope", &self.config.scope_string())
                .append_pair("redirect_uri", self.config.redirect_uri.as_str())
                .append_pair("response_type", "code")
                .append_pair("response_mode", "query");

            let optional = [
                ("state", &params.state),
                ("prompt", &params.prompt),
                ("login_hint", &params.login_hint),
                ("domain_hint", &params.domain_hint),
            ];
            for (key, value) in optional {
                if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                    query.append_pair(key, value);
                }
            }
        }

        debug!("Built authorize URL for {}", self.config.endpoints.authority);
        Ok(url)
    }

    /// Exchange authorization code for a Microsoft access token
    #[instrument(skip(self, code))]
    pub async fn acquire_token_by_code(
        &self,
        code: &str,
    ) -> Result<IdentityAccessToken, IdentityAuthError> {
        let scope = self.config.scope_string();
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.secret()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
        ];

        info!("Exchanging authorization code for tokens");
        let response = self
            .http
            .post(self.config.endpoints.token_url())
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let rejected = match serde_json::from_str::<MsErrorResponse>(&body) {
                Ok(error) => IdentityAuthError::Rejected {
                    status,
                    error: error.error,
                    description: error.error_description,
                },
                Err(_) => IdentityAuthError::Rejected {
                    status,
                    error: body.chars().take(200).collect(),
                    description: None,
                },
            };
            warn!("Token endpoint rejected the authorization code: {}", rejected);
            return Err(rejected);
        }

        let token_response: MsTokenResponse = serde_json::from_str(&body)
            .map_err(|e| IdentityAuthError::InvalidResponse(e.to_string()))?;
        if token_response.access_token.is_empty() {
            return Err(IdentityAuthError::InvalidResponse(
                "empty access_token".to_string(),
            ));
        }

        debug!(
            "Received {} token, expires in {:?}s",
            token_response.token_type.as_deref().unwrap_or("access"),
            token_response.expires_in
        );
        Ok(IdentityAccessToken::new(token_response.access_token))
    }
}
