use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::config::{Endpoints, RP_MINECRAFT, RP_XBOX_AUTH};
use crate::errors::{ExchangeError, Result, Stage, XboxAccountError};
use crate::models::*;
use crate::tokens::{IdentityAccessToken, MinecraftAccessToken, XblToken, XstsToken};

/// The Microsoft token → Minecraft profile chain.
///
/// Each stage consumes the token produced by the previous one. Nothing is
/// kept between calls, so one instance can serve any number of concurrent
/// exchanges.
#[derive(Debug, Clone)]
pub struct TokenExchange {
    http: Client,
    endpoints: Endpoints,
}

impl TokenExchange {
    pub fn new(http: Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Run all four stages in order, stopping at the first failure
    #[instrument(skip_all)]
    pub async fn exchange(&self, token: IdentityAccessToken) -> Result<MinecraftProfile> {
        let xbl = self.authenticate_xbl(token).await?;
        let xsts = self.authorize_xsts(xbl).await?;
        let mc = self.login_minecraft(xsts).await?;
        self.fetch_profile(mc).await
    }

    /// Authenticate with Xbox Live
    #[instrument(skip_all)]
    pub async fn authenticate_xbl(&self, token: IdentityAccessToken) -> Result<XblToken> {
        const STAGE: Stage = Stage::XblAuthenticate;
        info!("1. authenticate XBL");

        let request = XblAuthRequest {
            properties: XblAuthProperties {
                auth_method: "RPS",
                site_name: "user.auth.xboxlive.com",
                rps_ticket: format!("d={}", token.secret()),
            },
            relying_party: RP_XBOX_AUTH,
            token_type: "JWT",
        };
        drop(token);

        let builder = self
            .http
            .post(&self.endpoints.xbl_authenticate)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&request);
        let (status, body) = send(STAGE, builder).await?;
        if !status.is_success() {
            return Err(rejected(STAGE, status, &body));
        }

        let response: XblAuthResponse = parse(STAGE, &body)?;
        debug!("XBL token valid until {:?}", response.not_after);
        Ok(XblToken::new(response.token))
    }

    /// Authorize with XSTS for the Minecraft Services relying party
    #[instrument(skip_all)]
    pub async fn authorize_xsts(&self, xbl: XblToken) -> Result<XstsToken> {
        const STAGE: Stage = Stage::XstsAuthorize;
        info!("2. authorize XSTS");

        let request = XstsAuthRequest {
            properties: XstsAuthProperties {
                sandbox_id: "RETAIL",
                user_tokens: [xbl.secret()],
            },
            relying_party: RP_MINECRAFT,
            token_type: "JWT",
        };

        let builder = self
            .http
            .post(&self.endpoints.xsts_authorize)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&request);
        let (status, body) = send(STAGE, builder).await?;

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(error_response) = serde_json::from_str::<XstsErrorResponse>(&body) {
                let error = XboxAccountError::from_xerr(error_response.xerr);
                warn!(xerr = error.code(), "{}", error);
                return Err(ExchangeError::XboxAccount { error, body });
            }
        }
        if !status.is_success() {
            return Err(rejected(STAGE, status, &body));
        }

        let response: XstsAuthResponse = parse(STAGE, &body)?;
        let uhs = response
            .display_claims
            .xui
            .first()
            .ok_or_else(|| ExchangeError::MalformedResponse {
                stage: STAGE,
                reason: "missing DisplayClaims.xui[0]".to_string(),
            })?
            .uhs
            .clone();

        debug!("XSTS token valid until {:?}", response.not_after);
        Ok(XstsToken::new(response.token, uhs))
    }

    /// Login to Minecraft Services with the XSTS token
    #[instrument(skip_all)]
    pub async fn login_minecraft(&self, xsts: XstsToken) -> Result<MinecraftAccessToken> {
        const STAGE: Stage = Stage::MinecraftLogin;
        info!("3. login to Minecraft");

        let request = McLoginRequest {
            identity_token: xsts.identity_token(),
        };
        drop(xsts);

        let builder = self
            .http
            .post(&self.endpoints.mc_login)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&request);
        let (status, body) = send(STAGE, builder).await?;
        if !status.is_success() {
            return Err(rejected(STAGE, status, &body));
        }

        let response: McLoginResponse = parse(STAGE, &body)?;
        debug!("Minecraft token expires in {:?}s", response.expires_in);
        Ok(MinecraftAccessToken::new(response.access_token))
    }

    /// Fetch the Minecraft profile
    #[instrument(skip_all)]
    pub async fn fetch_profile(&self, mc: MinecraftAccessToken) -> Result<MinecraftProfile> {
        const STAGE: Stage = Stage::ProfileFetch;
        info!("4. get Minecraft profile");

        let builder = self
            .http
            .get(&self.endpoints.mc_profile)
            .header(AUTHORIZATION, format!("Bearer {}", mc.secret()));
        let (status, body) = send(STAGE, builder).await?;

        if status == StatusCode::NOT_FOUND {
            warn!("No Minecraft profile - the account may not own the game");
        }
        if !status.is_success() {
            return Err(rejected(STAGE, status, &body));
        }

        parse(STAGE, &body)
    }
}

async fn send(stage: Stage, builder: RequestBuilder) -> Result<(StatusCode, String)> {
    let transport = |source| ExchangeError::Transport { stage, source };

    let response = builder.send().await.map_err(transport)?;
    let status = response.status();
    let body = response.text().await.map_err(transport)?;
    debug!("{} answered HTTP {}", stage, status);

    Ok((status, body))
}

fn rejected(stage: Stage, status: StatusCode, body: &str) -> ExchangeError {
    ExchangeError::UpstreamRejected {
        stage,
        status,
        body: body.to_string(),
    }
}

fn parse<T: DeserializeOwned>(stage: Stage, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ExchangeError::MalformedResponse {
        stage,
        reason: e.to_string(),
    })
}
