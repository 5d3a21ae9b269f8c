use std::fmt;
use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

/// Upstream service endpoints
pub mod endpoints {
    pub const MS_AUTHORITY: &str = "https://login.microsoftonline.com/consumers";
    pub const XBL_AUTHENTICATE: &str = "https://user.auth.xboxlive.com/user/authenticate";
    pub const XSTS_AUTHORIZE: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
    pub const MC_LOGIN: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
    pub const MC_PROFILE: &str = "https://api.minecraftservices.com/minecraft/profile";
}

/// Values used when the client credentials are not configured
pub mod placeholder {
    pub const CLIENT_ID: &str = "00000000-0000-0000-0000-000000000000";
    pub const CLIENT_SECRET: &str = "~0000~0000000000000000000000000000000000";
}

/// Callback registered with the Azure application
pub const REDIRECT_URI: &str = "http://localhost:3000/redirect";

/// Scopes requested from the identity platform.
/// Without `XboxLive.offline_access` no refresh token is issued.
pub const XBOX_SCOPES: &[&str] = &["XboxLive.signin", "XboxLive.offline_access"];

/// OpenID scopes the identity platform expects alongside any resource scope
pub const OIDC_DEFAULT_SCOPES: &[&str] = &["openid", "profile", "offline_access"];

/// Relying parties
pub const RP_XBOX_AUTH: &str = "http://auth.xboxlive.com";
pub const RP_MINECRAFT: &str = "rp://api.minecraftservices.com/";

/// Where each pipeline stage and the identity authority are reached.
///
/// Production values come from [`endpoints`]; [`Endpoints::rooted_at`] points
/// every service at one host, which is how a local proxy or mock is wired in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authority: String,
    pub xbl_authenticate: String,
    pub xsts_authorize: String,
    pub mc_login: String,
    pub mc_profile: String,
}

impl Endpoints {
    /// Use `base` as the scheme and host for every upstream, keeping the
    /// production paths.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authority: format!("{base}/consumers"),
            xbl_authenticate: format!("{base}/user/authenticate"),
            xsts_authorize: format!("{base}/xsts/authorize"),
            mc_login: format!("{base}/authentication/login_with_xbox"),
            mc_profile: format!("{base}/minecraft/profile"),
        }
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.authority.trim_end_matches('/'))
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authority: endpoints::MS_AUTHORITY.to_string(),
            xbl_authenticate: endpoints::XBL_AUTHENTICATE.to_string(),
            xsts_authorize: endpoints::XSTS_AUTHORIZE.to_string(),
            mc_login: endpoints::MC_LOGIN.to_string(),
            mc_profile: endpoints::MC_PROFILE.to_string(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Confidential client secret, hidden from debug output
#[derive(Clone)]
pub struct ClientSecret(Zeroizing<String>);

impl ClientSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(***)")
    }
}

/// Configuration for [`AuthClient`](crate::AuthClient)
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Application (client) ID from the Azure portal
    pub client_id: String,

    /// Secret generated under "Certificates & secrets"
    pub client_secret: ClientSecret,

    /// OAuth redirect URI
    pub redirect_uri: Url,

    /// Resource scopes requested on both legs of the code grant
    pub scopes: Vec<String>,

    /// Upstream endpoints
    pub endpoints: Endpoints,

    /// HTTP client timeouts
    pub http_timeouts: HttpTimeouts,

    /// Custom user agent (optional)
    pub user_agent: Option<String>,
}

impl AuthConfig {
    /// Create config for a confidential web client on the consumers tenant
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: ClientSecret::new(client_secret),
            redirect_uri: Url::parse(REDIRECT_URI).expect("valid redirect URI"),
            scopes: XBOX_SCOPES.iter().map(|s| s.to_string()).collect(),
            endpoints: Endpoints::default(),
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some("msa-mc-web".to_string()),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Space-separated scope string sent to the authority.
    ///
    /// Configured scopes come first, followed by any OpenID default not
    /// already present.
    pub fn scope_string(&self) -> String {
        let mut scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        for default in OIDC_DEFAULT_SCOPES {
            if !scopes.contains(default) {
                scopes.push(default);
            }
        }
        scopes.join(" ")
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(placeholder::CLIENT_ID, placeholder::CLIENT_SECRET)
    }
}
