use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// The four hops of the token exchange, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    XblAuthenticate,
    XstsAuthorize,
    MinecraftLogin,
    ProfileFetch,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Self::XblAuthenticate => 1,
            Self::XstsAuthorize => 2,
            Self::MinecraftLogin => 3,
            Self::ProfileFetch => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::XblAuthenticate => "XBL authenticate",
            Self::XstsAuthorize => "XSTS authorize",
            Self::MinecraftLogin => "Minecraft login",
            Self::ProfileFetch => "profile fetch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.number(), self.name())
    }
}

/// Token exchange error types
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Network error during {stage}: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} rejected with HTTP {status}: {body}")]
    UpstreamRejected {
        stage: Stage,
        status: StatusCode,
        body: String,
    },

    #[error("XSTS authorization denied: {error}")]
    XboxAccount {
        error: XboxAccountError,
        /// Raw 401 body as returned by XSTS
        body: String,
    },

    #[error("Malformed response from {stage}: {reason}")]
    MalformedResponse { stage: Stage, reason: String },

    #[error("Identity authentication failed: {0}")]
    IdentityAuth(#[from] IdentityAuthError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Failures before the pipeline starts, while turning the authorization code
/// into a Microsoft access token
#[derive(Error, Debug)]
pub enum IdentityAuthError {
    #[error("User cancelled the authentication flow")]
    UserCancelled,

    #[error("Authority reported {error}: {}", .description.as_deref().unwrap_or("no description"))]
    Denied {
        error: String,
        description: Option<String>,
    },

    #[error("Invalid redirect - missing authorization code")]
    MissingCode,

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Token endpoint returned HTTP {status}: {error}")]
    Rejected {
        status: StatusCode,
        error: String,
        description: Option<String>,
    },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// XSTS account states signalled through the `XErr` field of a 401
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum XboxAccountError {
    #[error("The account doesn't have an Xbox account")]
    NoXboxAccount,

    #[error("The account is from a country where Xbox Live is not available/banned")]
    CountryUnavailable,

    #[error(
        "The account is a child (under 18) and cannot proceed unless the account is added to a Family by an adult"
    )]
    ChildAccount,

    #[error("Unclassified Xbox account error (XErr: {0})")]
    Unclassified(u64),
}

impl XboxAccountError {
    pub const NO_XBOX_ACCOUNT: u64 = 2148916233;
    pub const COUNTRY_UNAVAILABLE: u64 = 2148916235;
    pub const CHILD_ACCOUNT: u64 = 2148916238;

    /// Parse XErr code from XSTS response
    pub fn from_xerr(code: u64) -> Self {
        match code {
            Self::NO_XBOX_ACCOUNT => Self::NoXboxAccount,
            Self::COUNTRY_UNAVAILABLE => Self::CountryUnavailable,
            Self::CHILD_ACCOUNT => Self::ChildAccount,
            code => Self::Unclassified(code),
        }
    }

    pub fn code(self) -> u64 {
        match self {
            Self::NoXboxAccount => Self::NO_XBOX_ACCOUNT,
            Self::CountryUnavailable => Self::COUNTRY_UNAVAILABLE,
            Self::ChildAccount => Self::CHILD_ACCOUNT,
            Self::Unclassified(code) => code,
        }
    }
}

/// JSON shape of a failed exchange as handed back to HTTP callers
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorReport {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xbox_account: Option<XboxAccountReport>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct XboxAccountReport {
    pub code: u64,
    pub message: String,
}

impl ErrorReport {
    fn new(error: &'static str, message: String) -> Self {
        Self {
            error,
            message,
            stage: None,
            status: None,
            body: None,
            xbox_account: None,
        }
    }
}

impl ExchangeError {
    /// Short machine-readable name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport_error",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::XboxAccount { .. } => "xbox_account_error",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::IdentityAuth(_) => "identity_auth_error",
            Self::HttpClient(_) => "http_client_error",
        }
    }

    /// Build the serializable error body.
    ///
    /// Unless `surface_account_errors` is set, an XSTS account error is
    /// reported exactly like any other upstream 401 and the classification
    /// stays in the logs.
    pub fn report(&self, surface_account_errors: bool) -> ErrorReport {
        match self {
            Self::Transport { stage, .. } | Self::MalformedResponse { stage, .. } => ErrorReport {
                stage: Some(stage.number()),
                ..ErrorReport::new(self.kind(), self.to_string())
            },
            Self::UpstreamRejected {
                stage,
                status,
                body,
            } => ErrorReport {
                stage: Some(stage.number()),
                status: Some(status.as_u16()),
                body: Some(body.clone()),
                ..ErrorReport::new(self.kind(), self.to_string())
            },
            Self::XboxAccount { error, body } if surface_account_errors => ErrorReport {
                stage: Some(Stage::XstsAuthorize.number()),
                status: Some(StatusCode::UNAUTHORIZED.as_u16()),
                body: Some(body.clone()),
                xbox_account: Some(XboxAccountReport {
                    code: error.code(),
                    message: error.to_string(),
                }),
                ..ErrorReport::new(self.kind(), self.to_string())
            },
            Self::XboxAccount { body, .. } => ExchangeError::UpstreamRejected {
                stage: Stage::XstsAuthorize,
                status: StatusCode::UNAUTHORIZED,
                body: body.clone(),
            }
            .report(false),
            Self::IdentityAuth(IdentityAuthError::Rejected { status, .. }) => ErrorReport {
                status: Some(status.as_u16()),
                ..ErrorReport::new(self.kind(), self.to_string())
            },
            Self::IdentityAuth(_) | Self::HttpClient(_) => {
                ErrorReport::new(self.kind(), self.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
