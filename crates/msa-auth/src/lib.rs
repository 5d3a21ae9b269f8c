//! Microsoft account → Minecraft profile token exchange
//!
//! This crate implements the confidential-client side of the Microsoft
//! identity platform authorization-code grant and the chain of exchanges that
//! turns the resulting access token into a Minecraft profile.
//!
//! # Authentication Flow
//!
//! 1. OAuth2 authorization with Microsoft (consumers tenant)
//! 2. Xbox Live authentication
//! 3. XSTS authorization
//! 4. Minecraft Services login
//! 5. Profile retrieval
//!
//! Steps 2–5 run strictly in order; the first failure ends the exchange and
//! is returned as an [`ExchangeError`]. No token is cached or retried.
//!
//! # Example
//!
//! ```no_run
//! use msa_auth::{AuthClient, AuthCodeUrlParams, AuthConfig};
//!
//! # async fn example() -> msa_auth::Result<()> {
//! let client = AuthClient::new(AuthConfig::new("client-id", "client-secret"))?;
//!
//! // Send the user here...
//! let url = client.build_authorize_url(&AuthCodeUrlParams::default())?;
//! println!("Visit: {}", url);
//!
//! // ...and finish with the code delivered to the redirect URI
//! let profile = client.complete_login_with_code("M.C123...").await?;
//! println!("Logged in as: {:?}", profile.name());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod identity;
pub mod models;
pub mod pipeline;
pub mod tokens;

// Re-export main types
pub use client::AuthClient;
pub use config::{AuthConfig, Endpoints};
pub use errors::{ErrorReport, ExchangeError, IdentityAuthError, Result, Stage, XboxAccountError};
pub use identity::{AuthCodeUrlParams, CallbackParams, IdentityProvider};
pub use models::MinecraftProfile;
pub use pipeline::TokenExchange;
pub use tokens::{IdentityAccessToken, MinecraftAccessToken, XblToken, XstsToken};
