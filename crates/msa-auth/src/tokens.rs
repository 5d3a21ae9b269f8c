//! Tokens passed between the exchange stages.
//!
//! None of these types implement `Clone`: every stage takes its input token by
//! value, so a token is spent the moment the stage that needs it runs. The
//! backing memory is wiped on drop and `Debug` never prints the secret.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

macro_rules! bearer_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            pub fn new(token: impl Into<String>) -> Self {
                Self(token.into())
            }

            pub fn secret(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(***)"))
            }
        }
    };
}

bearer_token!(
    /// Access token issued by the Microsoft identity platform
    IdentityAccessToken
);

bearer_token!(
    /// Xbox Live user token
    XblToken
);

bearer_token!(
    /// Minecraft Services access token
    MinecraftAccessToken
);

/// XSTS token together with the user hash it was issued for
#[derive(Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct XstsToken {
    token: String,
    user_hash: String,
}

impl XstsToken {
    pub fn new(token: impl Into<String>, user_hash: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_hash: user_hash.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn user_hash(&self) -> &str {
        &self.user_hash
    }

    /// Value of the `identityToken` field for Minecraft login
    pub fn identity_token(&self) -> String {
        format!("XBL3.0 x={};{}", self.user_hash, self.token)
    }
}

impl fmt::Debug for XstsToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XstsToken")
            .field("token", &"***")
            .field("user_hash", &self.user_hash)
            .finish()
    }
}
