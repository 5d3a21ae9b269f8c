use msa_auth::AuthClient;

/// Shared, read-only application state built once at startup
#[derive(Debug, Clone)]
pub struct AppState {
    pub client: AuthClient,
    /// Whether the XSTS account classification is returned to callers
    pub surface_account_errors: bool,
}

impl AppState {
    pub fn new(client: AuthClient, surface_account_errors: bool) -> Self {
        Self {
            client,
            surface_account_errors,
        }
    }
}
