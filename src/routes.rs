use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use msa_auth::{
    AuthCodeUrlParams, CallbackParams, ExchangeError, IdentityAuthError, MinecraftProfile,
};
use tracing::{error, info, instrument};

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(start))
        .route("/start", get(start))
        .route("/redirect", get(redirect))
        .with_state(state)
}

/// First leg of the code grant: send the browser to the authority
#[instrument(skip(state))]
async fn start(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AuthCodeUrlParams>, QueryRejection>,
) -> Response {
    let result = query_params(query).and_then(|params| state.client.build_authorize_url(&params));
    match result {
        Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response(),
        Err(e) => {
            error!(kind = e.kind(), "Failed to start login: {}", e);
            error_response(&state, &e)
        }
    }
}

/// Second leg: trade the code for a Microsoft token and run the exchange
#[instrument(skip_all)]
async fn redirect(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Response {
    match login(&state, query).await {
        Ok(profile) => {
            info!("Fetched Minecraft profile for {:?}", profile.name());
            Json(profile).into_response()
        }
        Err(e) => {
            error!(kind = e.kind(), "Login failed: {}", e);
            error_response(&state, &e)
        }
    }
}

async fn login(
    state: &AppState,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> msa_auth::Result<MinecraftProfile> {
    let code = query_params(query)?.into_code()?;
    state.client.complete_login_with_code(&code).await
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> msa_auth::Result<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| IdentityAuthError::InvalidQuery(rejection.body_text()).into())
}

fn error_response(state: &AppState, error: &ExchangeError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(error.report(state.surface_account_errors)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use msa_auth::{AuthClient, AuthConfig, Endpoints};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_with(endpoints: Endpoints, surface_account_errors: bool) -> Router {
        let config = AuthConfig::new("client-123", "secret-456").with_endpoints(endpoints);
        let client = AuthClient::new(config).unwrap();
        router(Arc::new(AppState::new(client, surface_account_errors)))
    }

    fn app(server: &MockServer) -> Router {
        app_with(Endpoints::rooted_at(&server.uri()), false)
    }

    async fn send(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    async fn mount(server: &MockServer, verb: &str, route: &str, status: u16, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_token(server: &MockServer) {
        mount(
            server,
            "POST",
            "/consumers/oauth2/v2.0/token",
            200,
            json!({ "access_token": "ms1", "token_type": "Bearer", "expires_in": 3600 }),
        )
        .await;
    }

    async fn forbid(server: &MockServer, verb: &str, route: &str) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_start_redirects_with_login_hint() {
        let server = MockServer::start().await;

        let response = send(app(&server), "/start?loginHint=foo").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        assert!(location.starts_with(&format!("{}/consumers/oauth2/v2.0/authorize?", server.uri())));
        assert!(location.contains("login_hint=foo"));
        assert!(location.contains("client_id=client-123"));
    }

    #[tokio::test]
    async fn test_start_omits_absent_params() {
        let server = MockServer::start().await;

        let response = send(app(&server), "/start").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        assert!(!location.contains("login_hint"));
        assert!(!location.contains("domain_hint"));
        assert!(!location.contains("state="));
    }

    #[tokio::test]
    async fn test_root_is_start_alias() {
        let server = MockServer::start().await;

        let response = send(app(&server), "/?state=xyz&prompt=select_account&domainHint=consumers").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        assert!(location.contains("state=xyz"));
        assert!(location.contains("prompt=select_account"));
        assert!(location.contains("domain_hint=consumers"));
    }

    #[tokio::test]
    async fn test_redirect_returns_profile() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount(&server, "POST", "/user/authenticate", 200, json!({ "Token": "xbl1" })).await;
        mount(
            &server,
            "POST",
            "/xsts/authorize",
            200,
            json!({ "Token": "xsts1", "DisplayClaims": { "xui": [{ "uhs": "hash1" }] } }),
        )
        .await;
        mount(
            &server,
            "POST",
            "/authentication/login_with_xbox",
            200,
            json!({ "access_token": "mc1" }),
        )
        .await;
        mount(
            &server,
            "GET",
            "/minecraft/profile",
            200,
            json!({ "id": "abc", "name": "Steve" }),
        )
        .await;

        let response = send(app(&server), "/redirect?code=M.C123").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "id": "abc", "name": "Steve" }));

        let requests = server.received_requests().await.unwrap();
        let login = requests
            .iter()
            .find(|r| r.url.path() == "/authentication/login_with_xbox")
            .unwrap();
        let body: Value = serde_json::from_slice(&login.body).unwrap();
        assert_eq!(body["identityToken"], "XBL3.0 x=hash1;xsts1");
    }

    #[tokio::test]
    async fn test_redirect_account_error_is_generic_500() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount(&server, "POST", "/user/authenticate", 200, json!({ "Token": "xbl1" })).await;
        mount(
            &server,
            "POST",
            "/xsts/authorize",
            401,
            json!({ "Identity": "0", "XErr": 2148916233u64, "Message": "" }),
        )
        .await;
        forbid(&server, "POST", "/authentication/login_with_xbox").await;
        forbid(&server, "GET", "/minecraft/profile").await;

        let response = send(app(&server), "/redirect?code=M.C123").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "upstream_rejected");
        assert_eq!(body["stage"], 2);
        assert_eq!(body["status"], 401);
        assert!(body.get("xbox_account").is_none());
    }

    #[tokio::test]
    async fn test_redirect_account_error_can_be_surfaced() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount(&server, "POST", "/user/authenticate", 200, json!({ "Token": "xbl1" })).await;
        mount(
            &server,
            "POST",
            "/xsts/authorize",
            401,
            json!({ "XErr": 2148916235u64 }),
        )
        .await;

        let app = app_with(Endpoints::rooted_at(&server.uri()), true);
        let response = send(app, "/redirect?code=M.C123").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "xbox_account_error");
        assert_eq!(body["xbox_account"]["code"], 2148916235u64);
    }

    #[tokio::test]
    async fn test_redirect_transport_error_is_500() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        forbid(&server, "POST", "/xsts/authorize").await;
        forbid(&server, "POST", "/authentication/login_with_xbox").await;
        forbid(&server, "GET", "/minecraft/profile").await;

        let mut endpoints = Endpoints::rooted_at(&server.uri());
        endpoints.xbl_authenticate = "http://127.0.0.1:1/user/authenticate".to_string();
        let response = send(app_with(endpoints, false), "/redirect?code=M.C123").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "transport_error");
        assert_eq!(body["stage"], 1);
    }

    #[tokio::test]
    async fn test_redirect_without_code_is_500() {
        let server = MockServer::start().await;
        forbid(&server, "POST", "/consumers/oauth2/v2.0/token").await;

        let response = send(app(&server), "/redirect").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "identity_auth_error");
    }

    #[tokio::test]
    async fn test_redirect_user_cancelled_is_500() {
        let server = MockServer::start().await;
        forbid(&server, "POST", "/consumers/oauth2/v2.0/token").await;

        let response = send(
            app(&server),
            "/redirect?error=access_denied&error_description=The+user+has+denied+access",
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "identity_auth_error");
        assert_eq!(body["message"], "Identity authentication failed: User cancelled the authentication flow");
    }

    #[tokio::test]
    async fn test_redirect_duplicate_code_is_500() {
        let server = MockServer::start().await;
        forbid(&server, "POST", "/consumers/oauth2/v2.0/token").await;

        let response = send(app(&server), "/redirect?code=a&code=b").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "identity_auth_error");
        assert!(body["message"].as_str().unwrap().contains("duplicate field `code`"));
    }

    #[tokio::test]
    async fn test_start_duplicate_param_is_500() {
        let server = MockServer::start().await;

        let response = send(app(&server), "/start?state=a&state=b").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::LOCATION).is_none());
        assert_eq!(json_body(response).await["error"], "identity_auth_error");
    }
}
