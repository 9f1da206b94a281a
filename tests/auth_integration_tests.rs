mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, header},
};
use common::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use question_board::{
    AppConfig, AppState, ApiError, MemoryStore, SessionRegistry,
    auth::{
        AuthUser, SESSION_COOKIE_NAME, SessionClaims, SessionContext, issue_session_token,
        read_session_token, session_cookie,
    },
    config::Env,
    create_router,
    models::SessionUser,
};
use serde_json::Value;
use tower::ServiceExt;

// --- Helpers ---

fn ada() -> SessionUser {
    SessionUser {
        id: ACTIVE_USER.to_string(),
        display_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        group_id: GROUP_A.to_string(),
    }
}

fn app_with_state() -> (Router, AppState) {
    let state = app_state(seeded_store());
    (create_router(state.clone()), state)
}

fn app() -> Router {
    app_with_state().0
}

/// Opens a session for Ada in `state` and returns the matching `Cookie` header value.
fn session_header(state: &AppState) -> String {
    let (token, claims) = issue_session_token(&ada(), &state.config).expect("token issued");
    state.sessions.open(&claims);
    format!("{}={}", SESSION_COOKIE_NAME, token)
}

fn post(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("JSON body")
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

// --- Session token ---

#[test]
fn test_session_token_round_trip() {
    let config = AppConfig::default();
    let (token, issued) = issue_session_token(&ada(), &config).unwrap();

    let claims = read_session_token(&token, &config).expect("valid token");
    assert_eq!(claims.user, ada());
    assert_eq!(claims.sid, issued.sid);
    assert_eq!(claims.exp - claims.iat, config.session_max_age_secs as usize);
}

#[test]
fn test_every_token_gets_a_fresh_session_id() {
    let config = AppConfig::default();
    let (_, first) = issue_session_token(&ada(), &config).unwrap();
    let (_, second) = issue_session_token(&ada(), &config).unwrap();

    assert_ne!(first.sid, second.sid);
}

#[test]
fn test_oversized_max_age_saturates() {
    let config = AppConfig {
        session_max_age_secs: u64::MAX,
        ..AppConfig::default()
    };

    let (token, claims) = issue_session_token(&ada(), &config).unwrap();
    assert_eq!(claims.exp, usize::MAX);
    assert!(read_session_token(&token, &config).is_some());

    let cookie = session_cookie(token, &config);
    assert_eq!(cookie.max_age(), Some(time::Duration::seconds(i64::MAX)));
}

#[test]
fn test_token_signed_with_another_secret_is_rejected() {
    let config = AppConfig::default();
    let foreign = AppConfig {
        session_secret: "some-other-secret".to_string(),
        ..AppConfig::default()
    };
    let (token, _) = issue_session_token(&ada(), &foreign).unwrap();

    assert!(read_session_token(&token, &config).is_none());
}

#[test]
fn test_expired_token_is_rejected() {
    let config = AppConfig::default();
    // Well past the validation leeway.
    let claims = SessionClaims {
        sid: "expired-session".to_string(),
        user: ada(),
        iat: 1_000_000,
        exp: 1_000_060,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )
    .unwrap();

    assert!(read_session_token(&token, &config).is_none());
}

#[test]
fn test_garbage_token_is_rejected() {
    assert!(read_session_token("not-a-token", &AppConfig::default()).is_none());
}

// --- Session registry ---

#[test]
fn test_registry_open_and_close() {
    let config = AppConfig::default();
    let sessions = SessionRegistry::new();
    let (_, claims) = issue_session_token(&ada(), &config).unwrap();

    assert!(!sessions.is_open(&claims.sid));
    sessions.open(&claims);
    assert!(sessions.is_open(&claims.sid));

    assert!(sessions.close(&claims.sid));
    assert!(!sessions.is_open(&claims.sid));
    assert!(!sessions.close(&claims.sid), "closing twice is a no-op");
}

#[test]
fn test_registry_forgets_expired_sessions() {
    let sessions = SessionRegistry::new();
    let stale = SessionClaims {
        sid: "stale".to_string(),
        user: ada(),
        iat: 1_000_000,
        exp: 1_000_060,
    };
    sessions.open(&stale);
    assert!(!sessions.is_open("stale"));

    let (_, fresh) = issue_session_token(&ada(), &AppConfig::default()).unwrap();
    sessions.open(&fresh);
    assert_eq!(sessions.len(), 1, "opening a session prunes expired entries");
}

#[test]
fn test_registry_is_shared_between_clones() {
    let sessions = SessionRegistry::new();
    let (_, claims) = issue_session_token(&ada(), &AppConfig::default()).unwrap();

    sessions.clone().open(&claims);
    assert!(sessions.is_open(&claims.sid));
}

#[test]
fn test_session_cookie_attributes() {
    let local = AppConfig::default();
    let cookie = session_cookie("abc".to_string(), &local);

    assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.secure(), Some(false));
    assert_eq!(
        cookie.max_age(),
        Some(time::Duration::seconds(local.session_max_age_secs as i64))
    );

    let production = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    assert_eq!(session_cookie("abc".to_string(), &production).secure(), Some(true));
}

// --- Extractors ---

#[tokio::test]
async fn test_auth_user_extracted_from_cookie() {
    let state = app_state(seeded_store());
    let request = get("/api/user", Some(&session_header(&state)));
    let (mut parts, _) = request.into_parts();

    let AuthUser(user) = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user, ada());
}

#[tokio::test]
async fn test_auth_user_rejects_anonymous_request() {
    let state = app_state(seeded_store());
    let (mut parts, _) = get("/api/user", None).into_parts();

    let rejection = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
    assert!(matches!(rejection, ApiError::NotAuthenticated));
}

#[tokio::test]
async fn test_auth_user_rejects_token_of_unknown_session() {
    let state = app_state(seeded_store());
    // Validly signed, but never opened here (e.g. issued before a restart).
    let (token, _) = issue_session_token(&ada(), &state.config).unwrap();
    let cookie = format!("{}={}", SESSION_COOKIE_NAME, token);
    let (mut parts, _) = get("/api/user", Some(&cookie)).into_parts();

    let rejection = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
    assert!(matches!(rejection, ApiError::NotAuthenticated));
}

#[tokio::test]
async fn test_session_context_prefers_request_extension() {
    let state = app_state(seeded_store());
    let (mut parts, _) = get("/", None).into_parts();
    parts.extensions.insert(SessionContext {
        user: Some(ada()),
        session_id: Some("from-middleware".to_string()),
    });

    let session = SessionContext::from_request_parts(&mut parts, &state).await.unwrap();
    assert!(session.is_authenticated());
    assert_eq!(session.session_id.as_deref(), Some("from-middleware"));
}

// --- Gates through the router ---

#[tokio::test]
async fn test_api_gate_answers_with_failure_envelope() {
    for uri in ["/api/user", "/api/question", "/api/responses/q-1", "/api/comments/q-1"] {
        let response = app().oneshot(get(uri, None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let body = json_body(response).await;
        assert_eq!(body["success"], false, "{}", uri);
        assert_eq!(body["message"], "Not authenticated", "{}", uri);
    }
}

#[tokio::test]
async fn test_api_gate_lets_session_through() {
    let (app, state) = app_with_state();
    let cookie = session_header(&state);

    let response = app.oneshot(get("/api/user", Some(&cookie))).await.unwrap();

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], ACTIVE_USER);
    assert_eq!(body["user"]["groupId"], GROUP_A);
}

#[tokio::test]
async fn test_tampered_cookie_is_anonymous() {
    let (app, state) = app_with_state();
    let cookie = format!("{}x", session_header(&state));

    let response = app.oneshot(get("/api/user", Some(&cookie))).await.unwrap();

    let body = json_body(response).await;
    assert_eq!(body["message"], "Not authenticated");
}

#[tokio::test]
async fn test_cookie_copied_before_logout_is_rejected_after() {
    let app = app();

    let login = app
        .clone()
        .oneshot(post("/api/login", None, r#"{"userId":"user-001"}"#))
        .await
        .unwrap();
    let set_cookie = login
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("session cookie issued")
        .to_string();
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let before = app.clone().oneshot(get("/api/user", Some(&cookie))).await.unwrap();
    assert_eq!(json_body(before).await["success"], true);

    let logout = app
        .clone()
        .oneshot(post("/api/logout", Some(&cookie), ""))
        .await
        .unwrap();
    assert_eq!(json_body(logout).await["success"], true);

    for uri in ["/api/user", "/api/question", "/api/responses/q-1", "/api/comments/q-1"] {
        let replayed = app.clone().oneshot(get(uri, Some(&cookie))).await.unwrap();
        let body = json_body(replayed).await;
        assert_eq!(body["success"], false, "{}", uri);
        assert_eq!(body["message"], "Not authenticated", "{}", uri);
    }

    let dashboard = app.oneshot(get("/dashboard", Some(&cookie))).await.unwrap();
    assert_eq!(location(&dashboard), "/login");
}

#[tokio::test]
async fn test_dashboard_redirects_anonymous_visitors() {
    let response = app().oneshot(get("/dashboard", None)).await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_root_redirects_by_session() {
    let (app, state) = app_with_state();
    let anonymous = app.clone().oneshot(get("/", None)).await.unwrap();
    assert_eq!(location(&anonymous), "/login");

    let cookie = session_header(&state);
    let signed_in = app.oneshot(get("/", Some(&cookie))).await.unwrap();
    assert_eq!(location(&signed_in), "/dashboard");
}

#[tokio::test]
async fn test_login_page_skipped_with_session() {
    let (app, state) = app_with_state();
    let cookie = session_header(&state);

    let response = app.oneshot(get("/login", Some(&cookie))).await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_pages_served_from_static_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("login.html"), "<h1>login</h1>").unwrap();
    std::fs::write(dir.path().join("dashboard.html"), "<h1>dashboard</h1>").unwrap();

    let mut state = app_state(MemoryStore::new());
    state.config.static_dir = dir.path().to_string_lossy().into_owned();
    let cookie = session_header(&state);

    let login = create_router(state.clone()).oneshot(get("/login", None)).await.unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let bytes = to_bytes(login.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>login</h1>");

    let dashboard = create_router(state)
        .oneshot(get("/dashboard", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(dashboard.status(), StatusCode::OK);
    let bytes = to_bytes(dashboard.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>dashboard</h1>");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let response = app().oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
