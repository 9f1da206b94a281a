use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. The page handlers here still look at the
/// session to decide where to redirect, but never refuse a request.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; does not touch the store.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Redirects to /dashboard or /login depending on the session.
        .route("/", get(handlers::root))
        // GET /login
        // The login page, or a redirect to /dashboard for signed-in users.
        .route("/login", get(handlers::login_page))
        // POST /api/login
        // Exchanges a bare user id for a session cookie.
        .route("/api/login", post(handlers::login))
        // POST /api/logout
        // Expires the session cookie. Works with or without a session.
        .route("/api/logout", post(handlers::logout))
        // GET /api/debug
        // Lists the ids and a sample of what the store holds.
        .route("/api/debug", get(handlers::debug_report))
        // GET /api/test
        // Write-then-read round trip against the store.
        .route("/api/test", get(handlers::store_probe))
}
