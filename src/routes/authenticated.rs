use crate::{AppState, auth, handlers};
use axum::{Router, middleware, routing::get};

/// Authenticated Router Module
///
/// Every route here sits behind a session gate applied as a route layer. API routes
/// answer anonymous callers with the `Not authenticated` envelope; the dashboard page
/// redirects them to `/login`.
pub fn authenticated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(api_routes(state.clone()))
        .merge(page_routes(state))
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // GET /api/user
        // The session user (id, display name, email, group).
        .route("/api/user", get(handlers::current_user))
        // GET /api/question
        // One broadcast question, random among the active ones.
        .route("/api/question", get(handlers::get_question))
        // GET /api/responses/{questionId}
        // Responses within the caller's group, newest first.
        .route("/api/responses/{questionId}", get(handlers::get_responses))
        // GET /api/comments/{questionId}
        // Comments within the caller's group, threaded by response.
        .route("/api/comments/{questionId}", get(handlers::get_comments))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_session,
        ))
}

fn page_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // GET /dashboard
        .route("/dashboard", get(handlers::dashboard_page))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_page_session,
        ))
}
