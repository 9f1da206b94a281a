use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod seed;
pub mod shaping;
pub mod store;

// Routing segregated by access level (Public, Authenticated).
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::SessionRegistry;
pub use config::AppConfig;
pub use error::ApiError;
pub use store::{DocumentStore, MemoryStore, MongoStore, StoreError, StoreState};

/// ApiDoc
///
/// Auto-generates the OpenAPI document for the JSON endpoints, served at
/// `/api-docs/openapi.json` and browsable through the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::current_user, handlers::logout, handlers::get_question,
        handlers::get_responses, handlers::get_comments, handlers::debug_report,
        handlers::store_probe
    ),
    components(
        schemas(
            models::User, models::Question, models::QuestionResponse, models::ResponseComment,
            models::SessionUser, models::LoginRequest, models::LoginResponse,
            models::CurrentUserResponse, models::MessageResponse, models::QuestionPayload,
            models::ResponsesPayload, models::CommentsPayload, models::ProbeDocument,
            models::ProbeResponse, models::FailureBody, models::DebugReport,
        )
    ),
    tags(
        (name = "question-board", description = "Broadcast question board API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The container shared by every request: the document store, the loaded configuration
/// and the registry of open sessions.
#[derive(Clone)]
pub struct AppState {
    /// Store Layer: MongoDB in deployments, in-memory for local runs and tests.
    pub store: StoreState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Sessions opened by login and not yet closed by logout.
    pub sessions: SessionRegistry,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for StoreState {
    fn from_ref(app_state: &AppState) -> StoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(app_state: &AppState) -> SessionRegistry {
        app_state.sessions.clone()
    }
}

/// create_router
///
/// Assembles the routing table, applies the session layer and the observability stack,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes(state.clone()))
        // Resolves the session cookie into a SessionContext for every route above.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_middleware,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with method, URI and the `x-request-id` so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
