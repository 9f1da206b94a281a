use crate::{
    AppState,
    auth::{self, AuthUser, SessionContext},
    error::ApiError,
    models::{
        CommentsPayload, CurrentUserResponse, DebugData, DebugReport, IdListing, LoginRequest,
        LoginResponse, MessageResponse, ProbeDocument, ProbeResponse, QuestionListing,
        QuestionPayload, ResponseListing, ResponsesPayload, SessionUser,
    },
    shaping,
    store::{StoreError, collections},
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Request, State, rejection::JsonRejection},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use std::path::PathBuf;
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Number of responses shown in the debug report sample.
const DEBUG_RESPONSE_SAMPLE: usize = 3;

// --- Pages ---

/// serve_page
///
/// Streams `name` from the configured static directory. Missing files yield the 404 that
/// `ServeFile` produces.
async fn serve_page(state: &AppState, name: &str, request: Request) -> Response {
    let path = PathBuf::from(&state.config.static_dir).join(name);
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// root
///
/// [Public Route] Sends signed-in users to the dashboard and everyone else to the login page.
pub async fn root(session: SessionContext) -> Redirect {
    if session.is_authenticated() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

/// login_page
///
/// [Public Route] Serves `login.html`, or skips straight to the dashboard when a session
/// already exists.
pub async fn login_page(
    State(state): State<AppState>,
    session: SessionContext,
    request: Request,
) -> Response {
    if session.is_authenticated() {
        return Redirect::to("/dashboard").into_response();
    }
    serve_page(&state, "login.html", request).await
}

/// dashboard_page
///
/// [Authenticated Page] Serves `dashboard.html`. The page gate has already redirected
/// anonymous visitors.
pub async fn dashboard_page(State(state): State<AppState>, request: Request) -> Response {
    serve_page(&state, "dashboard.html", request).await
}

// --- Session API ---

/// login
///
/// [Public Route] Logs a user in by bare identifier.
///
/// *Flow*: look the user up, refuse unknown or inactive accounts, stamp `lastLoginAt`,
/// then issue the session cookie holding `{id, displayName, email, groupId}`.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses((status = 200, description = "Logged in, or refused with success = false", body = LoginResponse))
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    // An unreadable body is treated the same as a missing identifier.
    let user_id = payload
        .ok()
        .and_then(|Json(request)| request.user_id)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingUserId)?;

    let user = state
        .store
        .get_user(&user_id)
        .await
        .map_err(ApiError::store("An error occurred during login"))?
        .ok_or(ApiError::UserNotFound)?;

    if !user.is_active {
        return Err(ApiError::UserInactive);
    }

    state
        .store
        .record_login(&user.id, Utc::now())
        .await
        .map_err(ApiError::store("An error occurred during login"))?;

    let session_user = SessionUser::from(&user);
    let (token, claims) = auth::issue_session_token(&session_user, &state.config)?;
    state.sessions.open(&claims);

    tracing::info!(user_id = %session_user.id, group_id = %session_user.group_id, "user logged in");

    Ok((
        jar.add(auth::session_cookie(token, &state.config)),
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            user: session_user,
        }),
    ))
}

/// current_user
///
/// [Authenticated Route] Returns the user recorded in the session.
#[utoipa::path(
    get,
    path = "/api/user",
    responses((status = 200, description = "Session user", body = CurrentUserResponse))
)]
pub async fn current_user(AuthUser(user): AuthUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        success: true,
        user,
    })
}

/// logout
///
/// [Public Route] Always succeeds: the session is closed server-side, so a copy of the old
/// cookie no longer authenticates, and the cookie is replaced by an expired one.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
    session: SessionContext,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(session_id) = session.session_id.as_deref() {
        state.sessions.close(session_id);
        tracing::info!(sid = %session_id, "session closed");
    }

    (
        jar.add(auth::cleared_session_cookie(&state.config)),
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully".to_string(),
        }),
    )
}

// --- Question Board API ---

/// get_question
///
/// [Authenticated Route] Returns one broadcast question, drawn at random from the active
/// questions (or from all of them when none is active).
#[utoipa::path(
    get,
    path = "/api/question",
    responses((status = 200, description = "Selected question", body = QuestionPayload))
)]
pub async fn get_question(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<QuestionPayload>, ApiError> {
    let questions = state
        .store
        .list_questions()
        .await
        .map_err(ApiError::store("Error fetching question"))?;

    tracing::debug!(count = questions.len(), "questions loaded");

    let question = shaping::select_question(&questions, &mut rand::rng())
        .cloned()
        .ok_or(ApiError::NoQuestions)?;

    tracing::debug!(question_id = %question.id, active = question.is_active, "question selected");

    Ok(Json(QuestionPayload {
        success: true,
        question,
    }))
}

/// get_responses
///
/// [Authenticated Route] Lists the responses to a question written within the caller's
/// group, newest first.
#[utoipa::path(
    get,
    path = "/api/responses/{questionId}",
    params(("questionId" = String, Path, description = "Question ID")),
    responses((status = 200, description = "Group responses", body = ResponsesPayload))
)]
pub async fn get_responses(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<ResponsesPayload>, ApiError> {
    let responses = state
        .store
        .list_responses(&question_id, &user.group_id)
        .await
        .map_err(ApiError::store("Error fetching responses"))?;

    tracing::debug!(%question_id, group_id = %user.group_id, count = responses.len(), "responses loaded");

    Ok(Json(ResponsesPayload {
        success: true,
        responses: shaping::sort_responses(responses),
    }))
}

/// get_comments
///
/// [Authenticated Route] Lists the caller's group comments on a question, threaded by
/// parent response and ordered oldest first within each thread.
#[utoipa::path(
    get,
    path = "/api/comments/{questionId}",
    params(("questionId" = String, Path, description = "Question ID")),
    responses((status = 200, description = "Comments by response", body = CommentsPayload))
)]
pub async fn get_comments(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<CommentsPayload>, ApiError> {
    let comments = state
        .store
        .list_comments(&question_id, &user.group_id)
        .await
        .map_err(ApiError::store("Error fetching comments"))?;

    tracing::debug!(%question_id, group_id = %user.group_id, count = comments.len(), "comments loaded");

    Ok(Json(CommentsPayload {
        success: true,
        comments: shaping::thread_comments(comments),
    }))
}

// --- Diagnostics ---

/// debug_report
///
/// [Public Route] Enumerates what the store currently holds: user and group ids, every
/// question, and a small sample of responses. Reads projections only, so one incomplete
/// document does not hide the rest.
#[utoipa::path(
    get,
    path = "/api/debug",
    responses((status = 200, description = "Store listing", body = DebugReport))
)]
pub async fn debug_report(State(state): State<AppState>) -> Result<Json<DebugReport>, ApiError> {
    let failed = ApiError::store("Error checking store data");

    let collect = async {
        let users = state.store.list_ids(collections::USERS).await?;
        let groups = state.store.list_ids(collections::GROUPS).await?;
        let questions = state.store.list_question_summaries().await?;
        let response_ids = state.store.list_ids(collections::RESPONSES).await?;
        let sample = state.store.sample_responses(DEBUG_RESPONSE_SAMPLE).await?;

        Ok::<_, StoreError>(DebugData {
            users: IdListing {
                count: users.len(),
                ids: users,
            },
            groups: IdListing {
                count: groups.len(),
                ids: groups,
            },
            broadcast_questions: QuestionListing {
                count: questions.len(),
                questions,
            },
            question_responses: ResponseListing {
                count: response_ids.len(),
                sample,
            },
        })
    };

    let data = collect.await.map_err(failed)?;

    Ok(Json(DebugReport {
        success: true,
        message: "Store data check".to_string(),
        data,
    }))
}

/// store_probe
///
/// [Public Route] Writes a fixed document to the `test` collection and reads it back,
/// proving the store is reachable and writable.
#[utoipa::path(
    get,
    path = "/api/test",
    responses((status = 200, description = "Round-trip result", body = ProbeResponse))
)]
pub async fn store_probe(State(state): State<AppState>) -> Result<Json<ProbeResponse>, ApiError> {
    let now = Utc::now();
    let probe = ProbeDocument {
        message: "Hello from the store!".to_string(),
        timestamp: now,
        created_at: now,
    };

    let data = state.store.write_probe(probe).await.map_err(ApiError::Probe)?;

    Ok(Json(ProbeResponse {
        success: true,
        data,
        message: "Store connection successful!".to_string(),
    }))
}
