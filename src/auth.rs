use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::{SystemTime, UNIX_EPOCH},
};
use uuid::Uuid;

use crate::{AppState, config::AppConfig, error::ApiError, models::SessionUser};

/// Name of the HTTP-only cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "qb_session";

/// SessionClaims
///
/// The payload of the signed session token. The token alone is not enough: its `sid`
/// must also be open in the `SessionRegistry`, which is what logout revokes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Session id (UUID v4), the key into the `SessionRegistry`.
    pub sid: String,
    /// The user recorded at login.
    pub user: SessionUser,
    /// Issued At (iat).
    pub iat: usize,
    /// Expiration Time (exp): `iat + session_max_age_secs`, saturating.
    pub exp: usize,
}

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as usize)
        .unwrap_or(0)
}

/// issue_session_token
///
/// Opens a new session for `user` and signs it with the configured secret (HS256).
/// The caller registers the returned claims with the `SessionRegistry`.
pub fn issue_session_token(
    user: &SessionUser,
    config: &AppConfig,
) -> Result<(String, SessionClaims), jsonwebtoken::errors::Error> {
    let iat = now_secs();
    let max_age = usize::try_from(config.session_max_age_secs).unwrap_or(usize::MAX);
    let claims = SessionClaims {
        sid: Uuid::new_v4().to_string(),
        user: user.clone(),
        iat,
        exp: iat.saturating_add(max_age),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )?;
    Ok((token, claims))
}

/// read_session_token
///
/// Returns the claims if the token is well-formed, correctly signed and not expired.
/// Whether the session is still open is the registry's call, not the token's.
pub fn read_session_token(token: &str, config: &AppConfig) -> Option<SessionClaims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.session_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring invalid session token");
            None
        }
    }
}

/// SessionRegistry
///
/// The server side of every session: open session ids and their expiry. Login opens an
/// entry, logout closes it, and a token whose `sid` is not open is no session at all.
/// Held per process; a restart signs everyone out.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    open: Arc<RwLock<HashMap<String, usize>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `claims.sid` until `claims.exp`, dropping entries that already expired.
    pub fn open(&self, claims: &SessionClaims) {
        let now = now_secs();
        let mut open = self.open.write().unwrap_or_else(PoisonError::into_inner);
        open.retain(|_, exp| *exp > now);
        open.insert(claims.sid.clone(), claims.exp);
    }

    pub fn is_open(&self, sid: &str) -> bool {
        let open = self.open.read().unwrap_or_else(PoisonError::into_inner);
        open.get(sid).is_some_and(|exp| *exp > now_secs())
    }

    /// Returns whether `sid` was open.
    pub fn close(&self, sid: &str) -> bool {
        let mut open = self.open.write().unwrap_or_else(PoisonError::into_inner);
        open.remove(sid).is_some()
    }

    pub fn len(&self) -> usize {
        self.open.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// session_cookie
///
/// HTTP-only, `SameSite=Lax`, scoped to `/`, `Secure` in production.
pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .max_age(time::Duration::seconds(
            i64::try_from(config.session_max_age_secs).unwrap_or(i64::MAX),
        ))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies())
        .build()
}

/// Overwrites the session cookie with an empty, already-expired one.
pub fn cleared_session_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies())
        .build()
}

/// SessionContext
///
/// The per-request session view, inserted into the request extensions by
/// `session_middleware`. `user` is `Some` iff the request carries a valid token for a
/// session that is still open.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user: Option<SessionUser>,
    pub session_id: Option<String>,
}

impl SessionContext {
    pub fn from_jar(jar: &CookieJar, config: &AppConfig, sessions: &SessionRegistry) -> Self {
        let claims = jar
            .get(SESSION_COOKIE_NAME)
            .map(|cookie| cookie.value())
            .filter(|token| !token.is_empty())
            .and_then(|token| read_session_token(token, config))
            .filter(|claims| {
                let open = sessions.is_open(&claims.sid);
                if !open {
                    tracing::debug!(sid = %claims.sid, "ignoring token of a closed session");
                }
                open
            });

        match claims {
            Some(claims) => Self {
                user: Some(claims.user),
                session_id: Some(claims.sid),
            },
            None => Self::default(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// session_middleware
///
/// Resolves the session cookie once per request and stores the result as a
/// `SessionContext` extension for the gates and handlers below it.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = SessionContext::from_jar(&jar, &state.config, &state.sessions);
    request.extensions_mut().insert(session);
    next.run(request).await
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
    SessionRegistry: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<SessionContext>() {
            return Ok(session.clone());
        }
        // Not behind session_middleware (e.g. a handler exercised directly in tests).
        let config = AppConfig::from_ref(state);
        let sessions = SessionRegistry::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(SessionContext::from_jar(&jar, &config, &sessions))
    }
}

/// AuthUser
///
/// Extractor for handlers that require a session. Rejects with
/// `ApiError::NotAuthenticated`, which renders the JSON failure envelope.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
    SessionRegistry: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(session) = SessionContext::from_request_parts(parts, state).await;
        session.user.map(AuthUser).ok_or(ApiError::NotAuthenticated)
    }
}

/// require_api_session
///
/// Route layer for the gated `/api/*` endpoints. The `AuthUser` extractor does the work;
/// a request without a session never reaches the handler.
pub async fn require_api_session(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// require_page_session
///
/// Route layer for gated HTML pages: anonymous visitors are sent to `/login`.
pub async fn require_page_session(session: SessionContext, request: Request, next: Next) -> Response {
    if session.is_authenticated() {
        next.run(request).await
    } else {
        Redirect::to("/login").into_response()
    }
}
