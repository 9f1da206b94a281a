// Centralized error handling for the API endpoints

use crate::{models::FailureBody, store::StoreError};
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors an API handler can end with. Each one renders as a `success:false` envelope
/// with HTTP 200; clients only look at the `success` flag.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("User ID is required")]
    MissingUserId,

    #[error("User not found")]
    UserNotFound,

    #[error("User account is not active")]
    UserInactive,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No questions available. Please run the seed tool")]
    NoQuestions,

    #[error("An error occurred during login")]
    SessionIssue(#[from] jsonwebtoken::errors::Error),

    /// A store failure, reported under an endpoint-specific message.
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    /// The store round-trip probe failed.
    #[error("Please check store credentials and setup")]
    Probe(#[source] StoreError),
}

impl ApiError {
    /// Adapter for `map_err`: `store_call.await.map_err(ApiError::store("Error fetching question"))?`.
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |source| ApiError::Store { context, source }
    }

    /// The JSON body this error renders to.
    pub fn body(&self) -> FailureBody {
        match self {
            ApiError::Store { source, .. } => FailureBody {
                success: false,
                message: Some(self.to_string()),
                error: Some(source.to_string()),
                note: None,
            },
            ApiError::SessionIssue(source) => FailureBody {
                success: false,
                message: Some(self.to_string()),
                error: Some(source.to_string()),
                note: None,
            },
            ApiError::Probe(source) => FailureBody {
                success: false,
                message: None,
                error: Some(source.to_string()),
                note: Some(self.to_string()),
            },
            _ => FailureBody {
                success: false,
                message: Some(self.to_string()),
                error: None,
                note: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store { context, source } => {
                tracing::error!(error = %source, "{}", context);
            }
            ApiError::SessionIssue(source) => {
                tracing::error!(error = %source, "failed to issue session token");
            }
            ApiError::Probe(source) => {
                tracing::error!(error = %source, "store probe failed");
            }
            other => {
                tracing::debug!(reason = %other, "request refused");
            }
        }

        Json(self.body()).into_response()
    }
}
