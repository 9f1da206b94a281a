use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Store Records (validated at the store boundary) ---

/// User
///
/// A member account from the `users` collection. The document id is the login identifier
/// typed by the user. Only `lastLoginAt` is ever written back by this service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    // Cohort scope: responses and comments are only visible within the same group.
    pub group_id: String,
    // Missing flag means the account was never activated.
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Question
///
/// A broadcast question from the `Broadcast_questions` collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Question {
    pub id: String,
    /// The question text shown on the dashboard.
    pub question: String,
    /// Active questions are preferred by the random selector.
    #[serde(default)]
    pub is_active: bool,
}

/// QuestionResponse
///
/// A group member's answer to a question, from the `question_responses` collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuestionResponse {
    pub id: String,
    pub question_id: String,
    pub group_id: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// ResponseComment
///
/// A comment threaded under a response, from the `response_comments` collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ResponseComment {
    pub id: String,
    // Parent response; the threading key.
    pub response_id: String,
    pub question_id: String,
    pub group_id: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// ProbeDocument
///
/// The document written to and read back from the `test` collection by `GET /api/test`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProbeDocument {
    pub message: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Session ---

/// SessionUser
///
/// The identity stored in the session after a successful login. This is the only user
/// data the gated endpoints see.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionUser {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub group_id: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            group_id: user.group_id.clone(),
        }
    }
}

// --- Request Payloads ---

/// LoginRequest
///
/// Input payload for `POST /api/login`. The identifier is optional at the type level so a
/// missing value produces the "User ID is required" envelope instead of a rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginRequest {
    #[schema(example = "user-001")]
    pub user_id: Option<String>,
}

// --- Response Envelopes ---

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: SessionUser,
}

/// CurrentUserResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CurrentUserResponse {
    pub success: bool,
    pub user: SessionUser,
}

/// MessageResponse
///
/// A bare acknowledgement, e.g. for logout.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// QuestionPayload
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct QuestionPayload {
    pub success: bool,
    pub question: Question,
}

/// ResponsesPayload
///
/// Group-scoped responses, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ResponsesPayload {
    pub success: bool,
    pub responses: Vec<QuestionResponse>,
}

/// CommentsPayload
///
/// Group-scoped comments keyed by parent response id, each thread oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentsPayload {
    pub success: bool,
    pub comments: BTreeMap<String, Vec<ResponseComment>>,
}

/// ProbeResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProbeResponse {
    pub success: bool,
    pub data: ProbeDocument,
    pub message: String,
}

/// FailureBody
///
/// The uniform `success:false` envelope. Every logical failure is rendered with this
/// body and HTTP 200; only the flag communicates the outcome.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct FailureBody {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// --- Debug Report ---

/// IdListing
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct IdListing {
    pub count: usize,
    pub ids: Vec<String>,
}

/// QuestionSummary
///
/// Debug projection of a question. Fields a document lacks are left out.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuestionSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

/// QuestionListing
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct QuestionListing {
    pub count: usize,
    pub questions: Vec<QuestionSummary>,
}

/// ResponseSample
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ResponseSample {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// ResponseListing
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResponseListing {
    pub count: usize,
    pub sample: Vec<ResponseSample>,
}

/// DebugData
///
/// Field names mirror the collection names so the report reads like a store listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DebugData {
    pub users: IdListing,
    pub groups: IdListing,
    #[serde(rename = "Broadcast_questions")]
    pub broadcast_questions: QuestionListing,
    pub question_responses: ResponseListing,
}

/// DebugReport
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DebugReport {
    pub success: bool,
    pub message: String,
    pub data: DebugData,
}
