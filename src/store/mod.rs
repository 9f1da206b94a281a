use crate::models::{
    ProbeDocument, Question, QuestionResponse, QuestionSummary, ResponseComment, ResponseSample,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Collection names, shared by the service, the seed tool and the store implementations.
pub mod collections {
    pub const USERS: &str = "users";
    pub const GROUPS: &str = "groups";
    pub const QUESTIONS: &str = "Broadcast_questions";
    pub const RESPONSES: &str = "question_responses";
    pub const COMMENTS: &str = "response_comments";
    pub const PROBE: &str = "test";
}

/// Document id of the probe written by `GET /api/test`.
pub const PROBE_DOCUMENT_ID: &str = "hello";

/// StoreError
///
/// Everything that can go wrong at the document store boundary. Handlers never inspect
/// the variant; they wrap it into an `ApiError` whose envelope carries `to_string()`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[from] mongodb::error::Error),

    /// A stored document did not match the record shape expected for its collection.
    #[error("malformed document {collection}/{id}: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("document {collection}/{id} was not found after it was written")]
    Missing { collection: String, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// DocumentStore
///
/// The abstract contract for every read and write this service performs. Handlers only
/// see this trait, so the MongoDB client and the in-memory store are interchangeable.
///
/// **Send + Sync + async_trait** make `Arc<dyn DocumentStore>` shareable across Axum's
/// task boundaries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    // Sets `lastLoginAt`. Unknown ids are a silent no-op.
    async fn record_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    // --- Question board ---
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError>;
    // Both filters are exact equality matches; order is whatever the store returns.
    async fn list_responses(
        &self,
        question_id: &str,
        group_id: &str,
    ) -> Result<Vec<QuestionResponse>, StoreError>;
    async fn list_comments(
        &self,
        question_id: &str,
        group_id: &str,
    ) -> Result<Vec<ResponseComment>, StoreError>;

    // --- Diagnostics ---
    // Projections: only the listed fields are read, so incomplete documents still show up.
    async fn list_ids(&self, collection: &str) -> Result<Vec<String>, StoreError>;
    async fn list_question_summaries(&self) -> Result<Vec<QuestionSummary>, StoreError>;
    async fn sample_responses(&self, limit: usize) -> Result<Vec<ResponseSample>, StoreError>;
    /// Writes the probe under `PROBE_DOCUMENT_ID` and returns what the store reads back.
    async fn write_probe(&self, probe: ProbeDocument) -> Result<ProbeDocument, StoreError>;

    // --- Seeding ---
    /// Clears `collection` and inserts `documents`, last write wins for a repeated id.
    /// Returns the number of documents stored.
    async fn replace_collection(
        &self,
        collection: &str,
        documents: Vec<Value>,
    ) -> Result<usize, StoreError>;
}

/// StoreState
///
/// The concrete type used to share the store across the application state.
pub type StoreState = Arc<dyn DocumentStore>;

/// document_id
///
/// Resolves the id a seed document is stored under: its own string `id` field when
/// present, otherwise a freshly generated UUID.
pub fn document_id(document: &Value) -> String {
    document
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// resolve_documents
///
/// Pairs every seed document with its `document_id`. A repeated id replaces the earlier
/// document in place, so the result holds each id once, in first-seen order.
pub fn resolve_documents(documents: Vec<Value>) -> Vec<(String, Value)> {
    let mut resolved: Vec<(String, Value)> = Vec::with_capacity(documents.len());
    for document in documents {
        let id = document_id(&document);
        match resolved.iter_mut().find(|(key, _)| *key == id) {
            Some(slot) => slot.1 = document,
            None => resolved.push((id, document)),
        }
    }
    resolved
}
