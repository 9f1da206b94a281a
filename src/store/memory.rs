use super::{DocumentStore, PROBE_DOCUMENT_ID, StoreError, collections, document_id};
use crate::models::{
    ProbeDocument, Question, QuestionResponse, QuestionSummary, ResponseComment, ResponseSample,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Collections keyed by name; each keeps its documents in insertion order.
type Collections = HashMap<String, Vec<(String, Value)>>;

/// MemoryStore
///
/// An in-process `DocumentStore` used for local development without MongoDB and for
/// handler tests. Documents are held as JSON and validated into records on every read,
/// the same way the MongoDB implementation validates BSON.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    /// When true, every operation returns a simulated `StoreError::Unavailable`.
    pub should_fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Builder used by tests and the local bootstrap: appends `documents` to `collection`.
    pub fn with_collection(self, collection: &str, documents: Vec<Value>) -> Self {
        if let Ok(mut stored) = self.collections.write() {
            let target = stored.entry(collection.to_string()).or_default();
            for document in documents {
                upsert(target, document);
            }
        }
        self
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Unavailable(
                "simulated store failure".to_string(),
            ));
        }
        Ok(())
    }

    /// Decodes every document of `collection` accepted by `filter`, in insertion order.
    fn read_records<T, F>(&self, collection: &str, filter: F) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
        F: Fn(&Value) -> bool,
    {
        self.check_available()?;
        let stored = self.collections.read().map_err(|_| poisoned())?;

        stored
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, document)| filter(document))
                    .map(|(id, document)| decode(collection, id, document))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let mut users = self.read_records(collections::USERS, |document| {
            field_equals(document, "id", id)
        })?;
        Ok(users.pop())
    }

    async fn record_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check_available()?;
        let mut stored = self.collections.write().map_err(|_| poisoned())?;

        if let Some(users) = stored.get_mut(collections::USERS) {
            if let Some((_, Value::Object(user))) = users.iter_mut().find(|(key, _)| key == id) {
                user.insert("lastLoginAt".to_string(), Value::String(at.to_rfc3339()));
            }
        }
        Ok(())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        self.read_records(collections::QUESTIONS, |_| true)
    }

    async fn list_responses(
        &self,
        question_id: &str,
        group_id: &str,
    ) -> Result<Vec<QuestionResponse>, StoreError> {
        self.read_records(collections::RESPONSES, |document| {
            field_equals(document, "questionId", question_id)
                && field_equals(document, "groupId", group_id)
        })
    }

    async fn list_comments(
        &self,
        question_id: &str,
        group_id: &str,
    ) -> Result<Vec<ResponseComment>, StoreError> {
        self.read_records(collections::COMMENTS, |document| {
            field_equals(document, "questionId", question_id)
                && field_equals(document, "groupId", group_id)
        })
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        let stored = self.collections.read().map_err(|_| poisoned())?;

        Ok(stored
            .get(collection)
            .map(|documents| documents.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default())
    }

    async fn list_question_summaries(&self) -> Result<Vec<QuestionSummary>, StoreError> {
        self.read_records(collections::QUESTIONS, |_| true)
    }

    async fn sample_responses(&self, limit: usize) -> Result<Vec<ResponseSample>, StoreError> {
        let mut sample: Vec<ResponseSample> =
            self.read_records(collections::RESPONSES, |_| true)?;
        sample.truncate(limit);
        Ok(sample)
    }

    async fn write_probe(&self, probe: ProbeDocument) -> Result<ProbeDocument, StoreError> {
        self.check_available()?;
        let malformed = |reason: String| StoreError::Malformed {
            collection: collections::PROBE.to_string(),
            id: PROBE_DOCUMENT_ID.to_string(),
            reason,
        };

        let mut document = serde_json::to_value(&probe).map_err(|e| malformed(e.to_string()))?;
        if let Value::Object(fields) = &mut document {
            fields.insert("id".to_string(), Value::String(PROBE_DOCUMENT_ID.to_string()));
        }

        {
            let mut stored = self.collections.write().map_err(|_| poisoned())?;
            upsert(
                stored.entry(collections::PROBE.to_string()).or_default(),
                document,
            );
        }

        self.read_records(collections::PROBE, |document| {
            field_equals(document, "id", PROBE_DOCUMENT_ID)
        })?
        .pop()
        .ok_or_else(|| StoreError::Missing {
            collection: collections::PROBE.to_string(),
            id: PROBE_DOCUMENT_ID.to_string(),
        })
    }

    async fn replace_collection(
        &self,
        collection: &str,
        documents: Vec<Value>,
    ) -> Result<usize, StoreError> {
        self.check_available()?;
        let mut stored = self.collections.write().map_err(|_| poisoned())?;

        let target = stored.entry(collection.to_string()).or_default();
        target.clear();
        for document in documents {
            upsert(target, document);
        }
        Ok(target.len())
    }
}

/// Inserts `document` under its resolved id, replacing any document with the same id.
/// The id is also written into the body so reads can validate it like any other field.
fn upsert(target: &mut Vec<(String, Value)>, mut document: Value) {
    let id = document_id(&document);
    if let Value::Object(fields) = &mut document {
        fields.insert("id".to_string(), Value::String(id.clone()));
    }

    match target.iter_mut().find(|(key, _)| *key == id) {
        Some(slot) => slot.1 = document,
        None => target.push((id, document)),
    }
}

fn field_equals(document: &Value, field: &str, expected: &str) -> bool {
    document.get(field).and_then(Value::as_str) == Some(expected)
}

fn decode<T: DeserializeOwned>(collection: &str, id: &str, document: &Value) -> Result<T, StoreError> {
    serde_json::from_value(document.clone()).map_err(|e| StoreError::Malformed {
        collection: collection.to_string(),
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}
