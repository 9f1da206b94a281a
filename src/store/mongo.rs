use super::{DocumentStore, PROBE_DOCUMENT_ID, StoreError, collections, resolve_documents};
use crate::models::{
    ProbeDocument, Question, QuestionResponse, QuestionSummary, ResponseComment, ResponseSample,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, Database,
    bson::{self, Bson, Document, doc},
    options::ClientOptions,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// MongoStore
///
/// `DocumentStore` backed by MongoDB. Document ids live in `_id` and are surfaced to the
/// rest of the service as the `id` field of each record.
#[derive(Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// connect
    ///
    /// Parses the URI, builds a pooled client and verifies the connection by listing the
    /// collections of `database` once.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("question-board".to_string());
        options.max_pool_size = Some(20);
        options.connect_timeout = Some(Duration::from_secs(5));
        options.server_selection_timeout = Some(Duration::from_secs(5));

        let client = Client::with_options(options)?;
        let database = client.database(database);

        database.list_collection_names().await?;
        tracing::info!(database = %database.name(), "connected to MongoDB");

        Ok(Self { database })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }

    /// Runs `filter` against `collection` and validates every hit into `T`.
    async fn find_records<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<T>, StoreError> {
        let coll = self.collection(collection);
        let mut find = coll.find(filter);
        if let Some(projection) = projection {
            find = find.projection(projection);
        }
        if let Some(limit) = limit {
            find = find.limit(limit);
        }
        let documents: Vec<Document> = find.await?.try_collect().await?;

        documents
            .into_iter()
            .map(|document| into_record(collection, document))
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.collection(collections::USERS)
            .find_one(doc! { "_id": id })
            .await?
            .map(|document| into_record(collections::USERS, document))
            .transpose()
    }

    async fn record_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.collection(collections::USERS)
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "lastLoginAt": at.to_rfc3339() } },
            )
            .await?;
        Ok(())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        self.find_records(collections::QUESTIONS, doc! {}, None, None)
            .await
    }

    async fn list_responses(
        &self,
        question_id: &str,
        group_id: &str,
    ) -> Result<Vec<QuestionResponse>, StoreError> {
        self.find_records(
            collections::RESPONSES,
            doc! { "questionId": question_id, "groupId": group_id },
            None,
            None,
        )
        .await
    }

    async fn list_comments(
        &self,
        question_id: &str,
        group_id: &str,
    ) -> Result<Vec<ResponseComment>, StoreError> {
        self.find_records(
            collections::COMMENTS,
            doc! { "questionId": question_id, "groupId": group_id },
            None,
            None,
        )
        .await
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let documents: Vec<Document> = self
            .collection(collection)
            .find(doc! {})
            .projection(doc! { "_id": 1 })
            .await?
            .try_collect()
            .await?;

        Ok(documents
            .into_iter()
            .map(|mut document| id_of(document.remove("_id")))
            .collect())
    }

    async fn list_question_summaries(&self) -> Result<Vec<QuestionSummary>, StoreError> {
        self.find_records(
            collections::QUESTIONS,
            doc! {},
            Some(doc! { "question": 1, "isActive": 1 }),
            None,
        )
        .await
    }

    async fn sample_responses(&self, limit: usize) -> Result<Vec<ResponseSample>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.find_records(
            collections::RESPONSES,
            doc! {},
            Some(doc! { "questionId": 1, "groupId": 1 }),
            Some(limit),
        )
        .await
    }

    async fn write_probe(&self, probe: ProbeDocument) -> Result<ProbeDocument, StoreError> {
        let document = bson::to_document(&probe).map_err(|e| StoreError::Malformed {
            collection: collections::PROBE.to_string(),
            id: PROBE_DOCUMENT_ID.to_string(),
            reason: e.to_string(),
        })?;

        let probes = self.collection(collections::PROBE);
        probes
            .replace_one(doc! { "_id": PROBE_DOCUMENT_ID }, document)
            .upsert(true)
            .await?;

        match probes.find_one(doc! { "_id": PROBE_DOCUMENT_ID }).await? {
            Some(stored) => into_record(collections::PROBE, stored),
            None => Err(StoreError::Missing {
                collection: collections::PROBE.to_string(),
                id: PROBE_DOCUMENT_ID.to_string(),
            }),
        }
    }

    async fn replace_collection(
        &self,
        collection: &str,
        documents: Vec<Value>,
    ) -> Result<usize, StoreError> {
        let target = self.collection(collection);

        // Resolved before the collection is cleared: a repeated id must not fail the insert.
        let documents = resolve_documents(documents)
            .into_iter()
            .map(|(id, value)| into_document(collection, id, &value))
            .collect::<Result<Vec<_>, _>>()?;

        let cleared = target.delete_many(doc! {}).await?;
        tracing::debug!(collection, deleted = cleared.deleted_count, "collection cleared");

        if documents.is_empty() {
            return Ok(0);
        }

        let inserted = target.insert_many(documents).await?;
        Ok(inserted.inserted_ids.len())
    }
}

/// Renders any `_id` shape (string, ObjectId, number) as the string id used by the API.
fn id_of(raw: Option<Bson>) -> String {
    match raw {
        Some(Bson::String(id)) => id,
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// into_record
///
/// The validation boundary: moves `_id` into `id`, renders native BSON dates as RFC 3339
/// strings, and deserializes the document into its record struct. A missing or mistyped
/// required field becomes `StoreError::Malformed`.
fn into_record<T: DeserializeOwned>(collection: &str, mut document: Document) -> Result<T, StoreError> {
    let id = id_of(document.remove("_id"));
    document.insert("id", id.clone());

    let malformed = |reason: String| StoreError::Malformed {
        collection: collection.to_string(),
        id: id.clone(),
        reason,
    };

    for (_, value) in document.iter_mut() {
        if let Bson::DateTime(at) = value {
            let rendered = at.try_to_rfc3339_string().map_err(|e| malformed(e.to_string()))?;
            *value = Bson::String(rendered);
        }
    }

    bson::from_document(document).map_err(|e| malformed(e.to_string()))
}

/// Converts a seed value into a BSON document stored under `id`.
fn into_document(collection: &str, id: String, value: &Value) -> Result<Document, StoreError> {
    let mut document = bson::to_document(value).map_err(|e| StoreError::Malformed {
        collection: collection.to_string(),
        id: id.clone(),
        reason: e.to_string(),
    })?;
    document.remove("id");
    document.insert("_id", id);
    Ok(document)
}
