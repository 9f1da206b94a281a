//! Loading of the JSON seed files that prime a store with users, groups, questions,
//! responses and comments.

use crate::store::{DocumentStore, StoreError, collections};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Seed file → collection mapping, in upload order.
pub const SEED_FILES: &[(&str, &str)] = &[
    ("users.json", collections::USERS),
    ("groups.json", collections::GROUPS),
    ("broadcast_questions.json", collections::QUESTIONS),
    ("question_responses.json", collections::RESPONSES),
    ("response_comments.json", collections::COMMENTS),
];

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} must contain an array or an object of arrays")]
    NotACollection { path: PathBuf },

    #[error("failed to upload {collection}: {source}")]
    Upload {
        collection: &'static str,
        #[source]
        source: StoreError,
    },
}

/// SeedCollection
///
/// The documents destined for one collection.
#[derive(Debug, Clone)]
pub struct SeedCollection {
    pub collection: &'static str,
    pub documents: Vec<Value>,
}

/// parse_seed_documents
///
/// Accepts either a JSON array of documents or an object whose values are arrays (or
/// single documents), which are flattened in the order the keys appear in the file.
pub fn parse_seed_documents(path: &Path, raw: &str) -> Result<Vec<Value>, SeedError> {
    let parsed: Value = serde_json::from_str(raw).map_err(|source| SeedError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match parsed {
        Value::Array(documents) => Ok(documents),
        Value::Object(groups) => Ok(groups
            .into_iter()
            .flat_map(|(_, value)| match value {
                Value::Array(documents) => documents,
                single => vec![single],
            })
            .collect()),
        _ => Err(SeedError::NotACollection {
            path: path.to_path_buf(),
        }),
    }
}

/// load_seed_dir
///
/// Reads every known seed file from `dir`. Missing files are skipped with a warning so a
/// partial data set still loads.
pub fn load_seed_dir(dir: &Path) -> Result<Vec<SeedCollection>, SeedError> {
    let mut loaded = Vec::new();

    for &(file, collection) in SEED_FILES {
        let path = dir.join(file);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "seed file not found, skipping");
            continue;
        }

        let raw = fs::read_to_string(&path).map_err(|source| SeedError::Io {
            path: path.clone(),
            source,
        })?;
        let documents = parse_seed_documents(&path, &raw)?;

        if documents.is_empty() {
            tracing::warn!(path = %path.display(), "seed file is empty, skipping");
            continue;
        }

        loaded.push(SeedCollection {
            collection,
            documents,
        });
    }

    Ok(loaded)
}

/// apply_seed
///
/// Replaces each seeded collection in `store`. Returns `(collection, inserted)` pairs.
pub async fn apply_seed(
    store: &dyn DocumentStore,
    seed: Vec<SeedCollection>,
) -> Result<Vec<(&'static str, usize)>, SeedError> {
    let mut report = Vec::with_capacity(seed.len());

    for SeedCollection {
        collection,
        documents,
    } in seed
    {
        let inserted = store
            .replace_collection(collection, documents)
            .await
            .map_err(|source| SeedError::Upload { collection, source })?;

        tracing::info!(collection, inserted, "collection seeded");
        report.push((collection, inserted));
    }

    Ok(report)
}
