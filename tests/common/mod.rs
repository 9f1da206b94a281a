#![allow(dead_code)]

use question_board::{AppConfig, AppState, MemoryStore, SessionRegistry, store::collections};
use serde_json::{Value, json};
use std::sync::Arc;

pub const ACTIVE_USER: &str = "user-001";
pub const OTHER_GROUP_USER: &str = "user-002";
pub const INACTIVE_USER: &str = "user-003";
pub const GROUP_A: &str = "group-a";
pub const GROUP_B: &str = "group-b";
pub const QUESTION: &str = "q-1";

pub fn users() -> Vec<Value> {
    vec![
        json!({
            "id": ACTIVE_USER,
            "displayName": "Ada Lovelace",
            "email": "ada@example.com",
            "groupId": GROUP_A,
            "isActive": true,
        }),
        json!({
            "id": OTHER_GROUP_USER,
            "displayName": "Grace Hopper",
            "email": "grace@example.com",
            "groupId": GROUP_B,
            "isActive": true,
        }),
        json!({
            "id": INACTIVE_USER,
            "displayName": "Dormant Account",
            "email": "dormant@example.com",
            "groupId": GROUP_A,
            "isActive": false,
        }),
    ]
}

pub fn questions() -> Vec<Value> {
    vec![
        json!({ "id": QUESTION, "question": "What surprised you this week?", "isActive": true }),
        json!({ "id": "q-2", "question": "What will you try next?", "isActive": false }),
        json!({ "id": "q-3", "question": "Who helped you most?", "isActive": false }),
    ]
}

pub fn responses() -> Vec<Value> {
    vec![
        json!({ "id": "r-1", "questionId": QUESTION, "groupId": GROUP_A,
                "createdAt": "2025-03-01T09:00:00Z", "content": "The pace." }),
        json!({ "id": "r-2", "questionId": QUESTION, "groupId": GROUP_A,
                "createdAt": "2025-03-03T09:00:00Z", "content": "Pairing." }),
        json!({ "id": "r-3", "questionId": QUESTION, "groupId": GROUP_A,
                "createdAt": "2025-03-02T09:00:00Z", "content": "Rust." }),
        json!({ "id": "r-4", "questionId": QUESTION, "groupId": GROUP_B,
                "createdAt": "2025-03-04T09:00:00Z", "content": "Other cohort." }),
        json!({ "id": "r-5", "questionId": "q-2", "groupId": GROUP_A,
                "createdAt": "2025-03-05T09:00:00Z", "content": "Other question." }),
    ]
}

pub fn comments() -> Vec<Value> {
    vec![
        json!({ "id": "c-1", "responseId": "r-1", "questionId": QUESTION, "groupId": GROUP_A,
                "createdAt": "2025-03-01T12:00:00Z", "content": "Agreed." }),
        json!({ "id": "c-2", "responseId": "r-2", "questionId": QUESTION, "groupId": GROUP_A,
                "createdAt": "2025-03-03T10:00:00Z", "content": "Same here." }),
        json!({ "id": "c-3", "responseId": "r-1", "questionId": QUESTION, "groupId": GROUP_A,
                "createdAt": "2025-03-01T10:00:00Z", "content": "First!" }),
        json!({ "id": "c-4", "responseId": "r-4", "questionId": QUESTION, "groupId": GROUP_B,
                "createdAt": "2025-03-04T10:00:00Z", "content": "Hidden from group A." }),
    ]
}

/// A store holding the full fixture data set.
pub fn seeded_store() -> MemoryStore {
    MemoryStore::new()
        .with_collection(collections::USERS, users())
        .with_collection(collections::GROUPS, vec![json!({ "id": GROUP_A }), json!({ "id": GROUP_B })])
        .with_collection(collections::QUESTIONS, questions())
        .with_collection(collections::RESPONSES, responses())
        .with_collection(collections::COMMENTS, comments())
}

pub fn app_state(store: MemoryStore) -> AppState {
    AppState {
        store: Arc::new(store),
        config: AppConfig::default(),
        sessions: SessionRegistry::new(),
    }
}
