use crate::models::{Question, QuestionResponse, ResponseComment};
use rand::{Rng, seq::IndexedRandom};
use std::collections::BTreeMap;

/// select_question
///
/// Picks the question to broadcast: uniformly at random among the active questions, or
/// among all questions when none is active. Returns `None` only for an empty slice.
///
/// The RNG is a parameter so callers can pass `rand::rng()` in production and a seeded
/// generator in tests.
pub fn select_question<'a, R>(questions: &'a [Question], rng: &mut R) -> Option<&'a Question>
where
    R: Rng + ?Sized,
{
    let active: Vec<&Question> = questions.iter().filter(|q| q.is_active).collect();

    if active.is_empty() {
        questions.choose(rng)
    } else {
        active.choose(rng).copied()
    }
}

/// sort_responses
///
/// Newest first. The sort is stable: responses sharing a timestamp keep the order the
/// store returned them in.
pub fn sort_responses(mut responses: Vec<QuestionResponse>) -> Vec<QuestionResponse> {
    responses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    responses
}

/// thread_comments
///
/// Orders comments oldest first (stable) and partitions them by parent response. Every
/// comment lands under exactly one key, its own `response_id`.
pub fn thread_comments(mut comments: Vec<ResponseComment>) -> BTreeMap<String, Vec<ResponseComment>> {
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut threads: BTreeMap<String, Vec<ResponseComment>> = BTreeMap::new();
    for comment in comments {
        threads
            .entry(comment.response_id.clone())
            .or_default()
            .push(comment);
    }
    threads
}
