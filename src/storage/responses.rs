use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    agent::error::AutofillError,
    form::form_model::now_ms,
    profile::resolver::AnswerLookup,
    storage::store::{KeyValueStore, get_typed, set_typed},
};

pub const RESPONSES_KEY: &str = "saved_responses";

/// Minimum word overlap for a stored question to count as the same question.
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResponse {
    pub original_question: String,
    pub answer: String,
    pub timestamp_ms: u128,
    pub frequency: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarResponse {
    pub key: String,
    pub response: SavedResponse,
    pub similarity: f64,
}

pub type SavedResponses = BTreeMap<String, SavedResponse>;

/// Answers the user gave to free-text questions, keyed by normalized question.
pub struct ResponseStore<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> Clone for ResponseStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore + ?Sized> ResponseStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn saved_responses(&self) -> Result<SavedResponses, AutofillError> {
        Ok(get_typed(&*self.store, RESPONSES_KEY)?.unwrap_or_default())
    }

    /// Store `answer` under the normalized question, bumping its frequency.
    pub fn save_response(&self, question: &str, answer: &str) -> Result<String, AutofillError> {
        let key = normalize_question(question);
        if key.is_empty() {
            return Err(AutofillError::Validation(
                "question has no words to remember".to_string(),
            ));
        }

        let mut responses = self.saved_responses()?;
        let frequency = responses.get(&key).map(|r| r.frequency).unwrap_or(0) + 1;
        responses.insert(
            key.clone(),
            SavedResponse {
                original_question: question.to_string(),
                answer: answer.to_string(),
                timestamp_ms: now_ms(),
                frequency,
            },
        );
        set_typed(&*self.store, RESPONSES_KEY, &responses)?;
        debug!(key = %key, frequency, "saved response");
        Ok(key)
    }

    /// Remove a stored response by its normalized key. Returns whether it existed.
    pub fn delete_response(&self, key: &str) -> Result<bool, AutofillError> {
        let mut responses = self.saved_responses()?;
        let existed = responses.remove(key).is_some();
        if existed {
            set_typed(&*self.store, RESPONSES_KEY, &responses)?;
        }
        Ok(existed)
    }

    /// Best stored response whose question overlaps strictly more than
    /// [`SIMILARITY_THRESHOLD`] with `question`.
    pub fn find_similar_response(
        &self,
        question: &str,
    ) -> Result<Option<SimilarResponse>, AutofillError> {
        let normalized = normalize_question(question);
        let mut best: Option<SimilarResponse> = None;

        for (key, response) in self.saved_responses()? {
            let similarity = calculate_similarity(&normalized, &key);
            let better = best.as_ref().map(|b| similarity > b.similarity).unwrap_or(true);
            if similarity > SIMILARITY_THRESHOLD && better {
                best = Some(SimilarResponse {
                    key,
                    response,
                    similarity,
                });
            }
        }
        Ok(best)
    }
}

impl<S: KeyValueStore + ?Sized> AnswerLookup for ResponseStore<S> {
    fn answer_for(&self, question: &str) -> Option<String> {
        match self.find_similar_response(question) {
            Ok(found) => found.map(|f| f.response.answer),
            Err(e) => {
                warn!(error = %e, "saved responses unavailable");
                None
            }
        }
    }
}

/// Lowercase, drop punctuation, collapse whitespace.
pub fn normalize_question(question: &str) -> String {
    let lowered = question.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Jaccard similarity of the space-separated word sets.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    let words_a: HashSet<&str> = a.split(' ').collect();
    let words_b: HashSet<&str> = b.split(' ').collect();
    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    words_a.intersection(&words_b).count() as f64 / union as f64
}
