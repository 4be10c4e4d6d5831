use serde::{Deserialize, Serialize};

use crate::form::form_model::now_ms;

/// One orchestrator transition, written as a JSONL record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    pub state: String,

    /// SHA-1 fingerprint of the scanned field selectors
    pub run: Option<String>,

    pub field_count: Option<usize>,
    pub filled: Option<usize>,
    pub unresolved: Option<usize>,

    pub detail: Option<String>,
}

impl TraceEvent {
    pub fn now(step: u64, state: impl std::fmt::Debug) -> Self {
        Self {
            timestamp_ms: now_ms(),
            step,
            state: format!("{:?}", state),
            run: None,
            field_count: None,
            filled: None,
            unresolved: None,
            detail: None,
        }
    }

    pub fn with_run(mut self, fingerprint: impl ToString) -> Self {
        self.run = Some(fingerprint.to_string());
        self
    }

    pub fn with_field_count(mut self, count: usize) -> Self {
        self.field_count = Some(count);
        self
    }

    pub fn with_counts(mut self, filled: usize, unresolved: usize) -> Self {
        self.filled = Some(filled);
        self.unresolved = Some(unresolved);
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
