use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fill::filler::FillResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutofillState {
    Idle,
    Scanning,
    Resolving,
    Filling,
    Done,
    Failed,
}

/// Final outcome shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AutofillStatus {
    FullyFilled,
    PartiallyFilled { unresolved: usize },
    Failed { reason: String },
}

impl AutofillStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, AutofillStatus::Failed { .. })
    }
}

impl fmt::Display for AutofillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutofillStatus::FullyFilled => write!(f, "fully filled"),
            AutofillStatus::PartiallyFilled { unresolved } => {
                write!(f, "partially filled, {} fields unresolved", unresolved)
            }
            AutofillStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofillReport {
    pub state: AutofillState,
    pub status: AutofillStatus,
    /// Fields in the scanned snapshot, including non-fillable ones
    pub field_count: usize,
    pub results: Vec<FillResult>,
    /// Selectors of required fields left without a value
    pub missing_required: Vec<String>,
    pub filled: usize,
    pub unresolved: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl AutofillReport {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: AutofillState::Failed,
            status: AutofillStatus::Failed {
                reason: reason.into(),
            },
            field_count: 0,
            results: vec![],
            missing_required: vec![],
            filled: 0,
            unresolved: 0,
            fingerprint: None,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.status.is_failure()
    }

    pub fn status_line(&self) -> String {
        self.status.to_string()
    }
}
