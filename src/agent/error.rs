use thiserror::Error;

/// Coarse classification used by the recovery policy and by callers that
/// decide whether a failure is fatal to the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Lookup,
    Remote,
    Access,
    Storage,
}

#[derive(Debug, Error)]
pub enum AutofillError {
    /// Malformed input data: missing profile, missing field list, bad payload shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// Selector does not resolve to a live element
    #[error("Element not found: {selector}")]
    Lookup { selector: String },

    /// Element exists but could not take the value (e.g. no matching option)
    #[error("Could not fill '{selector}': {reason}")]
    Fill { selector: String, reason: String },

    /// AI service unreachable or answered with a non-success status
    #[error("Remote request failed{}: {message}", status_suffix(.status))]
    Remote {
        status: Option<u16>,
        message: String,
        retry_after: Option<u64>,
    },

    /// Cross-origin or detached sub-document, or no document at all
    #[error("Document not accessible: {0}")]
    Access(String),

    /// Key-value store read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl AutofillError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AutofillError::Validation(_) | AutofillError::Json { .. } => ErrorKind::Validation,
            AutofillError::Lookup { .. } | AutofillError::Fill { .. } => ErrorKind::Lookup,
            AutofillError::Remote { .. } => ErrorKind::Remote,
            AutofillError::Access(_) => ErrorKind::Access,
            AutofillError::Storage(_) | AutofillError::Io { .. } => ErrorKind::Storage,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        AutofillError::Json {
            context: context.into(),
            source,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AutofillError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        AutofillError::Remote {
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Message without the category prefix, for responses shown to users.
    pub fn user_message(&self) -> String {
        match self {
            AutofillError::Validation(m) | AutofillError::Access(m) | AutofillError::Storage(m) => {
                m.clone()
            }
            other => other.to_string(),
        }
    }
}
