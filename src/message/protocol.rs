use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{agent::analysis_model::FormAnalysis, form::form_model::Field};

pub const ANALYZE_FORM: &str = "ANALYZE_FORM";
pub const START_AUTOFILL: &str = "START_AUTOFILL";
pub const TOGGLE_DEBUG: &str = "TOGGLE_DEBUG";

const KNOWN_ACTIONS: [&str; 3] = [ANALYZE_FORM, START_AUTOFILL, TOGGLE_DEBUG];

/// Messages exchanged between the page side and the background coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "ANALYZE_FORM")]
    AnalyzeForm { data: AnalyzeFormData },
    #[serde(rename = "START_AUTOFILL")]
    StartAutofill,
    #[serde(rename = "TOGGLE_DEBUG")]
    ToggleDebug { data: ToggleDebugData },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeFormData {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleDebugData {
    pub enabled: bool,
}

impl Request {
    pub fn analyze_form(fields: Vec<Field>) -> Self {
        Request::AnalyzeForm {
            data: AnalyzeFormData { fields },
        }
    }

    pub fn toggle_debug(enabled: bool) -> Self {
        Request::ToggleDebug {
            data: ToggleDebugData { enabled },
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Request::AnalyzeForm { .. } => ANALYZE_FORM,
            Request::StartAutofill => START_AUTOFILL,
            Request::ToggleDebug { .. } => TOGGLE_DEBUG,
        }
    }
}

/// Reply shapes: an analysis payload, `{success, error?}`, or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Analysis(FormAnalysis),
    Ack {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Error {
        error: String,
    },
}

impl Response {
    pub fn ok() -> Self {
        Response::Ack {
            success: true,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Response::Ack {
            success: false,
            error: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Response::Analysis(_) => true,
            Response::Ack { success, .. } => *success,
            Response::Error { .. } => false,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Response::Analysis(_) => None,
            Response::Ack { error, .. } => error.as_deref(),
            Response::Error { error } => Some(error),
        }
    }
}

/// Decode a raw message. Unknown or missing actions answer "Unknown action";
/// a known action with a bad payload answers with the decode error.
pub fn parse_request(raw: &str) -> Result<Request, Response> {
    match serde_json::from_str::<Request>(raw) {
        Ok(request) => Ok(request),
        Err(e) => {
            let action = serde_json::from_str::<Value>(raw)
                .ok()
                .and_then(|v| v.get("action").and_then(Value::as_str).map(str::to_string));
            match action {
                Some(a) if KNOWN_ACTIONS.contains(&a.as_str()) => {
                    Err(Response::failure(format!("Invalid {} message: {}", a, e)))
                }
                _ => Err(Response::failure("Unknown action")),
            }
        }
    }
}
