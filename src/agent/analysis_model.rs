use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::dom::document::FramePath;

/// Below this an AI mapping gets a profile-derived fallback attached.
pub const MIN_CONFIDENCE: f64 = 0.6;

/// The value chosen for one selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedField {
    pub selector: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_value: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Document that owns the element. `None` when the analysis did not say,
    /// as with remote mappings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<FramePath>,
}

fn full_confidence() -> f64 {
    1.0
}

/// Accepts strings, numbers, booleans and null. Remote analyses are not
/// consistent about value types.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl AnalyzedField {
    pub fn new(selector: &str, value: &str) -> Self {
        Self {
            selector: selector.to_string(),
            value: value.to_string(),
            confidence: 1.0,
            fallback_value: None,
            required: false,
            frame: None,
        }
    }

    pub fn in_frame(mut self, frame: FramePath) -> Self {
        self.frame = Some(frame);
        self
    }

    /// The primary value, or the fallback when the primary is empty.
    pub fn effective_value(&self) -> &str {
        if !self.value.is_empty() {
            return &self.value;
        }
        self.fallback_value.as_deref().unwrap_or("")
    }

    pub fn has_value(&self) -> bool {
        !self.effective_value().is_empty()
    }
}

/// Selector-to-value mapping for one snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAnalysis {
    pub fields: Vec<AnalyzedField>,
    #[serde(default)]
    pub missing_required: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl FormAnalysis {
    pub fn field(&self, selector: &str) -> Option<&AnalyzedField> {
        self.fields.iter().find(|f| f.selector == selector)
    }

    /// `(selector, value)` pairs in analysis order.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|f| (f.selector.clone(), f.effective_value().to_string()))
            .collect()
    }
}
