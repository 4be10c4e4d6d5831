use serde::{Deserialize, Serialize};

use crate::dom::document::FramePath;

/// Semantic role of a form field. Closed set; anything unrecognized is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FieldPurpose {
    FirstName,
    LastName,
    Email,
    Phone,
    AddressLine1,
    AddressLine2,
    City,
    State,
    PostalCode,
    Country,
    ReferralSource,
    #[default]
    Unknown,
}

impl FieldPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldPurpose::FirstName => "firstName",
            FieldPurpose::LastName => "lastName",
            FieldPurpose::Email => "email",
            FieldPurpose::Phone => "phone",
            FieldPurpose::AddressLine1 => "addressLine1",
            FieldPurpose::AddressLine2 => "addressLine2",
            FieldPurpose::City => "city",
            FieldPurpose::State => "state",
            FieldPurpose::PostalCode => "postalCode",
            FieldPurpose::Country => "country",
            FieldPurpose::ReferralSource => "referralSource",
            FieldPurpose::Unknown => "unknown",
        }
    }

    pub fn is_name(&self) -> bool {
        matches!(self, FieldPurpose::FirstName | FieldPurpose::LastName)
    }
}

impl std::fmt::Display for FieldPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected input, select or textarea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    pub selector: String,
    #[serde(default)]
    pub purpose: FieldPurpose,
    /// Resolved fill value; empty until resolution runs
    #[serde(default)]
    pub value: String,
    /// Element value at scan time
    #[serde(default)]
    pub current_value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frame: FramePath,
}

/// Input types that never take a typed value.
pub const NON_FILLABLE_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image", "file"];

impl Field {
    /// Lowercased `label name id`, the text every pattern table matches against.
    pub fn haystack(&self) -> String {
        format!("{} {} {}", self.label, self.name, self.id).to_lowercase()
    }

    pub fn is_fillable(&self) -> bool {
        !NON_FILLABLE_TYPES.contains(&self.field_type.as_str())
    }
}

/// All fields captured from one document context at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub url: String,
    pub fields: Vec<Field>,
    pub timestamp_ms: u128,
    /// Native `<form>` elements in the top document
    pub form_count: usize,
}

impl FormSnapshot {
    pub fn new(url: &str, fields: Vec<Field>, form_count: usize) -> Self {
        FormSnapshot {
            url: url.to_string(),
            fields,
            timestamp_ms: now_ms(),
            form_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_by_selector(&self, selector: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.selector == selector)
    }

    /// Selectors are only unique per document, so iframe fields are looked
    /// up together with their frame path.
    pub fn field_in_frame(&self, selector: &str, frame: &[usize]) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.selector == selector && f.frame == frame)
    }

    /// Stable digest of the field layout, used to correlate trace events.
    pub fn fingerprint(&self) -> String {
        use sha1::{Digest, Sha1};

        let mut hasher = Sha1::new();
        for field in &self.fields {
            hasher.update(field.selector.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

pub fn now_ms() -> u128 {
    u128::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
