use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::form_model::FieldPurpose;

/// User-entered reference data the pipeline fills forms from. Read-only to
/// the pipeline; owned by persistent storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    /// Free-form extension keys (e.g. `totalYearsExperience`)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Either a single free-text address line or a structured address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Line(String),
    Structured(StructuredAddress),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredAddress {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

fn non_empty(s: Option<&String>) -> Option<&str> {
    s.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl Profile {
    fn structured(&self) -> Option<&StructuredAddress> {
        match &self.address {
            Some(Address::Structured(a)) => Some(a),
            _ => None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    pub fn address_line1(&self) -> Option<&str> {
        match &self.address {
            Some(Address::Line(line)) => non_empty(Some(line)),
            Some(Address::Structured(a)) => non_empty(a.line1.as_ref()),
            None => None,
        }
    }

    pub fn address_line2(&self) -> Option<&str> {
        non_empty(self.address_line2.as_ref())
            .or_else(|| self.structured().and_then(|a| non_empty(a.line2.as_ref())))
    }

    pub fn city(&self) -> Option<&str> {
        non_empty(self.city.as_ref())
            .or_else(|| self.structured().and_then(|a| non_empty(a.city.as_ref())))
    }

    pub fn state(&self) -> Option<&str> {
        non_empty(self.state.as_ref())
            .or_else(|| self.structured().and_then(|a| non_empty(a.province.as_ref())))
    }

    pub fn postal_code(&self) -> Option<&str> {
        non_empty(self.postal_code.as_ref())
            .or_else(|| self.structured().and_then(|a| non_empty(a.postal_code.as_ref())))
    }

    pub fn country(&self) -> Option<&str> {
        non_empty(self.country.as_ref())
            .or_else(|| self.structured().and_then(|a| non_empty(a.country.as_ref())))
    }

    /// Extension key rendered as text; numbers and booleans are stringified.
    pub fn extension(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Direct attribute lookup for a purpose tag. No defaults applied.
    pub fn value_for(&self, purpose: FieldPurpose) -> Option<String> {
        let value = match purpose {
            FieldPurpose::FirstName => Some(self.first_name.as_str()),
            FieldPurpose::LastName => Some(self.last_name.as_str()),
            FieldPurpose::Email => Some(self.email.as_str()),
            FieldPurpose::Phone => Some(self.phone.as_str()),
            FieldPurpose::AddressLine1 => self.address_line1(),
            FieldPurpose::AddressLine2 => self.address_line2(),
            FieldPurpose::City => self.city(),
            FieldPurpose::State => self.state(),
            FieldPurpose::PostalCode => self.postal_code(),
            FieldPurpose::Country => self.country(),
            FieldPurpose::ReferralSource | FieldPurpose::Unknown => None,
        };
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}
