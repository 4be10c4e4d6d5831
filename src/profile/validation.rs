use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{form::form_model::Field, profile::profile_model::Profile};

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[\d\s\-()]{10,}$").unwrap());
static LINKEDIN_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(www\.)?linkedin\.com/.*$").unwrap());
static GITHUB_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(www\.)?github\.com/.*$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Check a profile before it is saved or used for filling.
pub fn validate_profile(profile: &Profile) -> ValidationReport {
    let mut errors = Vec::new();

    if profile.first_name.trim().is_empty() {
        errors.push("First name is required".to_string());
    }
    if profile.last_name.trim().is_empty() {
        errors.push("Last name is required".to_string());
    }
    if profile.email.trim().is_empty() {
        errors.push("Email is required".to_string());
    } else if !is_valid_email(profile.email.trim()) {
        errors.push("Invalid email format".to_string());
    }

    if !profile.phone.is_empty() && !PHONE.is_match(&profile.phone) {
        errors.push("Invalid phone format".to_string());
    }

    if let Some(url) = profile.linkedin.as_deref().filter(|u| !u.is_empty()) {
        if !LINKEDIN_URL.is_match(url) {
            errors.push("Invalid LinkedIn URL".to_string());
        }
    }
    if let Some(url) = profile.github.as_deref().filter(|u| !u.is_empty()) {
        if !GITHUB_URL.is_match(url) {
            errors.push("Invalid GitHub URL".to_string());
        }
    }

    if let Some(years) = profile.extension("totalYearsExperience") {
        if years.trim().parse::<u32>().is_err() {
            errors.push("Invalid years of experience".to_string());
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Check a single value against the field it is about to go into.
pub fn validate_form_field(field: &Field, value: &str) -> Result<(), String> {
    if field.required && value.is_empty() {
        return Err("Field is required".to_string());
    }

    match field.field_type.as_str() {
        "email" if !is_valid_email(value) => Err("Invalid email format".to_string()),
        _ => Ok(()),
    }
}

/// Normalize a value for its input type.
pub fn sanitize_value(value: &str, field_type: &str) -> String {
    match field_type {
        "email" => value.trim().to_lowercase(),
        "tel" => {
            let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
            format!("+{}", digits)
        }
        "text" => value.trim().to_string(),
        _ => value.to_string(),
    }
}
