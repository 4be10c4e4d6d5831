use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    form::form_model::{Field, FieldPurpose},
    profile::profile_model::Profile,
};

pub const DEFAULT_PHONE_CODE: &str = "+1";
pub const DEFAULT_STATE: &str = "Ontario";
pub const DEFAULT_COUNTRY: &str = "Canada";
pub const DEFAULT_REFERRAL: &str = "LinkedIn";

/// Source of previously given answers to free-text questions.
pub trait AnswerLookup {
    fn answer_for(&self, question: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextRule {
    FirstName,
    LastName,
    PhoneCode,
    PhoneNumber,
    AddressLine1,
    AddressLine2,
    City,
    State,
    PostalCode,
    Country,
    HeardAbout,
}

/// Keyword rules over `label name id`, checked in order. These carry the
/// static defaults, so they run before the purpose-keyed lookup.
static TEXT_RULES: Lazy<Vec<(Regex, TextRule)>> = Lazy::new(|| {
    [
        (r"first.*name", TextRule::FirstName),
        (r"last.*name", TextRule::LastName),
        (r"phone.*code", TextRule::PhoneCode),
        (r"phone.*number", TextRule::PhoneNumber),
        (r"address.*line.*1|street|address$", TextRule::AddressLine1),
        (r"address.*line.*2|suite|apt|unit", TextRule::AddressLine2),
        (r"city|town|municipality", TextRule::City),
        (r"state|province|region", TextRule::State),
        (r"postal.*code|zip", TextRule::PostalCode),
        (r"country", TextRule::Country),
        (r"hear.*about", TextRule::HeardAbout),
    ]
    .into_iter()
    .filter_map(|(pattern, rule)| Regex::new(pattern).ok().map(|re| (re, rule)))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    TextPattern,
    Purpose,
    SavedAnswer,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub value: String,
    pub source: ResolutionSource,
}

fn owned(value: Option<&str>) -> String {
    value.unwrap_or("").to_string()
}

fn text_rule_value(rule: TextRule, profile: &Profile) -> String {
    match rule {
        TextRule::FirstName => profile.first_name.clone(),
        TextRule::LastName => profile.last_name.clone(),
        TextRule::PhoneCode => DEFAULT_PHONE_CODE.to_string(),
        TextRule::PhoneNumber => profile.phone.clone(),
        TextRule::AddressLine1 => owned(profile.address_line1()),
        TextRule::AddressLine2 => owned(profile.address_line2()),
        TextRule::City => owned(profile.city()),
        TextRule::State => profile.state().unwrap_or(DEFAULT_STATE).to_string(),
        TextRule::PostalCode => owned(profile.postal_code()),
        TextRule::Country => profile.country().unwrap_or(DEFAULT_COUNTRY).to_string(),
        TextRule::HeardAbout => DEFAULT_REFERRAL.to_string(),
    }
}

fn purpose_value(purpose: FieldPurpose, profile: &Profile) -> Option<String> {
    match purpose {
        FieldPurpose::State => Some(profile.state().unwrap_or(DEFAULT_STATE).to_string()),
        FieldPurpose::Country => Some(profile.country().unwrap_or(DEFAULT_COUNTRY).to_string()),
        FieldPurpose::ReferralSource => Some(DEFAULT_REFERRAL.to_string()),
        FieldPurpose::Unknown => None,
        other => profile.value_for(other),
    }
}

/// Map a field to the value it should be filled with. Empty when nothing applies.
pub fn resolve(field: &Field, profile: &Profile) -> String {
    resolve_with(field, profile, None).value
}

/// Keyword rules first; when one matches its value is final, even if empty.
/// Otherwise the purpose tag picks the profile attribute, and as a last resort
/// the label is looked up as a previously answered question.
pub fn resolve_with(
    field: &Field,
    profile: &Profile,
    answers: Option<&dyn AnswerLookup>,
) -> Resolution {
    if !field.is_fillable() {
        return Resolution {
            value: String::new(),
            source: ResolutionSource::NotFound,
        };
    }

    let text = field.haystack();
    if let Some((_, rule)) = TEXT_RULES.iter().find(|(re, _)| re.is_match(&text)) {
        return Resolution {
            value: text_rule_value(*rule, profile).trim().to_string(),
            source: ResolutionSource::TextPattern,
        };
    }

    if let Some(value) = purpose_value(field.purpose, profile).filter(|v| !v.is_empty()) {
        return Resolution {
            value,
            source: ResolutionSource::Purpose,
        };
    }

    let question = field.label.trim();
    if let Some(answer) = answers
        .filter(|_| !question.is_empty())
        .and_then(|a| a.answer_for(question))
    {
        return Resolution {
            value: answer,
            source: ResolutionSource::SavedAnswer,
        };
    }

    Resolution {
        value: String::new(),
        source: ResolutionSource::NotFound,
    }
}
