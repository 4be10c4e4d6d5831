use once_cell::sync::Lazy;
use regex::Regex;

use crate::form::form_model::{Field, FieldPurpose};

/// Ordered `(purpose, patterns)` table. The first entry with any matching
/// pattern wins; there is no scoring across entries. Several patterns overlap
/// ("country code" is a phone field before it is a country field, "name" sits
/// inside "lastname"), and real forms depend on this exact order.
static PURPOSE_TABLE: Lazy<Vec<(FieldPurpose, Vec<Regex>)>> = Lazy::new(|| {
    let table: &[(FieldPurpose, &[&str])] = &[
        (FieldPurpose::FirstName, &[r"first.*name", r"given.*name", r"fname"]),
        (
            FieldPurpose::LastName,
            &[r"last.*name", r"family.*name", r"surname", r"lname"],
        ),
        (FieldPurpose::Email, &[r"e-?mail"]),
        (
            FieldPurpose::Phone,
            &[r"phone", r"tel", r"mobile", r"cell", r"extension", r"country.*code"],
        ),
        (
            FieldPurpose::AddressLine1,
            &[r"address.*line.*1", r"street", r"address$"],
        ),
        (
            FieldPurpose::AddressLine2,
            &[r"address.*line.*2", r"suite", r"apt", r"unit"],
        ),
        (FieldPurpose::City, &[r"city", r"town", r"municipality"]),
        (FieldPurpose::State, &[r"state", r"province", r"region"]),
        (FieldPurpose::PostalCode, &[r"postal.*code", r"zip", r"postcode"]),
        (FieldPurpose::Country, &[r"country"]),
        (
            FieldPurpose::ReferralSource,
            &[r"hear.*about", r"referr", r"source"],
        ),
    ];

    table
        .iter()
        .map(|(purpose, patterns)| {
            let compiled = patterns
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect();
            (*purpose, compiled)
        })
        .collect()
});

/// Input types that carry purpose on their own and are appended to the haystack.
const TELLING_TYPES: &[&str] = &["email", "tel"];

/// Text the purpose table is matched against: lowercase `label name id`, plus
/// the input type when the type itself is meaningful.
pub fn classification_text(field: &Field) -> String {
    let mut text = field.haystack();
    if TELLING_TYPES.contains(&field.field_type.as_str()) {
        text.push(' ');
        text.push_str(&field.field_type);
    }
    text
}

pub fn classify(field: &Field) -> FieldPurpose {
    let text = classification_text(field);

    PURPOSE_TABLE
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(&text)))
        .map(|(purpose, _)| *purpose)
        .unwrap_or(FieldPurpose::Unknown)
}

/// The ordered purpose tags, for callers that want to show or document the table.
pub fn purpose_order() -> Vec<FieldPurpose> {
    PURPOSE_TABLE.iter().map(|(p, _)| *p).collect()
}
