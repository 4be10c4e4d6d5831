use serde_json::Value;
use tracing::debug;

use crate::{
    agent::{
        analysis_model::{AnalyzedField, FormAnalysis},
        error::AutofillError,
    },
    form::form_model::{FormSnapshot, now_ms},
    profile::{
        profile_model::Profile,
        resolver::{AnswerLookup, ResolutionSource, resolve_with},
    },
};

/// Turns a scanned snapshot into selector/value pairs.
pub trait FieldAnalyzer {
    fn analyze(&self, snapshot: &FormSnapshot) -> Result<FormAnalysis, AutofillError>;
}

impl<A: FieldAnalyzer + ?Sized> FieldAnalyzer for Box<A> {
    fn analyze(&self, snapshot: &FormSnapshot) -> Result<FormAnalysis, AutofillError> {
        (**self).analyze(snapshot)
    }
}

/// Local, rule-based resolution against the stored profile.
pub struct ProfileAnalyzer {
    profile: Profile,
    answers: Option<Box<dyn AnswerLookup>>,
}

impl ProfileAnalyzer {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            answers: None,
        }
    }

    /// Consult previously saved answers for questions no rule covers.
    pub fn with_answers(mut self, answers: Box<dyn AnswerLookup>) -> Self {
        self.answers = Some(answers);
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }
}

impl FieldAnalyzer for ProfileAnalyzer {
    fn analyze(&self, snapshot: &FormSnapshot) -> Result<FormAnalysis, AutofillError> {
        let mut fields = Vec::with_capacity(snapshot.fields.len());
        let mut missing_required = Vec::new();
        let mut suggestions = Vec::new();

        for field in &snapshot.fields {
            let resolution = resolve_with(field, &self.profile, self.answers.as_deref());
            let found = !resolution.value.is_empty();

            if field.is_fillable() && !found {
                if field.required {
                    missing_required.push(field.selector.clone());
                }
                if !field.label.trim().is_empty() && resolution.source == ResolutionSource::NotFound {
                    suggestions.push(Value::String(format!(
                        "No answer for \"{}\"; fill it manually",
                        field.label.trim()
                    )));
                }
            }

            fields.push(AnalyzedField {
                selector: field.selector.clone(),
                confidence: if found { 1.0 } else { 0.0 },
                value: resolution.value,
                fallback_value: None,
                required: field.required,
                frame: Some(field.frame.clone()),
            });
        }

        debug!(
            fields = fields.len(),
            missing_required = missing_required.len(),
            "local analysis complete"
        );

        Ok(FormAnalysis {
            fields,
            missing_required,
            suggestions,
            timestamp_ms: Some(now_ms() as u64),
        })
    }
}
