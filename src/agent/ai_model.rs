use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    agent::{
        analysis_model::{AnalyzedField, FormAnalysis, MIN_CONFIDENCE},
        analyzer::FieldAnalyzer,
        error::AutofillError,
        recovery::ErrorRecovery,
    },
    form::form_model::{FormSnapshot, now_ms},
    profile::profile_model::{Address, Profile},
};

pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_MODEL: &str = "mistral-medium";

const SYSTEM_PROMPT: &str = "You are an AI assistant specialized in analyzing job application forms and matching fields to user profiles.";

/// Raw text completion. Implementations own transport and auth.
pub trait TextInference {
    fn infer_text(&self, system: &str, prompt: &str) -> Result<String, AutofillError>;
}

// ============================================================================
// Mistral chat-completions backend
// ============================================================================

pub struct MistralBackend {
    pub base_url: String,
    pub model: String,
    api_key: String,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatContent>,
}

#[derive(Deserialize)]
struct ChatContent {
    content: Option<String>,
}

impl MistralBackend {
    pub fn new(api_key: &str) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl TextInference for MistralBackend {
    fn infer_text(&self, system: &str, prompt: &str) -> Result<String, AutofillError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
            max_tokens: 2000,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AutofillError::remote(format!("could not build HTTP client: {}", e)))?;

        debug!(endpoint = %self.endpoint(), model = %self.model, "sending analysis request");
        let response = client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| AutofillError::remote(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().unwrap_or_default();
            return Err(AutofillError::Remote {
                status: Some(status.as_u16()),
                message: body,
                retry_after,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| AutofillError::Validation(format!("Invalid API response format: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| AutofillError::Validation("Invalid API response format".to_string()))
    }
}

// ============================================================================
// Mock backend (for tests without network)
// ============================================================================

/// Returns a canned completion. Queued errors are returned first, one per call.
#[derive(Default)]
pub struct MockTextInference {
    pub response: String,
    failures: Mutex<VecDeque<AutofillError>>,
    prompts: Mutex<Vec<String>>,
}

impl MockTextInference {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            ..Default::default()
        }
    }

    pub fn failing_first(self, errors: Vec<AutofillError>) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.extend(errors);
        }
        self
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl TextInference for MockTextInference {
    fn infer_text(&self, _system: &str, prompt: &str) -> Result<String, AutofillError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(error) = self.failures.lock().ok().and_then(|mut f| f.pop_front()) {
            return Err(error);
        }
        Ok(self.response.clone())
    }
}

impl<T: TextInference + ?Sized> TextInference for std::sync::Arc<T> {
    fn infer_text(&self, system: &str, prompt: &str) -> Result<String, AutofillError> {
        (**self).infer_text(system, prompt)
    }
}

// ============================================================================
// AiFormAnalyzer: remote field mapping with local post-processing
// ============================================================================

#[derive(Serialize)]
struct PromptField<'a> {
    #[serde(rename = "type")]
    field_type: &'a str,
    name: &'a str,
    label: &'a str,
    required: bool,
    selector: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptProfile<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone: &'a str,
    address: Option<&'a Address>,
}

const REQUIRED_KEYS: [&str; 3] = ["fields", "missingRequired", "suggestions"];

pub struct AiFormAnalyzer {
    backend: Box<dyn TextInference>,
    profile: Profile,
    recovery: ErrorRecovery,
}

impl AiFormAnalyzer {
    pub fn new(backend: Box<dyn TextInference>, profile: Profile) -> Self {
        Self {
            backend,
            profile,
            recovery: ErrorRecovery::default(),
        }
    }

    pub fn with_recovery(mut self, recovery: ErrorRecovery) -> Self {
        self.recovery = recovery;
        self
    }

    /// Only the attributes the mapping needs leave the machine.
    pub fn build_prompt(snapshot: &FormSnapshot, profile: &Profile) -> Result<String, AutofillError> {
        let fields: Vec<PromptField> = snapshot
            .fields
            .iter()
            .map(|f| PromptField {
                field_type: &f.field_type,
                name: &f.name,
                label: &f.label,
                required: f.required,
                selector: &f.selector,
            })
            .collect();
        let sanitized = PromptProfile {
            first_name: &profile.first_name,
            last_name: &profile.last_name,
            email: &profile.email,
            phone: &profile.phone,
            address: profile.address.as_ref(),
        };

        let fields_json = serde_json::to_string_pretty(&fields)
            .map_err(|e| AutofillError::json("prompt fields", e))?;
        let profile_json = serde_json::to_string_pretty(&sanitized)
            .map_err(|e| AutofillError::json("prompt profile", e))?;

        Ok(format!(
            r#"Analyze this form for job application field mapping.

Form Fields:
{fields_json}

User Profile:
{profile_json}

Guidelines:
1. Match each form field to the appropriate profile field
2. Consider field labels, types, IDs, and context
3. For each field provide:
   - confidence score (0-1)
   - mapped value from profile
   - any special formatting needed
4. Identify required fields
5. Note any fields needing manual input
6. Flag potential validation issues

Return ONLY valid JSON with this shape:
{{"fields":[{{"selector":"...","value":"...","confidence":0.9,"required":false}}],"missingRequired":["..."],"suggestions":["..."]}}"#
        ))
    }

    /// Parse the completion and check it carries every top-level key.
    pub fn parse_analysis(content: &str) -> Result<FormAnalysis, AutofillError> {
        let body = strip_code_fence(content);
        let value: Value = serde_json::from_str(body).map_err(|e| {
            AutofillError::Validation(format!("Failed to parse AI response: {}", e))
        })?;

        let Some(object) = value.as_object() else {
            return Err(AutofillError::Validation(
                "Failed to parse AI response: not a JSON object".to_string(),
            ));
        };
        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|k| !object.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            return Err(AutofillError::Validation(format!(
                "Invalid analysis format. Missing fields: {}",
                missing.join(", ")
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| AutofillError::Validation(format!("Failed to parse AI response: {}", e)))
    }

    /// Adjust confidences, attach fallbacks to weak matches and recompute
    /// which required fields still lack a value.
    pub fn enhance(mut analysis: FormAnalysis, snapshot: &FormSnapshot, profile: &Profile) -> FormAnalysis {
        for field in &mut analysis.fields {
            field.confidence = adjust_confidence(field, snapshot);
            if field.confidence < MIN_CONFIDENCE {
                field.fallback_value = fallback_value(&field.selector, profile);
            }
            let scanned = match &field.frame {
                Some(frame) => snapshot.field_in_frame(&field.selector, frame),
                None => snapshot.field_by_selector(&field.selector),
            };
            if scanned.is_some_and(|f| f.required) {
                field.required = true;
            }
        }

        analysis.missing_required = analysis
            .fields
            .iter()
            .filter(|f| f.required && !f.has_value())
            .map(|f| f.selector.clone())
            .collect();
        analysis.timestamp_ms = Some(now_ms() as u64);
        analysis
    }
}

impl FieldAnalyzer for AiFormAnalyzer {
    fn analyze(&self, snapshot: &FormSnapshot) -> Result<FormAnalysis, AutofillError> {
        if snapshot.is_empty() {
            return Err(AutofillError::Validation("Invalid form data or profile".to_string()));
        }

        let prompt = Self::build_prompt(snapshot, &self.profile)?;
        let content = self
            .recovery
            .run(|| self.backend.infer_text(SYSTEM_PROMPT, &prompt))?;

        let analysis = Self::parse_analysis(&content)?;
        let enhanced = Self::enhance(analysis, snapshot, &self.profile);
        info!(
            fields = enhanced.fields.len(),
            missing_required = enhanced.missing_required.len(),
            "remote analysis complete"
        );
        Ok(enhanced)
    }
}

/// Exact name match boosts, generic selectors are penalized.
fn adjust_confidence(field: &AnalyzedField, snapshot: &FormSnapshot) -> f64 {
    let mut score = field.confidence;
    let selector = field.selector.to_lowercase();

    if snapshot
        .fields
        .iter()
        .any(|f| !f.name.is_empty() && f.name.to_lowercase() == selector)
    {
        score += 0.2;
    }
    if field.selector.contains("input") || field.selector.contains("field") {
        score -= 0.1;
    }
    score.clamp(0.0, 1.0)
}

const FALLBACK_PATTERNS: &[(&str, &[&str])] = &[
    ("name", &["name", "fullname", "full_name"]),
    ("email", &["email", "e-mail", "emailaddress"]),
    ("phone", &["phone", "telephone", "mobile"]),
];

fn fallback_value(selector: &str, profile: &Profile) -> Option<String> {
    let selector = selector.to_lowercase();
    let (key, _) = FALLBACK_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| selector.contains(p)))?;

    let value = match *key {
        "name" => profile.full_name(),
        "email" => profile.email.clone(),
        _ => profile.phone.clone(),
    };
    Some(value).filter(|v| !v.is_empty())
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
