use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    agent::{
        ai_model::{AiFormAnalyzer, TextInference},
        analysis_model::FormAnalysis,
        analyzer::{FieldAnalyzer, ProfileAnalyzer},
        autofill_model::AutofillReport,
        error::AutofillError,
        orchestrator::Autofill,
        recovery::{DEFAULT_MAX_RETRIES, ErrorRecovery},
    },
    dom::page::Page,
    fill::delay::{Delay, ThreadDelay},
    form::form_model::{Field, FormSnapshot},
    message::protocol::{Request, Response, parse_request},
    profile::profile_model::Profile,
    storage::{
        responses::ResponseStore,
        settings::{API_KEY_KEY, PROFILE_KEY, ensure_default_settings},
        store::{KeyValueStore, get_typed},
    },
};

/// Builds a remote inference backend from a stored API key.
pub type InferenceFactory = Box<dyn Fn(&str) -> Box<dyn TextInference>>;

/// Supplies the pause used between remote retries.
pub type DelayFactory = Box<dyn Fn() -> Box<dyn Delay>>;

// ============================================================================
// Background coordinator
// ============================================================================

/// Privileged side of the channel: owns storage and answers analysis requests.
pub struct Coordinator<S: KeyValueStore + 'static> {
    store: Arc<S>,
    inference: Option<InferenceFactory>,
    backoff: DelayFactory,
    max_retries: u32,
}

impl<S: KeyValueStore + 'static> Coordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            inference: None,
            backoff: Box::new(|| Box::new(ThreadDelay)),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Enable remote analysis for installs that have an API key stored.
    pub fn with_inference(mut self, factory: InferenceFactory) -> Self {
        self.inference = Some(factory);
        self
    }

    pub fn with_backoff_delay(mut self, factory: DelayFactory) -> Self {
        self.backoff = factory;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// First-run setup. Writes default settings when none exist.
    pub fn on_installed(&self) -> Result<(), AutofillError> {
        if ensure_default_settings(&*self.store)? {
            info!("default settings written");
        }
        Ok(())
    }

    pub fn handle(&self, request: &Request) -> Response {
        debug!(action = request.action(), "coordinator received message");
        match request {
            Request::AnalyzeForm { data } => match self.analyze_form(&data.fields) {
                Ok(analysis) => Response::Analysis(analysis),
                Err(e) => {
                    warn!(error = %e, "form analysis failed");
                    Response::error(e.user_message())
                }
            },
            _ => Response::failure("Unknown action"),
        }
    }

    pub fn handle_json(&self, raw: &str) -> Response {
        match parse_request(raw) {
            Ok(request) => self.handle(&request),
            Err(response) => response,
        }
    }

    pub fn analyze_form(&self, fields: &[Field]) -> Result<FormAnalysis, AutofillError> {
        let profile: Profile = get_typed(&*self.store, PROFILE_KEY)?
            .ok_or_else(|| AutofillError::Validation("Profile not configured".to_string()))?;
        let snapshot = FormSnapshot::new("", fields.to_vec(), 0);

        let api_key = get_typed::<String, _>(&*self.store, API_KEY_KEY)?.filter(|k| !k.trim().is_empty());
        match (api_key, &self.inference) {
            (Some(key), Some(factory)) => {
                debug!("using remote analysis");
                AiFormAnalyzer::new(factory(&key), profile)
                    .with_recovery(ErrorRecovery::new(self.max_retries, (self.backoff)()))
                    .analyze(&snapshot)
            }
            _ => {
                let answers = ResponseStore::new(Arc::clone(&self.store));
                ProfileAnalyzer::new(profile)
                    .with_answers(Box::new(answers))
                    .analyze(&snapshot)
            }
        }
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Point-to-point request/response link to the coordinator.
pub trait Channel {
    fn send(&self, request: &Request) -> Result<Response, AutofillError>;
}

/// In-process channel. Messages cross it as JSON, the same as they would
/// between isolated contexts.
pub struct LocalChannel<S: KeyValueStore + 'static> {
    coordinator: Arc<Coordinator<S>>,
}

impl<S: KeyValueStore + 'static> LocalChannel<S> {
    pub fn new(coordinator: Arc<Coordinator<S>>) -> Self {
        Self { coordinator }
    }
}

impl<S: KeyValueStore + 'static> Channel for LocalChannel<S> {
    fn send(&self, request: &Request) -> Result<Response, AutofillError> {
        let wire = serde_json::to_string(request).map_err(|e| AutofillError::json("request", e))?;
        let response = self.coordinator.handle_json(&wire);
        let wire = serde_json::to_string(&response).map_err(|e| AutofillError::json("response", e))?;
        serde_json::from_str(&wire).map_err(|e| AutofillError::json("response", e))
    }
}

/// Field analysis delegated across a channel.
pub struct ChannelAnalyzer<'a, C: Channel + ?Sized> {
    channel: &'a C,
}

impl<'a, C: Channel + ?Sized> ChannelAnalyzer<'a, C> {
    pub fn new(channel: &'a C) -> Self {
        Self { channel }
    }
}

impl<C: Channel + ?Sized> FieldAnalyzer for ChannelAnalyzer<'_, C> {
    fn analyze(&self, snapshot: &FormSnapshot) -> Result<FormAnalysis, AutofillError> {
        match self.channel.send(&Request::analyze_form(snapshot.fields.clone()))? {
            Response::Analysis(analysis) => Ok(analysis),
            other => Err(AutofillError::Validation(
                other
                    .error_message()
                    .unwrap_or("Invalid analysis data")
                    .to_string(),
            )),
        }
    }
}

// ============================================================================
// Page-side agent
// ============================================================================

/// Page side of the channel: scans and fills its own page on request.
pub struct ContentAgent<C: Channel, P: Page> {
    channel: C,
    pub page: P,
    autofill: Autofill,
    last_report: Option<AutofillReport>,
}

impl<C: Channel, P: Page> ContentAgent<C, P> {
    pub fn new(channel: C, page: P, autofill: Autofill) -> Self {
        Self {
            channel,
            page,
            autofill,
            last_report: None,
        }
    }

    pub fn autofill(&self) -> &Autofill {
        &self.autofill
    }

    pub fn last_report(&self) -> Option<&AutofillReport> {
        self.last_report.as_ref()
    }

    pub fn handle(&mut self, request: Request) -> Response {
        debug!(action = request.action(), "content agent received message");
        match request {
            Request::StartAutofill => {
                let analyzer = ChannelAnalyzer::new(&self.channel);
                let report = self.autofill.run(&mut self.page, &analyzer);
                let response = if report.is_success() {
                    Response::ok()
                } else {
                    Response::failure(report.status_line())
                };
                self.last_report = Some(report);
                response
            }
            Request::ToggleDebug { data } => {
                if data.enabled {
                    self.autofill.overlay_mut().show();
                } else {
                    self.autofill.overlay_mut().hide();
                }
                Response::ok()
            }
            Request::AnalyzeForm { .. } => Response::failure("Unknown action"),
        }
    }

    pub fn handle_json(&mut self, raw: &str) -> Response {
        match parse_request(raw) {
            Ok(request) => self.handle(request),
            Err(response) => response,
        }
    }
}
