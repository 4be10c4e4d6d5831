use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use form_autofill::{
    agent::{
        ai_model::{MockTextInference, TextInference},
        analyzer::FieldAnalyzer,
        autofill_model::AutofillStatus,
        error::AutofillError,
        orchestrator::Autofill,
    },
    fill::{
        delay::{Delay, RecordingDelay},
        filler::FormFiller,
    },
    form::scanner::scan,
    message::{
        coordinator::{Channel, ChannelAnalyzer, ContentAgent, Coordinator, LocalChannel},
        protocol::{Request, Response, parse_request},
    },
    storage::{
        responses::ResponseStore,
        settings::{API_KEY_KEY, PROFILE_KEY, load_settings},
        store::{KeyValueStore, MemoryStore, set_typed},
    },
};

mod common;
use crate::common::builders::{contact_form, john_doe, typed_field};

fn configured_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    set_typed(&*store, PROFILE_KEY, &john_doe()).unwrap();
    store
}

fn content_agent(store: Arc<MemoryStore>) -> ContentAgent<LocalChannel<MemoryStore>, form_autofill::dom::document::Document> {
    let channel = LocalChannel::new(Arc::new(Coordinator::new(store)));
    ContentAgent::new(channel, contact_form(&["email"]), Autofill::new(FormFiller::instant()))
}

// =========================================================================
// Wire format
// =========================================================================

#[test]
fn requests_are_tagged_by_action() {
    assert_eq!(
        serde_json::to_value(Request::toggle_debug(true)).unwrap(),
        json!({"action": "TOGGLE_DEBUG", "data": {"enabled": true}})
    );
    assert_eq!(
        serde_json::to_value(Request::StartAutofill).unwrap(),
        json!({"action": "START_AUTOFILL"})
    );

    let fields = vec![typed_field("Email", "email", "email", "email")];
    let value = serde_json::to_value(Request::analyze_form(fields)).unwrap();
    assert_eq!(value["action"], "ANALYZE_FORM");
    assert_eq!(value["data"]["fields"][0]["selector"], "#email");
    assert_eq!(value["data"]["fields"][0]["type"], "email");
}

#[test]
fn responses_have_three_shapes() {
    assert_eq!(serde_json::to_value(Response::ok()).unwrap(), json!({"success": true}));
    assert_eq!(
        serde_json::to_value(Response::failure("nope")).unwrap(),
        json!({"success": false, "error": "nope"})
    );
    assert_eq!(
        serde_json::to_value(Response::error("Profile not configured")).unwrap(),
        json!({"error": "Profile not configured"})
    );

    let parsed: Response = serde_json::from_value(json!({"error": "boom"})).unwrap();
    assert_eq!(parsed, Response::error("boom"));
    assert!(!parsed.is_success());
    assert_eq!(parsed.error_message(), Some("boom"));

    let parsed: Response = serde_json::from_value(json!({
        "fields": [{"selector": "#a", "value": "1"}],
        "missingRequired": [],
        "suggestions": []
    }))
    .unwrap();
    assert!(matches!(parsed, Response::Analysis(_)));
    assert!(parsed.is_success());
}

#[test]
fn unknown_actions_are_answered_not_dropped() {
    assert_eq!(
        parse_request(r#"{"action": "SELF_DESTRUCT"}"#).unwrap_err(),
        Response::failure("Unknown action")
    );
    assert_eq!(
        parse_request(r#"{"data": {}}"#).unwrap_err(),
        Response::failure("Unknown action")
    );
    assert_eq!(parse_request("not json").unwrap_err(), Response::failure("Unknown action"));
}

#[test]
fn bad_payload_for_known_action_is_reported() {
    let response = parse_request(r#"{"action": "TOGGLE_DEBUG", "data": {"enabled": "yes"}}"#).unwrap_err();
    assert!(!response.is_success());
    assert!(response
        .error_message()
        .unwrap()
        .starts_with("Invalid TOGGLE_DEBUG message"));

    assert_eq!(
        parse_request(r#"{"action": "START_AUTOFILL"}"#).unwrap(),
        Request::StartAutofill
    );
}

// =========================================================================
// Coordinator
// =========================================================================

#[test]
fn install_writes_default_settings_once() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = Coordinator::new(Arc::clone(&store));

    coordinator.on_installed().unwrap();
    assert!(store.get(&["settings"]).unwrap().contains_key("settings"));

    store.set(json!({"settings": {"debugMode": true}}).as_object().cloned().unwrap()).unwrap();
    coordinator.on_installed().unwrap();
    assert!(load_settings(&*store).unwrap().debug_mode);
}

#[test]
fn analysis_without_profile_is_an_error_response() {
    let coordinator = Coordinator::new(Arc::new(MemoryStore::new()));
    let fields = scan(&contact_form(&[])).fields;

    let response = coordinator.handle(&Request::analyze_form(fields));
    assert_eq!(response, Response::error("Profile not configured"));
}

#[test]
fn local_analysis_uses_the_stored_profile() {
    let coordinator = Coordinator::new(configured_store());
    let fields = scan(&contact_form(&["email"])).fields;

    match coordinator.handle(&Request::analyze_form(fields)) {
        Response::Analysis(analysis) => {
            assert_eq!(analysis.fields.len(), 4);
            assert_eq!(analysis.field("#email").unwrap().value, "john.doe@example.com");
            assert!(analysis.missing_required.is_empty());
        }
        other => panic!("expected analysis, got {:?}", other),
    }
}

#[test]
fn local_analysis_consults_saved_answers_in_the_same_store() {
    let store = configured_store();
    ResponseStore::new(Arc::clone(&store))
        .save_response("Why do you want to join us?", "The mission")
        .unwrap();
    let coordinator = Coordinator::new(store);

    let analysis = coordinator
        .analyze_form(&[typed_field("Why do you want to join us?", "why", "why", "textarea")])
        .unwrap();
    assert_eq!(analysis.field("#why").unwrap().value, "The mission");
}

#[test]
fn stored_api_key_switches_to_remote_analysis() {
    let store = configured_store();
    set_typed(&*store, API_KEY_KEY, &"sk-test").unwrap();

    let keys = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&keys);
    let coordinator = Coordinator::new(store).with_inference(Box::new(move |key: &str| {
        seen.lock().unwrap().push(key.to_string());
        Box::new(MockTextInference::new(
            r##"{"fields": [{"selector": "#firstName", "value": "Johnny", "confidence": 0.9}],
                "missingRequired": [], "suggestions": []}"##,
        )) as Box<dyn TextInference>
    }));

    let analysis = coordinator
        .analyze_form(&scan(&contact_form(&[])).fields)
        .unwrap();
    assert_eq!(analysis.field("#firstName").unwrap().value, "Johnny");
    assert_eq!(*keys.lock().unwrap(), vec!["sk-test".to_string()]);
}

#[test]
fn remote_retries_pause_through_the_injected_delay() {
    let store = configured_store();
    set_typed(&*store, API_KEY_KEY, &"sk-test").unwrap();

    let delay = Arc::new(RecordingDelay::new());
    let pauses = Arc::clone(&delay);
    let coordinator = Coordinator::new(store)
        .with_inference(Box::new(|_key: &str| {
            Box::new(
                MockTextInference::new(
                    r##"{"fields": [], "missingRequired": [], "suggestions": []}"##,
                )
                .failing_first(vec![AutofillError::remote("connection reset")]),
            ) as Box<dyn TextInference>
        }))
        .with_backoff_delay(Box::new(move || Box::new(Arc::clone(&pauses)) as Box<dyn Delay>));

    let analysis = coordinator.analyze_form(&scan(&contact_form(&[])).fields).unwrap();

    assert!(analysis.fields.is_empty());
    assert_eq!(delay.pauses(), vec![Duration::from_millis(1000)]);
}

#[test]
fn api_key_without_backend_stays_local() {
    let store = configured_store();
    set_typed(&*store, API_KEY_KEY, &"sk-test").unwrap();
    let coordinator = Coordinator::new(store);

    let analysis = coordinator.analyze_form(&scan(&contact_form(&[])).fields).unwrap();
    assert_eq!(analysis.field("#firstName").unwrap().value, "John");
}

#[test]
fn coordinator_rejects_page_side_actions() {
    let coordinator = Coordinator::new(configured_store());
    assert_eq!(coordinator.handle(&Request::StartAutofill), Response::failure("Unknown action"));
    assert_eq!(
        coordinator.handle_json(r#"{"action": "NOPE"}"#),
        Response::failure("Unknown action")
    );
}

// =========================================================================
// Content agent over the channel
// =========================================================================

#[test]
fn start_autofill_fills_the_page_through_the_channel() {
    let mut agent = content_agent(configured_store());

    let response = agent.handle_json(r#"{"action": "START_AUTOFILL"}"#);

    assert_eq!(response, Response::ok());
    let doc = &agent.page;
    assert_eq!(doc.value(doc.query_selector("#firstName").unwrap()), "John");
    assert_eq!(doc.value(doc.query_selector("#email").unwrap()), "john.doe@example.com");
    assert_eq!(agent.last_report().unwrap().status, AutofillStatus::FullyFilled);
}

#[test]
fn start_autofill_reports_missing_profile() {
    let mut agent = content_agent(Arc::new(MemoryStore::new()));

    let response = agent.handle(Request::StartAutofill);

    assert!(!response.is_success());
    assert!(response.error_message().unwrap().contains("Profile not configured"));
    assert!(agent.page.events().is_empty());
}

#[test]
fn toggle_debug_shows_and_clears_the_overlay() {
    let mut agent = content_agent(configured_store());

    assert_eq!(agent.handle(Request::toggle_debug(true)), Response::ok());
    assert!(agent.autofill().overlay().is_visible());
    agent.handle(Request::StartAutofill);
    assert!(agent.autofill().overlay().len() > 1);

    assert_eq!(
        agent.handle_json(r#"{"action": "TOGGLE_DEBUG", "data": {"enabled": false}}"#),
        Response::ok()
    );
    assert!(!agent.autofill().overlay().is_visible());
    assert!(agent.autofill().overlay().is_empty());
}

#[test]
fn content_agent_does_not_analyze() {
    let mut agent = content_agent(configured_store());
    assert_eq!(
        agent.handle(Request::analyze_form(vec![])),
        Response::failure("Unknown action")
    );
    assert_eq!(agent.handle_json("{}"), Response::failure("Unknown action"));
}

// =========================================================================
// Channel analyzer
// =========================================================================

struct CannedChannel(Response);

impl Channel for CannedChannel {
    fn send(&self, _request: &Request) -> Result<Response, AutofillError> {
        Ok(self.0.clone())
    }
}

#[test]
fn non_analysis_replies_become_errors() {
    let snapshot = scan(&contact_form(&[]));

    let ack = CannedChannel(Response::ok());
    let err = ChannelAnalyzer::new(&ack).analyze(&snapshot).unwrap_err();
    assert_eq!(err.user_message(), "Invalid analysis data");

    let failed = CannedChannel(Response::error("Profile not configured"));
    let err = ChannelAnalyzer::new(&failed).analyze(&snapshot).unwrap_err();
    assert_eq!(err.user_message(), "Profile not configured");
}
