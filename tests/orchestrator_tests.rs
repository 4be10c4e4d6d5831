use std::sync::Arc;
use std::time::Duration;

use form_autofill::{
    agent::{
        analysis_model::{AnalyzedField, FormAnalysis},
        analyzer::{FieldAnalyzer, ProfileAnalyzer},
        autofill_model::{AutofillState, AutofillStatus},
        error::AutofillError,
        orchestrator::{Autofill, build_instructions},
    },
    dom::{
        document::{Document, EventKind, FrameContent},
        page::{Page, Tab},
    },
    fill::{delay::RecordingDelay, filler::FormFiller},
    form::{form_model::FormSnapshot, scanner::scan},
    profile::profile_model::Profile,
    run_autofill,
    trace::{logger::TraceLogger, overlay::DebugOverlay, trace::TraceEvent},
};

mod common;
use crate::common::builders::{contact_form, framed_form, john_doe, labelled_input, typed_field};

/// Returns a fixed analysis regardless of the snapshot.
struct FixedAnalyzer(Result<FormAnalysis, String>);

impl FieldAnalyzer for FixedAnalyzer {
    fn analyze(&self, _snapshot: &FormSnapshot) -> Result<FormAnalysis, AutofillError> {
        self.0.clone().map_err(AutofillError::remote)
    }
}

fn fixed(fields: Vec<AnalyzedField>) -> FixedAnalyzer {
    FixedAnalyzer(Ok(FormAnalysis {
        fields,
        ..Default::default()
    }))
}

fn value_of(page: &dyn Page, selector: &str) -> String {
    let doc = page.document().unwrap();
    doc.value(doc.query_selector(selector).unwrap())
}

// =========================================================================
// Outcomes
// =========================================================================

#[test]
fn complete_profile_fills_everything() {
    let mut doc = contact_form(&["firstName", "email"]);
    let mut autofill = Autofill::new(FormFiller::instant());

    let report = autofill.run(&mut doc, &ProfileAnalyzer::new(john_doe()));

    assert_eq!(report.state, AutofillState::Done);
    assert_eq!(report.status, AutofillStatus::FullyFilled);
    assert_eq!(report.status_line(), "fully filled");
    assert!(report.is_success());
    assert_eq!(report.field_count, 4);
    assert_eq!(report.filled, 4);
    assert_eq!(report.unresolved, 0);
    assert!(report.missing_required.is_empty());
    assert_eq!(autofill.state, AutofillState::Done);
    assert_eq!(autofill.step, 4);

    assert_eq!(value_of(&doc, "#firstName"), "John");
    assert_eq!(value_of(&doc, "#lastName"), "Doe");
    assert_eq!(value_of(&doc, "#email"), "john.doe@example.com");
    assert_eq!(value_of(&doc, "#phone"), "416-555-0199");
}

#[test]
fn unanswered_optional_question_is_partial() {
    let mut doc = contact_form(&[]);
    let root = doc.root();
    let label = doc.append_element(root, "label", &[("for", "why")]);
    doc.append_text(label, "Why do you want to work here?");
    doc.append_element(root, "textarea", &[("id", "why")]);

    let report = Autofill::new(FormFiller::instant()).run(&mut doc, &ProfileAnalyzer::new(john_doe()));

    assert_eq!(report.state, AutofillState::Done);
    assert_eq!(report.status, AutofillStatus::PartiallyFilled { unresolved: 1 });
    assert_eq!(report.status_line(), "partially filled, 1 fields unresolved");
    assert_eq!(report.filled, 4);
    assert!(report.results.iter().any(|r| r.selector == "#why" && r.skipped));
}

#[test]
fn empty_required_field_fails_the_run() {
    let mut doc = contact_form(&["phone"]);
    let profile = Profile {
        phone: String::new(),
        ..john_doe()
    };

    let report = Autofill::new(FormFiller::instant()).run(&mut doc, &ProfileAnalyzer::new(profile));

    assert_eq!(report.state, AutofillState::Done);
    assert_eq!(
        report.status,
        AutofillStatus::Failed {
            reason: "required fields unfilled: #phone".into()
        }
    );
    assert!(!report.is_success());
    assert_eq!(report.missing_required, vec!["#phone"]);
    assert_eq!(report.filled, 3);
    assert_eq!(value_of(&doc, "#phone"), "");
}

#[test]
fn prefilled_required_field_is_not_missing() {
    let mut doc = contact_form(&["phone"]);
    let phone = doc.query_selector("#phone").unwrap();
    doc.set_value(phone, "555-0100");
    let profile = Profile {
        phone: String::new(),
        ..john_doe()
    };

    let report = Autofill::new(FormFiller::instant()).run(&mut doc, &ProfileAnalyzer::new(profile));

    assert!(report.missing_required.is_empty());
    assert_eq!(report.status, AutofillStatus::PartiallyFilled { unresolved: 1 });
    assert_eq!(value_of(&doc, "#phone"), "555-0100");
}

#[test]
fn every_fill_failing_fails_the_run() {
    let mut doc = contact_form(&[]);
    let analyzer = fixed(vec![
        AnalyzedField::new("#gone", "x"),
        AnalyzedField::new("#alsoGone", "y"),
    ]);

    let report = Autofill::new(FormFiller::instant()).run(&mut doc, &analyzer);

    assert_eq!(report.state, AutofillState::Done);
    assert_eq!(
        report.status,
        AutofillStatus::Failed {
            reason: "all 2 field fills failed".into()
        }
    );
    assert_eq!(report.filled, 0);
    assert_eq!(report.unresolved, 4);
}

#[test]
fn hidden_and_button_inputs_are_ignored() {
    let mut doc = contact_form(&[]);
    let root = doc.root();
    doc.append_element(root, "input", &[("type", "hidden"), ("name", "token"), ("required", "")]);
    doc.append_element(root, "input", &[("type", "submit"), ("id", "send")]);

    let report = Autofill::new(FormFiller::instant()).run(&mut doc, &ProfileAnalyzer::new(john_doe()));

    assert_eq!(report.status, AutofillStatus::FullyFilled);
    assert_eq!(report.field_count, 6);
    assert_eq!(report.results.len(), 4);
}

#[test]
fn frame_fields_are_filled_in_place() {
    let mut tab = Tab::with_document(framed_form());

    let report = Autofill::new(FormFiller::instant()).run(&mut tab, &ProfileAnalyzer::new(john_doe()));

    assert_eq!(report.status, AutofillStatus::FullyFilled);
    assert_eq!(report.filled, 2);
    let doc = tab.document().unwrap();
    let inner = doc.resolve_frame(&[1]).unwrap();
    assert_eq!(inner.value(inner.query_selector("#city").unwrap()), "Toronto");
}

/// Top-level `#email` next to an iframe whose own form also has `#email`.
fn email_in_both_frames() -> Document {
    let mut inner = Document::new("https://jobs.example.com/embedded");
    let inner_root = inner.root();
    labelled_input(
        &mut inner,
        inner_root,
        "Email",
        &[("id", "email"), ("type", "email"), ("required", "")],
    );

    let mut doc = Document::new("https://jobs.example.com/apply");
    let root = doc.root();
    labelled_input(
        &mut doc,
        root,
        "Email",
        &[("id", "email"), ("type", "email"), ("required", "")],
    );
    let frame = doc.append_element(root, "iframe", &[("src", "/embedded")]);
    doc.attach_frame(frame, FrameContent::Loaded(Box::new(inner)));
    doc
}

#[test]
fn same_selector_in_two_frames_fills_both() {
    let mut doc = email_in_both_frames();
    let email = "john.doe@example.com";

    let report = Autofill::new(FormFiller::instant()).run(&mut doc, &ProfileAnalyzer::new(john_doe()));

    assert_eq!(report.status, AutofillStatus::FullyFilled);
    assert_eq!(report.filled, 2);
    assert_eq!(value_of(&doc, "#email"), email);

    let inner = doc.resolve_frame(&[0]).unwrap();
    assert_eq!(inner.value(inner.query_selector("#email").unwrap()), email);

    // typed once, not twice
    let top = doc.query_selector("#email").unwrap();
    let inputs = doc
        .events_for(top)
        .into_iter()
        .filter(|e| e.kind == EventKind::Input)
        .count();
    assert_eq!(inputs, email.len());
}

#[test]
fn unframed_duplicates_are_claimed_in_scan_order() {
    let snapshot = scan(&email_in_both_frames());
    let analysis = FormAnalysis {
        fields: vec![
            AnalyzedField::new("#email", "a@example.com"),
            AnalyzedField::new("#email", "b@example.com"),
        ],
        ..Default::default()
    };

    let plan: Vec<_> = build_instructions(&snapshot, &analysis)
        .into_iter()
        .map(|i| (i.value, i.frame))
        .collect();
    assert_eq!(
        plan,
        vec![
            ("a@example.com".to_string(), vec![]),
            ("b@example.com".to_string(), vec![0])
        ]
    );
}

#[test]
fn unfilled_iframe_twin_is_still_missing() {
    let mut doc = email_in_both_frames();
    let top_only = AnalyzedField::new("#email", "john.doe@example.com").in_frame(vec![]);

    let report = Autofill::new(FormFiller::instant()).run(&mut doc, &fixed(vec![top_only]));

    assert_eq!(report.filled, 1);
    assert_eq!(report.missing_required, vec!["#email"]);
    assert_eq!(
        report.status,
        AutofillStatus::Failed {
            reason: "required fields unfilled: #email".into()
        }
    );
    let inner = doc.resolve_frame(&[0]).unwrap();
    assert_eq!(inner.value(inner.query_selector("#email").unwrap()), "");
}

// =========================================================================
// Stage failures
// =========================================================================

#[test]
fn page_without_fields_fails_during_scan() {
    let mut doc = Document::new("https://example.com/about");
    let mut autofill = Autofill::new(FormFiller::instant());

    let report = autofill.run(&mut doc, &ProfileAnalyzer::new(john_doe()));

    assert_eq!(report.state, AutofillState::Failed);
    assert_eq!(autofill.state, AutofillState::Failed);
    assert!(report.status_line().contains("no form fields found on page"));
    assert!(report.fingerprint.is_some());
    assert!(report.results.is_empty());
}

#[test]
fn tab_without_document_fails() {
    let mut tab = Tab::empty();
    let report = Autofill::new(FormFiller::instant()).run(&mut tab, &ProfileAnalyzer::new(john_doe()));

    assert_eq!(report.state, AutofillState::Failed);
    assert!(report.status_line().contains("Document not accessible"));
    assert!(report.fingerprint.is_none());
}

#[test]
fn analyzer_error_fails_before_filling() {
    let mut doc = contact_form(&[]);
    let analyzer = FixedAnalyzer(Err("service unavailable".into()));

    let report = Autofill::new(FormFiller::instant()).run(&mut doc, &analyzer);

    assert_eq!(report.state, AutofillState::Failed);
    assert!(report.status_line().contains("service unavailable"));
    assert!(doc.events().is_empty());
}

// =========================================================================
// Instruction building
// =========================================================================

#[test]
fn low_confidence_fallback_is_filled_when_value_is_empty() {
    let mut doc = contact_form(&[]);
    let mut first = AnalyzedField::new("#firstName", "");
    first.confidence = 0.3;
    first.fallback_value = Some("John Doe".into());

    let report = Autofill::new(FormFiller::instant()).run(&mut doc, &fixed(vec![first]));

    assert_eq!(value_of(&doc, "#firstName"), "John Doe");
    assert_eq!(report.filled, 1);
    assert_eq!(report.status, AutofillStatus::PartiallyFilled { unresolved: 3 });
}

#[test]
fn malformed_email_values_are_normalized() {
    let snapshot = scan(&contact_form(&[]));
    let analysis = FormAnalysis {
        fields: vec![
            AnalyzedField::new("#email", " John.Doe@Example.com "),
            AnalyzedField::new("#lastName", " Doe "),
        ],
        ..Default::default()
    };

    let instructions = build_instructions(&snapshot, &analysis);
    assert_eq!(instructions[0].value, "john.doe@example.com");
    assert_eq!(instructions[1].value, " Doe ");
}

#[test]
fn instructions_carry_frame_paths_and_skip_unfillable_fields() {
    let mut snapshot = scan(&framed_form());
    snapshot.fields.push(typed_field("", "token", "", "hidden"));
    let analysis = FormAnalysis {
        fields: vec![
            AnalyzedField::new("#firstName", "John"),
            AnalyzedField::new("#city", "Toronto"),
            AnalyzedField::new("[name=\"token\"]", "abc"),
            AnalyzedField::new("#unknown", "z"),
        ],
        ..Default::default()
    };

    let instructions = build_instructions(&snapshot, &analysis);
    let plan: Vec<_> = instructions
        .iter()
        .map(|i| (i.selector.as_str(), i.frame.clone()))
        .collect();
    assert_eq!(
        plan,
        vec![("#firstName", vec![]), ("#city", vec![1]), ("#unknown", vec![])]
    );
}

// =========================================================================
// Observability
// =========================================================================

#[test]
fn trace_file_records_each_transition() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let mut doc = contact_form(&[]);

    let mut autofill = Autofill::new(FormFiller::instant()).with_tracer(TraceLogger::new(&path));
    let report = autofill.run(&mut doc, &ProfileAnalyzer::new(john_doe()));

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<TraceEvent> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let states: Vec<_> = events.iter().map(|e| e.state.as_str()).collect();
    assert_eq!(states, vec!["Scanning", "Scanning", "Resolving", "Filling", "Done"]);

    let last = events.last().unwrap();
    assert_eq!(last.filled, Some(4));
    assert_eq!(last.unresolved, Some(0));
    assert_eq!(last.run, report.fingerprint);
    assert_eq!(events[1].field_count, Some(4));
}

#[test]
fn overlay_lists_progress_newest_first() {
    let mut doc = contact_form(&[]);
    let mut overlay = DebugOverlay::new();
    overlay.show();

    let mut autofill = Autofill::new(FormFiller::instant()).with_overlay(overlay);
    autofill.run(&mut doc, &ProfileAnalyzer::new(john_doe()));

    let lines = autofill.overlay().render();
    assert!(lines[0].ends_with("] fully filled"));
    assert!(lines.iter().any(|l| l.ends_with("Found 4 fields in 1 forms")));
    assert!(lines.last().unwrap().ends_with("Debug mode activated"));
}

#[test]
fn settle_delay_runs_before_scanning() {
    let delay = Arc::new(RecordingDelay::new());
    let filler = FormFiller::new(Box::new(Arc::clone(&delay)));
    let mut doc = contact_form(&[]);

    Autofill::new(filler)
        .with_settle_delay(Duration::from_millis(500))
        .run(&mut doc, &ProfileAnalyzer::new(john_doe()));

    let pauses = delay.pauses();
    assert_eq!(pauses[0], Duration::from_millis(500));
    assert!(pauses.len() > 1);
}

#[test]
fn run_autofill_uses_the_local_profile() {
    let mut doc = Document::new("https://jobs.example.com/short");
    let root = doc.root();
    labelled_input(&mut doc, root, "First Name", &[("id", "fn")]);

    let report = run_autofill(&mut doc, &john_doe());

    assert_eq!(report.status, AutofillStatus::FullyFilled);
    assert_eq!(value_of(&doc, "#fn"), "John");
}
