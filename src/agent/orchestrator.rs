use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::{
    agent::{
        analysis_model::FormAnalysis,
        analyzer::FieldAnalyzer,
        autofill_model::{AutofillReport, AutofillState, AutofillStatus},
        error::AutofillError,
    },
    dom::page::Page,
    fill::filler::{FillInstruction, FillResult, FormFiller},
    form::{
        form_model::{Field, FormSnapshot},
        scanner::scan,
    },
    profile::validation::{is_valid_email, sanitize_value},
    trace::{logger::TraceLogger, overlay::DebugOverlay, trace::TraceEvent},
};

/// Runs one scan, resolve and fill pass over a page.
///
/// The pass is linear: `Idle → Scanning → Resolving → Filling → Done`, or
/// `Failed` when a stage cannot continue. Per-field problems never stop the
/// pass; they show up in the report.
pub struct Autofill {
    pub state: AutofillState,
    pub step: u64,
    filler: FormFiller,
    tracer: TraceLogger,
    overlay: DebugOverlay,
    settle: Duration,
}

impl Default for Autofill {
    fn default() -> Self {
        Self::new(FormFiller::default())
    }
}

impl Autofill {
    pub fn new(filler: FormFiller) -> Self {
        Self {
            state: AutofillState::Idle,
            step: 0,
            filler,
            tracer: TraceLogger::disabled(),
            overlay: DebugOverlay::new(),
            settle: Duration::ZERO,
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_overlay(mut self, overlay: DebugOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Wait this long before scanning so late-rendering widgets settle.
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn overlay(&self) -> &DebugOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut DebugOverlay {
        &mut self.overlay
    }

    pub fn filler(&self) -> &FormFiller {
        &self.filler
    }

    pub fn run(&mut self, page: &mut dyn Page, analyzer: &dyn FieldAnalyzer) -> AutofillReport {
        self.state = AutofillState::Idle;
        if !self.settle.is_zero() {
            self.filler.delay().pause(self.settle);
        }

        // ---- Scanning ----
        self.transition(AutofillState::Scanning, None, "Scanning page for form fields");
        let snapshot = match page.document() {
            Ok(doc) => scan(doc),
            Err(e) => return self.fail(&e, None),
        };
        let fingerprint = snapshot.fingerprint();
        if snapshot.is_empty() {
            let e = AutofillError::Validation("no form fields found on page".to_string());
            return self.fail(&e, Some(&fingerprint));
        }
        self.tracer.log(
            &TraceEvent::now(self.step, self.state)
                .with_run(&fingerprint)
                .with_field_count(snapshot.fields.len())
                .with_detail("scan complete"),
        );
        self.overlay
            .log(format!("Found {} fields in {} forms", snapshot.fields.len(), snapshot.form_count));

        // ---- Resolving ----
        self.transition(AutofillState::Resolving, Some(&fingerprint), "Resolving field values");
        let analysis = match analyzer.analyze(&snapshot) {
            Ok(a) => a,
            Err(e) => return self.fail(&e, Some(&fingerprint)),
        };
        let instructions = build_instructions(&snapshot, &analysis);
        debug!(instructions = instructions.len(), "fill plan ready");

        // ---- Filling ----
        self.transition(
            AutofillState::Filling,
            Some(&fingerprint),
            &format!("Filling {} fields", instructions.len()),
        );
        let results = self.filler.fill_all(page, &instructions);

        // ---- Done ----
        let report = summarize(&snapshot, results, fingerprint);
        self.state = AutofillState::Done;
        info!(
            status = %report.status,
            filled = report.filled,
            unresolved = report.unresolved,
            "autofill finished"
        );
        self.tracer.log(
            &TraceEvent::now(self.step, self.state)
                .with_run(report.fingerprint.as_deref().unwrap_or_default())
                .with_field_count(report.field_count)
                .with_counts(report.filled, report.unresolved)
                .with_detail(&report.status),
        );
        self.step += 1;
        if report.status.is_failure() {
            self.overlay.error(report.status_line());
        } else {
            self.overlay.log(report.status_line());
        }

        AutofillReport {
            state: self.state,
            ..report
        }
    }

    fn transition(&mut self, next: AutofillState, run: Option<&str>, message: &str) {
        debug!(from = ?self.state, to = ?next, "autofill transition");
        self.state = next;

        let mut event = TraceEvent::now(self.step, next).with_detail(message);
        if let Some(run) = run {
            event = event.with_run(run);
        }
        self.tracer.log(&event);
        self.step += 1;
        self.overlay.log(message);
    }

    fn fail(&mut self, e: &AutofillError, run: Option<&str>) -> AutofillReport {
        error!(state = ?self.state, kind = ?e.kind(), error = %e, "autofill failed");
        let failed_in = self.state;
        self.state = AutofillState::Failed;

        let mut event = TraceEvent::now(self.step, self.state)
            .with_detail(format!("{:?}: {}", failed_in, e));
        if let Some(run) = run {
            event = event.with_run(run);
        }
        self.tracer.log(&event);
        self.step += 1;

        let report = AutofillReport::failed(e.to_string());
        self.overlay.error(report.status_line());
        AutofillReport {
            fingerprint: run.map(str::to_string),
            ..report
        }
    }
}

/// Map analyzed selectors back to scanned fields so iframe fields are filled
/// in their own document. Non-fillable fields are dropped.
pub fn build_instructions(snapshot: &FormSnapshot, analysis: &FormAnalysis) -> Vec<FillInstruction> {
    analysis
        .fields
        .iter()
        .zip(match_fields(snapshot, analysis))
        .filter_map(|(analyzed, index)| {
            let field = index.map(|i| &snapshot.fields[i]);
            if field.is_some_and(|f| !f.is_fillable()) {
                return None;
            }

            let mut value = analyzed.effective_value().to_string();
            if let Some(f) = field {
                if f.field_type == "email" && !value.is_empty() && !is_valid_email(&value) {
                    value = sanitize_value(&value, "email");
                }
            }

            let frame = match (field, &analyzed.frame) {
                (Some(f), _) => f.frame.clone(),
                (None, Some(frame)) => frame.clone(),
                (None, None) => vec![],
            };
            Some(FillInstruction::new(&analyzed.selector, &value).in_frame(frame))
        })
        .collect()
}

/// Pair each analyzed entry with the scanned field it describes. Entries that
/// name a frame match on selector and frame. The rest take the first field
/// with that selector not already claimed, in scan order.
fn match_fields(snapshot: &FormSnapshot, analysis: &FormAnalysis) -> Vec<Option<usize>> {
    let mut claimed = vec![false; snapshot.fields.len()];
    analysis
        .fields
        .iter()
        .map(|analyzed| {
            let candidates: Vec<usize> = snapshot
                .fields
                .iter()
                .enumerate()
                .filter(|(_, f)| f.selector == analyzed.selector)
                .filter(|(_, f)| analyzed.frame.as_ref().is_none_or(|frame| f.frame == *frame))
                .map(|(i, _)| i)
                .collect();
            let index = candidates
                .iter()
                .copied()
                .find(|&i| !claimed[i])
                .or_else(|| candidates.first().copied());
            if let Some(i) = index {
                claimed[i] = true;
            }
            index
        })
        .collect()
}

fn summarize(snapshot: &FormSnapshot, results: Vec<FillResult>, fingerprint: String) -> AutofillReport {
    let filled_fields: HashSet<(&[usize], &str)> = results
        .iter()
        .filter(|r| r.success && !r.skipped)
        .map(|r| (r.frame.as_slice(), r.selector.as_str()))
        .collect();
    let was_filled = |f: &Field| filled_fields.contains(&(f.frame.as_slice(), f.selector.as_str()));
    let filled = results.iter().filter(|r| r.success && !r.skipped).count();
    let attempted = results.iter().filter(|r| !r.skipped).count();

    let fillable: Vec<_> = snapshot.fields.iter().filter(|f| f.is_fillable()).collect();
    let unresolved = fillable
        .iter()
        .filter(|f| !was_filled(f))
        .count();

    let mut seen = HashSet::new();
    let missing_required: Vec<String> = fillable
        .iter()
        .filter(|f| f.required)
        .filter(|f| !was_filled(f))
        .filter(|f| f.current_value.trim().is_empty())
        .filter(|f| seen.insert((f.frame.as_slice(), f.selector.as_str())))
        .map(|f| f.selector.clone())
        .collect();

    let status = if attempted > 0 && filled == 0 {
        AutofillStatus::Failed {
            reason: format!("all {} field fills failed", attempted),
        }
    } else if !missing_required.is_empty() {
        AutofillStatus::Failed {
            reason: format!("required fields unfilled: {}", missing_required.join(", ")),
        }
    } else if unresolved == 0 {
        AutofillStatus::FullyFilled
    } else {
        AutofillStatus::PartiallyFilled { unresolved }
    };

    AutofillReport {
        state: AutofillState::Done,
        status,
        field_count: snapshot.fields.len(),
        results,
        missing_required,
        filled,
        unresolved,
        fingerprint: Some(fingerprint),
    }
}
