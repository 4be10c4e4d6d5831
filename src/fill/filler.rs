use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    agent::error::AutofillError,
    dom::{
        document::{Document, EventKind, FramePath, NodeId},
        page::Page,
    },
    fill::delay::{Delay, NoDelay, ThreadDelay, TypingCadence},
};

/// One value to write into the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillInstruction {
    pub selector: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frame: FramePath,
}

impl FillInstruction {
    pub fn new(selector: &str, value: &str) -> Self {
        Self {
            selector: selector.to_string(),
            value: value.to_string(),
            frame: vec![],
        }
    }

    pub fn in_frame(mut self, frame: FramePath) -> Self {
        self.frame = frame;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    Filled,
    /// Empty value; the element was left as it was
    Skipped,
}

/// Per-field outcome of a fill attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillResult {
    pub selector: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frame: FramePath,
}

impl FillResult {
    fn from_outcome(instruction: &FillInstruction, outcome: Result<FillOutcome, AutofillError>) -> Self {
        let (success, error, skipped) = match outcome {
            Ok(o) => (true, None, o == FillOutcome::Skipped),
            Err(e) => (false, Some(e.to_string()), false),
        };
        FillResult {
            selector: instruction.selector.clone(),
            success,
            error,
            skipped,
            frame: instruction.frame.clone(),
        }
    }
}

const TRUTHY: &[&str] = &["true", "yes", "on", "1", "checked"];

/// Writes values into live elements the way a user would: focus, keystrokes
/// with `input` events, then `change`.
pub struct FormFiller {
    delay: Box<dyn Delay>,
    cadence: TypingCadence,
}

impl Default for FormFiller {
    fn default() -> Self {
        Self::new(Box::new(ThreadDelay))
    }
}

impl FormFiller {
    pub fn new(delay: Box<dyn Delay>) -> Self {
        Self {
            delay,
            cadence: TypingCadence::default(),
        }
    }

    /// Filler that types without pausing.
    pub fn instant() -> Self {
        Self::new(Box::new(NoDelay))
    }

    pub fn with_cadence(mut self, cadence: TypingCadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn cadence(&self) -> TypingCadence {
        self.cadence
    }

    pub fn delay(&self) -> &dyn Delay {
        &*self.delay
    }

    /// Fill the element `selector` resolves to in `doc`.
    pub fn fill(
        &self,
        doc: &mut Document,
        selector: &str,
        value: &str,
    ) -> Result<FillOutcome, AutofillError> {
        let node = doc
            .query_selector(selector)
            .ok_or_else(|| AutofillError::Lookup {
                selector: selector.to_string(),
            })?;

        if value.is_empty() {
            return Ok(FillOutcome::Skipped);
        }

        let tag = doc.tag(node).unwrap_or("").to_string();
        let input_type = doc.attr(node, "type").unwrap_or("").to_lowercase();
        match (tag.as_str(), input_type.as_str()) {
            ("select", _) => self.select_option(doc, node, selector, value)?,
            ("input", "checkbox") | ("input", "radio") => self.toggle(doc, node, value),
            _ => self.type_text(doc, node, value),
        }

        Ok(FillOutcome::Filled)
    }

    /// Fill every instruction independently. A failure is recorded for that
    /// field and the batch moves on.
    pub fn fill_all(&self, page: &mut dyn Page, instructions: &[FillInstruction]) -> Vec<FillResult> {
        let doc = match page.document_mut() {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "no document to fill");
                let reason = e.to_string();
                return instructions
                    .iter()
                    .map(|i| FillResult {
                        selector: i.selector.clone(),
                        success: false,
                        error: Some(reason.clone()),
                        skipped: false,
                        frame: i.frame.clone(),
                    })
                    .collect();
            }
        };

        instructions
            .iter()
            .map(|instruction| {
                let outcome = doc
                    .resolve_frame_mut(&instruction.frame)
                    .and_then(|target| self.fill(target, &instruction.selector, &instruction.value));

                match &outcome {
                    Ok(FillOutcome::Filled) => debug!(selector = %instruction.selector, "field filled"),
                    Ok(FillOutcome::Skipped) => debug!(selector = %instruction.selector, "empty value, field skipped"),
                    Err(e) => warn!(selector = %instruction.selector, error = %e, "failed to fill field"),
                }

                FillResult::from_outcome(instruction, outcome)
            })
            .collect()
    }

    fn select_option(
        &self,
        doc: &mut Document,
        node: NodeId,
        selector: &str,
        value: &str,
    ) -> Result<(), AutofillError> {
        let options = doc.options(node);
        let wanted = value.trim().to_lowercase();
        let option = options
            .iter()
            .copied()
            .find(|&o| doc.option_value(o) == value)
            .or_else(|| {
                options
                    .iter()
                    .copied()
                    .find(|&o| doc.text_content(o).trim().to_lowercase() == wanted)
            })
            .ok_or_else(|| AutofillError::Fill {
                selector: selector.to_string(),
                reason: format!("no option matching '{}'", value),
            })?;

        let option_value = doc.option_value(option);
        doc.focus(node);
        doc.set_value(node, &option_value);
        doc.dispatch(node, EventKind::Change);
        Ok(())
    }

    fn toggle(&self, doc: &mut Document, node: NodeId, value: &str) {
        let own_value = doc.attr(node, "value").unwrap_or("on").to_string();
        let lowered = value.trim().to_lowercase();
        let checked = TRUTHY.contains(&lowered.as_str()) || value == own_value;

        doc.focus(node);
        doc.set_checked(node, checked);
        doc.dispatch(node, EventKind::Change);
    }

    /// Replay the value one character at a time. Many form frameworks only
    /// observe per-keystroke `input` events and ignore a bulk assignment.
    fn type_text(&self, doc: &mut Document, node: NodeId, value: &str) {
        doc.focus(node);
        doc.set_value(node, "");

        let mut typed = String::with_capacity(value.len());
        for c in value.chars() {
            typed.push(c);
            doc.set_value(node, &typed);
            doc.dispatch(node, EventKind::Input);
            self.delay.pause(self.cadence.next_gap());
        }

        doc.dispatch(node, EventKind::Change);
    }
}
