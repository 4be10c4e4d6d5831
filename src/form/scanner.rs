use tracing::{debug, warn};

use crate::{
    dom::document::{Document, FramePath, NodeId},
    form::{
        classifier::classify,
        form_model::{Field, FormSnapshot},
        label::find_label,
        selector::generate_selector,
    },
};

const CONTROL_TAGS: &[&str] = &["input", "select", "textarea"];

/// Collect every input, select and textarea in `doc` and its reachable
/// sub-documents.
///
/// Top-level fields come first in document order; each accessible iframe's
/// fields follow its parent document's fields. Frames that cannot be entered
/// (cross-origin, detached) are logged and skipped.
pub fn scan(doc: &Document) -> FormSnapshot {
    let mut fields = Vec::new();
    scan_context(doc, &mut Vec::new(), &mut fields);

    debug!(
        url = %doc.url,
        fields = fields.len(),
        forms = doc.form_count(),
        "form scan complete"
    );

    FormSnapshot::new(&doc.url, fields, doc.form_count())
}

fn scan_context(doc: &Document, path: &mut FramePath, out: &mut Vec<Field>) {
    for node in doc.elements_by_tag(CONTROL_TAGS) {
        out.push(analyze_field(doc, node, path));
    }

    for (index, iframe) in doc.frames().into_iter().enumerate() {
        match doc.frame_document(iframe) {
            Ok(sub) => {
                path.push(index);
                scan_context(sub, path, out);
                path.pop();
            }
            Err(e) => {
                warn!(frame = index, url = %doc.url, error = %e, "could not access iframe content");
            }
        }
    }
}

/// Build a `Field` for one control element. Missing attributes become empty
/// strings; this never fails.
pub fn analyze_field(doc: &Document, node: NodeId, frame: &[usize]) -> Field {
    let tag = doc.tag(node).unwrap_or("input").to_lowercase();
    let field_type = match tag.as_str() {
        "input" => doc
            .attr(node, "type")
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string()),
        other => other.to_string(),
    };

    let mut field = Field {
        field_type,
        name: doc.name(node).to_string(),
        id: doc.id(node).to_string(),
        label: find_label(doc, node),
        required: doc.has_attr(node, "required") || doc.attr(node, "aria-required") == Some("true"),
        selector: generate_selector(doc, node),
        current_value: doc.value(node),
        frame: frame.to_vec(),
        ..Field::default()
    };
    field.purpose = classify(&field);
    field
}
