use crate::dom::document::{Document, NodeId};

/// Best-effort human-readable label for a form control.
///
/// Tried in order: `label[for=id]`, an ancestor `<label>`, the immediately
/// preceding sibling element when it is a `<label>`, then the parent's own
/// non-empty text nodes. Returns an empty string when nothing matches.
pub fn find_label(doc: &Document, node: NodeId) -> String {
    let id = doc.id(node);
    if !id.is_empty() {
        let explicit = doc
            .elements_by_tag(&["label"])
            .into_iter()
            .find(|&l| doc.attr(l, "for") == Some(id));
        if let Some(label) = explicit {
            return doc.text_content(label).trim().to_string();
        }
    }

    if let Some(label) = wrapping_label(doc, node) {
        return doc.text_content(label).trim().to_string();
    }

    if let Some(prev) = doc.previous_element_sibling(node) {
        if doc.tag(prev) == Some("label") {
            return doc.text_content(prev).trim().to_string();
        }
    }

    match doc.parent(node) {
        Some(parent) => doc
            .children(parent)
            .iter()
            .filter_map(|&c| doc.text(c))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        None => String::new(),
    }
}

fn wrapping_label(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = doc.parent(node);
    while let Some(n) = current {
        if doc.tag(n) == Some("label") {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}
