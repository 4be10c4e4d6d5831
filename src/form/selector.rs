use crate::dom::document::{Document, NodeId};

/// Derive a locator for re-finding `node` later in the same document.
///
/// `#id` when the element has an id, `[name="..."]` when it has a name,
/// otherwise `tag.class1.class2` (or the bare tag). Ids and names are used
/// verbatim without escaping, so markup with duplicate ids or
/// selector-significant characters can yield a locator that is not unique.
pub fn generate_selector(doc: &Document, node: NodeId) -> String {
    let id = doc.id(node);
    if !id.is_empty() {
        return format!("#{}", id);
    }

    let name = doc.name(node);
    if !name.is_empty() {
        return format!("[name=\"{}\"]", name);
    }

    let tag = doc.tag(node).unwrap_or("").to_lowercase();
    let classes = doc.classes(node);
    if classes.is_empty() {
        tag
    } else {
        format!("{}.{}", tag, classes.join("."))
    }
}
