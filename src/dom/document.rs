use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    agent::error::AutofillError,
    dom::query::CompoundSelector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Indices of the iframes to descend through, counted in document order at each
/// level, from the top document to the document that owns an element.
pub type FramePath = Vec<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Focus,
    Input,
    Change,
}

/// An event dispatched on an element. Recorded in dispatch order so callers can
/// observe exactly what a page script listening on the element would have seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub target: NodeId,
    pub kind: EventKind,
    /// Element value right after the event fired
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum FrameContent {
    Loaded(Box<Document>),
    CrossOrigin,
    Detached,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    value: Option<String>,
    checked: Option<bool>,
    frame: Option<FrameContent>,
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory DOM of one document context: element tree, live form state,
/// dispatched events and embedded frames.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: String,
    nodes: Vec<Node>,
    root: NodeId,
    events: Vec<DomEvent>,
    focused: Option<NodeId>,
}

impl Document {
    pub fn new(url: &str) -> Self {
        Document {
            url: url.to_string(),
            nodes: vec![Node {
                data: NodeData::Element(ElementData {
                    tag: "body".into(),
                    attributes: vec![],
                    value: None,
                    checked: None,
                    frame: None,
                }),
                parent: None,
                children: vec![],
            }],
            root: NodeId(0),
            events: vec![],
            focused: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // =========================================================================
    // Tree construction
    // =========================================================================

    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let data = NodeData::Element(ElementData {
            tag: tag.to_lowercase(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            value: None,
            checked: None,
            frame: None,
        });
        self.push_node(parent, data)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push_node(parent, NodeData::Text(text.to_string()))
    }

    pub fn attach_frame(&mut self, iframe: NodeId, content: FrameContent) {
        if let Some(el) = self.element_mut(iframe) {
            el.frame = Some(content);
        }
    }

    fn push_node(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: vec![],
        });
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    // =========================================================================
    // Node accessors
    // =========================================================================

    pub fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0).map(|n| &n.data)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.data(node) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(node.0).map(|n| &mut n.data) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    /// `id` attribute, empty when absent.
    pub fn id(&self, node: NodeId) -> &str {
        self.attr(node, "id").unwrap_or("")
    }

    /// `name` attribute, empty when absent.
    pub fn name(&self, node: NodeId) -> &str {
        self.attr(node, "name").unwrap_or("")
    }

    pub fn classes(&self, node: NodeId) -> Vec<&str> {
        self.attr(node, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.data(node) {
            Some(NodeData::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(node)?);
        let pos = siblings.iter().position(|&s| s == node)?;
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .find(|&s| self.element(s).is_some())
    }

    /// Concatenated text of all descendant text nodes, like `textContent`.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.data(node) {
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element(_)) => {
                for &child in self.children(node) {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    /// All element descendants of `node` in document (pre-)order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            if self.element(n).is_some() {
                out.push(n);
                stack.extend(self.children(n).iter().rev().copied());
            }
        }
        out
    }

    /// Every element in the document, root included, in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut all = vec![self.root];
        all.extend(self.descendants(self.root));
        all
    }

    pub fn elements_by_tag(&self, tags: &[&str]) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|&n| self.tag(n).is_some_and(|t| tags.contains(&t)))
            .collect()
    }

    pub fn form_count(&self) -> usize {
        self.elements_by_tag(&["form"]).len()
    }

    // =========================================================================
    // Live form state
    // =========================================================================

    /// Current value of a form control, like the DOM `value` property.
    pub fn value(&self, node: NodeId) -> String {
        let Some(el) = self.element(node) else {
            return String::new();
        };
        if let Some(v) = &el.value {
            return v.clone();
        }
        match el.tag.as_str() {
            "textarea" => self.text_content(node),
            "select" => self
                .default_option(node)
                .map(|o| self.option_value(o))
                .unwrap_or_default(),
            _ => self.attr(node, "value").unwrap_or("").to_string(),
        }
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(el) = self.element_mut(node) {
            el.value = Some(value.to_string());
        }
    }

    pub fn checked(&self, node: NodeId) -> bool {
        match self.element(node) {
            Some(el) => el.checked.unwrap_or_else(|| self.has_attr(node, "checked")),
            None => false,
        }
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if let Some(el) = self.element_mut(node) {
            el.checked = Some(checked);
        }
    }

    /// `option` children of a select, looking through `optgroup`s.
    pub fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|&n| self.tag(n) == Some("option"))
            .collect()
    }

    pub fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(v) => v.to_string(),
            None => self.text_content(option).trim().to_string(),
        }
    }

    fn default_option(&self, select: NodeId) -> Option<NodeId> {
        let options = self.options(select);
        options
            .iter()
            .copied()
            .find(|&o| self.has_attr(o, "selected"))
            .or_else(|| options.first().copied())
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn focus(&mut self, node: NodeId) {
        self.focused = Some(node);
        self.dispatch(node, EventKind::Focus);
    }

    pub fn dispatch(&mut self, node: NodeId, kind: EventKind) {
        let value = self.value(node);
        self.events.push(DomEvent {
            target: node,
            kind,
            value,
        });
    }

    pub fn events(&self) -> &[DomEvent] {
        &self.events
    }

    pub fn events_for(&self, node: NodeId) -> Vec<&DomEvent> {
        self.events.iter().filter(|e| e.target == node).collect()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.query_selector_all(selector).into_iter().next()
    }

    /// Matches a compound selector against every element in document order.
    /// Unsupported selector syntax matches nothing.
    pub fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let Some(compound) = CompoundSelector::parse(selector) else {
            return vec![];
        };
        self.elements()
            .into_iter()
            .filter(|&n| compound.matches(self, n))
            .collect()
    }

    // =========================================================================
    // Embedded frames
    // =========================================================================

    /// `iframe`/`frame` elements in document order.
    pub fn frames(&self) -> Vec<NodeId> {
        self.elements_by_tag(&["iframe", "frame"])
    }

    pub fn frame_document(&self, iframe: NodeId) -> Result<&Document, AutofillError> {
        match self.element(iframe).and_then(|el| el.frame.as_ref()) {
            Some(FrameContent::Loaded(doc)) => Ok(&**doc),
            Some(FrameContent::CrossOrigin) => Err(AutofillError::Access(format!(
                "cross-origin frame in {}",
                self.url
            ))),
            Some(FrameContent::Detached) | None => Err(AutofillError::Access(format!(
                "detached frame in {}",
                self.url
            ))),
        }
    }

    pub fn frame_document_mut(&mut self, iframe: NodeId) -> Result<&mut Document, AutofillError> {
        let url = self.url.clone();
        match self.element_mut(iframe).and_then(|el| el.frame.as_mut()) {
            Some(FrameContent::Loaded(doc)) => Ok(&mut **doc),
            Some(FrameContent::CrossOrigin) => {
                Err(AutofillError::Access(format!("cross-origin frame in {}", url)))
            }
            Some(FrameContent::Detached) | None => {
                Err(AutofillError::Access(format!("detached frame in {}", url)))
            }
        }
    }

    /// Walk a frame path down to the owning document.
    pub fn resolve_frame(&self, path: &[usize]) -> Result<&Document, AutofillError> {
        let mut doc = self;
        for &index in path {
            let iframe = doc.frames().get(index).copied().ok_or_else(|| {
                AutofillError::Access(format!("frame #{} not present in {}", index, doc.url))
            })?;
            doc = doc.frame_document(iframe)?;
        }
        Ok(doc)
    }

    pub fn resolve_frame_mut(&mut self, path: &[usize]) -> Result<&mut Document, AutofillError> {
        let mut doc = self;
        for &index in path {
            let iframe = doc.frames().get(index).copied().ok_or_else(|| {
                AutofillError::Access(format!("frame #{} not present in {}", index, doc.url))
            })?;
            doc = doc.frame_document_mut(iframe)?;
        }
        Ok(doc)
    }

    // =========================================================================
    // JSON snapshots
    // =========================================================================

    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Document {
        let mut doc = Document::new(&snapshot.url);
        let root = doc.root;
        if let SnapshotNode::Element(el) = &snapshot.root {
            if let Some(data) = doc.element_mut(root) {
                data.tag = el.tag.to_lowercase();
                data.attributes = el
                    .attrs
                    .iter()
                    .map(|(k, v)| (k.to_lowercase(), v.clone()))
                    .collect();
            }
            if let Some(text) = &el.text {
                doc.append_text(root, text);
            }
            for child in &el.children {
                doc.load_node(root, child);
            }
        }
        doc
    }

    pub fn from_json(json: &str) -> Result<Document, AutofillError> {
        let snapshot: DocumentSnapshot =
            serde_json::from_str(json).map_err(|e| AutofillError::json("page snapshot", e))?;
        Ok(Document::from_snapshot(&snapshot))
    }

    fn load_node(&mut self, parent: NodeId, node: &SnapshotNode) {
        match node {
            SnapshotNode::Text { text } => {
                self.append_text(parent, text);
            }
            SnapshotNode::Element(el) => {
                let attrs: Vec<(&str, &str)> = el
                    .attrs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                let id = self.append_element(parent, &el.tag, &attrs);
                if let Some(v) = &el.value {
                    self.set_value(id, v);
                }
                if let Some(c) = el.checked {
                    self.set_checked(id, c);
                }
                if let Some(text) = &el.text {
                    self.append_text(id, text);
                }
                if let Some(frame) = &el.frame {
                    let content = match frame {
                        SnapshotFrame::Document(sub) => {
                            FrameContent::Loaded(Box::new(Document::from_snapshot(sub)))
                        }
                        SnapshotFrame::CrossOrigin => FrameContent::CrossOrigin,
                        SnapshotFrame::Detached => FrameContent::Detached,
                    };
                    self.attach_frame(id, content);
                }
                for child in &el.children {
                    self.load_node(id, child);
                }
            }
        }
    }

    /// Serialize the current tree, live values included.
    pub fn to_snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            url: self.url.clone(),
            root: self.snapshot_node(self.root),
        }
    }

    fn snapshot_node(&self, node: NodeId) -> SnapshotNode {
        match self.data(node) {
            Some(NodeData::Element(el)) => {
                let is_control = matches!(el.tag.as_str(), "input" | "select" | "textarea");
                let is_toggle = matches!(
                    self.attr(node, "type"),
                    Some("checkbox") | Some("radio")
                );
                SnapshotNode::Element(ElementSnapshot {
                    tag: el.tag.clone(),
                    attrs: el.attributes.iter().cloned().collect(),
                    text: None,
                    value: is_control.then(|| self.value(node)),
                    checked: is_toggle.then(|| self.checked(node)),
                    frame: el.frame.as_ref().map(|f| match f {
                        FrameContent::Loaded(doc) => {
                            SnapshotFrame::Document(Box::new(doc.to_snapshot()))
                        }
                        FrameContent::CrossOrigin => SnapshotFrame::CrossOrigin,
                        FrameContent::Detached => SnapshotFrame::Detached,
                    }),
                    children: self
                        .children(node)
                        .iter()
                        .map(|&c| self.snapshot_node(c))
                        .collect(),
                })
            }
            Some(NodeData::Text(t)) => SnapshotNode::Text { text: t.clone() },
            None => SnapshotNode::Text {
                text: String::new(),
            },
        }
    }
}

// ============================================================================
// Snapshot wire model
// ============================================================================

/// JSON page snapshot, as produced by a DOM extraction script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub url: String,
    pub root: SnapshotNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Element(ElementSnapshot),
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Shorthand for a leading text child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<SnapshotFrame>,
    #[serde(default)]
    pub children: Vec<SnapshotNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotFrame {
    Document(Box<DocumentSnapshot>),
    CrossOrigin,
    Detached,
}
