use form_autofill::{
    dom::document::{Document, FrameContent, NodeId},
    form::form_model::Field,
    profile::profile_model::{Address, Profile},
};

pub fn john_doe() -> Profile {
    Profile {
        first_name: "John".into(),
        last_name: "Doe".into(),
        email: "john.doe@example.com".into(),
        phone: "416-555-0199".into(),
        address: Some(Address::Line("12 King St W".into())),
        city: Some("Toronto".into()),
        postal_code: Some("M5H 1A1".into()),
        ..Default::default()
    }
}

/// `<label for=id>text</label><input id=id ...>` inside `parent`.
pub fn labelled_input(
    doc: &mut Document,
    parent: NodeId,
    label: &str,
    attrs: &[(&str, &str)],
) -> NodeId {
    let id = attrs
        .iter()
        .find(|(k, _)| *k == "id")
        .map(|(_, v)| *v)
        .unwrap_or("");
    let l = doc.append_element(parent, "label", &[("for", id)]);
    doc.append_text(l, label);
    doc.append_element(parent, "input", attrs)
}

/// Name/email/phone form with the given fields marked required.
pub fn contact_form(required: &[&str]) -> Document {
    let mut doc = Document::new("https://jobs.example.com/apply");
    let root = doc.root();
    let form = doc.append_element(root, "form", &[("id", "application")]);

    for (label, id, ty) in [
        ("First Name", "firstName", "text"),
        ("Last Name", "lastName", "text"),
        ("Email", "email", "email"),
        ("Phone", "phone", "tel"),
    ] {
        let mut attrs = vec![("id", id), ("name", id), ("type", ty)];
        if required.contains(&id) {
            attrs.push(("required", ""));
        }
        labelled_input(&mut doc, form, label, &attrs);
    }
    doc
}

/// Page whose only form lives in a same-origin iframe, next to a
/// cross-origin one.
pub fn framed_form() -> Document {
    let mut inner = Document::new("https://jobs.example.com/embedded");
    let inner_root = inner.root();
    labelled_input(
        &mut inner,
        inner_root,
        "City",
        &[("id", "city"), ("name", "city"), ("type", "text")],
    );

    let mut doc = Document::new("https://jobs.example.com/apply");
    let root = doc.root();
    labelled_input(
        &mut doc,
        root,
        "First Name",
        &[("id", "firstName"), ("type", "text")],
    );
    let blocked = doc.append_element(root, "iframe", &[("src", "https://ads.example.net")]);
    doc.attach_frame(blocked, FrameContent::CrossOrigin);
    let frame = doc.append_element(root, "iframe", &[("src", "/embedded")]);
    doc.attach_frame(frame, FrameContent::Loaded(Box::new(inner)));
    doc
}

pub fn field(label: &str, name: &str, id: &str) -> Field {
    Field {
        field_type: "text".into(),
        name: name.into(),
        id: id.into(),
        label: label.into(),
        selector: if id.is_empty() {
            format!("[name=\"{}\"]", name)
        } else {
            format!("#{}", id)
        },
        ..Default::default()
    }
}

pub fn typed_field(label: &str, name: &str, id: &str, field_type: &str) -> Field {
    Field {
        field_type: field_type.into(),
        ..field(label, name, id)
    }
}
