use crate::{agent::error::AutofillError, dom::document::Document};

/// The live document context an autofill run works against.
///
/// `Document` itself is always accessible. Browser-backed pages implement this
/// so the scanner and filler see the same tree.
pub trait Page {
    fn document(&self) -> Result<&Document, AutofillError>;
    fn document_mut(&mut self) -> Result<&mut Document, AutofillError>;
}

impl Page for Document {
    fn document(&self) -> Result<&Document, AutofillError> {
        Ok(self)
    }

    fn document_mut(&mut self) -> Result<&mut Document, AutofillError> {
        Ok(self)
    }
}

/// A browser tab that may or may not have a loaded, scriptable document
/// (e.g. `chrome://` pages, or a tab that is still navigating).
#[derive(Debug, Default)]
pub struct Tab {
    pub document: Option<Document>,
}

impl Tab {
    pub fn with_document(document: Document) -> Self {
        Tab {
            document: Some(document),
        }
    }

    pub fn empty() -> Self {
        Tab { document: None }
    }
}

impl Page for Tab {
    fn document(&self) -> Result<&Document, AutofillError> {
        self.document
            .as_ref()
            .ok_or_else(|| AutofillError::Access("no accessible document in tab".into()))
    }

    fn document_mut(&mut self) -> Result<&mut Document, AutofillError> {
        self.document
            .as_mut()
            .ok_or_else(|| AutofillError::Access("no accessible document in tab".into()))
    }
}
