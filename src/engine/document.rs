//! Document representation

use crate::network::{DocumentId, StoredDocument};

/// One study guide: its canonical string and storage identity.
///
/// The live tree is derived from `raw_html` on every mount and thrown away
/// on unmount; nothing else is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Absent for documents received by value, which cannot be persisted
    id: Option<DocumentId>,
    /// The canonical string
    raw_html: String,
    shareable: bool,
}

impl Document {
    /// A document backed by storage
    pub fn owned(id: DocumentId, stored: StoredDocument) -> Self {
        Self {
            id: Some(id),
            raw_html: stored.content,
            shareable: stored.shareable,
        }
    }

    /// A document received by value, without storage identity
    pub fn by_value(raw_html: impl Into<String>) -> Self {
        Self {
            id: None,
            raw_html: raw_html.into(),
            shareable: false,
        }
    }

    /// A stored shareable document viewed read-only
    pub fn shared(stored: StoredDocument) -> Self {
        Self {
            id: None,
            raw_html: stored.content,
            shareable: stored.shareable,
        }
    }

    pub fn id(&self) -> Option<&DocumentId> {
        self.id.as_ref()
    }

    pub fn raw_html(&self) -> &str {
        &self.raw_html
    }

    pub fn is_shareable(&self) -> bool {
        self.shareable
    }

    /// Whether edits can be written back
    pub fn is_persistable(&self) -> bool {
        self.id.is_some()
    }

    /// Same document with a new canonical string
    pub fn with_raw_html(&self, raw_html: String) -> Self {
        Self {
            raw_html,
            ..self.clone()
        }
    }

    /// Same document marked shareable
    pub fn into_shareable(self) -> Self {
        Self {
            shareable: true,
            ..self
        }
    }
}
