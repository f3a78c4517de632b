//! In-memory gateway for tests and the command line tool

use super::{DocumentId, DocumentUpdate, PersistenceGateway, StoredDocument};
use crate::utils::{ApostilaError, Result};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// Documents held in a map.
///
/// Updates yield to the runtime once before applying, so callers observe
/// the same interleaving as with a network backend.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    documents: RefCell<HashMap<DocumentId, StoredDocument>>,
    read_only: RefCell<HashSet<DocumentId>>,
    fail_updates: Cell<bool>,
    update_calls: Cell<usize>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document, replacing any previous one
    pub fn insert(&self, id: impl Into<DocumentId>, content: impl Into<String>, shareable: bool) {
        self.documents.borrow_mut().insert(
            id.into(),
            StoredDocument {
                content: content.into(),
                shareable,
            },
        );
    }

    /// Make updates to `id` affect zero rows
    pub fn set_read_only(&self, id: impl Into<DocumentId>) {
        self.read_only.borrow_mut().insert(id.into());
    }

    /// Make every update fail as a transport error
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.set(fail);
    }

    /// Number of update calls received
    pub fn update_calls(&self) -> usize {
        self.update_calls.get()
    }

    /// Stored copy of a document
    pub fn stored(&self, id: &DocumentId) -> Option<StoredDocument> {
        self.documents.borrow().get(id).cloned()
    }
}

#[async_trait(?Send)]
impl PersistenceGateway for MemoryGateway {
    async fn get(&self, id: &DocumentId) -> Result<StoredDocument> {
        tokio::task::yield_now().await;
        self.stored(id)
            .ok_or_else(|| ApostilaError::PermissionDenied("document not found".to_string()))
    }

    async fn update(&self, id: &DocumentId, update: DocumentUpdate) -> Result<u64> {
        self.update_calls.set(self.update_calls.get() + 1);
        tokio::task::yield_now().await;

        if self.fail_updates.get() {
            return Err(ApostilaError::PersistenceFailure("connection reset".to_string()));
        }
        if self.read_only.borrow().contains(id) {
            return Ok(0);
        }
        let mut documents = self.documents.borrow_mut();
        let Some(doc) = documents.get_mut(id) else {
            return Ok(0);
        };
        if let Some(content) = update.content {
            doc.content = content;
        }
        if let Some(shareable) = update.shareable {
            doc.shareable = shareable;
        }
        log::debug!("memory gateway updated {}", id);
        Ok(1)
    }
}
