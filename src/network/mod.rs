//! Persistence gateway for study-guide documents
//!
//! The renderer only needs two calls: read a document with its shareable
//! flag, and update content and/or flag. An update reporting zero affected
//! rows means the caller may not touch the document.

mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::MemoryGateway;

use crate::utils::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage identity of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A document as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub content: String,
    pub shareable: bool,
}

/// Fields to change; `None` leaves a field as stored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub content: Option<String>,
    pub shareable: Option<bool>,
}

impl DocumentUpdate {
    /// Replace the canonical string
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            shareable: None,
        }
    }

    /// Set the shareable flag
    pub fn shareable(shareable: bool) -> Self {
        Self {
            content: None,
            shareable: Some(shareable),
        }
    }
}

/// Storage backend of documents
#[async_trait(?Send)]
pub trait PersistenceGateway {
    /// Read a document
    async fn get(&self, id: &DocumentId) -> Result<StoredDocument>;

    /// Apply an update, returning the number of affected rows
    async fn update(&self, id: &DocumentId, update: DocumentUpdate) -> Result<u64>;
}
