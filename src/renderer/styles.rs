//! Append-only registry of installed stylesheets
//!
//! Stands in for the hosting page's head. Styles are keyed by id and never
//! removed for the lifetime of the page; installing an id twice is a no-op.

use std::collections::HashSet;

/// A stylesheet installed into the host page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledStyle {
    pub id: String,
    pub css: String,
}

/// Style registry shared by every mount of a host page
#[derive(Debug, Default)]
pub struct StyleRegistry {
    styles: Vec<InstalledStyle>,
    ids: HashSet<String>,
}

impl StyleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a style id is installed
    pub fn is_installed(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Install a stylesheet unless the id is taken. Returns whether it was added.
    pub fn install(&mut self, id: impl Into<String>, css: impl Into<String>) -> bool {
        let id = id.into();
        if !self.ids.insert(id.clone()) {
            log::debug!("style {} already installed, skipping", id);
            return false;
        }
        log::debug!("installing style {}", id);
        self.styles.push(InstalledStyle { id, css: css.into() });
        true
    }

    /// Installed stylesheet by id
    pub fn get(&self, id: &str) -> Option<&InstalledStyle> {
        self.styles.iter().find(|s| s.id == id)
    }

    /// Ids in installation order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(|s| s.id.as_str())
    }

    /// Number of installed styles
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Installed styles in installation order
    pub fn iter(&self) -> impl Iterator<Item = &InstalledStyle> {
        self.styles.iter()
    }
}
