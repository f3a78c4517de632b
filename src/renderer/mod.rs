//! Rendering layer for generated study guides
//!
//! Parses the canonical HTML string, rewrites and installs its stylesheets,
//! and mounts its body into a container of the host page.

pub mod css;
pub mod dom;
pub mod html;
mod ingest;
pub mod section;
mod styles;

pub use css::{InlineStyle, StyleRewriter};
pub use dom::{ElementMatcher, NodeExt};
pub use html::HtmlParser;
pub use ingest::{DocumentIngestor, EMPTY_STATE_CLASS, IngestReport, MountState};
pub use section::SchemaViolation;
pub use styles::{InstalledStyle, StyleRegistry};
