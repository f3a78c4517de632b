//! # Apostila - Interactive Study-Guide Renderer
//!
//! Turns a generated HTML study guide into a live, editable view inside a
//! host page, and writes section edits back into the document's canonical
//! string.
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - **renderer**: HTML parsing, stylesheet rewriting and document ingestion
//! - **ui**: Host page, event delegation, interaction controls and speech
//! - **editor**: Section editing and reinjection into the canonical string
//! - **share**: Share links and the shareable flag
//! - **network**: Persistence gateways (HTTP and in-memory)
//! - **engine**: The `Viewer` tying the components to one mount
//! - **config**: Renderer and gateway configuration
//! - **utils**: Shared utilities and error types

pub mod config;
pub mod editor;
pub mod engine;
pub mod network;
pub mod renderer;
pub mod share;
pub mod ui;
pub mod utils;

// Re-export main types for convenience
pub use config::{EditMode, GatewayConfig, RendererConfig};
pub use engine::{Document, LoadOutcome, Viewer};
pub use utils::error::{ApostilaError, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "Apostila";
