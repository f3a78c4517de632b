//! Renderer and gateway configuration
//!
//! Every field has a default, so an empty JSON object is a valid config file.

use crate::utils::{ApostilaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// How the section editor exposes a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditMode {
    /// Rendered text with paragraph and line-break structure
    #[default]
    PlainText,
    /// Serialized inner markup, edited verbatim
    RawMarkup,
}

/// Renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Marker attribute placed on the mount container
    pub container_attribute: String,
    /// Class toggled on the container for the alternate theme
    pub theme_class: String,
    /// Class of the cover image whose rule is overridden
    pub cover_class: String,
    /// Prefix of installed document style ids
    pub style_id_prefix: String,
    /// Id of the runtime stylesheet installed by the controller
    pub runtime_style_id: String,
    /// Font scale step for A+ / A-
    pub font_step: f32,
    /// Custom property holding the font scale
    pub font_property: String,
    /// Unit written after the font scale
    pub font_unit: String,
    /// Locale passed to speech synthesis
    pub speech_locale: String,
    /// Origin used to build share links
    pub origin: String,
    /// Path segment between origin and document id in share links
    pub share_path: String,
    /// Section editor mode
    pub edit_mode: EditMode,
    /// Text shown when a document has no content
    pub empty_message: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            container_attribute: "data-apostila-container".to_string(),
            theme_class: "dark".to_string(),
            cover_class: "capa".to_string(),
            style_id_prefix: "apostila-style-".to_string(),
            runtime_style_id: "apostila-runtime-styles".to_string(),
            font_step: 0.1,
            font_property: "--font-size".to_string(),
            font_unit: "rem".to_string(),
            speech_locale: "pt-BR".to_string(),
            origin: "http://localhost:5173".to_string(),
            share_path: "/apostila/".to_string(),
            edit_mode: EditMode::PlainText,
            empty_message: "No study guide content provided.".to_string(),
        }
    }
}

impl RendererConfig {
    /// Parse a JSON config and validate it
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ApostilaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check values the renderer cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.font_step.is_finite() && self.font_step > 0.0) {
            return Err(ApostilaError::Config(format!(
                "font_step must be positive, got {}",
                self.font_step
            )));
        }
        if self.container_attribute.trim().is_empty() || self.theme_class.trim().is_empty() {
            return Err(ApostilaError::Config(
                "container_attribute and theme_class must not be empty".to_string(),
            ));
        }
        self.share_origin().map(|_| ())
    }

    /// Attribute selector matching the mount container
    pub fn container_selector(&self) -> String {
        format!("[{}]", self.container_attribute)
    }

    /// ASCII serialization of the configured origin, without trailing slash
    pub fn share_origin(&self) -> Result<String> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ApostilaError::Config(format!("origin {:?}: {}", self.origin, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url.origin().ascii_serialization()),
            other => Err(ApostilaError::Config(format!(
                "origin must be http or https, got {other}"
            ))),
        }
    }
}

/// Configuration of the HTTP persistence gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// API base, e.g. `https://api.example.com/`
    pub base_url: String,
    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
}
