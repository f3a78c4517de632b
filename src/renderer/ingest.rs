//! Document ingestion: raw HTML string to mounted container

use super::css::{InlineStyle, StyleRewriter};
use super::dom::{NodeExt, create_element, create_text};
use super::html::{HtmlParser, find_body};
use super::section::{SchemaViolation, schema_violations, section_keys};
use super::styles::StyleRegistry;
use crate::config::RendererConfig;
use crate::utils::Result;
use markup5ever_rcdom::{Handle, NodeData};
use std::rc::Rc;

/// Inline style given to the theme button so it renders the same in any host
const THEME_BUTTON_STYLE: [(&str, &str); 9] = [
    ("display", "inline-flex"),
    ("align-items", "center"),
    ("gap", "0.25rem"),
    ("background", "#e5e7eb"),
    ("color", "#111827"),
    ("border", "1px solid #d1d5db"),
    ("padding", "0.25rem 0.5rem"),
    ("border-radius", "6px"),
    ("cursor", "pointer"),
];

/// Class of the placeholder shown for empty documents
pub const EMPTY_STATE_CLASS: &str = "apostila-empty";

/// What the container shows after ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    /// Body content is mounted
    Ready,
    /// Nothing usable; the "no content" placeholder is mounted
    Empty,
}

/// Result of one ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub state: MountState,
    /// Style ids installed by this ingestion
    pub installed_styles: Vec<String>,
    /// Style ids already present and skipped
    pub skipped_styles: Vec<String>,
    /// Keys of sections with a toggle heading
    pub sections: Vec<String>,
    pub schema_violations: Vec<SchemaViolation>,
    /// Whether the document has a cover image
    pub has_cover: bool,
}

impl IngestReport {
    fn empty() -> Self {
        Self {
            state: MountState::Empty,
            installed_styles: Vec::new(),
            skipped_styles: Vec::new(),
            sections: Vec::new(),
            schema_violations: Vec::new(),
            has_cover: false,
        }
    }
}

/// Parses documents, installs their styles and mounts their body
pub struct DocumentIngestor {
    parser: HtmlParser,
    rewriter: StyleRewriter,
    config: Rc<RendererConfig>,
}

impl DocumentIngestor {
    /// Create an ingestor for the given configuration
    pub fn new(config: Rc<RendererConfig>) -> Result<Self> {
        Ok(Self {
            parser: HtmlParser::new(),
            rewriter: StyleRewriter::new(&config)?,
            config,
        })
    }

    /// Parser shared with the section editor
    pub fn parser(&self) -> &HtmlParser {
        &self.parser
    }

    /// Mount `raw_html` into `container`.
    ///
    /// Replaces whatever the container held, installs each stylesheet of the
    /// document once per position id, and resets the per-mount viewer state
    /// (theme class, font scale). Never fails; empty input mounts a
    /// placeholder.
    pub fn ingest(&self, raw_html: &str, container: &Handle, styles: &mut StyleRegistry) -> IngestReport {
        self.prepare_container(container);

        if raw_html.trim().is_empty() {
            log::info!("empty document, mounting placeholder");
            self.mount_empty(container);
            return IngestReport::empty();
        }

        let dom = self.parser.parse(raw_html);
        let mut report = IngestReport::empty();

        let style_elements: Vec<Handle> = dom
            .document
            .descendant_elements()
            .into_iter()
            .filter(|el| el.is_tag("style"))
            .collect();
        for (index, style) in style_elements.iter().enumerate() {
            let id = format!("{}{}", self.config.style_id_prefix, index);
            if styles.is_installed(&id) {
                report.skipped_styles.push(id);
                continue;
            }
            let css = self.rewriter.rewrite(&style.text_content());
            styles.install(id.clone(), css);
            report.installed_styles.push(id);
        }

        let Some(body) = find_body(&dom.document).filter(has_content) else {
            log::warn!("document has no body content, mounting placeholder");
            self.mount_empty(container);
            return report;
        };
        body.move_children_to(container);

        self.normalize_theme_button(container);

        report.state = MountState::Ready;
        report.sections = section_keys(container);
        report.schema_violations = schema_violations(container);
        report.has_cover = container
            .descendant_elements()
            .iter()
            .any(|el| el.has_class(&self.config.cover_class));

        for violation in &report.schema_violations {
            log::warn!(
                "toggle heading {:?} in section {:?} has no content block",
                violation.heading,
                violation.section
            );
        }
        log::info!(
            "mounted document: {} sections, {} styles installed, {} skipped",
            report.sections.len(),
            report.installed_styles.len(),
            report.skipped_styles.len()
        );
        report
    }

    /// Clear the container and reset the marker, theme and font scale
    fn prepare_container(&self, container: &Handle) {
        container.clear_children();
        container.set_attribute(&self.config.container_attribute, "true");
        container.remove_class(&self.config.theme_class);

        let mut style = container
            .get_attribute("style")
            .map(|s| InlineStyle::parse(&s))
            .unwrap_or_default();
        style.set(&self.config.font_property, &format!("1{}", self.config.font_unit));
        if style.get("position").is_none() {
            style.set("position", "relative");
        }
        container.set_attribute("style", &style.to_css_string());
    }

    fn mount_empty(&self, container: &Handle) {
        let placeholder = create_element("div", &[("class", EMPTY_STATE_CLASS)]);
        placeholder.append_child(create_text(&self.config.empty_message));
        container.append_child(placeholder);
    }

    fn normalize_theme_button(&self, container: &Handle) {
        let Some(button) = container.find_element_by_id("toggle-theme") else {
            return;
        };
        let mut style = button
            .get_attribute("style")
            .map(|s| InlineStyle::parse(&s))
            .unwrap_or_default();
        for (property, value) in THEME_BUTTON_STYLE {
            style.set(property, value);
        }
        button.set_attribute("style", &style.to_css_string());
    }
}

/// Whether a body holds anything besides whitespace and comments
fn has_content(body: &Handle) -> bool {
    body.children.borrow().iter().any(|child| match &child.data {
        NodeData::Element { .. } => true,
        NodeData::Text { contents } => !contents.borrow().trim().is_empty(),
        _ => false,
    })
}
