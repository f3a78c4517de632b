//! Section schema of generated study guides
//!
//! ```text
//! <section id="KEY">
//!   <h2 role="button" aria-expanded="true">Title</h2>   heading
//!   <div class="controls">                              control cluster
//!     <button class="ouvir" data-section="KEY">...</button>
//!   </div>
//!   <div class="content">...</div>                      content block
//! </section>
//! ```
//!
//! The content block is always the second element sibling after the heading.
//! Nothing here panics when a document breaks the schema; lookups just
//! return `None`.

use super::dom::{ElementMatcher, NodeExt};
use markup5ever_rcdom::Handle;

/// Headings that collapse and expand their section
pub const TOGGLE_HEADING: ElementMatcher = ElementMatcher::TagAttr {
    tag: "h2",
    attr: "role",
    value: "button",
};

/// Attribute holding a heading's expanded state
pub const EXPANDED_ATTR: &str = "aria-expanded";

/// Attribute on a listen control naming its section
pub const SECTION_REF_ATTR: &str = "data-section";

/// Content block governed by a toggle heading: heading, controls, content
pub fn content_block(heading: &Handle) -> Option<Handle> {
    heading.next_element_sibling()?.next_element_sibling()
}

/// Whether a heading is currently expanded
pub fn is_expanded(heading: &Handle) -> bool {
    heading.get_attribute(EXPANDED_ATTR).as_deref() == Some("true")
}

/// First toggle heading among the direct children of a section element
pub fn section_heading(section: &Handle) -> Option<Handle> {
    section
        .element_children()
        .into_iter()
        .find(|child| TOGGLE_HEADING.matches(child))
}

/// Element identified by a section key
pub fn find_section(root: &Handle, key: &str) -> Option<Handle> {
    root.find_element_by_id(key)
}

/// The editable fragment of a section.
///
/// A section laid out per the schema edits its content block; an element
/// without a toggle heading is edited as a whole.
pub fn editable_fragment(root: &Handle, key: &str) -> Option<Handle> {
    let section = find_section(root, key)?;
    match section_heading(&section).and_then(|h| content_block(&h)) {
        Some(content) => Some(content),
        None => Some(section),
    }
}

/// Keys of every section that carries a toggle heading, in document order
pub fn section_keys(root: &Handle) -> Vec<String> {
    root.descendant_elements()
        .into_iter()
        .filter(|el| section_heading(el).is_some())
        .filter_map(|el| el.id())
        .collect()
}

/// A toggle heading whose content block cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Key of the enclosing section, if it has one
    pub section: Option<String>,
    /// Heading text, trimmed
    pub heading: String,
}

/// Toggle headings that break the heading/controls/content layout
pub fn schema_violations(root: &Handle) -> Vec<SchemaViolation> {
    root.descendant_elements()
        .into_iter()
        .filter(|el| TOGGLE_HEADING.matches(el))
        .filter(|heading| content_block(heading).is_none())
        .map(|heading| SchemaViolation {
            section: heading.parent_node().and_then(|p| p.id()),
            heading: heading.text_content().trim().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::dom::create_element;
    use crate::renderer::html::{HtmlParser, find_body};

    const DOC: &str = r#"
        <section id="intro">
          <h2 role="button" aria-expanded="true">Intro</h2>
          <div class="controls"><button class="ouvir" data-section="intro">Ouvir</button></div>
          <div class="content"><p>Hello</p></div>
        </section>
        <section id="broken"><h2 role="button">Broken</h2><p>only one sibling</p></section>
        <div id="plain"><p>No heading</p></div>
    "#;

    /// Body content moved out of the parsed document, which strips its
    /// subtree when dropped
    fn body() -> Handle {
        let dom = HtmlParser::new().parse(DOC);
        let container = create_element("div", &[]);
        find_body(&dom.document).unwrap().move_children_to(&container);
        container
    }

    #[test]
    fn test_content_block_is_third_sibling() {
        let body = body();
        let section = find_section(&body, "intro").unwrap();
        let heading = section_heading(&section).unwrap();
        assert!(is_expanded(&heading));
        assert!(content_block(&heading).unwrap().has_class("content"));
    }

    #[test]
    fn test_editable_fragment() {
        let body = body();
        assert!(editable_fragment(&body, "intro").unwrap().has_class("content"));
        assert_eq!(editable_fragment(&body, "plain").unwrap().id(), Some("plain".into()));
        assert_eq!(editable_fragment(&body, "broken").unwrap().id(), Some("broken".into()));
        assert!(editable_fragment(&body, "missing").is_none());
    }

    #[test]
    fn test_body_outlives_parsed_document() {
        let body = body();
        assert_eq!(body.element_children().len(), 3);
        assert!(body.text_content().contains("Hello"));
    }

    #[test]
    fn test_section_keys_and_violations() {
        let body = body();
        assert_eq!(section_keys(&body), vec!["intro", "broken"]);
        assert_eq!(
            schema_violations(&body),
            vec![SchemaViolation {
                section: Some("broken".into()),
                heading: "Broken".into(),
            }]
        );
    }
}
