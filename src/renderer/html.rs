//! HTML5 parsing and serialization using html5ever

use super::dom::NodeExt;
use crate::utils::{ApostilaError, Result};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{ParseOpts, parse_document, serialize, serialize::SerializeOpts, serialize::TraversalScope};
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};

/// HTML5 parser using html5ever
#[derive(Clone)]
pub struct HtmlParser {
    opts: ParseOpts,
}

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self {
            opts: ParseOpts {
                tree_builder: TreeBuilderOpts {
                    drop_doctype: false,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    /// Parse a complete document.
    ///
    /// Never fails: html5ever recovers from unclosed tags and stray fragments
    /// the same way browsers do, always producing html/head/body.
    pub fn parse(&self, content: &str) -> RcDom {
        parse_document(RcDom::default(), self.opts.clone()).one(content)
    }

    /// Replace the children of `parent` with the parsed `markup`.
    ///
    /// The markup is parsed in body context so leading `<style>` or `<title>`
    /// elements stay in the fragment instead of moving to a head.
    pub fn set_inner_html(&self, parent: &Handle, markup: &str) {
        let dom = self.parse(&format!("<body>{markup}"));
        parent.clear_children();
        if let Some(body) = find_body(&dom.document) {
            body.move_children_to(parent);
        }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// The `body` element of a parsed document
pub fn find_body(document: &Handle) -> Option<Handle> {
    let html = document.element_children().into_iter().find(|n| n.is_tag("html"))?;
    html.element_children().into_iter().find(|n| n.is_tag("body"))
}

/// The `head` element of a parsed document
pub fn find_head(document: &Handle) -> Option<Handle> {
    let html = document.element_children().into_iter().find(|n| n.is_tag("html"))?;
    html.element_children().into_iter().find(|n| n.is_tag("head"))
}

/// Serialize a whole parsed document, doctype included
pub fn serialize_document(dom: &RcDom) -> Result<String> {
    serialize_handle(&dom.document, TraversalScope::ChildrenOnly(None))
}

/// Serialized children of a node
pub fn inner_html(node: &Handle) -> Result<String> {
    serialize_handle(node, TraversalScope::ChildrenOnly(None))
}

/// Serialized node including its own tag
pub fn outer_html(node: &Handle) -> Result<String> {
    serialize_handle(node, TraversalScope::IncludeNode)
}

fn serialize_handle(node: &Handle, traversal_scope: TraversalScope) -> Result<String> {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    let serializable = SerializableHandle::from(node.clone());
    serialize(&mut output, &serializable, opts)
        .map_err(|e| ApostilaError::ParseFailure(format!("HTML serialization failed: {e}")))?;
    String::from_utf8(output).map_err(|e| ApostilaError::ParseFailure(e.to_string()))
}
