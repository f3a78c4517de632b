//! Conversions between a fragment and its editable text

use crate::renderer::dom::{NodeExt, create_element, create_text};
use crate::renderer::html::inner_html;
use crate::utils::Result;
use markup5ever_rcdom::{Handle, NodeData};

/// Elements whose boundaries become blank lines
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "summary", "table", "tr", "ul",
];

/// Elements whose text is never shown
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template", "noscript"];

/// Rendered text of a fragment with paragraph structure kept.
///
/// Block boundaries become blank lines and `<br>` becomes a newline; all
/// other markup is dropped. Whitespace runs collapse to one space, lines are
/// trimmed and at most one blank line separates paragraphs.
pub fn extract_plain_text(fragment: &Handle) -> String {
    let mut raw = String::new();
    for child in fragment.children.borrow().iter() {
        walk(child, &mut raw);
    }
    normalize_lines(&raw)
}

fn walk(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => push_collapsed(&contents.borrow(), out),
        NodeData::Element { name, .. } => {
            let tag = name.local.as_ref();
            if HIDDEN_ELEMENTS.contains(&tag) {
                return;
            }
            if tag == "br" {
                out.push('\n');
                return;
            }
            let block = BLOCK_ELEMENTS.contains(&tag);
            if block {
                out.push_str("\n\n");
            }
            for child in node.children.borrow().iter() {
                walk(child, out);
            }
            if block {
                out.push_str("\n\n");
            }
        }
        _ => {}
    }
}

fn push_collapsed(text: &str, out: &mut String) {
    let mut in_space = out.ends_with(' ');
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
}

fn normalize_lines(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in raw.split('\n').map(str::trim) {
        if line.is_empty() && lines.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Minimal markup for plain text: blank-line separated runs become
/// paragraphs, single newlines inside a run become `<br>`.
pub fn plain_text_to_markup(text: &str) -> Result<String> {
    let wrapper = create_element("div", &[]);
    let normalized = text.replace("\r\n", "\n");

    let mut paragraph: Vec<&str> = Vec::new();
    for line in normalized.split('\n').map(str::trim) {
        if line.is_empty() {
            flush_paragraph(&wrapper, &mut paragraph);
        } else {
            paragraph.push(line);
        }
    }
    flush_paragraph(&wrapper, &mut paragraph);

    inner_html(&wrapper)
}

fn flush_paragraph(wrapper: &Handle, lines: &mut Vec<&str>) {
    if lines.is_empty() {
        return;
    }
    let p = create_element("p", &[]);
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            p.append_child(create_element("br", &[]));
        }
        p.append_child(create_text(line));
    }
    wrapper.append_child(p);
    lines.clear();
}

/// Kind of a span of raw markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Tag syntax, shown de-emphasised
    Tag,
    /// Content
    Text,
}

/// One span of raw markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupSpan {
    pub kind: SpanKind,
    pub text: String,
}

/// Split raw markup into tag and text spans.
///
/// A tag opens at `<` followed by a letter, `/` or `!`; any other `<` and
/// an unterminated one are text. Concatenating the spans yields the input.
pub fn markup_spans(markup: &str) -> Vec<MarkupSpan> {
    let mut spans = Vec::new();
    let mut rest = markup;
    while !rest.is_empty() {
        let tag = tag_start(rest)
            .and_then(|start| rest[start..].find('>').map(|len| (start, start + len + 1)));
        match tag {
            Some((start, end)) => {
                if start > 0 {
                    push_span(&mut spans, SpanKind::Text, &rest[..start]);
                }
                push_span(&mut spans, SpanKind::Tag, &rest[start..end]);
                rest = &rest[end..];
            }
            None => {
                push_span(&mut spans, SpanKind::Text, rest);
                break;
            }
        }
    }
    spans
}

fn tag_start(text: &str) -> Option<usize> {
    text.match_indices('<').map(|(i, _)| i).find(|&i| {
        text[i + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
    })
}

fn push_span(spans: &mut Vec<MarkupSpan>, kind: SpanKind, text: &str) {
    if let Some(last) = spans.last_mut().filter(|s| s.kind == kind && kind == SpanKind::Text) {
        last.text.push_str(text);
        return;
    }
    spans.push(MarkupSpan {
        kind,
        text: text.to_string(),
    });
}
