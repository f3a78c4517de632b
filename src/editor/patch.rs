//! Reinjection of an edited fragment into the canonical string
//!
//! Two tiers. The targeted tier splices the new inner markup into the
//! original string in place of the old, which keeps every other byte of the
//! document. It is only taken when the old markup occurs exactly once and
//! the spliced string parses to the same tree as the edited document. All
//! other cases fall back to serializing the whole edited document.

use crate::renderer::html::{HtmlParser, inner_html, serialize_document};
use crate::renderer::section::editable_fragment;
use crate::utils::{ApostilaError, Result};

/// How a new canonical string was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchTier {
    /// Spliced into the original string
    Targeted,
    /// Whole edited document serialized
    FullReserialize,
    /// New content equals the old; canonical string untouched
    Unchanged,
}

/// A new canonical string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub canonical: String,
    pub tier: PatchTier,
}

/// Replace the inner markup of section `key` inside `raw`
pub fn patch_canonical(parser: &HtmlParser, raw: &str, key: &str, new_inner: &str) -> Result<Patch> {
    let dom = parser.parse(raw);
    let fragment = editable_fragment(&dom.document, key)
        .ok_or_else(|| ApostilaError::SectionNotFound(key.to_string()))?;

    let old_inner = inner_html(&fragment)?;
    parser.set_inner_html(&fragment, new_inner);
    let replacement = inner_html(&fragment)?;
    if replacement == old_inner {
        return Ok(Patch {
            canonical: raw.to_string(),
            tier: PatchTier::Unchanged,
        });
    }
    let full = serialize_document(&dom)?;

    if !old_inner.is_empty() && raw.matches(old_inner.as_str()).count() == 1 {
        let candidate = raw.replacen(old_inner.as_str(), &replacement, 1);
        if candidate != raw && serialize_document(&parser.parse(&candidate))? == full {
            log::debug!("section {} patched in place", key);
            return Ok(Patch {
                canonical: candidate,
                tier: PatchTier::Targeted,
            });
        }
    }

    log::debug!("section {} patched by full reserialization", key);
    Ok(Patch {
        canonical: full,
        tier: PatchTier::FullReserialize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::dom::NodeExt;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn section(key: &str, body: &str) -> String {
        format!(
            r#"<section id="{key}"><h2 role="button" aria-expanded="true">{key}</h2><div class="controls"><button class="ouvir" data-section="{key}">Ouvir</button></div><div class="content">{body}</div></section>"#
        )
    }

    fn doc(sections: &[(&str, &str)]) -> String {
        let body: String = sections.iter().map(|(k, b)| section(k, b)).collect();
        format!("<!DOCTYPE html><html><head><style>p {{ margin: 0 }}</style></head><body>{body}</body></html>")
    }

    fn content_of(raw: &str, key: &str) -> String {
        let dom = HtmlParser::new().parse(raw);
        inner_html(&editable_fragment(&dom.document, key).unwrap()).unwrap()
    }

    #[test]
    fn test_unique_content_is_spliced() {
        let raw = doc(&[("intro", "<p>Hello</p>"), ("exercises", "<p>Do this</p>")]);
        let patch = patch_canonical(&HtmlParser::new(), &raw, "exercises", "<p>New content</p>").unwrap();
        assert_eq!(patch.tier, PatchTier::Targeted);
        assert_eq!(patch.canonical, raw.replace("<p>Do this</p>", "<p>New content</p>"));
    }

    #[test]
    fn test_duplicate_content_falls_back() {
        let raw = doc(&[("intro", "<p>Same</p>"), ("exercises", "<p>Same</p>")]);
        let patch = patch_canonical(&HtmlParser::new(), &raw, "exercises", "<p>Other</p>").unwrap();
        assert_eq!(patch.tier, PatchTier::FullReserialize);
        assert_eq!(content_of(&patch.canonical, "intro"), "<p>Same</p>");
        assert_eq!(content_of(&patch.canonical, "exercises"), "<p>Other</p>");
    }

    #[test]
    fn test_non_canonical_source_markup_falls_back() {
        let raw = doc(&[("intro", "<P>Hello<BR/>there</P>")]);
        let patch = patch_canonical(&HtmlParser::new(), &raw, "intro", "<p>Bye</p>").unwrap();
        assert_eq!(patch.tier, PatchTier::FullReserialize);
        assert_eq!(content_of(&patch.canonical, "intro"), "<p>Bye</p>");
    }

    #[test]
    fn test_same_content_is_unchanged() {
        let raw = doc(&[("intro", "<p>Hello</p>")]);
        let patch = patch_canonical(&HtmlParser::new(), &raw, "intro", "<p>Hello</p>").unwrap();
        assert_eq!(patch.tier, PatchTier::Unchanged);
        assert_eq!(patch.canonical, raw);
    }

    #[test]
    fn test_missing_section() {
        let raw = doc(&[("intro", "<p>Hello</p>")]);
        let err = patch_canonical(&HtmlParser::new(), &raw, "nope", "x").unwrap_err();
        assert!(matches!(err, ApostilaError::SectionNotFound(k) if k == "nope"));
    }

    #[test]
    fn test_element_without_heading_is_edited_whole() {
        let raw = "<html><body><div id=\"note\"><p>a</p></div><p>a</p></body></html>";
        let patch = patch_canonical(&HtmlParser::new(), raw, "note", "<p>b</p>").unwrap();
        let dom = HtmlParser::new().parse(&patch.canonical);
        let note = dom.document.find_element_by_id("note").unwrap();
        assert_eq!(inner_html(&note).unwrap(), "<p>b</p>");
        assert!(patch.canonical.contains("</div><p>a</p>"));
    }

    proptest! {
        #[test]
        fn prop_duplicate_content_only_touches_target(
            shared in "[a-z]{1,8}( [a-z]{1,8}){0,3}",
            replacement in "[A-Z]{1,8}",
            copies in 2usize..5,
            target in 0usize..5,
        ) {
            let target = target % copies;
            let keys: Vec<String> = (0..copies).map(|i| format!("s{i}")).collect();
            let body = format!("<p>{shared}</p>");
            let sections: Vec<(&str, &str)> = keys.iter().map(|k| (k.as_str(), body.as_str())).collect();
            let raw = doc(&sections);

            let new_inner = format!("<p>{replacement}</p>");
            let patch = patch_canonical(&HtmlParser::new(), &raw, &keys[target], &new_inner).unwrap();

            prop_assert_eq!(patch.tier, PatchTier::FullReserialize);
            for (i, key) in keys.iter().enumerate() {
                let expected = if i == target { &new_inner } else { &body };
                prop_assert_eq!(&content_of(&patch.canonical, key), expected);
            }
        }
    }
}
