//! Stylesheet rewriting and inline style handling
//!
//! `StyleRewriter` is a text transform over rule preludes, not a CSS parser:
//! whatever it cannot match is copied through unchanged. Inline `style`
//! attributes are tokenized with cssparser so single declarations can be
//! read and replaced.

use crate::config::RendererConfig;
use crate::utils::{ApostilaError, Result};
use cssparser::{Delimiter, ParseError, Parser, ParserInput, Token};
use regex::Regex;

/// Declarations forced onto the cover image rule
const COVER_OVERRIDE: &str = "width: 100% !important; max-width: 100% !important; \
min-width: 100% !important; height: 25vh !important; max-height: 25vh !important; \
margin: 0 !important; display: block !important; object-fit: cover !important;";

/// Selectors that address the page root
const ROOT_SELECTORS: [&str; 3] = ["body", "html", ":root"];

/// Rewrites generated stylesheets so they apply inside a mount container
pub struct StyleRewriter {
    /// Text between the previous `{`, `}` or `;` and the next `{`
    prelude: Regex,
    container_selector: String,
    theme_class: String,
    cover_suffix: String,
}

impl StyleRewriter {
    /// Create a rewriter for the configured container and classes
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let prelude = Regex::new(r"([^{};]*)\{").map_err(|e| ApostilaError::Config(e.to_string()))?;
        Ok(Self {
            prelude,
            container_selector: config.container_selector(),
            theme_class: format!(".{}", config.theme_class),
            cover_suffix: format!(".{}", config.cover_class),
        })
    }

    /// Rewrite one stylesheet.
    ///
    /// - a root selector (`body`, `html`, `:root`) gains the container selector
    /// - a selector starting with the theme class gains a variant where the
    ///   class sits on the container
    /// - rules whose selector ends with the cover class get fixed declarations
    pub fn rewrite(&self, css: &str) -> String {
        let mut out = String::with_capacity(css.len() + 128);
        let mut copied = 0;
        let mut search_from = 0;

        while let Some(caps) = self.prelude.captures_at(css, search_from) {
            let (Some(whole), Some(prelude)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let block_start = whole.end();

            if prelude.as_str().trim_end().ends_with(&self.cover_suffix) {
                if let Some(close) = css[block_start..].find('}') {
                    out.push_str(&css[copied..block_start]);
                    out.push(' ');
                    out.push_str(COVER_OVERRIDE);
                    out.push_str(" }");
                    copied = block_start + close + 1;
                    search_from = copied;
                    continue;
                }
            }

            if let Some(rewritten) = self.rewrite_prelude(prelude.as_str()) {
                out.push_str(&css[copied..prelude.start()]);
                out.push_str(&rewritten);
                out.push('{');
                copied = block_start;
            }
            search_from = block_start;
        }

        out.push_str(&css[copied..]);
        out
    }

    /// Rewrite a selector list, or `None` if no selector in it changes
    fn rewrite_prelude(&self, prelude: &str) -> Option<String> {
        let (comments, selectors) = split_leading_comments(prelude);
        let mut changed = false;
        let parts: Vec<String> = selectors
            .split(',')
            .map(|part| {
                let (lead, rest) = split_leading_comments(part);
                let core = rest.trim_end();
                let trail = &rest[core.len()..];
                match self.selector_variant(core) {
                    Some(variant) => {
                        changed = true;
                        format!("{lead}{core}, {variant}{trail}")
                    }
                    None => part.to_string(),
                }
            })
            .collect();
        changed.then(|| format!("{comments}{}", parts.join(",")))
    }

    fn selector_variant(&self, selector: &str) -> Option<String> {
        if ROOT_SELECTORS.contains(&selector) {
            return Some(self.container_selector.clone());
        }
        let rest = selector.strip_prefix(&self.theme_class)?;
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            Some(format!("{}{}{}", self.container_selector, self.theme_class, rest))
        } else {
            None
        }
    }
}

/// Split off leading whitespace and complete `/* ... */` comments
fn split_leading_comments(text: &str) -> (&str, &str) {
    let mut offset = text.len() - text.trim_start().len();
    while text[offset..].starts_with("/*") {
        let Some(end) = text[offset + 2..].find("*/") else {
            break;
        };
        offset += end + 4;
        offset += text[offset..].len() - text[offset..].trim_start().len();
    }
    text.split_at(offset)
}

/// Ordered declarations of an inline `style` attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    /// Parse a `style` attribute value, skipping malformed declarations
    pub fn parse(text: &str) -> Self {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let mut declarations = Vec::new();

        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }
            match parser.try_parse(Self::parse_declaration) {
                Ok(decl) => declarations.push(decl),
                Err(_) => Self::skip_to_semicolon(&mut parser),
            }
        }

        Self { declarations }
    }

    fn parse_declaration<'i>(
        parser: &mut Parser<'i, '_>,
    ) -> std::result::Result<(String, String), ParseError<'i, ()>> {
        let name = parser.expect_ident()?.to_string();
        parser.expect_colon()?;
        let start = parser.position();
        parser.parse_until_before(Delimiter::Semicolon, |p| {
            while p.next().is_ok() {}
            Ok::<(), ParseError<'i, ()>>(())
        })?;
        let value = parser.slice_from(start).trim().to_string();
        let _ = parser.try_parse(|p| p.expect_semicolon());

        // Custom property names are case-sensitive
        let name = if name.starts_with("--") {
            name
        } else {
            name.to_ascii_lowercase()
        };
        Ok((name, value))
    }

    fn skip_to_semicolon(parser: &mut Parser<'_, '_>) {
        loop {
            match parser.next() {
                Ok(Token::Semicolon) | Err(_) => break,
                _ => continue,
            }
        }
    }

    /// Value of a property
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    /// Set a property, keeping its position if already declared
    pub fn set(&mut self, property: &str, value: &str) {
        match self.declarations.iter_mut().find(|(name, _)| name == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self
                .declarations
                .push((property.to_string(), value.to_string())),
        }
    }

    /// Number of declarations
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether there are no declarations
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialize back to attribute text
    pub fn to_css_string(&self) -> String {
        self.declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Leading number of a length such as `1.1rem`, if any
pub fn parse_scale(value: &str) -> Option<f32> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    match parser.next().ok()? {
        Token::Number { value, .. } | Token::Dimension { value, .. } => Some(*value),
        _ => None,
    }
}
