//! In-place section editing
//!
//! A session exposes one section's fragment as editable text. Committing
//! writes the new content into the canonical string (see [`patch`]),
//! persists it and only then touches the live tree, so a refused or failed
//! save leaves both the canonical string and the view as they were.

pub mod patch;
pub mod text;

pub use patch::{Patch, PatchTier, patch_canonical};
pub use text::{MarkupSpan, SpanKind, extract_plain_text, markup_spans, plain_text_to_markup};

use crate::config::EditMode;
use crate::engine::Document;
use crate::network::{DocumentUpdate, PersistenceGateway};
use crate::renderer::html::{HtmlParser, inner_html};
use crate::renderer::section::editable_fragment;
use crate::utils::{ApostilaError, InFlight, Result};
use markup5ever_rcdom::Handle;
use std::cell::{Cell, RefCell};

/// An open edit of one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    session_id: u64,
    section_key: String,
    mode: EditMode,
    original_fragment_text: String,
    working_text: String,
    dirty: bool,
}

impl EditSession {
    pub fn section_key(&self) -> &str {
        &self.section_key
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Text of the fragment when the session was opened
    pub fn original_text(&self) -> &str {
        &self.original_fragment_text
    }

    pub fn working_text(&self) -> &str {
        &self.working_text
    }

    /// Replace the working text
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.working_text = text.into();
        self.dirty = self.working_text != self.original_fragment_text;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Working text split for display; tag syntax is only marked in raw-markup mode
    pub fn spans(&self) -> Vec<MarkupSpan> {
        match self.mode {
            EditMode::RawMarkup => markup_spans(&self.working_text),
            EditMode::PlainText => vec![MarkupSpan {
                kind: SpanKind::Text,
                text: self.working_text.clone(),
            }],
        }
    }
}

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEdit {
    /// The document with its new canonical string
    pub document: Document,
    pub tier: PatchTier,
}

#[derive(Debug)]
struct ActiveEdit {
    session_id: u64,
    section_key: String,
}

/// Opens, commits and cancels section edits, one at a time
pub struct SectionEditor {
    parser: HtmlParser,
    mode: EditMode,
    active: RefCell<Option<ActiveEdit>>,
    next_id: Cell<u64>,
    saving: Cell<bool>,
}

impl SectionEditor {
    pub fn new(parser: HtmlParser, mode: EditMode) -> Self {
        Self {
            parser,
            mode,
            active: RefCell::new(None),
            next_id: Cell::new(1),
            saving: Cell::new(false),
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Key of the section being edited
    pub fn active_section(&self) -> Option<String> {
        self.active.borrow().as_ref().map(|a| a.section_key.clone())
    }

    /// Whether a save is outstanding
    pub fn is_saving(&self) -> bool {
        self.saving.get()
    }

    /// Open an edit of section `key` of the mounted tree
    pub fn open_editor(&self, container: &Handle, key: &str) -> Result<EditSession> {
        if let Some(active) = self.active.borrow().as_ref() {
            log::debug!("edit of {} already open", active.section_key);
            return Err(ApostilaError::ConcurrencyGuard("edit session already open"));
        }
        let fragment = editable_fragment(container, key)
            .ok_or_else(|| ApostilaError::SectionNotFound(key.to_string()))?;

        let text = match self.mode {
            EditMode::PlainText => extract_plain_text(&fragment),
            EditMode::RawMarkup => inner_html(&fragment)?,
        };

        let session_id = self.next_id.get();
        self.next_id.set(session_id + 1);
        *self.active.borrow_mut() = Some(ActiveEdit {
            session_id,
            section_key: key.to_string(),
        });
        log::info!("editing section {} ({:?})", key, self.mode);

        Ok(EditSession {
            session_id,
            section_key: key.to_string(),
            mode: self.mode,
            original_fragment_text: text.clone(),
            working_text: text,
            dirty: false,
        })
    }

    /// Drop a session without saving
    pub fn cancel_edit(&self, session: EditSession) {
        if self.is_current(&session) {
            self.active.borrow_mut().take();
            log::info!("edit of section {} cancelled", session.section_key);
        } else {
            log::debug!("cancel of stale session for {}", session.section_key);
        }
    }

    /// Forget the open session when its tree goes away
    pub fn abandon(&self) {
        if let Some(active) = self.active.borrow_mut().take() {
            log::debug!("edit of section {} abandoned", active.section_key);
        }
    }

    /// Write the session's text into `document`, persist it and apply it to
    /// the live `container`.
    ///
    /// Refused with `PermissionDenied` before any change when the document
    /// has no storage identity or the store affects zero rows. A transport
    /// failure keeps the session open so the save can be retried.
    pub async fn commit_edit(
        &self,
        session: &EditSession,
        document: &Document,
        gateway: &dyn PersistenceGateway,
        container: &Handle,
    ) -> Result<CommittedEdit> {
        if !self.is_current(session) {
            return Err(ApostilaError::NoActiveEdit(session.section_key.clone()));
        }
        let Some(id) = document.id() else {
            return Err(ApostilaError::PermissionDenied(
                "document has no storage identity".to_string(),
            ));
        };
        let Some(_saving) = InFlight::acquire(&self.saving) else {
            return Err(ApostilaError::ConcurrencyGuard("save"));
        };

        if !session.dirty {
            self.active.borrow_mut().take();
            log::info!("edit of section {} closed without changes", session.section_key);
            return Ok(CommittedEdit {
                document: document.clone(),
                tier: PatchTier::Unchanged,
            });
        }

        let new_inner = match session.mode {
            EditMode::PlainText => plain_text_to_markup(&session.working_text)?,
            EditMode::RawMarkup => session.working_text.clone(),
        };
        let patch = patch_canonical(&self.parser, document.raw_html(), &session.section_key, &new_inner)?;
        if patch.tier == PatchTier::Unchanged {
            self.active.borrow_mut().take();
            return Ok(CommittedEdit {
                document: document.clone(),
                tier: PatchTier::Unchanged,
            });
        }

        let affected = gateway
            .update(id, DocumentUpdate::content(patch.canonical.clone()))
            .await?;
        if affected == 0 {
            log::warn!("save of {} affected no rows", id);
            return Err(ApostilaError::PermissionDenied(format!(
                "update of document {id} affected no rows"
            )));
        }

        if self.is_current(session) {
            if let Some(fragment) = editable_fragment(container, &session.section_key) {
                self.parser.set_inner_html(&fragment, &new_inner);
            }
            self.active.borrow_mut().take();
        } else {
            log::debug!("tree of {} replaced while saving, live view left alone", session.section_key);
        }
        log::info!(
            "section {} saved to {} via {:?}",
            session.section_key,
            id,
            patch.tier
        );

        Ok(CommittedEdit {
            document: document.with_raw_html(patch.canonical),
            tier: patch.tier,
        })
    }

    fn is_current(&self, session: &EditSession) -> bool {
        self.active
            .borrow()
            .as_ref()
            .is_some_and(|a| a.session_id == session.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{DocumentId, MemoryGateway, StoredDocument};
    use crate::renderer::dom::{NodeExt, create_element};
    use crate::renderer::html::find_body;
    use pretty_assertions::assert_eq;

    const RAW: &str = r#"<html><head></head><body><section id="intro"><h2 role="button">Intro</h2><div class="controls"></div><div class="content"><p>Hello</p></div></section><section id="exercises"><h2 role="button">Exercises</h2><div class="controls"></div><div class="content"><p>Do this<br>and that</p></div></section></body></html>"#;

    fn mounted(raw: &str) -> Handle {
        let parser = HtmlParser::new();
        let dom = parser.parse(raw);
        let container = create_element("div", &[]);
        find_body(&dom.document).unwrap().move_children_to(&container);
        container
    }

    fn owned(gateway: &MemoryGateway) -> Document {
        gateway.insert("doc", RAW, false);
        Document::owned(
            DocumentId::new("doc"),
            StoredDocument {
                content: RAW.to_string(),
                shareable: false,
            },
        )
    }

    #[test]
    fn test_open_plain_and_raw() {
        let container = mounted(RAW);
        let plain = SectionEditor::new(HtmlParser::new(), EditMode::PlainText);
        let session = plain.open_editor(&container, "exercises").unwrap();
        assert_eq!(session.working_text(), "Do this\nand that");
        assert!(!session.is_dirty());

        let raw = SectionEditor::new(HtmlParser::new(), EditMode::RawMarkup);
        let session = raw.open_editor(&container, "exercises").unwrap();
        assert_eq!(session.working_text(), "<p>Do this<br>and that</p>");
        assert_eq!(session.spans()[0].kind, SpanKind::Tag);
    }

    #[test]
    fn test_single_session_and_missing_section() {
        let container = mounted(RAW);
        let editor = SectionEditor::new(HtmlParser::new(), EditMode::PlainText);
        assert!(matches!(
            editor.open_editor(&container, "nope"),
            Err(ApostilaError::SectionNotFound(_))
        ));
        assert_eq!(editor.active_section(), None);

        let session = editor.open_editor(&container, "intro").unwrap();
        assert!(matches!(
            editor.open_editor(&container, "exercises"),
            Err(ApostilaError::ConcurrencyGuard(_))
        ));
        editor.cancel_edit(session);
        assert!(editor.open_editor(&container, "exercises").is_ok());
    }

    #[test]
    fn test_set_text_tracks_dirty() {
        let container = mounted(RAW);
        let editor = SectionEditor::new(HtmlParser::new(), EditMode::PlainText);
        let mut session = editor.open_editor(&container, "intro").unwrap();
        session.set_text("Changed");
        assert!(session.is_dirty());
        session.set_text("Hello");
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_commit_updates_store_and_live_tree() {
        let gateway = MemoryGateway::new();
        let document = owned(&gateway);
        let container = mounted(RAW);
        let editor = SectionEditor::new(HtmlParser::new(), EditMode::PlainText);

        let mut session = editor.open_editor(&container, "exercises").unwrap();
        session.set_text("New content");
        let committed = editor.commit_edit(&session, &document, &gateway, &container).await.unwrap();

        assert_eq!(committed.tier, PatchTier::Targeted);
        assert_eq!(
            committed.document.raw_html(),
            RAW.replace("<p>Do this<br>and that</p>", "<p>New content</p>")
        );
        assert_eq!(
            gateway.stored(&DocumentId::new("doc")).unwrap().content,
            committed.document.raw_html()
        );
        let content = editable_fragment(&container, "exercises").unwrap();
        assert_eq!(inner_html(&content).unwrap(), "<p>New content</p>");
        assert_eq!(editor.active_section(), None);
        assert!(matches!(
            editor.commit_edit(&session, &document, &gateway, &container).await,
            Err(ApostilaError::NoActiveEdit(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_without_identity_is_denied() {
        let gateway = MemoryGateway::new();
        let document = Document::by_value(RAW);
        let container = mounted(RAW);
        let editor = SectionEditor::new(HtmlParser::new(), EditMode::PlainText);

        let mut session = editor.open_editor(&container, "intro").unwrap();
        session.set_text("Mine now");
        let err = editor.commit_edit(&session, &document, &gateway, &container).await.unwrap_err();
        assert!(matches!(err, ApostilaError::PermissionDenied(_)));
        assert_eq!(gateway.update_calls(), 0);
        assert_eq!(inner_html(&editable_fragment(&container, "intro").unwrap()).unwrap(), "<p>Hello</p>");
        assert_eq!(editor.active_section().as_deref(), Some("intro"));
    }

    #[tokio::test]
    async fn test_zero_rows_and_transport_errors_keep_everything() {
        let gateway = MemoryGateway::new();
        let document = owned(&gateway);
        let container = mounted(RAW);
        let editor = SectionEditor::new(HtmlParser::new(), EditMode::PlainText);
        let mut session = editor.open_editor(&container, "intro").unwrap();
        session.set_text("Other");

        gateway.set_read_only("doc");
        let err = editor.commit_edit(&session, &document, &gateway, &container).await.unwrap_err();
        assert!(matches!(err, ApostilaError::PermissionDenied(_)));

        gateway.fail_updates(true);
        let err = editor.commit_edit(&session, &document, &gateway, &container).await.unwrap_err();
        assert!(err.is_retryable());

        assert_eq!(gateway.stored(&DocumentId::new("doc")).unwrap().content, RAW);
        assert_eq!(inner_html(&editable_fragment(&container, "intro").unwrap()).unwrap(), "<p>Hello</p>");
        assert!(!editor.is_saving());
        assert_eq!(editor.active_section().as_deref(), Some("intro"));
    }

    #[tokio::test]
    async fn test_clean_session_commits_nothing() {
        let gateway = MemoryGateway::new();
        let document = owned(&gateway);
        let container = mounted(RAW);
        let editor = SectionEditor::new(HtmlParser::new(), EditMode::PlainText);
        let session = editor.open_editor(&container, "intro").unwrap();
        let committed = editor.commit_edit(&session, &document, &gateway, &container).await.unwrap();
        assert_eq!(committed.tier, PatchTier::Unchanged);
        assert_eq!(committed.document, document);
        assert_eq!(gateway.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_double_submit_is_guarded() {
        let gateway = MemoryGateway::new();
        let document = owned(&gateway);
        let container = mounted(RAW);
        let editor = SectionEditor::new(HtmlParser::new(), EditMode::PlainText);
        let mut session = editor.open_editor(&container, "intro").unwrap();
        session.set_text("Once");

        let (first, second) = tokio::join!(
            editor.commit_edit(&session, &document, &gateway, &container),
            editor.commit_edit(&session, &document, &gateway, &container)
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(ApostilaError::ConcurrencyGuard(_))));
        assert_eq!(gateway.update_calls(), 1);
    }
}
