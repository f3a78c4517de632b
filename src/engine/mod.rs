//! Viewer orchestrating the renderer components
//!
//! The `Viewer` owns one mount in a host page and coordinates the pipeline:
//! 1. Fetch the canonical string through the persistence gateway
//! 2. Ingest it into the mount point, installing its styles
//! 3. Attach the interaction controller to the fresh tree
//! 4. Route edits and share requests back to the gateway, remounting on success

mod document;

pub use document::Document;

use crate::config::RendererConfig;
use crate::editor::{EditSession, PatchTier, SectionEditor};
use crate::network::{DocumentId, PersistenceGateway};
use crate::renderer::{DocumentIngestor, IngestReport, NodeExt};
use crate::share::{Clipboard, ShareCoordinator, ShareLink};
use crate::ui::{Event, HostPage, InteractionController, MountPoint, SpeechChannel, ViewerState};
use crate::utils::{ApostilaError, Result};
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

/// Result of a load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The document is mounted
    Mounted(IngestReport),
    /// The view moved on while fetching; the result was dropped
    Stale,
}

#[derive(Default)]
struct MountSlot {
    document: Option<Document>,
    controller: Option<InteractionController>,
    report: Option<IngestReport>,
}

/// One study-guide view inside a host page
pub struct Viewer {
    config: Rc<RendererConfig>,
    host: Rc<HostPage>,
    mount: Rc<MountPoint>,
    gateway: Rc<dyn PersistenceGateway>,
    ingestor: DocumentIngestor,
    speech: SpeechChannel,
    editor: SectionEditor,
    share: ShareCoordinator,
    slot: RefCell<MountSlot>,
    /// Bumped by every mount and unmount
    generation: Cell<u64>,
}

impl Viewer {
    /// Create a viewer mounting into `host`
    pub fn new(
        config: RendererConfig,
        host: Rc<HostPage>,
        gateway: Rc<dyn PersistenceGateway>,
        speech: SpeechChannel,
    ) -> Result<Self> {
        config.validate()?;
        let config = Rc::new(config);
        let ingestor = DocumentIngestor::new(Rc::clone(&config))?;
        let editor = SectionEditor::new(ingestor.parser().clone(), config.edit_mode);
        let share = ShareCoordinator::new(&config)?;
        let mount = Rc::new(MountPoint::new(host.mount_node().clone()));
        Ok(Self {
            config,
            host,
            mount,
            gateway,
            ingestor,
            speech,
            editor,
            share,
            slot: RefCell::new(MountSlot::default()),
            generation: Cell::new(0),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn host(&self) -> &Rc<HostPage> {
        &self.host
    }

    pub fn mount_point(&self) -> &Rc<MountPoint> {
        &self.mount
    }

    pub fn editor(&self) -> &SectionEditor {
        &self.editor
    }

    pub fn share_coordinator(&self) -> &ShareCoordinator {
        &self.share
    }

    /// Mount a document received by value; it cannot be persisted
    pub fn open_by_value(&self, raw_html: impl Into<String>) -> IngestReport {
        self.mount(Document::by_value(raw_html))
    }

    /// Fetch and mount a document owned by the caller
    pub async fn open(&self, id: DocumentId) -> Result<LoadOutcome> {
        let generation = self.bump_generation();
        let stored = self.gateway.get(&id).await?;
        if self.is_stale(generation, &id) {
            return Ok(LoadOutcome::Stale);
        }
        Ok(LoadOutcome::Mounted(self.mount(Document::owned(id, stored))))
    }

    /// Fetch and mount a shared document read-only.
    ///
    /// Documents that are not shareable are reported as not found.
    pub async fn open_shared(&self, id: DocumentId) -> Result<LoadOutcome> {
        let generation = self.bump_generation();
        let stored = self.gateway.get(&id).await?;
        if self.is_stale(generation, &id) {
            return Ok(LoadOutcome::Stale);
        }
        if !stored.shareable {
            log::info!("document {} is not shared", id);
            return Err(ApostilaError::PermissionDenied("document not found".to_string()));
        }
        Ok(LoadOutcome::Mounted(self.mount(Document::shared(stored))))
    }

    /// Tear down the current mount
    pub fn unmount(&self) {
        self.bump_generation();
        let mut slot = self.slot.borrow_mut();
        slot.controller.take();
        slot.document = None;
        slot.report = None;
        self.speech.stop();
        self.editor.abandon();
        self.mount.node().clear_children();
        log::debug!("viewer unmounted");
    }

    /// Mounted document
    pub fn document(&self) -> Option<Document> {
        self.slot.borrow().document.clone()
    }

    /// Report of the last ingestion
    pub fn report(&self) -> Option<IngestReport> {
        self.slot.borrow().report.clone()
    }

    /// Controller of the current mount
    pub fn controller(&self) -> Option<Ref<'_, InteractionController>> {
        Ref::filter_map(self.slot.borrow(), |slot| slot.controller.as_ref()).ok()
    }

    /// Theme, font scale and playback of the current mount
    pub fn viewer_state(&self) -> Option<ViewerState> {
        self.controller().map(|c| c.state())
    }

    /// Deliver a user event to the mount point
    pub fn dispatch(&self, event: &mut Event) {
        self.mount.dispatch(event);
    }

    /// Open an edit of a section of the mounted tree
    pub fn open_editor(&self, key: &str) -> Result<EditSession> {
        self.editor.open_editor(self.mount.node(), key)
    }

    pub fn cancel_edit(&self, session: EditSession) {
        self.editor.cancel_edit(session);
    }

    /// Commit an edit and remount from the new canonical string
    pub async fn commit_edit(&self, session: &EditSession) -> Result<PatchTier> {
        let document = self
            .document()
            .ok_or_else(|| ApostilaError::NoActiveEdit(session.section_key().to_string()))?;
        let generation = self.generation.get();
        let committed = self
            .editor
            .commit_edit(session, &document, self.gateway.as_ref(), self.mount.node())
            .await?;

        if committed.tier == PatchTier::Unchanged {
            return Ok(committed.tier);
        }
        if self.generation.get() != generation {
            log::warn!("view changed while saving {}, not remounting", session.section_key());
            return Ok(committed.tier);
        }
        self.mount(committed.document);
        Ok(committed.tier)
    }

    /// Mark the mounted document shareable and return its link
    pub async fn share(&self) -> Result<ShareLink> {
        let document = self
            .document()
            .ok_or_else(|| ApostilaError::PermissionDenied("nothing mounted".to_string()))?;
        let generation = self.generation.get();
        let link = self.share.enable_sharing(&document, self.gateway.as_ref()).await?;
        if self.generation.get() == generation {
            let mut slot = self.slot.borrow_mut();
            if let Some(doc) = slot.document.take() {
                slot.document = Some(doc.into_shareable());
            }
        }
        Ok(link)
    }

    /// Copy a share link; failure is logged and reported as `false`
    pub fn copy_share_link(&self, link: &ShareLink, clipboard: &dyn Clipboard) -> bool {
        self.share.copy_link(link, clipboard)
    }

    fn mount(&self, document: Document) -> IngestReport {
        self.bump_generation();
        let mut slot = self.slot.borrow_mut();
        slot.controller.take();
        self.speech.stop();
        self.editor.abandon();

        let mut styles = self.host.styles_mut();
        let report = self
            .ingestor
            .ingest(document.raw_html(), self.mount.node(), &mut styles);
        slot.controller = Some(InteractionController::attach(
            Rc::clone(&self.mount),
            Rc::clone(&self.config),
            self.speech.clone(),
            &mut styles,
        ));
        slot.document = Some(document);
        slot.report = Some(report.clone());
        report
    }

    fn bump_generation(&self) -> u64 {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        next
    }

    fn is_stale(&self, generation: u64, id: &DocumentId) -> bool {
        if self.generation.get() != generation {
            log::info!("discarding stale fetch of {}", id);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MemoryGateway;
    use crate::renderer::MountState;
    use crate::ui::{FontStep, LoggingSynthesizer, Theme};

    const RAW: &str = r#"<html><head><style>body { margin: 0 }</style></head><body><section id="intro"><h2 role="button" aria-expanded="true">Intro</h2><div class="controls"></div><div class="content"><p>Hello</p></div></section></body></html>"#;

    fn viewer(gateway: Rc<MemoryGateway>) -> Viewer {
        Viewer::new(
            RendererConfig::default(),
            Rc::new(HostPage::new()),
            gateway,
            SpeechChannel::new(Box::new(LoggingSynthesizer::new())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_open_mounts_owned_document() {
        let gateway = Rc::new(MemoryGateway::new());
        gateway.insert("1", RAW, false);
        let viewer = viewer(Rc::clone(&gateway));

        let outcome = viewer.open(DocumentId::new("1")).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Mounted(ref r) if r.state == MountState::Ready));
        assert!(viewer.document().unwrap().is_persistable());
        assert!(viewer.mount_point().node().find_element_by_id("intro").is_some());
        assert!(viewer.host().styles().is_installed("apostila-style-0"));
        assert!(viewer.host().styles().is_installed("apostila-runtime-styles"));
    }

    #[tokio::test]
    async fn test_open_shared_requires_flag() {
        let gateway = Rc::new(MemoryGateway::new());
        gateway.insert("1", RAW, false);
        gateway.insert("2", RAW, true);
        let viewer = viewer(Rc::clone(&gateway));

        assert!(matches!(
            viewer.open_shared(DocumentId::new("1")).await,
            Err(ApostilaError::PermissionDenied(_))
        ));
        viewer.open_shared(DocumentId::new("2")).await.unwrap();
        assert!(!viewer.document().unwrap().is_persistable());
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_stale() {
        let gateway = Rc::new(MemoryGateway::new());
        gateway.insert("1", RAW, false);
        gateway.insert("2", "<p id=\"second\">Second</p>", false);
        let viewer = viewer(Rc::clone(&gateway));

        let (first, second) = tokio::join!(viewer.open(DocumentId::new("1")), viewer.open(DocumentId::new("2")));
        assert_eq!(first.unwrap(), LoadOutcome::Stale);
        assert!(matches!(second.unwrap(), LoadOutcome::Mounted(_)));
        assert!(viewer.mount_point().node().find_element_by_id("second").is_some());
        assert!(viewer.mount_point().node().find_element_by_id("intro").is_none());
    }

    #[test]
    fn test_remount_resets_viewer_state_and_listeners() {
        let viewer = viewer(Rc::new(MemoryGateway::new()));
        viewer.open_by_value(RAW);
        {
            let controller = viewer.controller().unwrap();
            controller.toggle_theme();
            controller.step_font(FontStep::Up);
        }
        assert_eq!(viewer.viewer_state().unwrap().theme, Theme::Dark);

        viewer.open_by_value(RAW);
        let state = viewer.viewer_state().unwrap();
        assert_eq!(state.theme, Theme::Light);
        assert_eq!(state.font_scale, 1.0);
        assert_eq!(viewer.mount_point().events().listener_count(crate::ui::EventType::Click), 1);

        viewer.unmount();
        assert!(viewer.viewer_state().is_none());
        assert_eq!(viewer.mount_point().events().listener_count(crate::ui::EventType::Click), 0);
        assert!(viewer.mount_point().node().element_children().is_empty());
    }

    #[tokio::test]
    async fn test_commit_remounts_from_new_canonical() {
        let gateway = Rc::new(MemoryGateway::new());
        gateway.insert("1", RAW, false);
        let viewer = viewer(Rc::clone(&gateway));
        viewer.open(DocumentId::new("1")).await.unwrap();

        let mut session = viewer.open_editor("intro").unwrap();
        session.set_text("Bye");
        assert_eq!(viewer.commit_edit(&session).await.unwrap(), PatchTier::Targeted);

        let document = viewer.document().unwrap();
        assert!(document.raw_html().contains("<p>Bye</p>"));
        assert_eq!(gateway.stored(&DocumentId::new("1")).unwrap().content, document.raw_html());
        let session = viewer.open_editor("intro").unwrap();
        assert_eq!(session.working_text(), "Bye");
    }
}
