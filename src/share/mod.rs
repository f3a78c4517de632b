//! Sharing of documents through a public link

use crate::config::RendererConfig;
use crate::engine::Document;
use crate::network::{DocumentId, DocumentUpdate, PersistenceGateway};
use crate::utils::{ApostilaError, InFlight, Result};
use std::cell::Cell;
use std::fmt;

/// Public link of a shared document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink(String);

impl ShareLink {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Write-only clipboard of the host platform
#[cfg_attr(test, mockall::automock)]
pub trait Clipboard {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Marks documents shareable and derives their links
pub struct ShareCoordinator {
    origin: String,
    share_path: String,
    in_flight: Cell<bool>,
}

impl ShareCoordinator {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let mut share_path = config.share_path.clone();
        if !share_path.starts_with('/') {
            share_path.insert(0, '/');
        }
        if !share_path.ends_with('/') {
            share_path.push('/');
        }
        Ok(Self {
            origin: config.share_origin()?,
            share_path,
            in_flight: Cell::new(false),
        })
    }

    /// Link of a document; the same id always yields the same link
    pub fn link_for(&self, id: &DocumentId) -> ShareLink {
        ShareLink(format!("{}{}{}", self.origin, self.share_path, id))
    }

    /// Whether a share request is outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    /// Mark `document` shareable and return its link.
    ///
    /// Already shareable documents succeed without a store call. A second
    /// request while one is outstanding fails with `ConcurrencyGuard`.
    pub async fn enable_sharing(
        &self,
        document: &Document,
        gateway: &dyn PersistenceGateway,
    ) -> Result<ShareLink> {
        let Some(id) = document.id() else {
            return Err(ApostilaError::PermissionDenied(
                "document has no storage identity".to_string(),
            ));
        };
        let link = self.link_for(id);
        if document.is_shareable() {
            log::debug!("document {} already shareable", id);
            return Ok(link);
        }

        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return Err(ApostilaError::ConcurrencyGuard("share"));
        };
        log::info!("sharing document {}", id);
        let affected = gateway.update(id, DocumentUpdate::shareable(true)).await?;
        if affected == 0 {
            log::warn!("share of {} affected no rows", id);
            return Err(ApostilaError::PermissionDenied(format!(
                "share of document {id} affected no rows"
            )));
        }
        Ok(link)
    }

    /// Copy a link to the clipboard; failures are logged, not returned
    pub fn copy_link(&self, link: &ShareLink, clipboard: &dyn Clipboard) -> bool {
        match clipboard.write_text(link.as_str()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("could not copy share link: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{MemoryGateway, StoredDocument};
    use tokio_test::assert_ok;

    fn coordinator() -> ShareCoordinator {
        ShareCoordinator::new(&RendererConfig {
            origin: "https://apostilas.example.com/some/page".to_string(),
            ..RendererConfig::default()
        })
        .unwrap()
    }

    fn document(shareable: bool) -> Document {
        Document::owned(
            DocumentId::new("42"),
            StoredDocument {
                content: "<p>x</p>".to_string(),
                shareable,
            },
        )
    }

    #[test]
    fn test_link_is_origin_plus_path_plus_id() {
        assert_eq!(
            coordinator().link_for(&DocumentId::new("42")).as_str(),
            "https://apostilas.example.com/apostila/42"
        );
    }

    #[tokio::test]
    async fn test_enable_sharing_updates_once() {
        let gateway = MemoryGateway::new();
        gateway.insert("42", "<p>x</p>", false);
        let share = coordinator();

        let link = assert_ok!(share.enable_sharing(&document(false), &gateway).await);
        assert_eq!(link.to_string(), "https://apostilas.example.com/apostila/42");
        assert!(gateway.stored(&DocumentId::new("42")).unwrap().shareable);

        assert_ok!(share.enable_sharing(&document(true), &gateway).await);
        assert_eq!(gateway.update_calls(), 1);
    }

    #[test]
    fn test_already_shareable_needs_no_store() {
        let gateway = MemoryGateway::new();
        let share = coordinator();
        let link = tokio_test::block_on(share.enable_sharing(&document(true), &gateway)).unwrap();
        assert_eq!(link.as_str(), "https://apostilas.example.com/apostila/42");
        assert_eq!(gateway.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_denied_and_no_identity() {
        let gateway = MemoryGateway::new();
        gateway.insert("42", "<p>x</p>", false);
        gateway.set_read_only("42");
        let share = coordinator();
        assert!(matches!(
            share.enable_sharing(&document(false), &gateway).await,
            Err(ApostilaError::PermissionDenied(_))
        ));
        assert!(matches!(
            share.enable_sharing(&Document::by_value("<p>x</p>"), &gateway).await,
            Err(ApostilaError::PermissionDenied(_))
        ));
        assert!(!share.is_busy());
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_guarded() {
        let gateway = MemoryGateway::new();
        gateway.insert("42", "<p>x</p>", false);
        let share = coordinator();
        let doc = document(false);

        let (first, second) = tokio::join!(
            share.enable_sharing(&doc, &gateway),
            share.enable_sharing(&doc, &gateway)
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(ApostilaError::ConcurrencyGuard(_))));
        assert_eq!(gateway.update_calls(), 1);
    }

    #[test]
    fn test_copy_link() {
        let share = coordinator();
        let link = share.link_for(&DocumentId::new("42"));

        let mut clipboard = MockClipboard::new();
        clipboard
            .expect_write_text()
            .withf(|text| text.to_string() == "https://apostilas.example.com/apostila/42")
            .times(1)
            .returning(|_| Ok(()));
        assert!(share.copy_link(&link, &clipboard));

        let mut broken = MockClipboard::new();
        broken
            .expect_write_text()
            .returning(|_| Err(ApostilaError::Clipboard("denied".to_string())));
        assert!(!share.copy_link(&link, &broken));
    }
}
