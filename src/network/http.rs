//! HTTP gateway against the study-guide API

use super::{DocumentId, DocumentUpdate, PersistenceGateway, StoredDocument};
use crate::config::GatewayConfig;
use crate::utils::{ApostilaError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct EditedHtml {
    file: String,
    #[serde(default)]
    is_shareable: bool,
}

#[derive(Debug, Serialize)]
struct EditRequest<'a> {
    id: &'a DocumentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_shareable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    affected: Option<u64>,
}

/// Affected rows reported by an update; an empty body counts as one
fn parse_affected(body: &str) -> Result<u64> {
    if body.trim().is_empty() {
        return Ok(1);
    }
    let parsed: EditResponse = serde_json::from_str(body)
        .map_err(|e| ApostilaError::PersistenceFailure(format!("invalid edit response: {e}")))?;
    Ok(parsed.affected.unwrap_or(1))
}

/// Statuses meaning the caller may not see or touch the document
fn is_denied(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    )
}

/// Gateway speaking JSON over HTTP
pub struct HttpGateway {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpGateway {
    /// Create a gateway for `config.base_url`
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| ApostilaError::Config(format!("base_url {:?}: {}", config.base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("apostila/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApostilaError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base,
            token: config.token.clone(),
        })
    }

    /// Absolute URL of an API path
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| ApostilaError::Config(format!("endpoint {path}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait(?Send)]
impl PersistenceGateway for HttpGateway {
    async fn get(&self, id: &DocumentId) -> Result<StoredDocument> {
        let url = self.endpoint("apostilas/edited_html")?;
        let response = self
            .authorize(self.client.get(url).query(&[("id", id.as_str())]))
            .send()
            .await?;

        let status = response.status();
        if is_denied(status) {
            return Err(ApostilaError::PermissionDenied("document not found".to_string()));
        }
        if !status.is_success() {
            return Err(ApostilaError::PersistenceFailure(format!("GET edited_html: {status}")));
        }
        let body = response.text().await?;
        let doc: EditedHtml = serde_json::from_str(&body)
            .map_err(|e| ApostilaError::PersistenceFailure(format!("invalid document payload: {e}")))?;
        Ok(StoredDocument {
            content: doc.file,
            shareable: doc.is_shareable,
        })
    }

    async fn update(&self, id: &DocumentId, update: DocumentUpdate) -> Result<u64> {
        let url = self.endpoint("apostilas/edit")?;
        let payload = EditRequest {
            id,
            file: update.content.as_deref(),
            is_shareable: update.shareable,
        };
        let response = self.authorize(self.client.put(url).json(&payload)).send().await?;

        let status = response.status();
        if is_denied(status) {
            log::warn!("update of {} refused with {}", id, status);
            return Ok(0);
        }
        if !status.is_success() {
            return Err(ApostilaError::PersistenceFailure(format!("PUT edit: {status}")));
        }
        let body = response.text().await?;
        parse_affected(&body)
    }
}
