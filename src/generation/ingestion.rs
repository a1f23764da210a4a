// src/generation/ingestion.rs

use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use url::Url;

use super::{CollaboratorError, Document, ensure_success};
use crate::config::as_base_url;

/// Opaque readiness signal returned by the indexing service.
///
/// The engine never interprets it beyond "the upload was accepted".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestionReceipt {
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// Uploads a document to the content-indexing collaborator.
#[async_trait]
pub trait DocumentIngestion: Send + Sync {
    async fn ingest(&self, document: &Document) -> Result<IngestionReceipt, CollaboratorError>;
}

/// Client for the RAG service's `POST /upload` (multipart, `file` part).
#[derive(Clone)]
pub struct RagIngestionClient {
    client: Client,
    endpoint: Url,
}

impl RagIngestionClient {
    pub fn new(client: Client, base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            endpoint: as_base_url(base_url.clone()).join("upload")?,
        })
    }
}

#[async_trait]
impl DocumentIngestion for RagIngestionClient {
    async fn ingest(&self, document: &Document) -> Result<IngestionReceipt, CollaboratorError> {
        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.content_type)?;
        let form = Form::new().part("file", part);

        tracing::debug!(
            file_name = %document.file_name,
            size = document.bytes.len(),
            "Uploading document for indexing"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let response = ensure_success(response).await?;

        // An empty or non-JSON success body still counts as accepted.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}
