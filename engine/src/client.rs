//! HTTP client for the research backend.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, info, warn};
use validator::Validate;

use crate::events::{CacheKey, InvalidationBus};
use crate::models::{
    DocumentListItem, DocumentMetadata, DocumentUploadResponse, HealthStatus, MetricsSnapshot,
    QueryHistoryEntry, QueryRequest, QueryResult,
};
use crate::{Config, Error, Result};

/// Anything that can answer a research query.
#[async_trait]
pub trait ResearchBackend: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult>;
}

/// Client for the research API.
#[derive(Debug, Clone)]
pub struct ResearchClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DocumentListBody {
    #[serde(default)]
    documents: Vec<DocumentListItem>,
}

impl ResearchClient {
    /// Create a new client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submit a research question.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        self.send(self.http.post(self.url("/query")).json(request)).await
    }

    /// Previously answered questions, newest first as the backend orders them.
    pub async fn query_history(&self) -> Result<Vec<QueryHistoryEntry>> {
        self.send(self.http.get(self.url("/query/history"))).await
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentListItem>> {
        let body: DocumentListBody = self.send(self.http.get(self.url("/documents"))).await?;
        Ok(body.documents)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.send(self.http.get(self.url("/health"))).await
    }

    pub async fn metrics(&self) -> Result<MetricsSnapshot> {
        self.send(self.http.get(self.url("/metrics"))).await
    }

    /// Upload a document with its metadata sidecar.
    pub async fn upload_document(
        &self,
        path: &Path,
        metadata: &DocumentMetadata,
    ) -> Result<DocumentUploadResponse> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))
            .map_err(|e| Error::Transport(format!("Invalid upload part: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("metadata_json", serde_json::to_string(metadata)?);

        self.send(self.http.post(self.url("/documents/upload")).multipart(form))
            .await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Network error");
            Error::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "API error");
            return Err(Error::Backend {
                status: status.as_u16(),
                message: error_detail(&body).unwrap_or_else(|| status.to_string()),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ResearchBackend for ResearchClient {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        ResearchClient::query(self, request).await
    }
}

/// Pull a readable message out of an error body (`{"detail": ...}` or plain text).
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("detail") {
            Some(serde_json::Value::String(detail)) => Some(detail.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(body.to_string()),
        },
        Err(_) => Some(body.to_string()),
    }
}

const UPLOAD_EXTENSIONS: [&str; 3] = ["pdf", "txt", "docx"];

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

fn mime_for(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub response: DocumentUploadResponse,
}

impl UploadOutcome {
    pub fn message(&self) -> String {
        if self.response.duplicate {
            "Duplicate document detected. No new chunks indexed.".to_string()
        } else {
            format!("Uploaded successfully. {} chunks indexed.", self.response.chunks_indexed)
        }
    }
}

/// Uploads documents and tells document/metrics caches to refresh.
///
/// Upload failures are returned to the caller and never touch query state.
#[derive(Debug, Clone)]
pub struct DocumentUploader {
    client: ResearchClient,
    bus: InvalidationBus,
}

impl DocumentUploader {
    pub fn new(client: ResearchClient, bus: InvalidationBus) -> Self {
        Self { client, bus }
    }

    pub async fn upload(&self, path: &Path, metadata: &DocumentMetadata) -> Result<UploadOutcome> {
        validate_upload(path, metadata).await?;

        match self.client.health().await {
            Ok(health) if !health.s3 => {
                return Err(Error::Unavailable(
                    "Upload is disabled while S3 is unavailable".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Health check failed, attempting upload anyway"),
        }

        let response = self.client.upload_document(path, metadata).await?;
        info!(
            document_id = %response.document_id,
            chunks = response.chunks_indexed,
            duplicate = response.duplicate,
            "Document uploaded"
        );
        self.bus.invalidate_all(&[CacheKey::Documents, CacheKey::Metrics]);

        Ok(UploadOutcome { response })
    }
}

async fn validate_upload(path: &Path, metadata: &DocumentMetadata) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        _ => {
            return Err(Error::validation(format!(
                "Select a file before submitting ({} not found)",
                path.display()
            )))
        }
    }

    let supported = extension(path)
        .map(|ext| UPLOAD_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    if !supported {
        return Err(Error::validation("Only PDF, TXT, or DOCX files are supported"));
    }

    metadata.validate()?;
    Ok(())
}
