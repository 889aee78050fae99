//! Research data models and their wire formats.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::{Error, Result};

/// Free-form JSON object attached to results and history records.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Optional restrictions applied to retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    /// Inclusive publication year window, serialized as `[start, end]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_range: Option<(i32, i32)>,
    /// Journals to restrict to, in the order given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<Vec<String>>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.year_range.is_none() && self.journal.is_none()
    }
}

/// Validated research query payload (`POST /query` body).
///
/// Only constructed through [`QueryRequest::new`]; fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1))]
    question: String,
    #[validate(range(min = 1))]
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<Filters>,
}

impl QueryRequest {
    /// Default number of sources requested when the form leaves it unset.
    pub const DEFAULT_MAX_RESULTS: u32 = 10;

    pub fn new(question: impl Into<String>, max_results: u32, filters: Option<Filters>) -> Result<Self> {
        let question = question.into().trim().to_string();
        if question.is_empty() {
            return Err(Error::validation("empty question"));
        }
        if let Some((start, end)) = filters.as_ref().and_then(|f| f.year_range) {
            if start > end {
                return Err(Error::validation("start year after end year"));
            }
        }

        let request = Self {
            question,
            max_results,
            filters: filters.filter(|f| !f.is_empty()),
        };
        request.validate()?;
        Ok(request)
    }

    /// Plain question with default result count and no filters.
    pub fn question_only(question: impl Into<String>) -> Result<Self> {
        Self::new(question, Self::DEFAULT_MAX_RESULTS, None)
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    pub fn filters(&self) -> Option<&Filters> {
        self.filters.as_ref()
    }
}

/// Study design reported for a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyType {
    #[serde(rename = "RCT")]
    Rct,
    #[serde(rename = "Meta-analysis")]
    MetaAnalysis,
    Guideline,
    Observational,
    Review,
    #[serde(other)]
    Other,
}

impl StudyType {
    /// Short badge label.
    pub fn label(&self) -> &'static str {
        match self {
            StudyType::Rct => "RCT",
            StudyType::MetaAnalysis => "Meta",
            StudyType::Guideline => "Guideline",
            StudyType::Observational => "Observational",
            StudyType::Review => "Review",
            StudyType::Other => "Other",
        }
    }
}

/// Risk-of-bias grading for a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskOfBias {
    Low,
    Medium,
    High,
}

impl RiskOfBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskOfBias::Low => "low",
            RiskOfBias::Medium => "medium",
            RiskOfBias::High => "high",
        }
    }
}

/// A source supporting an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Unique within a single result
    pub id: String,
    #[serde(rename = "paper_title")]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: i32,
    pub journal: String,
    pub excerpt: String,
    /// Retrieval confidence in `[0, 1]`
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_type: Option<StudyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_of_bias: Option<RiskOfBias>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_of_bias_note: Option<String>,
}

/// A synthesized answer and everything shown alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Citation>,
    pub confidence: f64,
    #[serde(rename = "query_time")]
    pub elapsed_seconds: f64,
    pub total_sources: u32,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_cutoff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caution_note: Option<String>,
}

impl QueryResult {
    pub fn citation(&self, id: &str) -> Option<&Citation> {
        self.sources.iter().find(|c| c.id == id)
    }
}

/// One previously asked question (`GET /query/history` item).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHistoryEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(deserialize_with = "utc_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// RFC 3339, or an offset-less timestamp read as UTC (the backend stamps history naively).
fn utc_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
}

/// A named group of history entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub queries: Vec<QueryHistoryEntry>,
    pub created_at: DateTime<Utc>,
}

/// Sidecar metadata sent with an uploaded document.
///
/// Blank fields are dropped so the backend only sees what the user filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub url: Option<String>,
}

impl DocumentMetadata {
    /// Build from raw form fields, treating blank strings as unset.
    pub fn from_form(
        title: Option<&str>,
        authors: Option<&str>,
        journal: Option<&str>,
        year: Option<i32>,
        doi: Option<&str>,
        url: Option<&str>,
    ) -> Self {
        fn filled(value: Option<&str>) -> Option<String> {
            value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
        }

        Self {
            title: filled(title),
            authors: filled(authors),
            journal: filled(journal),
            year,
            doi: filled(doi),
            url: filled(url),
        }
    }
}

/// Upload response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUploadResponse {
    pub document_id: String,
    pub chunks_indexed: u32,
    pub duplicate: bool,
}

/// Indexed document as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentListItem {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub chunks: u32,
}

/// Backend dependency health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub bedrock: bool,
    pub vector_store: bool,
    pub s3: bool,
}

/// Pipeline latency figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub ingestion_latency_ms: f64,
    pub retrieval_latency_ms: f64,
    pub generation_latency_ms: f64,
    pub documents_indexed: u64,
}
