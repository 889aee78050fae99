//! Query orchestration and evidence provenance engine for the Medical Research Synthesizer.
//!
//! This crate turns form input into validated research queries, runs them either against
//! canned demo fixtures or the live backend, maps answers onto their citations, and keeps
//! the pinned-answer workspace.

pub mod client;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod executor;
pub mod export;
pub mod filters;
pub mod fixtures;
pub mod intent;
pub mod models;
pub mod provenance;
pub mod settings;
pub mod tour;
pub mod workspace;

pub use client::{DocumentUploader, ResearchBackend, ResearchClient, UploadOutcome};
pub use commands::{CommandBus, ConsoleCommand};
pub use config::Config;
pub use console::{ConsoleEvent, ResearchConsole};
pub use error::{Error, Result};
pub use events::{CacheKey, InvalidationBus};
pub use executor::{Completion, ExecutorState, Mode, QueryExecutor, SettledQuery, Submission};
pub use filters::{build_request, QueryForm};
pub use intent::{classify, CanonicalKey};
pub use models::{
    Citation, DocumentMetadata, DocumentUploadResponse, Filters, HealthStatus, MetricsSnapshot,
    QueryHistoryEntry, QueryRequest, QueryResult, Session,
};
pub use provenance::{AnswerSegment, HighlightState};
pub use settings::{DynSettings, JsonFileStore, KeyValueStore, MemoryStore, Settings, Theme};
pub use workspace::{PinnedAnswer, WorkspaceStore};
