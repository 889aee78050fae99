//! Plain-text rendering of briefs and backend data.

use std::fmt::Write;

use mrs_engine::export::{self, ConfidenceBand};
use mrs_engine::models::{DocumentListItem, HealthStatus, MetricsSnapshot};
use mrs_engine::provenance::{self, AnswerSegment, HighlightState};
use mrs_engine::workspace::PinnedAnswer;
use mrs_engine::{Mode, QueryResult, Session, SettledQuery, Theme};

use crate::cli::ExportFormat;

/// Full brief for a settled answer. The highlighted segment and citation are marked.
pub fn brief(
    settled: &SettledQuery,
    segments: &[AnswerSegment],
    highlight: &HighlightState,
    theme: Theme,
) -> String {
    let result = &settled.result;
    let (open, close) = match theme {
        Theme::Dark => ("\x1b[1;33m", "\x1b[0m"),
        Theme::Light => ("\x1b[1;34m", "\x1b[0m"),
    };
    let mut out = String::new();

    let _ = writeln!(out, "Q: {}", settled.question);
    let _ = writeln!(
        out,
        "Confidence {}% ({}) | {} of {} sources | {:.1}s",
        export::confidence_percent(result.confidence),
        ConfidenceBand::of(result.confidence).as_str(),
        result.sources.len(),
        result.total_sources,
        result.elapsed_seconds
    );
    out.push('\n');

    for (n, segment) in segments.iter().enumerate() {
        let marker = provenance::render_marker(segment, &result.sources)
            .map(|m| format!(" {}", m))
            .unwrap_or_default();
        if highlight.is_segment_highlighted(segment) {
            let _ = writeln!(out, "  ({}) {}{}{}{}", n + 1, open, segment.text.trim(), close, marker);
        } else {
            let _ = writeln!(out, "  ({}) {}{}", n + 1, segment.text.trim(), marker);
        }
    }

    section(&mut out, "Evidence", &result.evidence);
    section(&mut out, "Conflicts", &result.conflicts);
    section(&mut out, "Limitations", &result.limitations);

    if !result.sources.is_empty() {
        out.push_str("\nCitations\n");
        for (i, source) in result.sources.iter().enumerate() {
            let flag = if highlight.is_citation_highlighted(&source.id) { "*" } else { " " };
            let mut tags = Vec::new();
            if let Some(study) = source.study_type {
                tags.push(study.label().to_string());
            }
            if let Some(risk) = source.risk_of_bias {
                tags.push(format!("risk of bias: {}", risk.as_str()));
            }
            let _ = writeln!(
                out,
                "{}[{}] {} ({}, {}) {}  #{}",
                flag,
                i + 1,
                source.title,
                source.journal,
                source.year,
                tags.join(", "),
                source.id
            );
            let _ = writeln!(out, "     {}", source.excerpt);
        }
    }

    if let Some(cutoff) = &result.evidence_cutoff {
        let _ = writeln!(out, "\nEvidence up to {}", cutoff);
    }
    if let Some(note) = &result.caution_note {
        let _ = writeln!(out, "{}", note);
    }
    out
}

fn section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}", title);
    for item in items {
        let _ = writeln!(out, "  - {}", item);
    }
}

pub fn exported(format: ExportFormat, question: &str, result: &QueryResult) -> String {
    match format {
        ExportFormat::Markdown => export::markdown(question, result),
        ExportFormat::References => export::references(result),
        ExportFormat::Answer => export::answer_text(result).to_string(),
    }
}

pub fn pending(mode: Mode) -> String {
    match mode {
        Mode::Simulated => "Synthesizing (demo)...".to_string(),
        Mode::Live => "Synthesizing evidence from the backend...".to_string(),
    }
}

pub fn sessions(sessions: &[Session]) -> String {
    let mut out = String::new();
    for session in sessions {
        let _ = writeln!(out, "{} ({})", session.name, session.created_at.format("%Y-%m-%d"));
        for entry in &session.queries {
            let _ = writeln!(out, "  {:<6} {}", entry.id, entry.question);
        }
    }
    if out.is_empty() {
        out.push_str("No research sessions yet.\n");
    }
    out
}

pub fn pins(pins: &[PinnedAnswer]) -> String {
    if pins.is_empty() {
        return "No pinned answers.\n".to_string();
    }
    let mut out = String::new();
    for pin in pins {
        let _ = writeln!(
            out,
            "{}  {}  [{}]",
            pin.pinned_at.format("%H:%M"),
            pin.question,
            pin.id
        );
    }
    out
}

pub fn documents(documents: &[DocumentListItem]) -> String {
    if documents.is_empty() {
        return "No documents indexed.\n".to_string();
    }
    let mut out = String::new();
    for doc in documents {
        let _ = writeln!(
            out,
            "{}  {} | {} | {} | {} chunks",
            doc.id,
            doc.title.as_deref().unwrap_or("(untitled)"),
            doc.journal.as_deref().unwrap_or("-"),
            doc.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
            doc.chunks
        );
    }
    out
}

pub fn health(health: &HealthStatus) -> String {
    let mark = |ok: bool| if ok { "up" } else { "down" };
    format!(
        "status: {}\nbedrock: {}\nvector store: {}\ns3: {}\n",
        health.status,
        mark(health.bedrock),
        mark(health.vector_store),
        mark(health.s3)
    )
}

pub fn metrics(metrics: &MetricsSnapshot) -> String {
    format!(
        "ingestion {:.0} ms | retrieval {:.0} ms | generation {:.0} ms | {} documents\n",
        metrics.ingestion_latency_ms,
        metrics.retrieval_latency_ms,
        metrics.generation_latency_ms,
        metrics.documents_indexed
    )
}
