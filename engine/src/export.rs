//! Plain-text renderings of a result for copying and export.

use crate::models::QueryResult;

/// Markdown research summary.
pub fn markdown(question: &str, result: &QueryResult) -> String {
    let mut lines = vec![
        "# Research summary".to_string(),
        String::new(),
        format!("**Question:** {}", question),
        String::new(),
        "## Answer".to_string(),
        String::new(),
        result.answer.clone(),
        String::new(),
        "## Evidence".to_string(),
    ];
    lines.extend(result.evidence.iter().map(|e| format!("- {}", e)));
    lines.push(String::new());
    lines.push("## Citations".to_string());
    lines.extend(
        result
            .sources
            .iter()
            .map(|s| format!("- **{}** ({}, {}). {}", s.title, s.journal, s.year, s.excerpt)),
    );
    lines.join("\n")
}

/// Reference list, one citation per paragraph.
pub fn references(result: &QueryResult) -> String {
    result
        .sources
        .iter()
        .map(|s| format!("{}. {}. {}. {}.", s.title, s.journal, s.year, s.authors.join(", ")))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn answer_text(result: &QueryResult) -> &str {
    &result.answer
}

/// Confidence as a whole percentage.
pub fn confidence_percent(confidence: f64) -> u32 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Qualitative confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Moderate,
    Low,
}

impl ConfidenceBand {
    pub fn of(confidence: f64) -> Self {
        match confidence_percent(confidence) {
            80.. => ConfidenceBand::High,
            60..=79 => ConfidenceBand::Moderate,
            _ => ConfidenceBand::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Moderate => "moderate",
            ConfidenceBand::Low => "low",
        }
    }
}
