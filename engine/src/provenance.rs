//! Links answer text to the citations that support it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fixtures;
use crate::intent::CanonicalKey;
use crate::models::Citation;

/// A contiguous span of an answer, optionally tagged with supporting citation ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSegment {
    pub text: String,
    #[serde(default)]
    pub citation_ids: Vec<String>,
}

impl AnswerSegment {
    pub fn new(text: impl Into<String>, citation_ids: Vec<String>) -> Self {
        Self {
            text: text.into(),
            citation_ids,
        }
    }

    pub fn untagged(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    pub fn is_tagged(&self) -> bool {
        !self.citation_ids.is_empty()
    }
}

/// Split an answer into ordered segments.
///
/// Curated segmentations are used only when `key` has one and it spells out `answer`
/// exactly; anything else comes back as a single untagged segment. Joining the texts of
/// the returned segments always reproduces `answer`.
pub fn segment(answer: &str, key: Option<CanonicalKey>, sources: &[Citation]) -> Vec<AnswerSegment> {
    if answer.is_empty() {
        return Vec::new();
    }

    if let Some((key, curated)) = key.and_then(|k| fixtures::curated_segments(k).map(|c| (k, c))) {
        if curated.iter().map(|s| s.text.as_str()).collect::<String>() == answer {
            for id in curated.iter().flat_map(|s| &s.citation_ids) {
                if index_of(sources, id) == 0 {
                    debug!(citation_id = %id, "Curated segment cites a source not in this result");
                }
            }
            return curated;
        }
        debug!(key = %key, "Curated segments do not match answer text");
    }

    vec![AnswerSegment::untagged(answer)]
}

/// 1-based position of `citation_id` in `sources`, or 0 when absent.
pub fn index_of(sources: &[Citation], citation_id: &str) -> usize {
    sources
        .iter()
        .position(|c| c.id == citation_id)
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Marker indices for a segment, in tag order, skipping ids not present in `sources`.
pub fn marker_indices(segment: &AnswerSegment, sources: &[Citation]) -> Vec<usize> {
    segment
        .citation_ids
        .iter()
        .map(|id| index_of(sources, id))
        .filter(|i| *i > 0)
        .collect()
}

/// Marker text such as `[1, 2]`, or `None` when nothing resolves.
pub fn render_marker(segment: &AnswerSegment, sources: &[Citation]) -> Option<String> {
    let indices = marker_indices(segment, sources);
    if indices.is_empty() {
        return None;
    }
    let joined = indices.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
    Some(format!("[{}]", joined))
}

/// The single citation currently highlighted, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightState {
    highlighted: Option<String>,
}

impl HighlightState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    /// Toggle from a segment click.
    ///
    /// A segment with no resolvable markers is not clickable. Clicking a segment that is
    /// already highlighted clears the highlight; otherwise its first citation becomes
    /// highlighted.
    pub fn click_segment(&mut self, segment: &AnswerSegment, sources: &[Citation]) {
        if marker_indices(segment, sources).is_empty() {
            return;
        }
        if self.is_segment_highlighted(segment) {
            self.highlighted = None;
        } else {
            self.highlighted = segment.citation_ids.first().cloned();
        }
    }

    /// Highlight a citation directly, as from its card.
    pub fn select_citation(&mut self, citation_id: impl Into<String>) {
        self.highlighted = Some(citation_id.into());
    }

    pub fn clear(&mut self) {
        self.highlighted = None;
    }

    pub fn is_segment_highlighted(&self, segment: &AnswerSegment) -> bool {
        match &self.highlighted {
            Some(id) => segment.citation_ids.iter().any(|c| c == id),
            None => false,
        }
    }

    pub fn is_citation_highlighted(&self, citation_id: &str) -> bool {
        self.highlighted.as_deref() == Some(citation_id)
    }
}
