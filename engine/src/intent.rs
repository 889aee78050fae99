//! Maps a free-text question onto the canned response that best matches it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a canned demo response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanonicalKey {
    #[serde(rename = "glp1-cv")]
    Glp1Cv,
    #[serde(rename = "sglt2-ckd")]
    Sglt2Ckd,
    HeartFailure,
    CompareTreatments,
    EvidenceSummary,
    PatientFriendly,
    LimitationsOnly,
    Default,
}

impl CanonicalKey {
    pub const ALL: [CanonicalKey; 8] = [
        CanonicalKey::Glp1Cv,
        CanonicalKey::Sglt2Ckd,
        CanonicalKey::HeartFailure,
        CanonicalKey::CompareTreatments,
        CanonicalKey::EvidenceSummary,
        CanonicalKey::PatientFriendly,
        CanonicalKey::LimitationsOnly,
        CanonicalKey::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalKey::Glp1Cv => "glp1-cv",
            CanonicalKey::Sglt2Ckd => "sglt2-ckd",
            CanonicalKey::HeartFailure => "heart-failure",
            CanonicalKey::CompareTreatments => "compare-treatments",
            CanonicalKey::EvidenceSummary => "evidence-summary",
            CanonicalKey::PatientFriendly => "patient-friendly",
            CanonicalKey::LimitationsOnly => "limitations-only",
            CanonicalKey::Default => "default",
        }
    }

    /// Lenient lookup: unknown keys resolve to [`CanonicalKey::Default`].
    pub fn resolve(key: &str) -> Self {
        key.parse().unwrap_or(CanonicalKey::Default)
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown response key: {}", s))
    }
}

/// Classify a question into a canned response key.
///
/// Case-insensitive substring matching, first rule wins; always returns a key.
pub fn classify(question: &str) -> CanonicalKey {
    let q = question.to_lowercase();
    let has = |needle: &str| q.contains(needle);

    if has("glp-1") && (has("cv") || has("cardiovascular") || has("cardiometabolic")) {
        CanonicalKey::Glp1Cv
    } else if has("sglt2") && (has("ckd") || has("kidney")) {
        CanonicalKey::Sglt2Ckd
    } else if has("heart failure") && (has("2024") || has("trial")) {
        CanonicalKey::HeartFailure
    } else if has("compare") && has("treatment") {
        CanonicalKey::CompareTreatments
    } else if has("evidence") && has("summary") {
        CanonicalKey::EvidenceSummary
    } else if has("patient") && has("simple") {
        CanonicalKey::PatientFriendly
    } else if has("limitation") {
        CanonicalKey::LimitationsOnly
    } else {
        CanonicalKey::Default
    }
}
