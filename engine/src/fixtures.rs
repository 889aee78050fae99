//! Canned demo content used in simulated mode.
//!
//! Responses, suggestions, templates and sessions are authoring-time data. The table is
//! built once on first use and handed out by value.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Duration, Utc};

use crate::intent::CanonicalKey;
use crate::models::{Citation, Metadata, QueryHistoryEntry, QueryResult, RiskOfBias, Session, StudyType};
use crate::provenance::AnswerSegment;

/// Question used by the "try a demo" action.
pub const DEMO_QUESTION: &str =
    "What are the key clinical takeaways for GLP-1 agonists in type 2 diabetes?";

/// One-click topic with a known response key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestedQuestion {
    pub label: &'static str,
    pub key: CanonicalKey,
}

pub const SUGGESTED_QUESTIONS: [SuggestedQuestion; 4] = [
    SuggestedQuestion { label: "GLP-1 and CV risk", key: CanonicalKey::Glp1Cv },
    SuggestedQuestion { label: "SGLT2 in CKD", key: CanonicalKey::Sglt2Ckd },
    SuggestedQuestion { label: "Heart failure 2024", key: CanonicalKey::HeartFailure },
    SuggestedQuestion { label: "Compare GLP-1 vs SGLT2", key: CanonicalKey::CompareTreatments },
];

/// Prewritten question shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTemplate {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub question: &'static str,
    pub key: CanonicalKey,
}

pub const QUERY_TEMPLATES: [QueryTemplate; 4] = [
    QueryTemplate {
        id: "evidence-summary",
        label: "Evidence summary",
        description: "Structured bullet summary",
        question: "Summarise the key evidence in bullets.",
        key: CanonicalKey::EvidenceSummary,
    },
    QueryTemplate {
        id: "compare-treatments",
        label: "Compare treatments",
        description: "Head-to-head comparison",
        question: "Compare GLP-1 receptor agonists and SGLT2 inhibitors for type 2 diabetes.",
        key: CanonicalKey::CompareTreatments,
    },
    QueryTemplate {
        id: "patient-friendly",
        label: "Patient-friendly",
        description: "Plain-language summary",
        question: "Explain the main benefits and side effects in simple terms for patients.",
        key: CanonicalKey::PatientFriendly,
    },
    QueryTemplate {
        id: "limitations-only",
        label: "Limitations only",
        description: "Critical appraisal",
        question: "What are the main limitations of the evidence?",
        key: CanonicalKey::LimitationsOnly,
    },
];

pub fn template(id: &str) -> Option<&'static QueryTemplate> {
    QUERY_TEMPLATES.iter().find(|t| t.id == id)
}

pub fn suggestion(label: &str) -> Option<&'static SuggestedQuestion> {
    SUGGESTED_QUESTIONS.iter().find(|s| s.label.eq_ignore_ascii_case(label.trim()))
}

const DEFAULT_SEGMENTS: [(&str, &[&str]); 3] = [
    (
        "GLP-1 receptor agonists such as semaglutide and tirzepatide consistently produce 10–15% weight loss and ~1.0–1.5% reductions in HbA1c in people with type 2 diabetes. ",
        &[],
    ),
    (
        "Large cardiovascular outcomes trials show a relative risk reduction of ~15–20% in major adverse cardiovascular events, particularly in high‑risk patients. ",
        &["demo-1"],
    ),
    (
        "Benefits are greatest when combined with lifestyle modification and careful titration to minimise GI side‑effects.",
        &["demo-2"],
    ),
];

/// Hand-tagged segmentation for keys that have one.
pub fn curated_segments(key: CanonicalKey) -> Option<Vec<AnswerSegment>> {
    match key {
        CanonicalKey::Default => Some(
            DEFAULT_SEGMENTS
                .iter()
                .map(|(text, ids)| AnswerSegment::new(*text, ids.iter().map(|id| id.to_string()).collect()))
                .collect(),
        ),
        _ => None,
    }
}

/// Canned result for a key. Every key has one.
pub fn response(key: CanonicalKey) -> QueryResult {
    let table = responses();
    table
        .get(&key)
        .or_else(|| table.get(&CanonicalKey::Default))
        .cloned()
        .unwrap_or_else(default_response)
}

fn responses() -> &'static HashMap<CanonicalKey, QueryResult> {
    static RESPONSES: OnceLock<HashMap<CanonicalKey, QueryResult>> = OnceLock::new();
    RESPONSES.get_or_init(build_responses)
}

fn default_response() -> QueryResult {
    let answer: String = DEFAULT_SEGMENTS.iter().map(|(text, _)| *text).collect();
    canned(&answer)
}

fn build_responses() -> HashMap<CanonicalKey, QueryResult> {
    let base = base_citations();
    let mut table = HashMap::new();

    table.insert(CanonicalKey::Default, default_response());

    let mut r = canned("Evidence summary: (1) Weight loss 10–15% with GLP-1 RAs; (2) HbA1c reduction ~1.0–1.5%; (3) MACE RR 15–20% in high-risk T2D; (4) GI side effects common but manageable with titration.");
    r.evidence = strings(&[
        "RCTs: SUSTAIN, STEP, SELECT.",
        "Meta-analyses support class effect for CV and renal outcomes.",
        "Real-world data show higher discontinuation than trials.",
    ]);
    table.insert(CanonicalKey::EvidenceSummary, r);

    let mut r = canned("GLP-1 RAs vs SGLT2i: Both improve CV and renal outcomes in T2D. GLP-1 RAs offer greater weight loss and HbA1c reduction; SGLT2i have more robust heart failure and CKD evidence and lower cost. Choice depends on phenotype, comorbidities, and access.");
    r.evidence = strings(&[
        "Head-to-head data limited; indirect comparison via meta-analysis.",
        "Guidelines recommend both; sequence often GLP-1 for weight, SGLT2i for HF/CKD.",
    ]);
    table.insert(CanonicalKey::CompareTreatments, r);

    let mut r = canned("In simple terms: Newer diabetes medicines (like Ozempic or Mounjaro) help with weight and blood sugar and can lower the risk of heart attacks and strokes. They are given as a weekly injection. Stomach upset is common at first but often improves. Your doctor will help you choose if one is right for you.");
    r.caution_note = Some("This is a simplified summary. Always follow your care team’s advice.".to_string());
    table.insert(CanonicalKey::PatientFriendly, r);

    let mut r = canned("Limitations of the current evidence: (1) Trials often exclude older frail adults and advanced HF/CKD; (2) Real-world discontinuation higher than in trials; (3) Long-term data beyond 2–3 years limited; (4) Cost and access vary by region.");
    r.evidence = Vec::new();
    r.limitations = strings(&[
        "Generalizability to complex patients unclear.",
        "Discontinuation and adherence in routine care understudied.",
        "Limited head-to-head and sequencing data.",
    ]);
    table.insert(CanonicalKey::LimitationsOnly, r);

    let mut r = canned("Practice-changing heart failure trials in 2024 include EMPACT-MI (empagliflozin post-MI), STEP-HFpEF DM (semaglutide in HFpEF and diabetes), and DELIVER subgroup analyses. SGLT2i and GLP-1 RAs both show benefit in HFpEF; selection depends on phenotype and comorbidities.");
    r.evidence_cutoff = Some("November 2024".to_string());
    r.sources = base[..3].to_vec();
    table.insert(CanonicalKey::HeartFailure, r);

    let mut r = canned("When starting SGLT2 inhibitors in CKD: monitor eGFR (expect initial small dip that stabilises), volume status, and BP. Follow sick-day guidance (hold during dehydration/acute illness). Check K+ in those on RAASi. Benefits are well established down to eGFR ~20; use guideline-directed dosing.");
    r.evidence = strings(&[
        "CREDENCE, DAPA-CKD, EMPA-KIDNEY support use in CKD.",
        "KDIGO 2024 reinforces SGLT2i in CKD with albuminuria.",
    ]);
    r.sources = vec![base[2].clone(), base[1].clone()];
    table.insert(CanonicalKey::Sglt2Ckd, r);

    table.insert(
        CanonicalKey::Glp1Cv,
        canned("GLP-1 agonists reduce cardiovascular risk in high-risk type 2 diabetes: weight loss 10–15%, HbA1c ~1–1.5% lower, and ~15–20% relative risk reduction in MACE. Use with lifestyle and gradual titration to limit GI side effects."),
    );

    table
}

/// Shared defaults every canned response starts from.
fn canned(answer: &str) -> QueryResult {
    QueryResult {
        answer: answer.to_string(),
        sources: base_citations()[..2].to_vec(),
        confidence: 0.87,
        elapsed_seconds: 2.4,
        total_sources: 6,
        evidence: strings(&[
            "Multiple phase 3 RCTs demonstrate durable weight loss over 68–104 weeks with weekly GLP‑1 RA dosing.",
            "CVOTs such as LEADER, SUSTAIN‑6 and SELECT show statistically significant reductions in composite CV endpoints.",
        ]),
        conflicts: strings(&[
            "Some real‑world studies report higher discontinuation rates due to GI intolerance than pivotal trials.",
        ]),
        limitations: strings(&[
            "Most trials exclude frail older adults and patients with advanced heart failure or severe renal impairment.",
        ]),
        metadata: Metadata::new(),
        evidence_cutoff: Some("December 2024".to_string()),
        caution_note: Some(
            "This summary is not a substitute for clinical guidelines or individualised care.".to_string(),
        ),
    }
}

fn base_citations() -> &'static [Citation] {
    static CITATIONS: OnceLock<Vec<Citation>> = OnceLock::new();
    CITATIONS.get_or_init(|| {
        vec![
            citation(
                "demo-1",
                "Cardiometabolic effects of GLP‑1 receptor agonists",
                &["Smith J", "Chen L"],
                2024,
                "Journal of Metabolic Science",
                0.9,
                "Across pooled analyses, GLP‑1 RAs reduced MACE by 17% (HR 0.83, 95% CI 0.78–0.89) in high‑risk T2D cohorts.",
                StudyType::MetaAnalysis,
                RiskOfBias::Low,
                "Large RCTs, pre-registered outcomes.",
            ),
            citation(
                "demo-2",
                "Weight‑loss outcomes with weekly semaglutide",
                &["Wilding J", "Batterham R"],
                2023,
                "New England Journal of Medicine",
                0.86,
                "Participants receiving 2.4 mg semaglutide achieved a mean 14.9% weight loss vs 2.4% with placebo at 68 weeks.",
                StudyType::Rct,
                RiskOfBias::Low,
                "Double-blind, multi-center.",
            ),
            citation(
                "demo-3",
                "SGLT2 inhibitors in CKD: KDIGO 2024 update",
                &["Kidney Disease Global Outcomes"],
                2024,
                "Kidney International",
                0.92,
                "SGLT2 inhibitors recommended for CKD with eGFR ≥20 and albuminuria, with sick-day guidance.",
                StudyType::Guideline,
                RiskOfBias::Low,
                "International consensus guideline.",
            ),
            citation(
                "demo-4",
                "Real-world discontinuation of GLP-1 RAs",
                &["Patel A", "Davis K"],
                2023,
                "Diabetes Care",
                0.78,
                "Discontinuation rates in routine care were higher than in trials, driven by GI intolerance.",
                StudyType::Observational,
                RiskOfBias::Medium,
                "Single health system, selection bias possible.",
            ),
        ]
    })
}

#[allow(clippy::too_many_arguments)]
fn citation(
    id: &str,
    title: &str,
    authors: &[&str],
    year: i32,
    journal: &str,
    confidence: f64,
    excerpt: &str,
    study_type: StudyType,
    risk_of_bias: RiskOfBias,
    note: &str,
) -> Citation {
    Citation {
        id: id.to_string(),
        title: title.to_string(),
        authors: strings(authors),
        year,
        journal: journal.to_string(),
        excerpt: excerpt.to_string(),
        confidence,
        page_number: None,
        study_type: Some(study_type),
        risk_of_bias: Some(risk_of_bias),
        risk_of_bias_note: Some(note.to_string()),
    }
}

/// Demo research sessions, timestamped relative to now.
pub fn demo_sessions() -> Vec<Session> {
    let now = Utc::now();
    let entry = |id: &str, question: &str, answer: &str, age: Duration| QueryHistoryEntry {
        id: id.to_string(),
        question: question.to_string(),
        answer: answer.to_string(),
        created_at: now - age,
        metadata: Metadata::new(),
    };

    vec![
        Session {
            id: "session-1".to_string(),
            name: "GLP-1 & cardiometabolic".to_string(),
            created_at: now - Duration::days(2),
            queries: vec![
                entry(
                    "h-1",
                    "How effective are GLP‑1 agonists for cardiometabolic risk reduction?",
                    "They provide clinically meaningful weight loss, HbA1c reductions, and ~15–20% MACE reduction in high‑risk T2D.",
                    Duration::zero(),
                ),
                entry(
                    "h-2",
                    "What are key limitations of GLP-1 trials?",
                    "Trials often exclude frail elderly, advanced HF/CKD; real-world discontinuation is higher than in RCTs.",
                    Duration::minutes(45),
                ),
            ],
        },
        Session {
            id: "session-2".to_string(),
            name: "Heart failure 2024".to_string(),
            created_at: now - Duration::days(1),
            queries: vec![entry(
                "h-3",
                "3 practice-changing trials in heart failure in 2024?",
                "EMPACT-MI (empagliflozin post-MI), STEP-HFpEF DM (semaglutide in HFpEF + DM), DELIVER subgroup analyses.",
                Duration::minutes(30),
            )],
        },
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
