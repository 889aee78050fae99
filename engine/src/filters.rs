//! Turns raw query form fields into a validated [`QueryRequest`].

use crate::models::{Filters, QueryRequest};
use crate::{Error, Result};

/// Raw query form state as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryForm {
    pub question: String,
    /// Unparsed "max results" field; blank, zero or non-numeric means the default.
    pub max_results: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    /// Comma-separated journal names.
    pub journals: String,
}

impl QueryForm {
    pub fn with_question(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }
}

/// Build a request from the form, or explain why it cannot be submitted.
pub fn build_request(form: &QueryForm) -> Result<QueryRequest> {
    let question = form.question.trim();
    if question.is_empty() {
        return Err(Error::validation("empty question"));
    }

    let year_range = match (valid_year(form.start_year), valid_year(form.end_year)) {
        (Some(start), Some(end)) if start > end => {
            return Err(Error::validation("start year after end year"));
        }
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };

    let journals = parse_journals(&form.journals);
    let filters = Filters {
        year_range,
        journal: (!journals.is_empty()).then_some(journals),
    };

    QueryRequest::new(
        question,
        parse_max_results(form.max_results.as_deref())?,
        (!filters.is_empty()).then_some(filters),
    )
}

/// Split a comma-separated journal list, dropping blanks and repeats.
pub fn parse_journals(raw: &str) -> Vec<String> {
    let mut journals: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !journals.iter().any(|j| j == name) {
            journals.push(name.to_string());
        }
    }
    journals
}

fn parse_max_results(raw: Option<&str>) -> Result<u32> {
    let Some(value) = raw.map(str::trim).and_then(|v| v.parse::<i64>().ok()) else {
        return Ok(QueryRequest::DEFAULT_MAX_RESULTS);
    };
    match value {
        0 => Ok(QueryRequest::DEFAULT_MAX_RESULTS),
        v if v < 0 => Err(Error::validation("max results must be positive")),
        v => u32::try_from(v).map_err(|_| Error::validation("max results out of range")),
    }
}

// A zero year is an unset field.
fn valid_year(year: Option<i32>) -> Option<i32> {
    year.filter(|y| *y != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(question: &str) -> QueryForm {
        QueryForm::with_question(question)
    }

    #[test]
    fn test_empty_question_rejected() {
        let err = build_request(&form("   \n ")).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: empty question");
    }

    #[test]
    fn test_inverted_years_rejected() {
        for (start, end) in [(2024, 2023), (2001, 1999), (2100, 1900)] {
            let mut f = form("Q");
            f.start_year = Some(start);
            f.end_year = Some(end);
            let err = build_request(&f).unwrap_err();
            assert_eq!(err.to_string(), "Validation error: start year after end year");
        }
    }

    #[test]
    fn test_journal_list_trimmed() {
        let mut f = form("Q");
        f.max_results = Some("10".to_string());
        f.journals = "NEJM, , Lancet".to_string();
        let request = build_request(&f).unwrap();
        let journals = request.filters().and_then(|f| f.journal.clone()).unwrap();
        assert_eq!(journals, vec!["NEJM", "Lancet"]);
        assert!(request.filters().unwrap().year_range.is_none());
    }

    #[test]
    fn test_year_range_needs_both_bounds() {
        let mut f = form("Q");
        f.start_year = Some(2020);
        let request = build_request(&f).unwrap();
        assert!(request.filters().is_none());

        f.end_year = Some(2020);
        let request = build_request(&f).unwrap();
        assert_eq!(request.filters().unwrap().year_range, Some((2020, 2020)));
    }

    #[test]
    fn test_max_results_defaults() {
        for raw in [None, Some(""), Some("abc"), Some("0")] {
            let mut f = form("Q");
            f.max_results = raw.map(String::from);
            assert_eq!(build_request(&f).unwrap().max_results(), 10);
        }

        let mut f = form("Q");
        f.max_results = Some("75".to_string());
        assert_eq!(build_request(&f).unwrap().max_results(), 75);

        f.max_results = Some("-3".to_string());
        assert!(build_request(&f).unwrap_err().is_validation());
    }

    #[test]
    fn test_question_is_trimmed() {
        let request = build_request(&form("  What about SGLT2?  ")).unwrap();
        assert_eq!(request.question(), "What about SGLT2?");
    }

    #[test]
    fn test_repeated_journals_collapse() {
        assert_eq!(parse_journals("BMJ,BMJ , JAMA,"), vec!["BMJ", "JAMA"]);
        assert!(parse_journals(" , ,").is_empty());
    }
}
