//! Pinned answers and research session history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{QueryHistoryEntry, QueryResult, Session};

/// An answer copied out of the live query state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinnedAnswer {
    pub id: String,
    pub question: String,
    pub result: QueryResult,
    pub pinned_at: DateTime<Utc>,
}

/// A history entry flattened with the name of its session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentQuery<'a> {
    pub session_name: &'a str,
    pub entry: &'a QueryHistoryEntry,
}

/// Pinned answers plus read-only session history supplied by a collaborator.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceStore {
    pinned: Vec<PinnedAnswer>,
    sessions: Vec<Session>,
}

impl WorkspaceStore {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            pinned: Vec::new(),
            sessions,
        }
    }

    /// Pin a copy of `result`. Later changes to the caller's result do not affect it.
    pub fn pin(&mut self, question: impl Into<String>, result: &QueryResult) -> PinnedAnswer {
        let pinned = PinnedAnswer {
            id: format!("pin-{}", Uuid::new_v4()),
            question: question.into(),
            result: result.clone(),
            pinned_at: Utc::now(),
        };
        info!(pin_id = %pinned.id, "Pinned answer");
        self.pinned.push(pinned.clone());
        pinned
    }

    /// Remove a pin. Unknown ids are ignored.
    pub fn unpin(&mut self, id: &str) -> Option<PinnedAnswer> {
        let index = self.pinned.iter().position(|p| p.id == id)?;
        Some(self.pinned.remove(index))
    }

    pub fn pinned(&self) -> &[PinnedAnswer] {
        &self.pinned
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Replace the history with a fresh copy from its source.
    pub fn replace_sessions(&mut self, sessions: Vec<Session>) {
        self.sessions = sessions;
    }

    /// The first `limit` history entries across sessions, in session order.
    pub fn recent_queries(&self, limit: usize) -> Vec<RecentQuery<'_>> {
        self.sessions
            .iter()
            .flat_map(|session| {
                session.queries.iter().map(move |entry| RecentQuery {
                    session_name: &session.name,
                    entry,
                })
            })
            .take(limit)
            .collect()
    }

    pub fn find_entry(&self, id: &str) -> Option<&QueryHistoryEntry> {
        self.sessions
            .iter()
            .flat_map(|s| &s.queries)
            .find(|entry| entry.id == id)
    }
}

/// Group backend history into a single session for display.
pub fn history_session(entries: Vec<QueryHistoryEntry>) -> Session {
    let created_at = entries
        .iter()
        .map(|e| e.created_at)
        .min()
        .unwrap_or_else(Utc::now);
    Session {
        id: "history".to_string(),
        name: "Query history".to_string(),
        queries: entries,
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::intent::CanonicalKey;

    #[test]
    fn test_pin_then_unpin_restores_collection() {
        let mut store = WorkspaceStore::default();
        let first = store.pin("Q1", &fixtures::response(CanonicalKey::Default));
        let before = store.pinned().to_vec();

        let second = store.pin("Q2", &fixtures::response(CanonicalKey::Glp1Cv));
        assert_eq!(store.pinned().len(), 2);
        assert_ne!(first.id, second.id);

        let removed = store.unpin(&second.id).unwrap();
        assert_eq!(removed.question, "Q2");
        assert_eq!(store.pinned(), before.as_slice());
    }

    #[test]
    fn test_unpin_unknown_is_noop() {
        let mut store = WorkspaceStore::default();
        store.pin("Q", &fixtures::response(CanonicalKey::Default));
        assert!(store.unpin("pin-missing").is_none());
        assert_eq!(store.pinned().len(), 1);
    }

    #[test]
    fn test_pin_is_a_copy() {
        let mut store = WorkspaceStore::default();
        let mut live = fixtures::response(CanonicalKey::Default);
        let pinned = store.pin("Q", &live);
        live.answer.push_str(" (edited)");
        live.sources.clear();
        assert_eq!(store.pinned()[0].result, pinned.result);
        assert_ne!(store.pinned()[0].result, live);
        assert!(pinned.id.starts_with("pin-"));
    }

    #[test]
    fn test_recent_queries_flatten_sessions() {
        let store = WorkspaceStore::new(fixtures::demo_sessions());
        let recent = store.recent_queries(5);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].session_name, "GLP-1 & cardiometabolic");
        assert_eq!(recent[2].entry.id, "h-3");
        assert_eq!(store.recent_queries(2).len(), 2);
        assert_eq!(store.find_entry("h-2").unwrap().question, "What are key limitations of GLP-1 trials?");
        assert!(store.find_entry("h-9").is_none());
    }

    #[test]
    fn test_history_session() {
        let sessions = fixtures::demo_sessions();
        let entries = sessions[0].queries.clone();
        let session = history_session(entries);
        assert_eq!(session.queries.len(), 2);
        assert_eq!(session.created_at, sessions[0].queries[1].created_at);
    }
}
