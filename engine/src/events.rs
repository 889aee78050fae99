//! Cache invalidation signals for independently fetched dashboard data.
//!
//! The engine does not own query history, metrics or the document list. It only tells
//! whoever caches them that a refetch is due.

use tokio::sync::broadcast;
use tracing::debug;

/// Externally cached data sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    QueryHistory,
    Metrics,
    Documents,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::QueryHistory => "query-history",
            CacheKey::Metrics => "metrics",
            CacheKey::Documents => "documents",
        }
    }
}

/// Fan-out channel of [`CacheKey`] invalidations.
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<CacheKey>,
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl InvalidationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.sender.subscribe()
    }

    /// Publish an invalidation. Having no subscribers is fine.
    pub fn invalidate(&self, key: CacheKey) {
        let receivers = self.sender.send(key).unwrap_or(0);
        debug!(cache = key.as_str(), receivers, "Invalidated cache");
    }

    pub fn invalidate_all(&self, keys: &[CacheKey]) {
        for key in keys {
            self.invalidate(*key);
        }
    }
}
