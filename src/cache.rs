//! Content-addressed summary cache.
//!
//! Maps the SHA-256 digest of normalized text to the summary generated for
//! it. Entries are never evicted or replaced. The cache is owned by a single
//! pipeline run and shared between its tasks through an `Arc`.
//!
//! Lookups are single-flight per key: when two tasks ask for the same digest
//! at once, one of them calls the backend and the other waits for that
//! result. A failed computation leaves the key empty, so nothing wrong is
//! ever cached.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

#[derive(Default)]
pub struct SummaryCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or run `compute` once and store it.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, compute: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key.to_string()).or_default())
        };
        cell.get_or_try_init(compute).await.cloned()
    }

    /// Cached value for `key`, if one has been stored.
    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Number of stored summaries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
