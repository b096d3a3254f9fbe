//! Per-subject filtered set cache
//!
//! Each normalized token maps to a `OnceCell` slot. Concurrent first requests
//! for the same token wait on the same slot, so a set is computed at most once
//! and is never observed half-built. Entries live until the cache is dropped
//! along with its store generation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

use crate::models::Question;

/// Shared, canonically ordered filtered set
pub type QuestionSet = Arc<[Arc<Question>]>;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct SubjectCache {
    slots: RwLock<HashMap<String, Arc<OnceCell<QuestionSet>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SubjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached set for `key`, computing it with `compute` on first use
    pub async fn get_or_compute<F>(&self, key: &str, compute: F) -> QuestionSet
    where
        F: FnOnce() -> Vec<Arc<Question>>,
    {
        let slot = self.slot(key).await;

        if let Some(set) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for subject '{}'", key);
            return Arc::clone(set);
        }

        let set = slot
            .get_or_init(|| async move {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let set: QuestionSet = compute().into();
                debug!("Cached subject '{}' ({} questions)", key, set.len());
                set
            })
            .await;
        Arc::clone(set)
    }

    async fn slot(&self, key: &str) -> Arc<OnceCell<QuestionSet>> {
        if let Some(slot) = self.slots.read().await.get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.slots.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
