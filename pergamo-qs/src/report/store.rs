//! Report deduplication store

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::ReportError;

/// Set-per-key store with expiry
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Add `member` to the set at `key`
    ///
    /// Returns `false` when the member was already present. A new key
    /// expires `ttl` after its first member was added.
    async fn record(&self, key: &str, member: &str) -> Result<bool, ReportError>;
}

#[derive(Debug)]
struct MemberSet {
    members: HashSet<String>,
    expires_at: Instant,
}

/// In-process [`ReportStore`]
#[derive(Debug)]
pub struct MemoryReportStore {
    ttl: Duration,
    sets: Mutex<HashMap<String, MemberSet>>,
}

impl MemoryReportStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sets: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.sets
            .lock()
            .await
            .values()
            .filter(|set| set.expires_at > now)
            .count()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn record(&self, key: &str, member: &str) -> Result<bool, ReportError> {
        let now = Instant::now();
        let mut sets = self.sets.lock().await;
        sets.retain(|_, set| set.expires_at > now);

        let set = sets.entry(key.to_string()).or_insert_with(|| MemberSet {
            members: HashSet::new(),
            expires_at: now + self.ttl,
        });
        Ok(set.members.insert(member.to_string()))
    }
}
