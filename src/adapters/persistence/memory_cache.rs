//! Implements ResultCache in process memory.
//!
//! Entries expire after a fixed TTL. An expired entry is dropped when it is
//! looked up, and every insert sweeps all expired entries, so digests that
//! never come back do not pile up.

use crate::domain::OperationKind;
use crate::ports::{CachedResult, ResultCache};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

type Key = (OperationKind, String);

/// In-memory result cache keyed by (operation, text digest).
pub struct InMemoryResultCache {
    ttl: Duration,
    entries: RwLock<HashMap<Key, (Instant, CachedResult)>>,
}

impl InMemoryResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait::async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get(&self, operation: OperationKind, text_digest: &str) -> Option<CachedResult> {
        let key = (operation, text_digest.to_string());
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some((stored_at, result)) if stored_at.elapsed() < self.ttl => {
                    return Some(result.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        debug!(operation = %operation, "evicting expired cache entry");
        self.entries.write().await.remove(&key);
        None
    }

    async fn put(&self, operation: OperationKind, text_digest: &str, result: CachedResult) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        let swept = before - entries.len();
        if swept > 0 {
            debug!(swept, "swept expired cache entries");
        }
        entries.insert((operation, text_digest.to_string()), (Instant::now(), result));
    }
}
