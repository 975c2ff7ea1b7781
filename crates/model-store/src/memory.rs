//! In-process model store with per-key TTL.

use crate::store::{ModelStore, StoreError};
use crate::types::RankingEntry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

struct Entry {
    value: Vec<RankingEntry>,
    expires_at: Instant,
}

/// The per-process copy of the trained model.
///
/// Expiry is lazy: an expired key answers as a miss immediately, and its slot
/// is reclaimed on the next write pass or an explicit [`purge_expired`]
/// sweep.
///
/// [`purge_expired`]: InMemoryModelStore::purge_expired
#[derive(Default)]
pub struct InMemoryModelStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired entry.
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} expired model entries", purged);
        }
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn get(&self, key: &str) -> Option<Vec<RankingEntry>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<RankingEntry>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
