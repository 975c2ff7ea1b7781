//! The model store contract.

use crate::types::RankingEntry;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors a model store backend can surface on write.
///
/// Reads never error: an unreachable or expired key is simply a miss, and a
/// backend that cannot be reached at read time reports a miss too (the
/// resolver falls through to its next source).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing cache rejected or lost the write
    #[error("Model store write failed: {0}")]
    WriteFailed(String),
}

/// A TTL-backed key → ranked-list cache.
///
/// Written by the trainer, read by the resolver. Every node (main or worker)
/// holds its own copy behind this trait; the external key-value cache of the
/// original deployment is reached only through it.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Look up the ranking stored under `key`.
    ///
    /// Returns `None` for absent and expired keys alike, never an error.
    /// `key` must already be normalized (see [`crate::normalize_key`]).
    async fn get(&self, key: &str) -> Option<Vec<RankingEntry>>;

    /// Store `value` under `key` for `ttl`, overwriting any prior value.
    ///
    /// Callers treat a failure as non-fatal: a missed cache write just means
    /// the next lookup misses. They log the error and move on.
    async fn set(
        &self,
        key: &str,
        value: Vec<RankingEntry>,
        ttl: Duration,
    ) -> Result<(), StoreError>;
}
