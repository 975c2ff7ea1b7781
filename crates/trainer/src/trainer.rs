//! The periodic trainer that ties a transaction source to a model store.

use crate::snapshot::{Snapshot, train_snapshot};
use anyhow::{Context, Result};
use data_loader::TransactionSource;
use model_store::ModelStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// TTL applied to every model entry written by a training pass.
pub const MODEL_TTL: Duration = Duration::from_secs(60 * 60);

/// Default cadence of the periodic training loop.
pub const DEFAULT_TRAIN_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// What one training pass accomplished.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Products whose rankings landed in the store
    pub products_written: usize,
    /// Products produced by the pass (writes may fail individually)
    pub products_trained: usize,
    pub records_used: usize,
    pub records_skipped: usize,
    pub elapsed: Duration,
}

/// Consumes the transaction source on a fixed cadence and publishes ranked
/// snapshots into the model store.
pub struct Trainer {
    source: Arc<dyn TransactionSource>,
    store: Arc<dyn ModelStore>,
    ttl: Duration,
}

impl Trainer {
    pub fn new(source: Arc<dyn TransactionSource>, store: Arc<dyn ModelStore>) -> Self {
        Self {
            source,
            store,
            ttl: MODEL_TTL,
        }
    }

    /// Configure the entry TTL (default: 1 hour)
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Run one training pass: load, aggregate, publish.
    ///
    /// A source that cannot be read is an error and leaves the store
    /// untouched; the previous snapshot keeps serving until its TTL runs
    /// out. Individual store write failures are logged and skipped.
    pub async fn train_once(&self) -> Result<TrainReport> {
        let start = Instant::now();

        // Load + aggregate are file- and CPU-bound; keep them off the
        // async workers.
        let source = self.source.clone();
        let snapshot: Snapshot = tokio::task::spawn_blocking(move || {
            let records = source
                .load()
                .with_context(|| format!("Failed to read transaction source '{}'", source.name()))?;
            Ok::<_, anyhow::Error>(train_snapshot(&records))
        })
        .await
        .context("Training task panicked")??;

        let products_trained = snapshot.rankings.len();
        let mut products_written = 0usize;
        for (key, ranking) in snapshot.rankings {
            match self.store.set(&key, ranking, self.ttl).await {
                Ok(()) => products_written += 1,
                Err(e) => warn!("Skipping model write for '{}': {}", key, e),
            }
        }

        let report = TrainReport {
            products_written,
            products_trained,
            records_used: snapshot.records_used,
            records_skipped: snapshot.records_skipped,
            elapsed: start.elapsed(),
        };
        info!(
            "Model updated: {}/{} products written from {} records ({} skipped) in {:.2?}",
            report.products_written,
            report.products_trained,
            report.records_used,
            report.records_skipped,
            report.elapsed
        );
        Ok(report)
    }

    /// Train now, then again every `interval`, forever.
    ///
    /// Each cycle is independent and idempotent; a failed cycle is logged
    /// and the loop waits for the next one.
    pub async fn run_periodic(&self, interval: Duration) {
        loop {
            info!("Training model from source '{}'...", self.source.name());
            if let Err(e) = self.train_once().await {
                warn!("Training pass failed, keeping previous snapshot: {:#}", e);
            }
            tokio::time::sleep(interval).await;
        }
    }
}
