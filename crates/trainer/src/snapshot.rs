//! The co-occurrence training pass.
//!
//! ## Algorithm
//! 1. Drop malformed records (missing product or entity)
//! 2. Group records by normalized product key
//! 3. Count occurrences per distinct entity within each group
//! 4. score(entity) = count(entity) / total count for the product
//! 5. Sort descending by score, truncate to the ranking cap
//!
//! The per-product counting runs as a rayon fold/reduce so large reports
//! aggregate across cores. Entities with exactly tied scores have no defined
//! relative order.

use data_loader::TransactionRecord;
use model_store::{MAX_RANKING_LEN, RankingEntry, normalize_key};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Output of one training pass, before it is written to the model store.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Normalized product key → ranking, descending by score, ≤ 10 entries
    pub rankings: HashMap<String, Vec<RankingEntry>>,
    /// Records that contributed to the counts
    pub records_used: usize,
    /// Malformed records dropped on the way in
    pub records_skipped: usize,
}

/// Build a ranked snapshot from one pass over the transaction records.
///
/// Pure and deterministic up to tie order: re-running on the same input
/// reproduces the same (entity, score) sets per product.
pub fn train_snapshot(records: &[TransactionRecord]) -> Snapshot {
    let records_skipped = records.iter().filter(|r| r.is_malformed()).count();
    let records_used = records.len() - records_skipped;

    // producto -> entidad -> frequency
    let counts: HashMap<String, HashMap<String, u64>> = records
        .par_iter()
        .filter(|r| !r.is_malformed())
        .fold(HashMap::new, |mut local: HashMap<String, HashMap<String, u64>>, record| {
            *local
                .entry(normalize_key(&record.producto))
                .or_default()
                .entry(record.entidad.clone())
                .or_insert(0) += 1;
            local
        })
        .reduce(HashMap::new, |mut merged, local| {
            for (producto, entidades) in local {
                let slot = merged.entry(producto).or_default();
                for (entidad, freq) in entidades {
                    *slot.entry(entidad).or_insert(0) += freq;
                }
            }
            merged
        });

    let rankings: HashMap<String, Vec<RankingEntry>> = counts
        .into_iter()
        .map(|(producto, entidades)| {
            let total: u64 = entidades.values().sum();
            let mut ranking: Vec<RankingEntry> = entidades
                .into_iter()
                .map(|(entidad, freq)| RankingEntry::new(entidad, freq as f64 / total as f64))
                .collect();
            ranking.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            ranking.truncate(MAX_RANKING_LEN);
            (producto, ranking)
        })
        .collect();

    debug!(
        "Trained snapshot: {} products from {} records ({} skipped)",
        rankings.len(),
        records_used,
        records_skipped
    );

    Snapshot {
        rankings,
        records_used,
        records_skipped,
    }
}
