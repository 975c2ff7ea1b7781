//! Ranking domain types shared across the trainer, the store, the worker
//! protocol and the server.

use serde::{Deserialize, Serialize};

/// Maximum number of entries kept per product ranking.
pub const MAX_RANKING_LEN: usize = 10;

/// One ranked answer: a purchasing entity and its normalized co-occurrence
/// score for the queried product.
///
/// Scores live in [0, 1]; within one product's pre-truncation ranking they
/// sum to 1.0 (± floating-point epsilon).
///
/// Field names are the wire names: the same shape is stored in the model
/// store, sent in TCP response frames and returned by the HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub entidad: String,
    pub score: f64,
}

impl RankingEntry {
    pub fn new(entidad: impl Into<String>, score: f64) -> Self {
        Self {
            entidad: entidad.into(),
            score,
        }
    }
}

/// Normalize a product name into a model key.
///
/// Keys are always normalized before store or lookup, so "  Laptop " and
/// "LAPTOP" resolve to the same ranking.
pub fn normalize_key(producto: &str) -> String {
    producto.trim().to_lowercase()
}
