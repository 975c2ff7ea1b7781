//! The transaction source abstraction.
//!
//! The trainer doesn't care where (product, entity) pairs come from; it asks
//! a [`TransactionSource`] for the full set once per training pass. The CSV
//! report is the production source; tests substitute a static one.

use crate::error::Result;
use crate::parser;
use crate::types::TransactionRecord;
use std::path::PathBuf;

/// Supplies the ordered sequence of transaction records for one training pass.
///
/// - `Send + Sync` allows sources to be shared across tasks
/// - `load` reads the whole pass eagerly; a failed read must leave no
///   partial state behind (the trainer keeps the previous snapshot)
pub trait TransactionSource: Send + Sync {
    /// Returns the name of this source (for logging/debugging)
    fn name(&self) -> &str;

    /// Load every record for one training pass.
    fn load(&self) -> Result<Vec<TransactionRecord>>;
}

/// Production source: the purchase-order CSV report on disk.
#[derive(Debug, Clone)]
pub struct CsvTransactionSource {
    path: PathBuf,
}

impl CsvTransactionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl TransactionSource for CsvTransactionSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self) -> Result<Vec<TransactionRecord>> {
        parser::load_transactions(&self.path)
    }
}

/// Fixed in-memory source, mainly for tests and ad-hoc training runs.
#[derive(Debug, Clone, Default)]
pub struct StaticTransactionSource {
    records: Vec<TransactionRecord>,
}

impl StaticTransactionSource {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }
}

impl TransactionSource for StaticTransactionSource {
    fn name(&self) -> &str {
        "static"
    }

    fn load(&self) -> Result<Vec<TransactionRecord>> {
        Ok(self.records.clone())
    }
}
