//! Append-only persistence of every resolved query.
//!
//! The log is write-only from this core's perspective: consumption (billing,
//! analytics, replay) happens elsewhere. The two ingress paths persist with
//! different guarantees, captured by [`PersistencePolicy`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model_store::RankingEntry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// When an ingress persists relative to answering the client.
///
/// - `RespondThenLog` (fail-open): the response is written first; a
///   persistence failure is logged and swallowed. The TCP ingress works this
///   way.
/// - `LogThenRespond` (fail-closed): the entry is persisted first; a
///   persistence failure gates the response (the HTTP ingress answers 500).
///
/// The asymmetry is deliberate and user-visible; changing an ingress's
/// policy changes its latency and failure semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistencePolicy {
    RespondThenLog,
    LogThenRespond,
}

/// One resolved query, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub producto: String,
    pub resultados: Vec<RankingEntry>,
    pub timestamp: DateTime<Utc>,
}

impl QueryLogEntry {
    pub fn new(producto: impl Into<String>, resultados: Vec<RankingEntry>) -> Self {
        Self {
            producto: producto.into(),
            resultados,
            timestamp: Utc::now(),
        }
    }
}

/// Errors that can occur while appending to the query log
#[derive(Error, Debug)]
pub enum QueryLogError {
    #[error("Failed to encode query log entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to persist query log entry: {0}")]
    Io(#[from] std::io::Error),
}

/// The document-store seam: append one entry per resolved query.
///
/// Entries are never mutated or deleted by this core, and there is no read
/// API here.
#[async_trait]
pub trait QueryLog: Send + Sync {
    async fn append(&self, entry: QueryLogEntry) -> Result<(), QueryLogError>;
}

/// JSON-lines file log, the deployment stand-in for the external document
/// store.
///
/// Each append is an independent open/write call, mirroring the
/// one-insert-per-query document store of the original deployment; there is
/// no cross-call transaction.
#[derive(Debug, Clone)]
pub struct JsonlQueryLog {
    path: PathBuf,
}

impl JsonlQueryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl QueryLog for JsonlQueryLog {
    async fn append(&self, entry: QueryLogEntry) -> Result<(), QueryLogError> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

/// In-memory log for tests and ad-hoc runs; exposes what was appended.
#[derive(Debug, Default)]
pub struct MemoryQueryLog {
    entries: Mutex<Vec<QueryLogEntry>>,
}

impl MemoryQueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<QueryLogEntry> {
        self.entries.lock().expect("query log lock poisoned").clone()
    }
}

#[async_trait]
impl QueryLog for MemoryQueryLog {
    async fn append(&self, entry: QueryLogEntry) -> Result<(), QueryLogError> {
        self.entries
            .lock()
            .expect("query log lock poisoned")
            .push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(producto: &str) -> QueryLogEntry {
        QueryLogEntry::new(
            producto,
            vec![RankingEntry::new("MINISTERIO DE EDUCACIÓN", 0.9)],
        )
    }

    #[tokio::test]
    async fn test_jsonl_log_appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consultas.jsonl");
        let log = JsonlQueryLog::new(&path);

        log.append(entry("LAPTOP")).await.unwrap();
        log.append(entry("PAPEL")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: QueryLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.producto, "LAPTOP");
        assert_eq!(first.resultados[0].entidad, "MINISTERIO DE EDUCACIÓN");
    }

    #[tokio::test]
    async fn test_jsonl_log_surfaces_unwritable_path() {
        let log = JsonlQueryLog::new("/definitely/not/a/dir/consultas.jsonl");
        let err = log.append(entry("LAPTOP")).await.unwrap_err();
        assert!(matches!(err, QueryLogError::Io(_)));
    }

    #[tokio::test]
    async fn test_memory_log_records_in_order() {
        let log = MemoryQueryLog::new();
        log.append(entry("LAPTOP")).await.unwrap();
        log.append(entry("PAPEL")).await.unwrap();

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].producto, "LAPTOP");
        assert_eq!(entries[1].producto, "PAPEL");
    }
}
