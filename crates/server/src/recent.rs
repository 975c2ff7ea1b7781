//! Bounded, shared record of the most recent resolutions.
//!
//! Every resolved query, from any connection or request, lands here; the
//! HTTP status endpoint reads it back for debugging. Bounded so an arbitrary
//! query volume cannot grow process memory.

use crate::query_log::QueryLogEntry;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Default number of resolutions kept.
pub const DEFAULT_RECENT_CAPACITY: usize = 32;

/// Thread-safe ring buffer of the latest resolutions.
#[derive(Debug)]
pub struct RecentResults {
    capacity: usize,
    entries: Mutex<VecDeque<QueryLogEntry>>,
}

impl RecentResults {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RECENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Record one resolution, evicting the oldest when full.
    pub fn record(&self, entry: QueryLogEntry) {
        let mut entries = self.entries.lock().expect("recent results lock poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The retained resolutions, most recent first.
    pub fn snapshot(&self) -> Vec<QueryLogEntry> {
        let entries = self.entries.lock().expect("recent results lock poisoned");
        entries.iter().rev().cloned().collect()
    }
}

impl Default for RecentResults {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_store::RankingEntry;

    fn entry(producto: &str) -> QueryLogEntry {
        QueryLogEntry::new(producto, vec![RankingEntry::new("X", 0.5)])
    }

    #[test]
    fn test_snapshot_is_most_recent_first() {
        let recent = RecentResults::new();
        recent.record(entry("A"));
        recent.record(entry("B"));

        let snapshot = recent.snapshot();
        assert_eq!(snapshot[0].producto, "B");
        assert_eq!(snapshot[1].producto, "A");
    }

    #[test]
    fn test_capacity_is_bounded() {
        let recent = RecentResults::with_capacity(3);
        for name in ["A", "B", "C", "D", "E"] {
            recent.record(entry(name));
        }

        let snapshot = recent.snapshot();
        assert_eq!(snapshot.len(), 3, "oldest entries are evicted");
        let names: Vec<_> = snapshot.iter().map(|e| e.producto.as_str()).collect();
        assert_eq!(names, vec!["E", "D", "C"]);
    }

    #[test]
    fn test_empty_snapshot() {
        let recent = RecentResults::new();
        assert!(recent.snapshot().is_empty());
    }
}
