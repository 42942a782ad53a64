//! Document store counters
//!
//! Counters only, monotonic, reset only when the registry is created.
//! Relaxed atomics; exact totals once writers are quiescent.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    documents_stored: AtomicU64,
    documents_updated: AtomicU64,
    documents_deleted: AtomicU64,
    /// Index rows inserted by store and update
    index_entries_written: AtomicU64,
    writes_rolled_back: AtomicU64,
    queries_executed: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_documents_stored(&self) {
        self.documents_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_documents_updated(&self) {
        self.documents_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_documents_deleted(&self) {
        self.documents_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_index_entries(&self, count: u64) {
        self.index_entries_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_writes_rolled_back(&self) {
        self.writes_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_stored: self.documents_stored.load(Ordering::Relaxed),
            documents_updated: self.documents_updated.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            index_entries_written: self.index_entries_written.load(Ordering::Relaxed),
            writes_rolled_back: self.writes_rolled_back.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
        }
    }

    /// Current values as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::json!(self.snapshot()).to_string()
    }
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub documents_stored: u64,
    pub documents_updated: u64,
    pub documents_deleted: u64,
    pub index_entries_written: u64,
    pub writes_rolled_back: u64,
    pub queries_executed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zero() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_documents_stored();
        registry.increment_documents_stored();
        registry.increment_documents_updated();
        registry.increment_documents_deleted();
        registry.add_index_entries(7);
        registry.increment_writes_rolled_back();
        registry.increment_queries_executed();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.documents_stored, 2);
        assert_eq!(snapshot.documents_updated, 1);
        assert_eq!(snapshot.documents_deleted, 1);
        assert_eq!(snapshot.index_entries_written, 7);
        assert_eq!(snapshot.writes_rolled_back, 1);
        assert_eq!(snapshot.queries_executed, 1);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.add_index_entries(1234);
        registry.increment_queries_executed();

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["index_entries_written"], 1234);
        assert_eq!(parsed["queries_executed"], 1);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        registry.increment_queries_executed();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.snapshot().queries_executed, 800);
    }
}
