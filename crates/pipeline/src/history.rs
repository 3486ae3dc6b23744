//! Append-only in-memory history, bounded to the newest entries.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Entries retained unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Records are shared, never mutated, and only ever appended. Once
/// `capacity` is reached the oldest entry is dropped.
pub struct History<T> {
    entries: RwLock<VecDeque<Arc<T>>>,
    capacity: usize,
    total: AtomicUsize,
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
            total: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `entry`, returning the shared handle stored in the history.
    pub async fn push(&self, entry: T) -> Arc<T> {
        let entry = Arc::new(entry);
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        self.total.fetch_add(1, Ordering::Relaxed);
        entry
    }

    /// Retained entries, oldest first.
    pub async fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Retained entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Every entry ever pushed, evicted ones included.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn last(&self) -> Option<Arc<T>> {
        self.entries.read().await.back().cloned()
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_only_snapshot() {
        let history = History::new();
        history.push("a").await;
        let snapshot = history.snapshot().await;
        history.push("b").await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(history.len().await, 2);
        assert_eq!(*history.last().await.unwrap(), "b");
    }

    #[tokio::test]
    async fn keeps_newest_within_capacity() {
        let history = History::with_capacity(2);
        for entry in ["a", "b", "c"] {
            history.push(entry).await;
        }

        let kept: Vec<&str> = history.snapshot().await.iter().map(|e| **e).collect();
        assert_eq!(kept, vec!["b", "c"]);
        assert_eq!(history.len().await, 2);
        assert_eq!(history.total(), 3);
    }
}
