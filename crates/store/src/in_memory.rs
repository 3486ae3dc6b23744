//! In-memory backend — useful for testing and as the degraded fallback.

use async_trait::async_trait;
use autoforge_core::error::StoreError;
use autoforge_core::store::{RecordFilter, RecordStore};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Records kept per collection unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 1000;

/// An in-memory store keeping the newest `capacity` records of each
/// collection.
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, VecDeque<Value>>>>,
    capacity: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of records in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, VecDeque::len)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn name(&self) -> &str { "in_memory" }

    async fn append_record(&self, collection: &str, record: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }

    async fn query(&self, collection: &str, filter: &RecordFilter) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|records| filter.apply(records))
            .unwrap_or_default())
    }
}
