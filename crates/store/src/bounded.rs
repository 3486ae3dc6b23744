//! Time-bounded writes for callers that must not wait on storage.

use autoforge_core::error::StoreError;
use autoforge_core::store::RecordStore;
use serde_json::Value;
use std::time::Duration;

/// Default bound on a best-effort record write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Append `record`, giving up after `timeout`. The in-flight write is
/// dropped on expiry.
pub async fn append_within(
    store: &dyn RecordStore,
    collection: &str,
    record: Value,
    timeout: Duration,
) -> Result<(), StoreError> {
    match tokio::time::timeout(timeout, store.append_record(collection, record)).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::TimedOut {
            secs: timeout.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryStore;
    use async_trait::async_trait;
    use autoforge_core::store::RecordFilter;
    use serde_json::json;

    struct StalledStore;

    #[async_trait]
    impl RecordStore for StalledStore {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn append_record(&self, _collection: &str, _record: Value) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn query(&self, _collection: &str, _filter: &RecordFilter) -> Result<Vec<Value>, StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_write_times_out() {
        let result = append_within(&StalledStore, "runs", json!({}), Duration::from_secs(2)).await;
        assert!(matches!(result, Err(StoreError::TimedOut { secs: 2 })));
    }

    #[tokio::test]
    async fn healthy_write_passes_through() {
        let store = InMemoryStore::new();
        append_within(&store, "runs", json!({"id": 1}), DEFAULT_WRITE_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(store.count("runs").await, 1);
    }
}
