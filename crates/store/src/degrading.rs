//! A store that degrades instead of failing.
//!
//! Writes go to the primary backend; when it errors, the record lands in the
//! fallback and a warning is logged. Queries merge both by record
//! `timestamp` so records written while degraded stay visible and in order.

use async_trait::async_trait;
use autoforge_core::error::StoreError;
use chrono::{DateTime, Utc};
use autoforge_core::store::{RecordFilter, RecordStore};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

pub struct DegradingStore {
    primary: Arc<dyn RecordStore>,
    fallback: Arc<dyn RecordStore>,
    degraded_writes: AtomicUsize,
}

impl DegradingStore {
    pub fn new(primary: Arc<dyn RecordStore>, fallback: Arc<dyn RecordStore>) -> Self {
        Self {
            primary,
            fallback,
            degraded_writes: AtomicUsize::new(0),
        }
    }

    /// Records that went to the fallback because the primary failed.
    pub fn degraded_writes(&self) -> usize {
        self.degraded_writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordStore for DegradingStore {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn append_record(&self, collection: &str, record: Value) -> Result<(), StoreError> {
        match self.primary.append_record(collection, record.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    primary = %self.primary.name(),
                    fallback = %self.fallback.name(),
                    collection,
                    error = %e,
                    "Primary store failed, degrading"
                );
                self.degraded_writes.fetch_add(1, Ordering::Relaxed);
                self.fallback.append_record(collection, record).await
            }
        }
    }

    async fn query(&self, collection: &str, filter: &RecordFilter) -> Result<Vec<Value>, StoreError> {
        let unlimited = RecordFilter {
            limit: None,
            ..filter.clone()
        };

        let mut records = match self.primary.query(collection, &unlimited).await {
            Ok(records) => records,
            Err(e) => {
                warn!(primary = %self.primary.name(), collection, error = %e, "Primary store query failed, using fallback only");
                Vec::new()
            }
        };
        records.extend(self.fallback.query(collection, &unlimited).await?);
        records.sort_by_key(timestamp_of);

        let limit_only = RecordFilter {
            equals: Vec::new(),
            limit: filter.limit,
        };
        Ok(limit_only.apply(&records))
    }
}

/// Undated records sort before dated ones; ties keep primary-then-fallback order.
fn timestamp_of(record: &Value) -> Option<DateTime<Utc>> {
    record
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}
