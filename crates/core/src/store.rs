//! Store trait — the persistence collaborator.
//!
//! Records are appended as JSON values into named collections and never
//! updated in place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// Collection holding construction records.
pub const CONSTRUCTION_RECORDS: &str = "construction_records";

/// Collection holding evolution cycles.
pub const EVOLUTION_CYCLES: &str = "evolution_cycles";

/// A query over one collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Top-level field equality matches; all must hold.
    #[serde(default)]
    pub equals: Vec<(String, serde_json::Value)>,

    /// Keep only the newest `limit` records (insertion order).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.equals.push((name.into(), value));
        self
    }

    pub fn newest(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record satisfies every equality clause.
    pub fn matches(&self, record: &serde_json::Value) -> bool {
        self.equals
            .iter()
            .all(|(name, expected)| record.get(name) == Some(expected))
    }

    /// Apply the filter to records in insertion order.
    pub fn apply<'a>(
        &self,
        records: impl IntoIterator<Item = &'a serde_json::Value>,
    ) -> Vec<serde_json::Value> {
        let matched: Vec<serde_json::Value> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        match self.limit {
            Some(limit) if matched.len() > limit => matched[matched.len() - limit..].to_vec(),
            _ => matched,
        }
    }
}

/// The core RecordStore trait.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// A human-readable name for this backend (e.g., "jsonl", "in_memory").
    fn name(&self) -> &str;

    /// Append one record to a collection.
    async fn append_record(
        &self,
        collection: &str,
        record: serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Records of a collection matching `filter`, oldest first.
    async fn query(
        &self,
        collection: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<serde_json::Value>, StoreError>;
}
