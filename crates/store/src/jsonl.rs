//! File-based backend — one JSON-lines file per collection.
//!
//! Records are appended as single lines and never rewritten, which keeps the
//! audit trail human-inspectable and safe against partial writes: a torn
//! trailing line is skipped on read.
//!
//! Storage location: `~/.autoforge/records/<collection>.jsonl`

use async_trait::async_trait;
use autoforge_core::error::StoreError;
use autoforge_core::store::{RecordFilter, RecordStore};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct JsonlStore {
    dir: PathBuf,
    /// Serializes appends so lines from concurrent writers never interleave.
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Create a store rooted at `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, collection: &str) -> Result<PathBuf, StoreError> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Unavailable(format!(
                "invalid collection name '{collection}'"
            )));
        }
        Ok(self.dir.join(format!("{collection}.jsonl")))
    }
}

#[async_trait]
impl RecordStore for JsonlStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn append_record(&self, collection: &str, record: Value) -> Result<(), StoreError> {
        let path = self.path_for(collection)?;
        let mut line = serde_json::to_string(&record)
            .map_err(|e| StoreError::WriteFailed(format!("Failed to serialize record: {e}")))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to create store directory: {e}"))
        })?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open {}: {e}", path.display())))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::WriteFailed(format!("Failed to write record: {e}")))?;
        file.flush()
            .await
            .map_err(|e| StoreError::WriteFailed(format!("Failed to flush record: {e}")))?;

        debug!(collection, path = %path.display(), "Record appended");
        Ok(())
    }

    async fn query(&self, collection: &str, filter: &RecordFilter) -> Result<Vec<Value>, StoreError> {
        let path = self.path_for(collection)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::QueryFailed(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let records: Vec<Value> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Value>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(collection, error = %e, "Skipping corrupted record line");
                    None
                }
            })
            .collect();

        Ok(filter.apply(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn append_then_query_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("records"));

        for n in 0..3 {
            store.append_record("construction_records", json!({"n": n})).await.unwrap();
        }

        let records = store
            .query("construction_records", &RecordFilter::all())
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["n"], 0);
        assert_eq!(records[2]["n"], 2);

        let newest = store
            .query("construction_records", &RecordFilter::all().newest(1))
            .await
            .unwrap();
        assert_eq!(newest[0]["n"], 2);
    }

    #[tokio::test]
    async fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        JsonlStore::new(dir.path())
            .append_record("evolution_cycles", json!({"id": "c1"}))
            .await
            .unwrap();

        let reopened = JsonlStore::new(dir.path());
        let cycles = reopened.query("evolution_cycles", &RecordFilter::all()).await.unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0]["id"], "c1");
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());
        assert!(store.query("nothing", &RecordFilter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupted_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("runs.jsonl"),
            "{\"id\": \"ok\"}\n{not json\n\n{\"id\": \"also ok\"}\n",
        )
        .unwrap();

        let store = JsonlStore::new(dir.path());
        let records = store.query("runs", &RecordFilter::all()).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn collection_names_cannot_escape_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());
        assert!(store.append_record("../evil", json!({})).await.is_err());
        assert!(store.query("a/b", &RecordFilter::all()).await.is_err());
    }
}
