//! Run history persisted through the storage bridge.

use crate::errors::StorageError;
use crate::storage::{Document, Filter, StorageBridge};
use crate::utils::iso_timestamp;
use std::sync::Arc;

/// Collection holding run history entries.
const RUN_HISTORY: &str = "run_history";

/// Tracks pipeline and plugin execution outcomes.
pub struct RunHistory {
    storage: Arc<StorageBridge>,
}

impl RunHistory {
    /// Creates a history tracker over a storage bridge.
    #[must_use]
    pub fn new(storage: Arc<StorageBridge>) -> Self {
        Self { storage }
    }

    /// Records one execution outcome.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn record(
        &self,
        pipeline: &str,
        plugin: &str,
        status: &str,
        details: serde_json::Value,
    ) -> Result<(), StorageError> {
        let mut entry = Document::new();
        entry.insert("pipeline".to_string(), serde_json::json!(pipeline));
        entry.insert("plugin".to_string(), serde_json::json!(plugin));
        entry.insert("status".to_string(), serde_json::json!(status));
        entry.insert("details".to_string(), details);
        entry.insert("timestamp".to_string(), serde_json::json!(iso_timestamp()));

        self.storage.insert(RUN_HISTORY, entry, false, None)?;
        Ok(())
    }

    /// Fetches recorded runs, optionally filtered by pipeline and/or
    /// plugin.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn runs(
        &self,
        pipeline: Option<&str>,
        plugin: Option<&str>,
    ) -> Result<Vec<Document>, StorageError> {
        let mut filter = Filter::new();
        if let Some(pipeline) = pipeline {
            filter.insert("pipeline".to_string(), serde_json::json!(pipeline));
        }
        if let Some(plugin) = plugin {
            filter.insert("plugin".to_string(), serde_json::json!(plugin));
        }
        self.storage.get(RUN_HISTORY, &filter, None)
    }
}

impl std::fmt::Debug for RunHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHistory").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn history() -> RunHistory {
        let bridge = StorageBridge::new(Arc::new(MemoryStore::new())).unwrap();
        RunHistory::new(Arc::new(bridge))
    }

    #[test]
    fn test_record_and_filter() {
        let history = history();

        history
            .record("markets", "gather_plugin", "ok", serde_json::json!({}))
            .unwrap();
        history
            .record("markets", "debug_plugin", "error", serde_json::json!({"error": "boom"}))
            .unwrap();
        history
            .record("futures", "gather_plugin", "ok", serde_json::json!({}))
            .unwrap();

        assert_eq!(history.runs(None, None).unwrap().len(), 3);
        assert_eq!(history.runs(Some("markets"), None).unwrap().len(), 2);
        assert_eq!(history.runs(None, Some("gather_plugin")).unwrap().len(), 2);
        assert_eq!(
            history.runs(Some("markets"), Some("debug_plugin")).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_entries_carry_timestamp() {
        let history = history();
        history
            .record("markets", "gather_plugin", "ok", serde_json::json!({}))
            .unwrap();

        let runs = history.runs(None, None).unwrap();
        assert!(runs[0].get("timestamp").and_then(|t| t.as_str()).is_some());
    }
}
