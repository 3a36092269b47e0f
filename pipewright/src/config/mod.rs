//! Configuration access over the storage bridge.
//!
//! Plugins never touch the store directly; system, pipeline, and plugin
//! configuration all flow through [`ConfigManager`], which inherits the
//! bridge's caching and coherence.

use crate::errors::StorageError;
use crate::storage::{Document, Filter, StorageBridge};
use std::sync::Arc;

/// Collection holding the system-wide configuration document.
const SYSTEM_CONFIG: &str = "system_config";
/// Collection holding per-pipeline configuration documents.
const PIPELINE_CONFIGS: &str = "pipeline_configs";
/// Collection holding per-(plugin, pipeline) configuration documents.
const PLUGIN_CONFIGS: &str = "plugin_configs";

/// Unified interface for reading and updating configuration.
pub struct ConfigManager {
    storage: Arc<StorageBridge>,
    plugin_repo: PluginConfigRepo,
}

impl ConfigManager {
    /// Creates a manager over a storage bridge.
    #[must_use]
    pub fn new(storage: Arc<StorageBridge>) -> Self {
        let plugin_repo = PluginConfigRepo::new(storage.clone());
        Self {
            storage,
            plugin_repo,
        }
    }

    /// Fetches the system-wide configuration document, if present.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn global_config(&self) -> Result<Option<Document>, StorageError> {
        let mut docs = self.storage.get(SYSTEM_CONFIG, &Filter::new(), None)?;
        Ok(if docs.is_empty() {
            None
        } else {
            Some(docs.swap_remove(0))
        })
    }

    /// Fetches a pipeline's configuration document, if present.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn pipeline_config(&self, name: &str) -> Result<Option<Document>, StorageError> {
        let mut filter = Filter::new();
        filter.insert("name".to_string(), serde_json::json!(name));

        let mut docs = self.storage.get(PIPELINE_CONFIGS, &filter, None)?;
        Ok(if docs.is_empty() {
            None
        } else {
            Some(docs.swap_remove(0))
        })
    }

    /// Fetches a plugin's configuration for a pipeline, if present.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn plugin_config(
        &self,
        plugin_id: &str,
        pipeline: &str,
    ) -> Result<Option<Document>, StorageError> {
        self.plugin_repo.get(plugin_id, pipeline, None)
    }

    /// Replaces (or inserts) a plugin's configuration for a pipeline.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn update_plugin_config(
        &self,
        plugin_id: &str,
        pipeline: &str,
        config: Document,
    ) -> Result<(), StorageError> {
        self.plugin_repo.update(plugin_id, pipeline, config, None)
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager").finish_non_exhaustive()
    }
}

/// Access layer for plugin configuration documents.
///
/// Documents are keyed by `(plugin_id, pipeline)`; updates are
/// replace-or-insert and always carry both key fields so the upsert
/// filter keeps matching.
pub struct PluginConfigRepo {
    storage: Arc<StorageBridge>,
}

impl PluginConfigRepo {
    /// Creates a repository over a storage bridge.
    #[must_use]
    pub fn new(storage: Arc<StorageBridge>) -> Self {
        Self { storage }
    }

    fn key_filter(plugin_id: &str, pipeline: &str) -> Filter {
        let mut filter = Filter::new();
        filter.insert("plugin_id".to_string(), serde_json::json!(plugin_id));
        filter.insert("pipeline".to_string(), serde_json::json!(pipeline));
        filter
    }

    /// Fetches the config document for `(plugin_id, pipeline)`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn get(
        &self,
        plugin_id: &str,
        pipeline: &str,
        database: Option<&str>,
    ) -> Result<Option<Document>, StorageError> {
        let mut docs = self.storage.get(
            PLUGIN_CONFIGS,
            &Self::key_filter(plugin_id, pipeline),
            database,
        )?;
        Ok(if docs.is_empty() {
            None
        } else {
            Some(docs.swap_remove(0))
        })
    }

    /// Replaces (or inserts) the config document for
    /// `(plugin_id, pipeline)`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn update(
        &self,
        plugin_id: &str,
        pipeline: &str,
        config: Document,
        database: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut doc = config;
        doc.insert("plugin_id".to_string(), serde_json::json!(plugin_id));
        doc.insert("pipeline".to_string(), serde_json::json!(pipeline));

        self.storage.update(
            PLUGIN_CONFIGS,
            &Self::key_filter(plugin_id, pipeline),
            doc,
            true,
            database,
        )?;
        Ok(())
    }

    /// Inserts a new config document for `(plugin_id, pipeline)`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn insert(
        &self,
        plugin_id: &str,
        pipeline: &str,
        config: Document,
        database: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut doc = config;
        doc.insert("plugin_id".to_string(), serde_json::json!(plugin_id));
        doc.insert("pipeline".to_string(), serde_json::json!(pipeline));

        self.storage.insert(PLUGIN_CONFIGS, doc, false, database)?;
        Ok(())
    }

    /// Deletes the config document for `(plugin_id, pipeline)`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn delete(
        &self,
        plugin_id: &str,
        pipeline: &str,
        database: Option<&str>,
    ) -> Result<(), StorageError> {
        self.storage.delete(
            PLUGIN_CONFIGS,
            &Self::key_filter(plugin_id, pipeline),
            database,
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for PluginConfigRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginConfigRepo").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn doc(json: serde_json::Value) -> Document {
        match json {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn manager() -> ConfigManager {
        let bridge = StorageBridge::new(Arc::new(MemoryStore::new())).unwrap();
        ConfigManager::new(Arc::new(bridge))
    }

    #[test]
    fn test_plugin_config_roundtrip() {
        let manager = manager();

        assert!(manager.plugin_config("gather_plugin", "markets").unwrap().is_none());

        manager
            .update_plugin_config(
                "gather_plugin",
                "markets",
                doc(serde_json::json!({"interval": "1h"})),
            )
            .unwrap();

        let config = manager
            .plugin_config("gather_plugin", "markets")
            .unwrap()
            .unwrap();
        assert_eq!(config.get("interval"), Some(&serde_json::json!("1h")));
        assert_eq!(config.get("plugin_id"), Some(&serde_json::json!("gather_plugin")));
        assert_eq!(config.get("pipeline"), Some(&serde_json::json!("markets")));
    }

    #[test]
    fn test_update_replaces_existing() {
        let manager = manager();

        manager
            .update_plugin_config(
                "gather_plugin",
                "markets",
                doc(serde_json::json!({"interval": "1h"})),
            )
            .unwrap();
        manager
            .update_plugin_config(
                "gather_plugin",
                "markets",
                doc(serde_json::json!({"interval": "4h"})),
            )
            .unwrap();

        let config = manager
            .plugin_config("gather_plugin", "markets")
            .unwrap()
            .unwrap();
        assert_eq!(config.get("interval"), Some(&serde_json::json!("4h")));
    }

    #[test]
    fn test_configs_are_scoped_per_pipeline() {
        let manager = manager();

        manager
            .update_plugin_config(
                "gather_plugin",
                "markets",
                doc(serde_json::json!({"interval": "1h"})),
            )
            .unwrap();

        assert!(manager.plugin_config("gather_plugin", "futures").unwrap().is_none());
    }

    #[test]
    fn test_global_and_pipeline_config() {
        let bridge = Arc::new(StorageBridge::new(Arc::new(MemoryStore::new())).unwrap());
        let manager = ConfigManager::new(bridge.clone());

        assert!(manager.global_config().unwrap().is_none());

        bridge
            .insert(
                "system_config",
                doc(serde_json::json!({"scheduler": {"max_workers": 4}})),
                false,
                None,
            )
            .unwrap();
        bridge
            .insert(
                "pipeline_configs",
                doc(serde_json::json!({"name": "markets", "schedule": "hourly"})),
                false,
                None,
            )
            .unwrap();

        assert!(manager.global_config().unwrap().is_some());
        let pipeline = manager.pipeline_config("markets").unwrap().unwrap();
        assert_eq!(pipeline.get("schedule"), Some(&serde_json::json!("hourly")));
        assert!(manager.pipeline_config("missing").unwrap().is_none());
    }

    #[test]
    fn test_repo_delete() {
        let bridge = Arc::new(StorageBridge::new(Arc::new(MemoryStore::new())).unwrap());
        let repo = PluginConfigRepo::new(bridge);

        repo.insert(
            "gather_plugin",
            "markets",
            doc(serde_json::json!({"interval": "1h"})),
            None,
        )
        .unwrap();
        assert!(repo.get("gather_plugin", "markets", None).unwrap().is_some());

        repo.delete("gather_plugin", "markets", None).unwrap();
        assert!(repo.get("gather_plugin", "markets", None).unwrap().is_none());
    }
}
