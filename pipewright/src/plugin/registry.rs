//! Plugin registry mapping plugin ids to implementations.

use super::Plugin;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry for plugin instances.
///
/// Populated at startup; lookups during execution are read-only. An
/// unknown id is reported per-plugin by the engine, never as a chain
/// abort.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<dyn Plugin>>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under its own id, replacing any previous entry.
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        self.plugins
            .write()
            .insert(plugin.id().to_string(), plugin);
    }

    /// Looks up a plugin by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.read().get(id).cloned()
    }

    /// Checks if a plugin id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.plugins.read().contains_key(id)
    }

    /// Returns all registered plugin ids.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.plugins.read().keys().cloned().collect()
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    /// Returns true if no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.ids())
            .finish()
    }
}
