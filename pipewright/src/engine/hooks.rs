//! Hook-to-plugin registry.

use std::collections::HashMap;

/// Maps each hook to its ordered plugin id list.
///
/// Built once at startup from pipeline definitions and explicit
/// bindings; immutable during execution.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    bindings: HashMap<String, Vec<String>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the ordered plugin list for a hook, replacing any
    /// previous binding.
    pub fn register(
        &mut self,
        hook: impl Into<String>,
        plugin_ids: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.bindings.insert(
            hook.into(),
            plugin_ids.into_iter().map(Into::into).collect(),
        );
    }

    /// Returns the ordered plugin ids for a hook; empty for unknown
    /// hooks.
    #[must_use]
    pub fn plugins_for(&self, hook: &str) -> &[String] {
        self.bindings.get(hook).map_or(&[], Vec::as_slice)
    }

    /// Checks whether a hook has a binding.
    #[must_use]
    pub fn contains(&self, hook: &str) -> bool {
        self.bindings.contains_key(hook)
    }

    /// Returns all bound hook names.
    #[must_use]
    pub fn hooks(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    /// Returns the number of bound hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = HookRegistry::new();
        registry.register("fetch", ["gather_plugin", "validate_plugin"]);

        assert_eq!(
            registry.plugins_for("fetch"),
            &["gather_plugin".to_string(), "validate_plugin".to_string()]
        );
        assert!(registry.plugins_for("unknown").is_empty());
    }

    #[test]
    fn test_register_replaces_binding() {
        let mut registry = HookRegistry::new();
        registry.register("fetch", ["a_plugin"]);
        registry.register("fetch", ["b_plugin"]);

        assert_eq!(registry.plugins_for("fetch"), &["b_plugin".to_string()]);
        assert_eq!(registry.len(), 1);
    }
}
