//! Plugin contract, registry, and invocation wrapper.
//!
//! Plugins are the units of work bound to pipeline hooks. Each one
//! implements [`Plugin::run`] and may return a replacement context that
//! the engine threads to every subsequent plugin in the run.

mod invoker;
mod registry;

use crate::context::RunContext;
use crate::errors::PluginError;
use std::collections::HashMap;
use std::fmt::Debug;

pub use invoker::PluginInvoker;
pub use registry::PluginRegistry;

/// Trait for pipeline plugins.
///
/// Implementations must be thread-safe: concurrent pipeline runs may
/// invoke the same plugin instance at the same time, each with its own
/// context.
pub trait Plugin: Send + Sync {
    /// Returns the plugin's registry id.
    fn id(&self) -> &str;

    /// Executes the plugin.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The run context, read-only for the plugin
    /// * `config` - The plugin's configuration for this pipeline
    /// * `pipeline` - The name of the executing pipeline
    ///
    /// # Errors
    ///
    /// A returned error is logged by the invocation wrapper and isolated
    /// per `(hook, plugin)` by the engine.
    fn run(
        &self,
        ctx: &RunContext,
        config: &serde_json::Value,
        pipeline: &str,
    ) -> Result<PluginOutcome, PluginError>;
}

/// The result of a plugin invocation.
#[derive(Debug, Clone, Default)]
pub struct PluginOutcome {
    /// Optional full replacement context for subsequent plugins.
    pub context: Option<RunContext>,
    /// Data produced by the plugin.
    pub data: HashMap<String, serde_json::Value>,
}

impl PluginOutcome {
    /// Creates an empty successful outcome.
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// Creates an outcome carrying a replacement context.
    #[must_use]
    pub fn with_context(ctx: RunContext) -> Self {
        Self {
            context: Some(ctx),
            data: HashMap::new(),
        }
    }

    /// Adds a data entry to the outcome.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// A simple function-based plugin.
pub struct FnPlugin<F>
where
    F: Fn(&RunContext, &serde_json::Value, &str) -> Result<PluginOutcome, PluginError>
        + Send
        + Sync,
{
    id: String,
    func: F,
}

impl<F> FnPlugin<F>
where
    F: Fn(&RunContext, &serde_json::Value, &str) -> Result<PluginOutcome, PluginError>
        + Send
        + Sync,
{
    /// Creates a new function-based plugin.
    pub fn new(id: impl Into<String>, func: F) -> Self {
        Self {
            id: id.into(),
            func,
        }
    }
}

impl<F> Debug for FnPlugin<F>
where
    F: Fn(&RunContext, &serde_json::Value, &str) -> Result<PluginOutcome, PluginError>
        + Send
        + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPlugin").field("id", &self.id).finish()
    }
}

impl<F> Plugin for FnPlugin<F>
where
    F: Fn(&RunContext, &serde_json::Value, &str) -> Result<PluginOutcome, PluginError>
        + Send
        + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn run(
        &self,
        ctx: &RunContext,
        config: &serde_json::Value,
        pipeline: &str,
    ) -> Result<PluginOutcome, PluginError> {
        (self.func)(ctx, config, pipeline)
    }
}

/// A no-op plugin for testing.
#[derive(Debug, Clone)]
pub struct NoOpPlugin {
    id: String,
}

impl NoOpPlugin {
    /// Creates a new no-op plugin.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Plugin for NoOpPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(
        &self,
        _ctx: &RunContext,
        _config: &serde_json::Value,
        _pipeline: &str,
    ) -> Result<PluginOutcome, PluginError> {
        Ok(PluginOutcome::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_plugin() {
        let plugin = FnPlugin::new("echo_plugin", |_ctx, config, _pipeline| {
            Ok(PluginOutcome::ok().with_data("echo", config.clone()))
        });

        assert_eq!(plugin.id(), "echo_plugin");

        let ctx = RunContext::new("markets", "fetch");
        let outcome = plugin
            .run(&ctx, &serde_json::json!({"k": "v"}), "markets")
            .unwrap();
        assert_eq!(outcome.data.get("echo"), Some(&serde_json::json!({"k": "v"})));
        assert!(outcome.context.is_none());
    }

    #[test]
    fn test_noop_plugin() {
        let plugin = NoOpPlugin::new("noop");
        let ctx = RunContext::new("markets", "fetch");

        let outcome = plugin.run(&ctx, &serde_json::json!({}), "markets").unwrap();
        assert!(outcome.data.is_empty());
    }

    #[test]
    fn test_outcome_with_context() {
        let mut ctx = RunContext::new("markets", "fetch");
        ctx.set("x", serde_json::json!(1));

        let outcome = PluginOutcome::with_context(ctx);
        assert!(outcome.context.is_some());
    }
}
