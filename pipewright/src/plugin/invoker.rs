//! Plugin invocation wrapper.

use super::{Plugin, PluginOutcome};
use crate::context::RunContext;
use crate::errors::PluginError;
use tracing::error;

/// Invokes `Plugin::run` and applies the inner error boundary.
///
/// The wrapper logs a failure with structured fields and re-raises it;
/// isolation happens one level up, in the engine's per-plugin catch.
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginInvoker;

impl PluginInvoker {
    /// Creates a new invoker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs a plugin, logging and propagating any failure.
    ///
    /// # Errors
    ///
    /// Returns whatever error the plugin body produced, after logging it.
    pub fn invoke(
        &self,
        plugin: &dyn Plugin,
        ctx: &RunContext,
        config: &serde_json::Value,
        pipeline: &str,
    ) -> Result<PluginOutcome, PluginError> {
        match plugin.run(ctx, config, pipeline) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(
                    plugin = %plugin.id(),
                    pipeline = %pipeline,
                    error = %e,
                    "plugin execution failed"
                );
                Err(e)
            }
        }
    }
}
