//! Pipeline definitions and run summaries.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named, ordered sequence of hooks to execute.
///
/// Definitions are created from external configuration at process start
/// and are read-only during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// The pipeline name.
    pub name: String,
    /// Hooks in execution order.
    #[serde(default)]
    pub hooks: Vec<String>,
    /// Optional schedule expression, consumed by an external ticker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// Optional command forwarded to plugins through the context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Optional priority used when the pipeline is dispatched as a job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl PipelineDefinition {
    /// Creates a definition with no hooks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: Vec::new(),
            schedule: None,
            command: None,
            priority: None,
        }
    }

    /// Sets the ordered hook list.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.hooks = hooks.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl Into<String>) -> Self {
        self.hooks.push(hook.into());
        self
    }

    /// Sets the schedule expression.
    #[must_use]
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    /// Sets the command.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Sets the job priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// The outcome of one plugin invocation within a run.
#[derive(Debug, Clone)]
pub struct PluginRunRecord {
    /// The plugin id.
    pub plugin: String,
    /// The hook the plugin was bound to.
    pub hook: String,
    /// The failure message, when the plugin failed.
    pub error: Option<String>,
}

impl PluginRunRecord {
    /// Records a successful invocation.
    #[must_use]
    pub fn ok(plugin: impl Into<String>, hook: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            hook: hook.into(),
            error: None,
        }
    }

    /// Records a failed invocation.
    #[must_use]
    pub fn failed(
        plugin: impl Into<String>,
        hook: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            hook: hook.into(),
            error: Some(error.into()),
        }
    }
}

/// The outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The run id.
    pub run_id: Uuid,
    /// The pipeline name.
    pub pipeline: String,
    /// Plugins that completed.
    pub executed: Vec<PluginRunRecord>,
    /// Plugins that failed (and were isolated).
    pub failed: Vec<PluginRunRecord>,
    /// Whether the run was cancelled before reaching the end of its
    /// hook chain.
    pub cancelled: bool,
}

impl RunSummary {
    /// Creates an empty summary for a starting run.
    #[must_use]
    pub fn new(run_id: Uuid, pipeline: impl Into<String>) -> Self {
        Self {
            run_id,
            pipeline: pipeline.into(),
            executed: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }
}
