//! Run-scoped execution context threaded through a pipeline's plugin chain.
//!
//! A [`RunContext`] is created fresh for every pipeline run and owned
//! exclusively by the executing thread. Plugins receive it read-only and
//! may return a full replacement context, which the engine then threads
//! to every subsequent plugin in the same run. Contexts are never shared
//! across concurrent runs.

use crate::config::ConfigManager;
use crate::observability::EventSink;
use crate::scheduler::JobScheduler;
use crate::utils::{generate_uuid, now_utc, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Shared service handles passed to plugins through the context.
///
/// This is the capability bag: an explicit service struct constructed
/// once at process start and cloned (cheaply, via `Arc`) into every run.
/// Every handle is optional so tests and partial deployments can build
/// contexts without standing up the full runtime.
#[derive(Clone, Default)]
pub struct ServiceHandles {
    /// Configuration access.
    pub config: Option<Arc<ConfigManager>>,
    /// Priority job scheduler for background work.
    pub jobs: Option<Arc<JobScheduler>>,
    /// Lifecycle event sink.
    pub events: Option<Arc<dyn EventSink>>,
}

impl ServiceHandles {
    /// Creates an empty handle bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration manager.
    #[must_use]
    pub fn with_config(mut self, config: Arc<ConfigManager>) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the job scheduler.
    #[must_use]
    pub fn with_jobs(mut self, jobs: Arc<JobScheduler>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }
}

impl std::fmt::Debug for ServiceHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandles")
            .field("config", &self.config.is_some())
            .field("jobs", &self.jobs.is_some())
            .field("events", &self.events.is_some())
            .finish()
    }
}

/// The mutable context for a single pipeline run.
///
/// Cloning produces a deep copy: the `data` payload is JSON values, so a
/// clone shares nothing mutable with the original.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Unique id for this run.
    pub run_id: Uuid,
    /// When the run started.
    pub start_time: Timestamp,
    /// The pipeline being executed.
    pub pipeline: String,
    /// The hook currently executing.
    pub hook: String,
    /// The pipeline's configured command, if any.
    pub command: Option<String>,
    /// Shared service handles.
    pub services: ServiceHandles,
    /// Arbitrary run-scoped data exchanged between plugins.
    data: HashMap<String, serde_json::Value>,
}

impl RunContext {
    /// Creates a context seeded with the pipeline name and its first hook.
    #[must_use]
    pub fn new(pipeline: impl Into<String>, first_hook: impl Into<String>) -> Self {
        Self {
            run_id: generate_uuid(),
            start_time: now_utc(),
            pipeline: pipeline.into(),
            hook: first_hook.into(),
            command: None,
            services: ServiceHandles::default(),
            data: HashMap::new(),
        }
    }

    /// Sets the pipeline command.
    #[must_use]
    pub fn with_command(mut self, command: Option<String>) -> Self {
        self.command = command;
        self
    }

    /// Sets the service handles.
    #[must_use]
    pub fn with_services(mut self, services: ServiceHandles) -> Self {
        self.services = services;
        self
    }

    /// Gets a data value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Sets a data value, overwriting any existing entry.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Removes a data value.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Checks if a data key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the full data payload.
    #[must_use]
    pub fn data(&self) -> &HashMap<String, serde_json::Value> {
        &self.data
    }

    /// Replaces the full data payload.
    pub fn set_data(&mut self, data: HashMap<String, serde_json::Value>) {
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_context_creation() {
        let ctx = RunContext::new("markets", "fetch").with_command(Some("gather".to_string()));

        assert_eq!(ctx.pipeline, "markets");
        assert_eq!(ctx.hook, "fetch");
        assert_eq!(ctx.command.as_deref(), Some("gather"));
        assert!(ctx.data().is_empty());
    }

    #[test]
    fn test_context_data_roundtrip() {
        let mut ctx = RunContext::new("markets", "fetch");
        ctx.set("x", serde_json::json!(1));

        assert_eq!(ctx.get("x"), Some(&serde_json::json!(1)));
        assert!(ctx.contains_key("x"));
        assert_eq!(ctx.remove("x"), Some(serde_json::json!(1)));
        assert!(!ctx.contains_key("x"));
    }

    #[test]
    fn test_context_clone_is_independent() {
        let mut ctx = RunContext::new("markets", "fetch");
        ctx.set("x", serde_json::json!(1));

        let mut cloned = ctx.clone();
        cloned.set("x", serde_json::json!(2));

        assert_eq!(ctx.get("x"), Some(&serde_json::json!(1)));
        assert_eq!(cloned.get("x"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_service_handles_debug_reports_presence() {
        let handles = ServiceHandles::new();
        let formatted = format!("{handles:?}");
        assert!(formatted.contains("config: false"));
    }
}
