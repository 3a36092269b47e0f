//! Pipeline execution engine.
//!
//! Resolves hooks to plugins, propagates the run context through each
//! pipeline's chain, isolates per-plugin failures, and runs each
//! pipeline on its own named worker via the thread lifecycle manager.

mod definition;
mod hooks;

use crate::context::{RunContext, ServiceHandles};
use crate::errors::{EngineError, PluginError};
use crate::history::RunHistory;
use crate::observability::{EventSink, NoOpEventSink};
use crate::plugin::{PluginInvoker, PluginRegistry};
use crate::threads::{RunControl, ThreadControl, ThreadManager};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub use definition::{PipelineDefinition, PluginRunRecord, RunSummary};
pub use hooks::HookRegistry;

/// The pipeline execution engine.
///
/// Constructed once at process start via [`Engine::builder`]; all
/// mutable state lives inside the run contexts it creates, so every
/// method takes `&self` and concurrent runs share nothing.
pub struct Engine {
    pipelines: HashMap<String, PipelineDefinition>,
    hooks: HookRegistry,
    registry: Arc<PluginRegistry>,
    invoker: PluginInvoker,
    threads: ThreadManager,
    services: ServiceHandles,
    history: Option<Arc<RunHistory>>,
    events: Arc<dyn EventSink>,
}

impl Engine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Returns the configured pipeline names.
    #[must_use]
    pub fn pipeline_names(&self) -> Vec<String> {
        self.pipelines.keys().cloned().collect()
    }

    /// Returns a pipeline definition.
    #[must_use]
    pub fn pipeline(&self, name: &str) -> Option<&PipelineDefinition> {
        self.pipelines.get(name)
    }

    /// Returns the thread lifecycle manager driving the pipeline
    /// workers, for pause/resume/cancel control by name.
    #[must_use]
    pub fn threads(&self) -> &ThreadManager {
        &self.threads
    }

    /// Starts one dedicated worker per configured pipeline, each
    /// executing its pipeline once. Fire-and-forget: the caller is not
    /// blocked and worker outcomes are reported through logging and the
    /// event sink.
    ///
    /// # Errors
    ///
    /// Returns an error when a worker cannot be started; workers
    /// already started keep running.
    pub fn run(self: &Arc<Self>) -> Result<(), EngineError> {
        info!(pipelines = self.pipelines.len(), "engine starting");

        for name in self.pipelines.keys() {
            let engine = Arc::clone(self);
            let pipeline = name.clone();
            let control = Arc::new(RunControl::new());
            let thread_control: Arc<dyn ThreadControl> = control.clone();

            self.threads.start_named(name, thread_control, move || {
                match engine.run_pipeline_controlled(&pipeline, Some(control.as_ref())) {
                    Ok(summary) => {
                        debug!(
                            pipeline = %summary.pipeline,
                            executed = summary.executed.len(),
                            failed = summary.failed.len(),
                            "pipeline worker finished"
                        );
                    }
                    Err(e) => {
                        error!(pipeline = %pipeline, error = %e, "pipeline worker failed");
                    }
                }
            })?;
        }
        Ok(())
    }

    /// Queues an on-demand pipeline run through the job scheduler
    /// instead of starting an immediate worker, using the pipeline's
    /// configured priority. The alternate entry point when queuing and
    /// backpressure are wanted over concurrent threads.
    ///
    /// # Errors
    ///
    /// Returns `PipelineNotFound` for unknown names,
    /// `SchedulerUnavailable` when the service handles carry no
    /// scheduler, or the scheduler's rejection after shutdown.
    pub fn dispatch_pipeline(self: &Arc<Self>, name: &str) -> Result<uuid::Uuid, EngineError> {
        let def = self
            .pipelines
            .get(name)
            .ok_or_else(|| EngineError::PipelineNotFound(name.to_string()))?;
        let jobs = self
            .services
            .jobs
            .as_ref()
            .ok_or(EngineError::SchedulerUnavailable)?;

        let priority = def.priority.unwrap_or(crate::scheduler::DEFAULT_PRIORITY);
        let engine = Arc::clone(self);
        let pipeline = name.to_string();

        let id = jobs.dispatch_with_priority(
            move || {
                let status = engine.trigger_pipeline(&pipeline);
                debug!(%status, "queued pipeline run finished");
                Ok(())
            },
            priority,
        )?;
        Ok(id)
    }

    /// Synchronous, on-demand execution of a single pipeline.
    ///
    /// Never raises to its caller: pipeline-not-found and any execution
    /// error are caught, logged, and reported in the returned status
    /// string.
    pub fn trigger_pipeline(&self, name: &str) -> String {
        match self.run_pipeline(name) {
            Ok(summary) => format!(
                "pipeline '{}' completed: {} plugins run, {} failed",
                name,
                summary.executed.len(),
                summary.failed.len()
            ),
            Err(e) => {
                error!(pipeline = %name, error = %e, "on-demand pipeline run failed");
                format!("pipeline '{name}' could not run: {e}")
            }
        }
    }

    /// Runs a pipeline's hook chain to completion.
    ///
    /// # Errors
    ///
    /// Returns `PipelineNotFound` for unknown names. Plugin failures do
    /// not surface here; they are isolated per `(hook, plugin)` and
    /// recorded in the summary.
    pub fn run_pipeline(&self, name: &str) -> Result<RunSummary, EngineError> {
        self.run_pipeline_controlled(name, None)
    }

    /// Runs a pipeline's hook chain, honoring a cooperative control at
    /// plugin boundaries.
    ///
    /// Within one run, plugin execution is strictly sequential: later
    /// plugins may depend on context replaced by earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `PipelineNotFound` for unknown names.
    pub fn run_pipeline_controlled(
        &self,
        name: &str,
        control: Option<&RunControl>,
    ) -> Result<RunSummary, EngineError> {
        let def = self
            .pipelines
            .get(name)
            .ok_or_else(|| EngineError::PipelineNotFound(name.to_string()))?;

        let first_hook = def.hooks.first().cloned().unwrap_or_default();
        let mut ctx = RunContext::new(name, first_hook)
            .with_command(def.command.clone())
            .with_services(self.services.clone());
        let mut summary = RunSummary::new(ctx.run_id, name);

        self.events.try_emit(
            "pipeline.started",
            Some(serde_json::json!({
                "pipeline": name,
                "run_id": ctx.run_id.to_string(),
            })),
        );

        'hooks: for hook in &def.hooks {
            ctx.hook.clone_from(hook);

            for plugin_id in self.hooks.plugins_for(hook) {
                if let Some(control) = control {
                    control.wait_if_paused();
                    if control.is_cancelled() {
                        summary.cancelled = true;
                        self.events.try_emit(
                            "pipeline.cancelled",
                            Some(serde_json::json!({
                                "pipeline": name,
                                "hook": hook,
                            })),
                        );
                        break 'hooks;
                    }
                }

                match self.execute_plugin(&mut ctx, plugin_id, name, hook) {
                    Ok(()) => {
                        summary.executed.push(PluginRunRecord::ok(plugin_id, hook));
                        self.record_history(
                            name,
                            plugin_id,
                            "ok",
                            serde_json::json!({"hook": hook}),
                        );
                    }
                    Err(e) => {
                        // One plugin's failure never aborts the rest of
                        // the chain, nor any other pipeline's run.
                        error!(
                            plugin = %plugin_id,
                            pipeline = %name,
                            hook = %hook,
                            error = %e,
                            "plugin failed; continuing chain"
                        );
                        self.events.try_emit(
                            "plugin.failed",
                            Some(serde_json::json!({
                                "plugin": plugin_id,
                                "pipeline": name,
                                "hook": hook,
                                "error": e.to_string(),
                            })),
                        );
                        self.record_history(
                            name,
                            plugin_id,
                            "error",
                            serde_json::json!({"hook": hook, "error": e.to_string()}),
                        );
                        summary
                            .failed
                            .push(PluginRunRecord::failed(plugin_id, hook, e.to_string()));
                    }
                }
            }
        }

        self.events.try_emit(
            "pipeline.completed",
            Some(serde_json::json!({
                "pipeline": name,
                "run_id": summary.run_id.to_string(),
                "executed": summary.executed.len(),
                "failed": summary.failed.len(),
                "cancelled": summary.cancelled,
            })),
        );
        Ok(summary)
    }

    /// Loads, configures, and invokes one plugin, threading any
    /// replacement context back into the run.
    fn execute_plugin(
        &self,
        ctx: &mut RunContext,
        plugin_id: &str,
        pipeline: &str,
        hook: &str,
    ) -> Result<(), PluginError> {
        let plugin = self
            .registry
            .get(plugin_id)
            .ok_or_else(|| PluginError::NotRegistered(plugin_id.to_string()))?;
        let config = self.resolve_config(plugin_id, pipeline)?;

        let outcome = self.invoker.invoke(plugin.as_ref(), ctx, &config, pipeline)?;
        if let Some(mut replacement) = outcome.context {
            replacement.hook = hook.to_string();
            *ctx = replacement;
        }

        debug!(plugin = %plugin_id, pipeline = %pipeline, hook = %hook, "plugin run");
        Ok(())
    }

    /// Resolves plugin configuration keyed by `(plugin_id, pipeline)`.
    fn resolve_config(
        &self,
        plugin_id: &str,
        pipeline: &str,
    ) -> Result<serde_json::Value, PluginError> {
        let Some(config) = &self.services.config else {
            return Ok(serde_json::json!({}));
        };

        match config.plugin_config(plugin_id, pipeline) {
            Ok(Some(doc)) => Ok(serde_json::Value::Object(doc)),
            Ok(None) => Ok(serde_json::json!({})),
            Err(e) => Err(PluginError::Config {
                plugin: plugin_id.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn record_history(
        &self,
        pipeline: &str,
        plugin: &str,
        status: &str,
        details: serde_json::Value,
    ) {
        if let Some(history) = &self.history {
            if let Err(e) = history.record(pipeline, plugin, status, details) {
                warn!(error = %e, "failed to record run history");
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pipelines", &self.pipeline_names())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    pipelines: Vec<PipelineDefinition>,
    bindings: Vec<(String, Vec<String>)>,
    registry: Option<Arc<PluginRegistry>>,
    services: ServiceHandles,
    history: Option<Arc<RunHistory>>,
    events: Option<Arc<dyn EventSink>>,
    join_timeout: Option<Duration>,
}

impl EngineBuilder {
    /// Adds a pipeline definition.
    #[must_use]
    pub fn pipeline(mut self, def: PipelineDefinition) -> Self {
        self.pipelines.push(def);
        self
    }

    /// Binds a hook to an ordered plugin id list.
    ///
    /// Hooks left unbound fall back to the `<hook>_plugin` naming
    /// convention.
    #[must_use]
    pub fn bind(
        mut self,
        hook: impl Into<String>,
        plugin_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.bindings.push((
            hook.into(),
            plugin_ids.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Sets the plugin registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<PluginRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the shared service handles passed into every run context.
    #[must_use]
    pub fn services(mut self, services: ServiceHandles) -> Self {
        self.services = services;
        self
    }

    /// Sets the run history tracker.
    #[must_use]
    pub fn history(mut self, history: Arc<RunHistory>) -> Self {
        self.history = Some(history);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Sets the join timeout used when stopping pipeline workers.
    #[must_use]
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = Some(timeout);
        self
    }

    /// Builds the engine, registering hook bindings and falling back to
    /// the `<hook>_plugin` convention for unbound hooks.
    #[must_use]
    pub fn build(self) -> Engine {
        let mut hooks = HookRegistry::new();
        for (hook, plugin_ids) in self.bindings {
            hooks.register(hook, plugin_ids);
        }
        for def in &self.pipelines {
            for hook in &def.hooks {
                if !hooks.contains(hook) {
                    hooks.register(hook.clone(), [format!("{hook}_plugin")]);
                }
            }
        }

        let pipelines = self
            .pipelines
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();

        let threads = self
            .join_timeout
            .map_or_else(ThreadManager::new, ThreadManager::with_join_timeout);

        Engine {
            pipelines,
            hooks,
            registry: self.registry.unwrap_or_default(),
            invoker: PluginInvoker::new(),
            threads,
            services: self.services,
            history: self.history,
            events: self.events.unwrap_or_else(|| Arc::new(NoOpEventSink)),
        }
    }
}
