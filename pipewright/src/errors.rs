//! Error types for the pipewright runtime.
//!
//! Each subsystem has its own error enum; `PipewrightError` is the
//! crate-level umbrella with `From` conversions for callers that want a
//! single error type at their boundary.

use thiserror::Error;

/// The top-level error type for pipewright operations.
#[derive(Debug, Error)]
pub enum PipewrightError {
    /// A pipeline engine error.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// A plugin execution error.
    #[error("{0}")]
    Plugin(#[from] PluginError),

    /// A job scheduler error.
    #[error("{0}")]
    Scheduler(#[from] SchedulerError),

    /// A worker lifecycle error.
    #[error("{0}")]
    Thread(#[from] ThreadError),

    /// A storage bridge error.
    #[error("{0}")]
    Storage(#[from] StorageError),
}

/// Errors raised by the pipeline execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The named pipeline has no definition.
    #[error("pipeline not found: {0}")]
    PipelineNotFound(String),

    /// A pipeline worker could not be started.
    #[error("{0}")]
    Thread(#[from] ThreadError),

    /// Queued dispatch was requested but no scheduler is configured.
    #[error("no job scheduler configured")]
    SchedulerUnavailable,

    /// The job scheduler rejected the dispatch.
    #[error("{0}")]
    Scheduler(#[from] SchedulerError),
}

/// Errors raised by plugins or the plugin invocation path.
///
/// A plugin failure is isolated per `(hook, plugin)` by the engine; it
/// never aborts sibling plugins, later hooks, or other pipeline runs.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// The plugin id is not present in the registry.
    #[error("plugin not registered: {0}")]
    NotRegistered(String),

    /// Plugin configuration could not be resolved.
    #[error("config lookup failed for plugin '{plugin}': {message}")]
    Config {
        /// The plugin id.
        plugin: String,
        /// The underlying failure.
        message: String,
    },

    /// The plugin body failed.
    #[error("plugin execution failed: {0}")]
    Execution(String),
}

impl PluginError {
    /// Creates an execution error from any displayable cause.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Errors raised by the job scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler has been shut down and accepts no more work.
    #[error("scheduler is shut down")]
    ShutDown,

    /// A worker thread could not be spawned.
    #[error("failed to spawn scheduler worker: {0}")]
    WorkerSpawn(std::io::Error),
}

/// Errors raised by the thread lifecycle manager.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// A worker with this name is still running.
    #[error("worker '{0}' is already running")]
    AlreadyRunning(String),

    /// The OS refused to spawn the worker thread.
    #[error("failed to spawn worker '{name}': {source}")]
    Spawn {
        /// The requested worker name.
        name: String,
        /// The OS-level error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the backing document store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A query could not be evaluated.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A document was rejected by the store.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Errors raised by the storage bridge.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store reported a failure.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The bridge worker has been closed; async requests cannot be served.
    #[error("storage bridge is closed")]
    BridgeClosed,

    /// The bridge worker or flush ticker thread could not be spawned.
    #[error("failed to start bridge worker: {0}")]
    WorkerSpawn(std::io::Error),

    /// A bulk flush failed; the documents were re-buffered.
    #[error("bulk flush failed for collection '{collection}': {source}")]
    FlushFailed {
        /// The collection whose buffer failed to flush.
        collection: String,
        /// The store failure.
        #[source]
        source: StoreError,
    },
}
