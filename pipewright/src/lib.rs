//! # Pipewright
//!
//! A plugin-driven pipeline runner. Named pipelines invoke an ordered
//! chain of plugins bound to hooks, plugins exchange a mutable run
//! context, and the surrounding runtime provides:
//!
//! - **Pipeline execution engine**: hook resolution, context
//!   propagation, per-plugin fault isolation
//! - **Priority job scheduler**: bounded worker pool with per-job and
//!   global pause/resume/cancel
//! - **Thread lifecycle manager**: named long-running workers behind a
//!   pause/resume/cancel capability contract
//! - **Storage bridge**: cache-coherent CRUD over a document store for
//!   both blocking and async callers, with buffered bulk writes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipewright::prelude::*;
//!
//! let registry = PluginRegistry::new();
//! registry.register(std::sync::Arc::new(GatherPlugin::new()));
//!
//! let engine = Engine::builder()
//!     .pipeline(PipelineDefinition::new("markets").with_hooks(["gather", "report"]))
//!     .registry(std::sync::Arc::new(registry))
//!     .build();
//!
//! // One dedicated worker per pipeline, fire-and-forget:
//! let engine = std::sync::Arc::new(engine);
//! engine.run()?;
//!
//! // Or synchronously, on demand:
//! let status = engine.trigger_pipeline("markets");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod history;
pub mod observability;
pub mod plugin;
pub mod scheduler;
pub mod storage;
pub mod threads;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ConfigManager, PluginConfigRepo};
    pub use crate::context::{RunContext, ServiceHandles};
    pub use crate::engine::{
        Engine, EngineBuilder, HookRegistry, PipelineDefinition, PluginRunRecord, RunSummary,
    };
    pub use crate::errors::{
        EngineError, PipewrightError, PluginError, SchedulerError, StorageError, StoreError,
        ThreadError,
    };
    pub use crate::history::RunHistory;
    pub use crate::observability::{
        init_logging, CollectingEventSink, EventSink, LogFormat, LoggingEventSink, NoOpEventSink,
        ResourceSnapshot,
    };
    pub use crate::plugin::{FnPlugin, Plugin, PluginInvoker, PluginOutcome, PluginRegistry};
    pub use crate::scheduler::{
        Job, JobResult, JobScheduler, JobStatus, JobStatusReport, SchedulerConfig,
        DEFAULT_PRIORITY,
    };
    pub use crate::storage::{
        BulkBufferConfig, Document, DocumentStore, Filter, MemoryStore, StorageBridge,
        StorageBridgeConfig,
    };
    pub use crate::threads::{RunControl, ThreadControl, ThreadManager};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
