//! Observability: lifecycle event sinks and process resource snapshots.
//!
//! Pipeline runs, plugin invocations, and scheduler jobs emit lifecycle
//! events (`pipeline.started`, `plugin.failed`, `job.finished`, ...)
//! through an [`EventSink`]. Resource snapshots back the scheduler's
//! per-job CPU/memory reporting.

mod events;
mod logging;
mod resources;

pub use events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
pub use logging::{init_logging, LogFormat};
pub use resources::ResourceSnapshot;
