//! Priority job scheduler with a bounded worker pool.
//!
//! Jobs are arbitrary callables dispatched with a priority (lower =
//! more urgent) onto a shared waitable priority queue. A fixed pool of
//! OS-thread workers drains the queue; pause/resume/cancel work at both
//! the individual-job level (status flips) and the global level (one
//! shared pause gate that blocks every worker).
//!
//! A payload failure marks its job `Failed` and is never propagated to
//! the dispatcher; one bad job cannot take down the pool.

mod job;
mod queue;

use crate::errors::SchedulerError;
use crate::observability::{EventSink, NoOpEventSink, ResourceSnapshot};
use crate::utils::generate_uuid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

use job::JobTable;
use queue::{JobQueue, PauseGate, QueuedJob};

pub use job::{Job, JobResult, JobStatus, JobStatusReport, DEFAULT_PRIORITY};

/// Tunables for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of worker threads in the pool.
    pub max_workers: usize,
    /// Jobs at or above this priority value are eligible for soft
    /// preemption.
    pub low_priority_threshold: i32,
    /// How long an idle worker waits on the queue before re-checking
    /// its stop condition.
    pub queue_wait: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            low_priority_threshold: 10,
            queue_wait: Duration::from_millis(100),
        }
    }
}

impl SchedulerConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Sets the soft-preemption threshold.
    #[must_use]
    pub fn with_low_priority_threshold(mut self, threshold: i32) -> Self {
        self.low_priority_threshold = threshold;
        self
    }
}

/// State shared between the scheduler handle and its workers.
struct SchedulerShared {
    queue: JobQueue,
    table: JobTable,
    parked: Mutex<HashMap<Uuid, QueuedJob>>,
    gate: PauseGate,
    stop: AtomicBool,
    events: Arc<dyn EventSink>,
}

/// Priority-ordered dispatch queue with a fixed worker pool.
pub struct JobScheduler {
    shared: Arc<SchedulerShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobScheduler {
    /// Creates a scheduler with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when a worker thread cannot be spawned.
    pub fn new() -> Result<Self, SchedulerError> {
        Self::with_config(SchedulerConfig::default())
    }

    /// Creates a scheduler with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when a worker thread cannot be spawned.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_config_and_events(config, Arc::new(NoOpEventSink))
    }

    /// Creates a scheduler with explicit configuration and event sink.
    ///
    /// # Errors
    ///
    /// Returns an error when a worker thread cannot be spawned.
    pub fn with_config_and_events(
        config: SchedulerConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, SchedulerError> {
        let shared = Arc::new(SchedulerShared {
            queue: JobQueue::new(),
            table: JobTable::default(),
            parked: Mutex::new(HashMap::new()),
            gate: PauseGate::new(),
            stop: AtomicBool::new(false),
            events,
        });

        let mut workers = Vec::with_capacity(config.max_workers);
        for slot in 0..config.max_workers {
            let worker_shared = shared.clone();
            let worker_config = config.clone();
            let handle = std::thread::Builder::new()
                .name(format!("job-worker-{slot}"))
                .spawn(move || worker_loop(&worker_shared, &worker_config))
                .map_err(SchedulerError::WorkerSpawn)?;
            workers.push(handle);
        }

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
        })
    }

    /// Dispatches a job at the default priority.
    ///
    /// # Errors
    ///
    /// Returns `ShutDown` after [`Self::shutdown`].
    pub fn dispatch<F>(&self, f: F) -> Result<Uuid, SchedulerError>
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        self.dispatch_with_priority(f, DEFAULT_PRIORITY)
    }

    /// Dispatches a job with an explicit priority (lower = more urgent).
    ///
    /// Returns immediately with the job id.
    ///
    /// # Errors
    ///
    /// Returns `ShutDown` after [`Self::shutdown`].
    pub fn dispatch_with_priority<F>(&self, f: F, priority: i32) -> Result<Uuid, SchedulerError>
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        if self.shared.stop.load(Ordering::SeqCst) {
            return Err(SchedulerError::ShutDown);
        }

        let id = generate_uuid();
        self.shared.table.insert(Job::new(id, priority));
        self.shared.queue.push(id, priority, Box::new(f));
        self.shared.events.try_emit(
            "job.dispatched",
            Some(serde_json::json!({"job_id": id.to_string(), "priority": priority})),
        );
        Ok(id)
    }

    /// Pauses a job. Returns false once the job is terminal or unknown.
    pub fn pause_job(&self, id: Uuid) -> bool {
        self.shared.table.pause(id)
    }

    /// Resumes a paused job. Returns false once the job is terminal or
    /// unknown.
    pub fn resume_job(&self, id: Uuid) -> bool {
        if !self.shared.table.resume(id) {
            return false;
        }
        // A worker may have parked the payload while the job was
        // paused; put it back in the queue and wake someone.
        if let Some(job) = self.shared.parked.lock().remove(&id) {
            self.shared.queue.requeue(job);
        }
        true
    }

    /// Cancels a job. Returns false once the job is terminal or
    /// unknown.
    ///
    /// Cancellation of a running job is cooperative at the status
    /// level: the payload completes, but the job stays `Canceled`.
    pub fn cancel_job(&self, id: Uuid) -> bool {
        if !self.shared.table.cancel(id) {
            return false;
        }
        self.shared.parked.lock().remove(&id);
        true
    }

    /// Fetches one job's current state.
    #[must_use]
    pub fn job(&self, id: Uuid) -> Option<Job> {
        self.shared.table.get(id)
    }

    /// Snapshots every dispatched job for monitoring.
    #[must_use]
    pub fn job_status(&self) -> Vec<JobStatusReport> {
        self.shared.table.reports()
    }

    /// Returns the number of jobs waiting in the queue.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.shared.queue.len()
    }

    /// Closes the global pause gate: every worker blocks before its
    /// next job.
    pub fn pause_all(&self) {
        self.shared.gate.pause();
    }

    /// Opens the global pause gate.
    pub fn resume_all(&self) {
        self.shared.gate.resume();
    }

    /// Returns whether the global pause gate is closed.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.shared.gate.is_paused()
    }

    /// Signals stop, releases the pause gate so blocked workers can
    /// exit, and joins the pool. Idempotent. Jobs still queued are
    /// dropped in `Queued` status.
    pub fn shutdown(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.gate.resume();
        self.shared.queue.close();

        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                error!("scheduler worker panicked");
            }
        }
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("queued", &self.queued_len())
            .field("paused", &self.is_paused())
            .finish()
    }
}

fn worker_loop(shared: &SchedulerShared, config: &SchedulerConfig) {
    loop {
        if shared.stop.load(Ordering::SeqCst) {
            break;
        }
        shared.gate.wait_until_open();
        if shared.stop.load(Ordering::SeqCst) {
            break;
        }

        let Some(job) = shared.queue.pop_wait(config.queue_wait) else {
            if shared.queue.is_closed() {
                break;
            }
            continue;
        };

        // A global pause issued after the gate check must still hold
        // the popped job back.
        shared.gate.wait_until_open();
        if shared.stop.load(Ordering::SeqCst) {
            break;
        }

        match shared.table.status(job.id) {
            Some(JobStatus::Paused) => {
                // The heap cannot wait on a buried item; park the
                // payload until an explicit resume re-queues it.
                let id = job.id;
                shared.parked.lock().insert(id, job);
                // A resume (or cancel) may have raced the park and
                // already swept the side table; re-queue if so.
                if shared.table.status(id) != Some(JobStatus::Paused) {
                    if let Some(parked) = shared.parked.lock().remove(&id) {
                        shared.queue.requeue(parked);
                    }
                }
                continue;
            }
            Some(JobStatus::Canceled) | None => {
                debug!(job_id = %job.id, "skipping canceled job");
                continue;
            }
            _ => {}
        }

        // Soft preemption: defer a low-priority job when something
        // strictly more urgent arrived while this worker was blocked.
        // Each deferral ages the job so it cannot starve.
        if job.effective() >= i64::from(config.low_priority_threshold) {
            if let Some(most_urgent) = shared.queue.most_urgent() {
                if most_urgent < job.effective() {
                    shared.queue.requeue_aged(job);
                    continue;
                }
            }
        }

        run_job(shared, job);
    }
}

fn run_job(shared: &SchedulerShared, job: QueuedJob) {
    let id = job.id;
    shared.table.mark_running(id);
    shared.events.try_emit(
        "job.started",
        Some(serde_json::json!({"job_id": id.to_string()})),
    );

    let payload = job.payload;
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(payload));

    let status = match outcome {
        Ok(Ok(())) => JobStatus::Succeeded,
        Ok(Err(e)) => {
            error!(job_id = %id, error = %e, "job payload failed");
            JobStatus::Failed
        }
        Err(_) => {
            error!(job_id = %id, "job payload panicked");
            JobStatus::Failed
        }
    };

    shared.table.finish(id, status, ResourceSnapshot::current());
    shared.events.try_emit(
        "job.finished",
        Some(serde_json::json!({
            "job_id": id.to_string(),
            "status": shared.table.status(id).map(|s| s.to_string()),
        })),
    );
}
