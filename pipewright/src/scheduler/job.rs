//! Job lifecycle types for the priority scheduler.

use crate::observability::ResourceSnapshot;
use crate::utils::{now_utc, Timestamp};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The default dispatch priority. Lower values are more urgent.
pub const DEFAULT_PRIORITY: i32 = 10;

/// The result of a job payload.
pub type JobResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A boxed job payload.
pub(crate) type JobPayload = Box<dyn FnOnce() -> JobResult + Send + 'static>;

/// Lifecycle status of a scheduled job.
///
/// `Succeeded`, `Failed`, and `Canceled` are terminal; control calls on
/// a terminal job are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Waiting in the queue.
    Queued,
    /// Currently executing on a worker.
    Running,
    /// Held back until resumed.
    Paused,
    /// Canceled before completion.
    Canceled,
    /// Payload completed without error.
    Succeeded,
    /// Payload returned an error or panicked.
    Failed,
}

impl JobStatus {
    /// Returns true once the job can no longer change state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Queued => "Queued",
            Self::Running => "Running",
            Self::Paused => "Paused",
            Self::Canceled => "Canceled",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        };
        write!(f, "{label}")
    }
}

/// A scheduled unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job id.
    pub id: Uuid,
    /// Dispatch priority (lower = more urgent).
    pub priority: i32,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// When the job was dispatched.
    pub submitted_at: Timestamp,
    /// Best-effort CPU time observed when the job finished.
    pub cpu_seconds: Option<f64>,
    /// Best-effort resident memory observed when the job finished.
    pub rss_bytes: Option<u64>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl Job {
    /// Creates a freshly queued job.
    #[must_use]
    pub fn new(id: Uuid, priority: i32) -> Self {
        Self {
            id,
            priority,
            status: JobStatus::Queued,
            submitted_at: now_utc(),
            cpu_seconds: None,
            rss_bytes: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Returns how long the job has been (or was) running.
    #[must_use]
    pub fn run_time(&self) -> Option<Duration> {
        let started = self.started_at?;
        Some(match self.finished_at {
            Some(finished) => finished.duration_since(started),
            None => started.elapsed(),
        })
    }
}

/// Monitoring snapshot of one job.
#[derive(Debug, Clone)]
pub struct JobStatusReport {
    /// The job id.
    pub id: Uuid,
    /// The dispatch priority.
    pub priority: i32,
    /// The lifecycle status at snapshot time.
    pub status: JobStatus,
    /// Elapsed running time, when the job has started.
    pub run_time: Option<Duration>,
    /// Best-effort CPU time.
    pub cpu_seconds: Option<f64>,
    /// Best-effort resident memory.
    pub rss_bytes: Option<u64>,
}

/// Tracks every dispatched job for status reporting and control calls.
#[derive(Debug, Default)]
pub(crate) struct JobTable {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl JobTable {
    pub fn insert(&self, job: Job) {
        self.jobs.lock().insert(job.id, job);
    }

    pub fn status(&self, id: Uuid) -> Option<JobStatus> {
        self.jobs.lock().get(&id).map(|job| job.status)
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.lock().get(&id).cloned()
    }

    pub fn mark_running(&self, id: Uuid) {
        if let Some(job) = self.jobs.lock().get_mut(&id) {
            job.status = JobStatus::Running;
            job.started_at = Some(Instant::now());
        }
    }

    /// Records the final status and resource snapshot.
    ///
    /// A cancellation observed mid-run stays terminal: the payload's own
    /// outcome does not overwrite `Canceled`.
    pub fn finish(&self, id: Uuid, status: JobStatus, snapshot: ResourceSnapshot) {
        if let Some(job) = self.jobs.lock().get_mut(&id) {
            if job.status != JobStatus::Canceled {
                job.status = status;
            }
            job.finished_at = Some(Instant::now());
            job.cpu_seconds = snapshot.cpu_seconds;
            job.rss_bytes = snapshot.rss_bytes;
        }
    }

    /// Flips a non-terminal job to `Paused`.
    pub fn pause(&self, id: Uuid) -> bool {
        match self.jobs.lock().get_mut(&id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Paused;
                true
            }
            _ => false,
        }
    }

    /// Flips a paused job back to `Queued`; true for any non-terminal
    /// job.
    pub fn resume(&self, id: Uuid) -> bool {
        match self.jobs.lock().get_mut(&id) {
            Some(job) if !job.status.is_terminal() => {
                if job.status == JobStatus::Paused {
                    job.status = JobStatus::Queued;
                }
                true
            }
            _ => false,
        }
    }

    /// Flips a non-terminal job to `Canceled`.
    pub fn cancel(&self, id: Uuid) -> bool {
        match self.jobs.lock().get_mut(&id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Canceled;
                true
            }
            _ => false,
        }
    }

    pub fn reports(&self) -> Vec<JobStatusReport> {
        self.jobs
            .lock()
            .values()
            .map(|job| JobStatusReport {
                id: job.id,
                priority: job.priority,
                status: job.status,
                run_time: job.run_time(),
                cpu_seconds: job.cpu_seconds,
                rss_bytes: job.rss_bytes,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_uuid;

    #[test]
    fn test_status_terminality() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Paused.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_table_lifecycle() {
        let table = JobTable::default();
        let id = generate_uuid();
        table.insert(Job::new(id, 5));

        assert_eq!(table.status(id), Some(JobStatus::Queued));

        table.mark_running(id);
        assert_eq!(table.status(id), Some(JobStatus::Running));

        table.finish(id, JobStatus::Succeeded, ResourceSnapshot::default());
        assert_eq!(table.status(id), Some(JobStatus::Succeeded));

        // Terminal: control calls are rejected.
        assert!(!table.pause(id));
        assert!(!table.resume(id));
        assert!(!table.cancel(id));
    }

    #[test]
    fn test_cancel_survives_finish() {
        let table = JobTable::default();
        let id = generate_uuid();
        table.insert(Job::new(id, 5));

        table.mark_running(id);
        assert!(table.cancel(id));
        table.finish(id, JobStatus::Succeeded, ResourceSnapshot::default());

        assert_eq!(table.status(id), Some(JobStatus::Canceled));
    }

    #[test]
    fn test_pause_and_resume() {
        let table = JobTable::default();
        let id = generate_uuid();
        table.insert(Job::new(id, 5));

        assert!(table.pause(id));
        assert_eq!(table.status(id), Some(JobStatus::Paused));

        assert!(table.resume(id));
        assert_eq!(table.status(id), Some(JobStatus::Queued));
    }

    #[test]
    fn test_unknown_job_is_rejected() {
        let table = JobTable::default();
        assert!(!table.pause(generate_uuid()));
        assert_eq!(table.status(generate_uuid()), None);
    }
}
