//! Manager for named long-running workers.

use super::ThreadControl;
use crate::errors::ThreadError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

struct ManagedWorker {
    handle: JoinHandle<()>,
    control: Arc<dyn ThreadControl>,
}

/// Starts, names, and cooperatively controls background workers.
///
/// Cancellation is best-effort: the worker must poll its control's
/// cancel signal itself. A worker that ignores the signal past the join
/// timeout keeps running detached from the registry until process exit.
pub struct ThreadManager {
    workers: Mutex<HashMap<String, ManagedWorker>>,
    join_timeout: Duration,
}

impl Default for ThreadManager {
    fn default() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl ThreadManager {
    /// Creates a manager with the default 5s join timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager with an explicit join timeout.
    #[must_use]
    pub fn with_join_timeout(join_timeout: Duration) -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            join_timeout,
        }
    }

    /// Spawns a named worker and registers it with its control object.
    ///
    /// The name is free for reuse once the entry has been removed or the
    /// worker has finished.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning` when a live worker holds the name, or
    /// `Spawn` when the OS refuses the thread.
    pub fn start_named<F>(
        &self,
        name: &str,
        control: Arc<dyn ThreadControl>,
        f: F,
    ) -> Result<(), ThreadError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut workers = self.workers.lock();

        if let Some(existing) = workers.get(name) {
            if existing.handle.is_finished() {
                if let Some(finished) = workers.remove(name) {
                    join_quietly(name, finished.handle);
                }
            } else {
                return Err(ThreadError::AlreadyRunning(name.to_string()));
            }
        }

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(f)
            .map_err(|source| ThreadError::Spawn {
                name: name.to_string(),
                source,
            })?;

        workers.insert(
            name.to_string(),
            ManagedWorker { handle, control },
        );
        Ok(())
    }

    /// Pauses the named worker via its control. No-op for unknown names.
    pub fn pause_named(&self, name: &str) -> bool {
        if let Some(worker) = self.workers.lock().get(name) {
            worker.control.pause();
            true
        } else {
            debug!(worker = %name, "pause requested for unknown worker");
            false
        }
    }

    /// Resumes the named worker via its control. No-op for unknown
    /// names.
    pub fn resume_named(&self, name: &str) -> bool {
        if let Some(worker) = self.workers.lock().get(name) {
            worker.control.resume();
            true
        } else {
            debug!(worker = %name, "resume requested for unknown worker");
            false
        }
    }

    /// Signals cancellation, joins with the bounded timeout, and removes
    /// the entry regardless of whether the join completed.
    ///
    /// Returns false for unknown names.
    pub fn cancel_named(&self, name: &str) -> bool {
        let Some(worker) = self.workers.lock().remove(name) else {
            return false;
        };

        worker.control.cancel();
        if !join_with_timeout(worker.handle, self.join_timeout) {
            warn!(
                worker = %name,
                timeout = ?self.join_timeout,
                "worker ignored cancel signal; abandoning"
            );
        }
        true
    }

    /// Joins the named worker with the bounded timeout and removes the
    /// entry, without signaling cancellation first.
    ///
    /// Returns false for unknown names.
    pub fn stop_named(&self, name: &str) -> bool {
        let Some(worker) = self.workers.lock().remove(name) else {
            return false;
        };

        if !join_with_timeout(worker.handle, self.join_timeout) {
            warn!(
                worker = %name,
                timeout = ?self.join_timeout,
                "worker did not finish before stop timeout; abandoning"
            );
        }
        true
    }

    /// Checks if a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.workers.lock().contains_key(name)
    }

    /// Returns all registered worker names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.workers.lock().keys().cloned().collect()
    }

    /// Returns the number of registered workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.lock().len()
    }

    /// Returns true if no workers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.lock().is_empty()
    }
}

impl std::fmt::Debug for ThreadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadManager")
            .field("workers", &self.names())
            .field("join_timeout", &self.join_timeout)
            .finish()
    }
}

/// Joins a handle, bounded by `timeout`. Returns false when the worker
/// is still running at the deadline; the dropped handle detaches it.
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    if handle.join().is_err() {
        warn!("worker panicked before join");
    }
    true
}

fn join_quietly(name: &str, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        warn!(worker = %name, "finished worker had panicked");
    }
}
