//! Waitable priority queue and the global pause gate.
//!
//! The queue is a condition-variable-guarded binary heap: workers block
//! on the condvar instead of spin-polling, and every push wakes one of
//! them. Equal effective priorities preserve arrival order through a
//! monotonic sequence number. Deferred jobs age: each deferral lowers a
//! job's effective priority value, so soft preemption cannot starve a
//! job indefinitely.

use super::job::JobPayload;
use parking_lot::{Condvar, Mutex};
use std::collections::BinaryHeap;
use std::time::Duration;
use uuid::Uuid;

/// A queued job entry: identity, ordering fields, and the payload.
pub(crate) struct QueuedJob {
    pub id: Uuid,
    pub priority: i32,
    pub age: u32,
    pub seq: u64,
    pub payload: JobPayload,
}

impl QueuedJob {
    /// Effective priority after aging; lower is more urgent.
    pub fn effective(&self) -> i64 {
        i64::from(self.priority) - i64::from(self.age)
    }
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap; invert so the smallest
        // (effective, seq) pair pops first.
        (other.effective(), other.seq).cmp(&(self.effective(), self.seq))
    }
}

impl std::fmt::Debug for QueuedJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedJob")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("age", &self.age)
            .field("seq", &self.seq)
            .finish()
    }
}

#[derive(Default)]
struct QueueInner {
    heap: BinaryHeap<QueuedJob>,
    next_seq: u64,
    closed: bool,
}

/// Condvar-guarded priority queue shared by the worker pool.
#[derive(Default)]
pub(crate) struct JobQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a fresh job.
    pub fn push(&self, id: Uuid, priority: i32, payload: JobPayload) {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(QueuedJob {
            id,
            priority,
            age: 0,
            seq,
            payload,
        });
        drop(inner);
        self.available.notify_one();
    }

    /// Puts a previously popped job back, keeping its ordering fields.
    pub fn requeue(&self, job: QueuedJob) {
        self.inner.lock().heap.push(job);
        self.available.notify_one();
    }

    /// Puts a deferred job back with an aging boost.
    pub fn requeue_aged(&self, mut job: QueuedJob) {
        job.age += 1;
        self.requeue(job);
    }

    /// Pops the most urgent job, waiting up to `timeout` when empty.
    ///
    /// Returns `None` on timeout or when the queue is closed and empty;
    /// callers loop and re-check their stop conditions.
    pub fn pop_wait(&self, timeout: Duration) -> Option<QueuedJob> {
        let mut inner = self.inner.lock();
        if inner.heap.is_empty() {
            if inner.closed {
                return None;
            }
            let _ = self.available.wait_for(&mut inner, timeout);
        }
        inner.heap.pop()
    }

    /// Peeks the most urgent effective priority currently waiting.
    pub fn most_urgent(&self) -> Option<i64> {
        self.inner.lock().heap.peek().map(QueuedJob::effective)
    }

    /// Closes the queue and wakes every waiter.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }
}

/// The single global pause gate shared by all workers.
///
/// Closing the gate blocks every worker before its next pop, realizing
/// one coarse-grained pause/resume for the whole pool.
#[derive(Default)]
pub(crate) struct PauseGate {
    paused: Mutex<bool>,
    released: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        *self.paused.lock() = true;
    }

    pub fn resume(&self) {
        *self.paused.lock() = false;
        self.released.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Blocks until the gate is open.
    pub fn wait_until_open(&self) {
        let mut paused = self.paused.lock();
        while *paused {
            self.released.wait(&mut paused);
        }
    }
}
