//! Cooperative pause/resume/cancel controls for workers.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

/// Capability contract for controlling a named worker.
///
/// Any value implementing these three operations is accepted by the
/// thread manager; control is cooperative in every case — the worker
/// loop must poll its control at its own suspension points, since the
/// manager cannot forcibly terminate it.
pub trait ThreadControl: Send + Sync {
    /// Requests that the worker pause at its next suspension point.
    fn pause(&self);

    /// Lifts a pause.
    fn resume(&self);

    /// Requests cancellation. Irreversible.
    fn cancel(&self);
}

/// The standard control implementation: a pause switch plus a cancel
/// flag.
///
/// Worker loops call [`RunControl::wait_if_paused`] at suspension
/// points; the call blocks while paused and returns immediately once
/// resumed or cancelled (cancellation must stay observable to a paused
/// worker).
#[derive(Default)]
pub struct RunControl {
    paused: Mutex<bool>,
    unpaused: Condvar,
    cancelled: AtomicBool,
}

impl RunControl {
    /// Creates a control in the running, not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a pause is currently requested.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Blocks while paused; returns once running or cancelled.
    pub fn wait_if_paused(&self) {
        let mut paused = self.paused.lock();
        while *paused && !self.is_cancelled() {
            self.unpaused.wait(&mut paused);
        }
    }
}

impl ThreadControl for RunControl {
    fn pause(&self) {
        *self.paused.lock() = true;
    }

    fn resume(&self) {
        *self.paused.lock() = false;
        self.unpaused.notify_all();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // Wake paused waiters so they can observe the cancellation.
        self.unpaused.notify_all();
    }
}

impl std::fmt::Debug for RunControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunControl")
            .field("paused", &self.is_paused())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
