//! Pause barrier and control surface.
//!
//! A single mutex guards the tri-state control flag and the observable
//! phase; the condvar wakes the run thread on resume and cancel.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::types::RunPhase;
use crate::invoker::Invoker;

/// What the caller asked the run to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlFlag {
    Running,
    Paused,
    Cancelled,
}

#[derive(Debug)]
struct ControlState {
    flag: ControlFlag,
    phase: RunPhase,
}

/// How the run thread left the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BarrierOutcome {
    /// Not paused; went straight through.
    Clear,
    /// Was paused and got resumed.
    Resumed,
    Cancelled,
}

/// State shared between the caller and the run thread.
pub(crate) struct RunControl {
    state: Mutex<ControlState>,
    wake: Condvar,
}

impl RunControl {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ControlState {
                flag: ControlFlag::Running,
                phase: RunPhase::Idle,
            }),
            wake: Condvar::new(),
        }
    }

    pub(crate) fn phase(&self) -> RunPhase {
        self.state.lock().phase
    }

    pub(crate) fn set_phase(&self, phase: RunPhase) {
        self.state.lock().phase = phase;
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.state.lock().flag == ControlFlag::Cancelled
    }

    /// Request a pause. Only a running flag changes; returns whether it did.
    pub(crate) fn pause(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase.is_terminal() || state.flag != ControlFlag::Running {
            return false;
        }
        state.flag = ControlFlag::Paused;
        true
    }

    /// Clear a pause request and wake the run thread. No-op unless paused.
    pub(crate) fn resume(&self) -> bool {
        let mut state = self.state.lock();
        if state.flag != ControlFlag::Paused {
            return false;
        }
        state.flag = ControlFlag::Running;
        self.wake.notify_all();
        true
    }

    /// Set the cancelled flag and wake the run thread. Returns false if the
    /// run had already ended or was already cancelled.
    pub(crate) fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase.is_terminal() || state.flag == ControlFlag::Cancelled {
            return false;
        }
        state.flag = ControlFlag::Cancelled;
        self.wake.notify_all();
        true
    }

    /// Block while paused.
    ///
    /// `on_block` runs once, without the lock held, when the thread is
    /// about to wait.
    pub(crate) fn wait_at_barrier(&self, on_block: impl FnOnce()) -> BarrierOutcome {
        let mut state = self.state.lock();
        match state.flag {
            ControlFlag::Running => return BarrierOutcome::Clear,
            ControlFlag::Cancelled => return BarrierOutcome::Cancelled,
            ControlFlag::Paused => {}
        }

        state.phase = RunPhase::Paused;
        MutexGuard::unlocked(&mut state, on_block);

        while state.flag == ControlFlag::Paused {
            self.wake.wait(&mut state);
        }

        if state.flag == ControlFlag::Cancelled {
            return BarrierOutcome::Cancelled;
        }
        state.phase = RunPhase::Running;
        BarrierOutcome::Resumed
    }
}

/// Cloneable handle for controlling a run from any thread.
#[derive(Clone)]
pub struct ControlHandle {
    control: Arc<RunControl>,
    invoker: Arc<dyn Invoker>,
}

impl ControlHandle {
    pub(crate) fn new(control: Arc<RunControl>, invoker: Arc<dyn Invoker>) -> Self {
        Self { control, invoker }
    }

    /// Suspend before the next image dispatch. The in-flight image finishes.
    ///
    /// Idempotent.
    pub fn pause(&self) {
        if self.control.pause() {
            tracing::info!("Pause requested");
        }
    }

    /// Release a paused run. No-op when not paused.
    pub fn resume(&self) {
        if self.control.resume() {
            tracing::info!("Resume requested");
        }
    }

    /// Stop the run: no further dispatch, the in-flight process is terminated.
    pub fn cancel(&self) {
        if self.control.cancel() {
            tracing::info!("Cancel requested");
            // Outside the lock: terminate may block on the invoker's own lock.
            self.invoker.terminate();
        }
    }

    /// Answer a recoverable error by skipping on.
    pub fn continue_after_error(&self) {
        self.resume();
    }

    /// Answer a recoverable error by stopping the run.
    pub fn abort_after_error(&self) {
        self.cancel();
    }

    /// Current phase of the run.
    pub fn phase(&self) -> RunPhase {
        self.control.phase()
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }
}
