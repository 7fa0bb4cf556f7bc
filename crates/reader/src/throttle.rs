//! Single-flight execution with coalesced reruns.
//!
//! A [`ThrottledTrigger`] wraps an async operation. Calling [`trigger`] while an
//! execution is in flight does not start a second one. Instead it marks a rerun,
//! and the in-flight caller runs the operation exactly once more after it
//! finishes, no matter how many triggers arrived in between.
//!
//! [`trigger`]: ThrottledTrigger::trigger

use std::{fmt, future::Future, pin::pin};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::*;

#[derive(Debug, Default)]
struct ThrottleState {
    in_progress: bool,
    pending_rerun: bool,
}

/// Result of a successful [`ThrottledTrigger::trigger`] call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// This caller ran the operation `runs` times, including coalesced reruns.
    Executed { runs: usize },

    /// An execution was already in flight; it will rerun once it finishes.
    Coalesced,
}

pub struct ThrottledTrigger<F> {
    op: F,
    state: Mutex<ThrottleState>,
    /// Woken whenever `in_progress` is released.
    idle: Notify,
}

impl<F> fmt::Debug for ThrottledTrigger<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottledTrigger")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl<F, Fut, E> ThrottledTrigger<F>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    pub fn new(op: F) -> Self {
        Self {
            op,
            state: Mutex::new(ThrottleState::default()),
            idle: Notify::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().in_progress
    }

    /// Returns true if a trigger arrived during an execution that has not been
    /// followed by a rerun yet. This happens when that execution failed.
    pub fn has_pending_rerun(&self) -> bool {
        self.state.lock().pending_rerun
    }

    /// Runs the operation, or schedules a rerun if it is already running.
    ///
    /// An error ends the loop and is returned to this caller. A rerun requested
    /// during the failed execution stays pending and is served by the next call.
    pub async fn trigger(&self) -> Result<TriggerOutcome, E> {
        {
            let mut state = self.state.lock();
            if state.in_progress {
                state.pending_rerun = true;
                trace!("execution in flight, rerun requested");
                return Ok(TriggerOutcome::Coalesced);
            }
            state.in_progress = true;
            // this execution serves any rerun left over from a failed one
            state.pending_rerun = false;
        }

        let mut guard = InProgressGuard::new(&self.state, &self.idle);
        let mut runs = 0;
        loop {
            runs += 1;
            (self.op)().await?;

            let mut state = self.state.lock();
            if !state.pending_rerun {
                state.in_progress = false;
                guard.disarm();
                break;
            }
            state.pending_rerun = false;
            debug!(%runs, "running coalesced rerun");
        }
        self.idle.notify_waiters();

        Ok(TriggerOutcome::Executed { runs })
    }

    /// Like [`trigger`](Self::trigger), but never returns
    /// [`TriggerOutcome::Coalesced`].
    ///
    /// If an execution is in flight, waits for it to end and triggers again,
    /// so the returned outcome always covers an execution that started after
    /// this call.
    pub async fn trigger_and_wait(&self) -> Result<TriggerOutcome, E> {
        loop {
            // registered before triggering so a release in between is not missed
            let mut idle = pin!(self.idle.notified());
            idle.as_mut().enable();

            match self.trigger().await? {
                TriggerOutcome::Coalesced => idle.await,
                executed => return Ok(executed),
            }
        }
    }
}

/// Clears `in_progress` if the executing caller errors out or is dropped.
struct InProgressGuard<'a> {
    state: &'a Mutex<ThrottleState>,
    idle: &'a Notify,
    armed: bool,
}

impl<'a> InProgressGuard<'a> {
    fn new(state: &'a Mutex<ThrottleState>, idle: &'a Notify) -> Self {
        Self {
            state,
            idle,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.lock().in_progress = false;
            self.idle.notify_waiters();
        }
    }
}
