//! Per-invocation timeout state.

use std::sync::atomic::{AtomicU8, Ordering};

use faultguard_core::invocation::InterruptToken;

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const TIMED_OUT: u8 = 2;

/// Tracks one guarded invocation racing against its watcher.
///
/// Exactly one of the two parties wins the CAS from `RUNNING`: the
/// watcher (moving to `TIMED_OUT` and interrupting the invocation) or the
/// strategy observing the inner outcome (moving to `FINISHED` and
/// cancelling the watcher).
pub(crate) struct TimeoutExecution {
    state: AtomicU8,
    token: InterruptToken,
}

impl TimeoutExecution {
    pub(crate) fn new(token: InterruptToken) -> Self {
        Self {
            state: AtomicU8::new(RUNNING),
            token,
        }
    }

    /// Called by the watcher when the timer fires. Returns whether the
    /// watcher won the race.
    pub(crate) fn timeout(&self) -> bool {
        let won = self
            .state
            .compare_exchange(RUNNING, TIMED_OUT, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if won {
            self.token.interrupt();
        }
        won
    }

    /// Called when the inner invocation returns. Runs `on_finish` (used
    /// to cancel the watcher) only if the watcher has not fired yet.
    pub(crate) fn finish(&self, on_finish: impl FnOnce()) {
        let won = self
            .state
            .compare_exchange(RUNNING, FINISHED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if won {
            on_finish();
        }
    }

    pub(crate) fn has_timed_out(&self) -> bool {
        self.state.load(Ordering::SeqCst) == TIMED_OUT
    }
}
