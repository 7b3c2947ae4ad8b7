//! Timeout strategy implementation.

use std::sync::Arc;
use std::time::Instant;

use faultguard_core::invocation::{AsyncInvocation, SyncInvocation};
use faultguard_core::strategy::{
    AsyncStrategy, SharedAsyncStrategy, SharedSyncStrategy, SyncStrategy,
};
use faultguard_core::timer::Timer;
use faultguard_core::{BoxFuture, DefinitionError, GuardError};

#[cfg(feature = "metrics")]
use metrics::histogram;

use crate::config::TimeoutConfig;
use crate::events::TimeoutEvent;
use crate::execution::TimeoutExecution;

fn emit_timed_out(config: &TimeoutConfig, started: Instant) {
    config.events.dispatch(&TimeoutEvent::TimedOut);

    #[cfg(feature = "metrics")]
    histogram!("timeout_timed_out_seconds", "timeout" => config.name.clone())
        .record(started.elapsed().as_secs_f64());
    #[cfg(not(feature = "metrics"))]
    let _ = started;
}

fn emit_finished(config: &TimeoutConfig, started: Instant) {
    config.events.dispatch(&TimeoutEvent::Finished);

    #[cfg(feature = "metrics")]
    histogram!("timeout_succeeded_seconds", "timeout" => config.name.clone())
        .record(started.elapsed().as_secs_f64());
    #[cfg(not(feature = "metrics"))]
    let _ = started;
}

fn timeout_error<E>(config: &TimeoutConfig) -> GuardError<E> {
    GuardError::Timeout {
        description: config.name.clone(),
    }
}

/// Timeout for synchronous pipelines.
///
/// A watcher scheduled on the shared timer thread interrupts the
/// invocation's token when the duration elapses. Whatever the inner
/// outcome was, a fired watcher turns it into a timeout failure, and the
/// interrupt flag is cleared unconditionally before this strategy
/// returns; an interrupt that was *not* raised by the watcher surfaces as
/// [`GuardError::Interrupted`].
pub struct SyncTimeout<T, E> {
    next: SharedSyncStrategy<T, E>,
    config: Arc<TimeoutConfig>,
    timer: &'static Timer,
}

impl<T, E> SyncTimeout<T, E> {
    /// Creates the strategy around the next one in the chain, scheduling
    /// watchers on the process-wide timer.
    pub fn new(
        next: SharedSyncStrategy<T, E>,
        config: TimeoutConfig,
    ) -> Result<Self, DefinitionError> {
        Self::with_timer(next, config, Timer::shared())
    }

    /// Creates the strategy with an explicit timer.
    pub fn with_timer(
        next: SharedSyncStrategy<T, E>,
        config: TimeoutConfig,
        timer: &'static Timer,
    ) -> Result<Self, DefinitionError> {
        config.validate()?;
        Ok(Self {
            next,
            config: Arc::new(config),
            timer,
        })
    }
}

impl<T, E> SyncStrategy<T, E> for SyncTimeout<T, E> {
    fn apply(&self, ctx: &mut SyncInvocation<'_, T, E>) -> Result<T, GuardError<E>> {
        let execution = Arc::new(TimeoutExecution::new(ctx.interrupt_token().clone()));
        let watcher = Arc::clone(&execution);
        let watch = self.timer.schedule(self.config.duration, move || {
            watcher.timeout();
        });
        let started = Instant::now();

        let result = self.next.apply(ctx);

        execution.finish(|| watch.cancel());
        // Interruption status must be cleared on every exit path.
        let interrupted = ctx.interrupt_token().clear();

        if execution.has_timed_out() {
            emit_timed_out(&self.config, started);
            return Err(timeout_error(&self.config));
        }
        emit_finished(&self.config, started);
        if interrupted {
            return Err(GuardError::Interrupted);
        }
        result
    }
}

/// Timeout for asynchronous pipelines.
///
/// The inner invocation races a tokio timer; whichever resolves first
/// wins and the loser is dropped. No interruption is attempted.
pub struct AsyncTimeout<T, E> {
    next: SharedAsyncStrategy<T, E>,
    config: Arc<TimeoutConfig>,
}

impl<T, E> AsyncTimeout<T, E> {
    /// Creates the strategy around the next one in the chain.
    pub fn new(
        next: SharedAsyncStrategy<T, E>,
        config: TimeoutConfig,
    ) -> Result<Self, DefinitionError> {
        config.validate()?;
        Ok(Self {
            next,
            config: Arc::new(config),
        })
    }
}

impl<T, E> AsyncStrategy<T, E> for AsyncTimeout<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn apply(&self, ctx: AsyncInvocation<T, E>) -> BoxFuture<'static, Result<T, GuardError<E>>> {
        let next = Arc::clone(&self.next);
        let config = Arc::clone(&self.config);
        Box::pin(async move {
            let started = Instant::now();
            let inner = next.apply(ctx);
            tokio::select! {
                result = inner => {
                    emit_finished(&config, started);
                    result
                }
                _ = tokio::time::sleep(config.duration) => {
                    emit_timed_out(&config, started);
                    Err(timeout_error(&config))
                }
            }
        })
    }
}
