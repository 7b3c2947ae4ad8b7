//! Retry strategy implementation.

use std::sync::Arc;
use std::time::Duration;

use faultguard_core::classifier::{FaultClassifier, FaultMatcher};
use faultguard_core::clock::Stopwatch;
use faultguard_core::invocation::{AsyncInvocation, SyncInvocation};
use faultguard_core::strategy::{
    AsyncStrategy, SharedAsyncStrategy, SharedSyncStrategy, SyncStrategy,
};
use faultguard_core::{BoxFuture, DefinitionError, GuardError};

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::config::RetryConfig;
use crate::events::RetryEvent;

struct RetryShared<E> {
    config: RetryConfig<E>,
    classifier: FaultClassifier<E>,
}

impl<E> RetryShared<E> {
    fn new(
        config: RetryConfig<E>,
        inspect_cause_chain: bool,
    ) -> Result<Arc<Self>, DefinitionError> {
        let retry_on = if config.retry_on.is_empty() {
            vec![FaultMatcher::any()]
        } else {
            config.retry_on.clone()
        };
        let classifier =
            FaultClassifier::new(retry_on, config.abort_on.clone(), inspect_cause_chain);
        Ok(Arc::new(Self { config, classifier }))
    }

    /// Decides what to do with a failed attempt. `attempts` counts the
    /// attempts made so far, `elapsed` the time since the first one.
    fn next_delay(
        &self,
        fault: &GuardError<E>,
        attempts: u32,
        elapsed: Duration,
    ) -> RetryDecision {
        // Interruption is never retried.
        if fault.is_interrupted() {
            return RetryDecision::GiveUp;
        }
        if !self.classifier.applies_to(fault) {
            return RetryDecision::GiveUp;
        }
        if attempts > self.config.max_retries {
            return RetryDecision::GiveUp;
        }
        let delay = self.config.backoff.delay_for(attempts - 1, fault);
        if !self.config.max_duration.is_zero() && elapsed + delay >= self.config.max_duration {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(delay)
    }

    fn succeeded(&self, attempts: u32) {
        self.config.events.dispatch(&RetryEvent::Succeeded { attempts });

        #[cfg(feature = "metrics")]
        counter!(
            "retry_invocations_total",
            "retry" => self.config.events.strategy().to_string(),
            "outcome" => "success"
        )
        .increment(1);
    }

    fn failed(&self, attempts: u32) {
        self.config.events.dispatch(&RetryEvent::Failed { attempts });

        #[cfg(feature = "metrics")]
        counter!(
            "retry_invocations_total",
            "retry" => self.config.events.strategy().to_string(),
            "outcome" => "failure"
        )
        .increment(1);
    }

    fn retried(&self, attempt: u32, delay: Duration) {
        self.config.events.dispatch(&RetryEvent::Retried { attempt, delay });

        #[cfg(feature = "metrics")]
        counter!("retry_retries_total", "retry" => self.config.events.strategy().to_string()).increment(1);
    }
}

enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Retry for synchronous pipelines. Delays block the calling thread but
/// wake early when the invocation is interrupted.
pub struct SyncRetry<T, E> {
    next: SharedSyncStrategy<T, E>,
    shared: Arc<RetryShared<E>>,
    stopwatch: Arc<dyn Stopwatch>,
}

impl<T, E> SyncRetry<T, E> {
    /// Creates the strategy around the next one in the chain.
    pub fn new(
        next: SharedSyncStrategy<T, E>,
        config: RetryConfig<E>,
        stopwatch: Arc<dyn Stopwatch>,
        inspect_cause_chain: bool,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            next,
            shared: RetryShared::new(config, inspect_cause_chain)?,
            stopwatch,
        })
    }
}

impl<T, E> SyncStrategy<T, E> for SyncRetry<T, E> {
    fn apply(&self, ctx: &mut SyncInvocation<'_, T, E>) -> Result<T, GuardError<E>> {
        let running = self.stopwatch.start();
        let mut attempts: u32 = 0;
        loop {
            let result = self.next.apply(ctx);
            attempts += 1;
            let fault = match result {
                Ok(value) => {
                    self.shared.succeeded(attempts);
                    return Ok(value);
                }
                Err(fault) => fault,
            };
            // An interrupt raised during the attempt propagates without
            // another try, even if the attempt itself produced a result.
            if ctx.interrupt_token().is_interrupted() {
                self.shared.failed(attempts);
                return Err(GuardError::Interrupted);
            }
            match self.shared.next_delay(&fault, attempts, running.elapsed()) {
                RetryDecision::GiveUp => {
                    self.shared.failed(attempts);
                    return Err(fault);
                }
                RetryDecision::RetryAfter(delay) => {
                    self.shared.retried(attempts, delay);
                    if !delay.is_zero() && ctx.interrupt_token().wait_for(delay) {
                        self.shared.failed(attempts);
                        return Err(GuardError::Interrupted);
                    }
                }
            }
        }
    }
}

/// Retry for asynchronous pipelines. Delays are scheduled on the tokio
/// timer; the caller's task is suspended, never a thread.
pub struct AsyncRetry<T, E> {
    next: SharedAsyncStrategy<T, E>,
    shared: Arc<RetryShared<E>>,
    stopwatch: Arc<dyn Stopwatch>,
}

impl<T, E> AsyncRetry<T, E> {
    /// Creates the strategy around the next one in the chain.
    pub fn new(
        next: SharedAsyncStrategy<T, E>,
        config: RetryConfig<E>,
        stopwatch: Arc<dyn Stopwatch>,
        inspect_cause_chain: bool,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            next,
            shared: RetryShared::new(config, inspect_cause_chain)?,
            stopwatch,
        })
    }
}

impl<T, E> AsyncStrategy<T, E> for AsyncRetry<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    fn apply(&self, ctx: AsyncInvocation<T, E>) -> BoxFuture<'static, Result<T, GuardError<E>>> {
        let next = Arc::clone(&self.next);
        let shared = Arc::clone(&self.shared);
        let running = self.stopwatch.start();
        Box::pin(async move {
            let mut attempts: u32 = 0;
            loop {
                let result = next.apply(ctx.clone()).await;
                attempts += 1;
                let fault = match result {
                    Ok(value) => {
                        shared.succeeded(attempts);
                        return Ok(value);
                    }
                    Err(fault) => fault,
                };
                match shared.next_delay(&fault, attempts, running.elapsed()) {
                    RetryDecision::GiveUp => {
                        shared.failed(attempts);
                        return Err(fault);
                    }
                    RetryDecision::RetryAfter(delay) => {
                        shared.retried(attempts, delay);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        })
    }
}
