//! Circuit breaker strategy implementation.

use std::sync::Arc;

use faultguard_core::classifier::{FaultClassifier, FaultMatcher};
use faultguard_core::clock::Stopwatch;
use faultguard_core::events::EventDispatcher;
use faultguard_core::invocation::{AsyncInvocation, SyncInvocation};
use faultguard_core::strategy::{
    AsyncStrategy, SharedAsyncStrategy, SharedSyncStrategy, SyncStrategy,
};
use faultguard_core::{BoxFuture, DefinitionError, GuardError};

use crate::breaker::CircuitBreaker;
use crate::config::CircuitBreakerConfig;
use crate::maintenance;

fn build_breaker<E>(
    config: &CircuitBreakerConfig<E>,
    stopwatch: &dyn Stopwatch,
) -> Result<Arc<CircuitBreaker>, DefinitionError> {
    config.validate()?;
    let events = EventDispatcher::new(config.display_name(), config.callbacks.clone());
    let breaker = Arc::new(CircuitBreaker::new(
        config.name.clone(),
        config.display_name(),
        config.request_volume_threshold,
        config.failure_ratio,
        config.delay.as_millis() as u64,
        config.success_threshold,
        events,
        stopwatch,
    ));
    maintenance::register(&breaker)?;
    Ok(breaker)
}

fn build_classifier<E>(
    config: &CircuitBreakerConfig<E>,
    inspect_cause_chain: bool,
) -> FaultClassifier<E> {
    let fail_on = if config.fail_on.is_empty() {
        vec![FaultMatcher::any()]
    } else {
        config.fail_on.clone()
    };
    FaultClassifier::new(fail_on, config.skip_on.clone(), inspect_cause_chain)
}

fn rejection<E>(breaker: &CircuitBreaker) -> GuardError<E> {
    GuardError::CircuitBreakerOpen {
        name: breaker.name().map(|name| name.to_string()),
    }
}

/// Circuit breaker for synchronous pipelines.
pub struct SyncCircuitBreaker<T, E> {
    next: SharedSyncStrategy<T, E>,
    breaker: Arc<CircuitBreaker>,
    classifier: FaultClassifier<E>,
}

impl<T, E> SyncCircuitBreaker<T, E> {
    /// Creates the strategy around the next one in the chain. A named
    /// breaker is registered with the maintenance surface; a duplicate
    /// name fails the build.
    pub fn new(
        next: SharedSyncStrategy<T, E>,
        config: CircuitBreakerConfig<E>,
        stopwatch: &dyn Stopwatch,
        inspect_cause_chain: bool,
    ) -> Result<Self, DefinitionError> {
        let breaker = build_breaker(&config, stopwatch)?;
        let classifier = build_classifier(&config, inspect_cause_chain);
        Ok(Self {
            next,
            breaker,
            classifier,
        })
    }

    /// The underlying breaker state machine.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

impl<T, E> SyncStrategy<T, E> for SyncCircuitBreaker<T, E> {
    fn apply(&self, ctx: &mut SyncInvocation<'_, T, E>) -> Result<T, GuardError<E>> {
        if !self.breaker.try_acquire() {
            return Err(rejection(&self.breaker));
        }
        let result = self.next.apply(ctx);
        match &result {
            Ok(_) => self.breaker.record(false),
            Err(fault) => self.breaker.record(self.classifier.applies_to(fault)),
        }
        result
    }
}

/// Circuit breaker for asynchronous pipelines.
pub struct AsyncCircuitBreaker<T, E> {
    next: SharedAsyncStrategy<T, E>,
    breaker: Arc<CircuitBreaker>,
    classifier: FaultClassifier<E>,
}

impl<T, E> AsyncCircuitBreaker<T, E> {
    /// Creates the strategy around the next one in the chain.
    pub fn new(
        next: SharedAsyncStrategy<T, E>,
        config: CircuitBreakerConfig<E>,
        stopwatch: &dyn Stopwatch,
        inspect_cause_chain: bool,
    ) -> Result<Self, DefinitionError> {
        let breaker = build_breaker(&config, stopwatch)?;
        let classifier = build_classifier(&config, inspect_cause_chain);
        Ok(Self {
            next,
            breaker,
            classifier,
        })
    }

    /// The underlying breaker state machine.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

impl<T, E> AsyncStrategy<T, E> for AsyncCircuitBreaker<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    fn apply(&self, ctx: AsyncInvocation<T, E>) -> BoxFuture<'static, Result<T, GuardError<E>>> {
        let next = Arc::clone(&self.next);
        let breaker = Arc::clone(&self.breaker);
        let classifier = self.classifier.clone();
        Box::pin(async move {
            if !breaker.try_acquire() {
                return Err(rejection(&breaker));
            }
            let result = next.apply(ctx).await;
            match &result {
                Ok(_) => breaker.record(false),
                Err(fault) => breaker.record(classifier.applies_to(fault)),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultguard_core::clock::ManualStopwatch;
    use faultguard_core::strategy::Invoke;
    use faultguard_core::FaultKind;
    use std::time::Duration;

    fn config(rvt: usize, ratio: f64) -> CircuitBreakerConfig<&'static str> {
        CircuitBreakerConfig::builder()
            .request_volume_threshold(rvt)
            .failure_ratio(ratio)
            .delay(Duration::from_millis(500))
            .build()
    }

    #[test]
    fn open_breaker_rejects_without_reaching_the_target() {
        let clock = ManualStopwatch::new();
        let cb: SyncCircuitBreaker<u32, &'static str> =
            SyncCircuitBreaker::new(Arc::new(Invoke), config(2, 0.1), &clock, false).unwrap();

        let mut calls = 0;
        let mut failing = || {
            calls += 1;
            Err("boom")
        };
        let mut ctx = SyncInvocation::new(&mut failing);
        assert!(cb.apply(&mut ctx).is_err());
        assert!(cb.apply(&mut ctx).is_err());
        drop(ctx);

        // Breaker is open now; the target must not be reached.
        let mut counting = || {
            calls += 1;
            Ok(1)
        };
        let mut ctx = SyncInvocation::new(&mut counting);
        assert!(matches!(
            cb.apply(&mut ctx),
            Err(GuardError::CircuitBreakerOpen { .. })
        ));
        drop(ctx);
        assert_eq!(calls, 2);

        // After the delay, a trial goes through and closes the breaker.
        clock.set_millis(500);
        let mut succeeding = || Ok(7);
        let mut ctx = SyncInvocation::new(&mut succeeding);
        assert_eq!(cb.apply(&mut ctx).unwrap(), 7);
    }

    #[test]
    fn skip_on_failures_count_as_successes() {
        let clock = ManualStopwatch::new();
        let config = CircuitBreakerConfig::builder()
            .request_volume_threshold(2)
            .failure_ratio(0.1)
            .skip_on(FaultMatcher::kind(FaultKind::Application))
            .build();
        let cb: SyncCircuitBreaker<u32, &'static str> =
            SyncCircuitBreaker::new(Arc::new(Invoke), config, &clock, false).unwrap();

        let mut failing = || Err("expected");
        let mut ctx = SyncInvocation::new(&mut failing);
        for _ in 0..5 {
            assert!(matches!(
                cb.apply(&mut ctx),
                Err(GuardError::Application(_))
            ));
        }
        assert_eq!(
            cb.breaker().state(),
            crate::breaker::CircuitState::Closed
        );
    }

    #[tokio::test]
    async fn async_breaker_shares_state_across_invocations() {
        let clock = ManualStopwatch::new();
        let cb: Arc<AsyncCircuitBreaker<u32, &'static str>> = Arc::new(
            AsyncCircuitBreaker::new(
                Arc::new(faultguard_core::strategy::AsyncInvoke),
                config(2, 0.1),
                &clock,
                false,
            )
            .unwrap(),
        );

        let failing = AsyncInvocation::new(|| async { Err("boom") });
        assert!(cb.apply(failing.clone()).await.is_err());
        assert!(cb.apply(failing.clone()).await.is_err());

        let ok = AsyncInvocation::new(|| async { Ok(1) });
        assert!(matches!(
            cb.apply(ok.clone()).await,
            Err(GuardError::CircuitBreakerOpen { .. })
        ));

        clock.set_millis(500);
        assert_eq!(cb.apply(ok).await.unwrap(), 1);
    }
}
