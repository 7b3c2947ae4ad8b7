//! Fallback strategy implementation.

use std::sync::Arc;

use faultguard_core::classifier::{FaultClassifier, FaultMatcher};
use faultguard_core::events::EventDispatcher;
use faultguard_core::invocation::{AsyncInvocation, SyncInvocation};
use faultguard_core::strategy::{
    AsyncStrategy, SharedAsyncStrategy, SharedSyncStrategy, SyncStrategy,
};
use faultguard_core::{BoxFuture, DefinitionError, GuardError};

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::candidates::FallbackCandidates;
use crate::config::{AsyncHandler, FallbackConfig, SyncHandler};
use crate::events::FallbackEvent;

struct FallbackShared<E, H> {
    candidates: FallbackCandidates<E, H>,
    classifier: FaultClassifier<E>,
    events: EventDispatcher<FallbackEvent>,
    inspect_cause_chain: bool,
}

impl<E, H> FallbackShared<E, H> {
    fn new(
        config: FallbackConfig<E, H>,
        inspect_cause_chain: bool,
    ) -> Result<Arc<Self>, DefinitionError> {
        let mut candidates = FallbackCandidates::new();
        for (matcher, handler) in config.typed {
            candidates.add_typed(matcher, handler)?;
        }
        for handler in config.catch_all {
            candidates.set_catch_all(handler)?;
        }
        if candidates.is_empty() {
            return Err(DefinitionError::InvalidConfiguration {
                strategy: "fallback",
                message: "at least one handler must be registered".to_string(),
            });
        }
        let apply_on = if config.apply_on.is_empty() {
            vec![FaultMatcher::any()]
        } else {
            config.apply_on
        };
        let classifier = FaultClassifier::new(apply_on, config.skip_on, inspect_cause_chain);
        Ok(Arc::new(Self {
            candidates,
            classifier,
            events: EventDispatcher::new(config.name, config.callbacks),
            inspect_cause_chain,
        }))
    }

    /// Selects the handler for a fault, honoring activation rules first.
    fn select(&self, fault: &GuardError<E>) -> Option<&H> {
        if !self.classifier.applies_to(fault) {
            return None;
        }
        self.candidates.resolve(fault, self.inspect_cause_chain)
    }

    fn applied(&self) {
        self.events.dispatch(&FallbackEvent::Applied);

        #[cfg(feature = "metrics")]
        counter!("fallback_applied_total", "fallback" => self.events.strategy().to_string()).increment(1);
    }
}

/// Fallback for synchronous pipelines.
pub struct SyncFallback<T, E> {
    next: SharedSyncStrategy<T, E>,
    shared: Arc<FallbackShared<E, SyncHandler<T, E>>>,
}

impl<T, E> SyncFallback<T, E> {
    /// Creates the strategy around the next one in the chain. Duplicate
    /// handler registrations fail the build.
    pub fn new(
        next: SharedSyncStrategy<T, E>,
        config: FallbackConfig<E, SyncHandler<T, E>>,
        inspect_cause_chain: bool,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            next,
            shared: FallbackShared::new(config, inspect_cause_chain)?,
        })
    }
}

impl<T, E> SyncStrategy<T, E> for SyncFallback<T, E> {
    fn apply(&self, ctx: &mut SyncInvocation<'_, T, E>) -> Result<T, GuardError<E>> {
        let fault = match self.next.apply(ctx) {
            Ok(value) => return Ok(value),
            Err(fault) => fault,
        };
        match self.shared.select(&fault) {
            Some(handler) => {
                self.shared.applied();
                handler(&fault).map_err(GuardError::Application)
            }
            None => Err(fault),
        }
    }
}

/// Fallback for asynchronous pipelines.
pub struct AsyncFallback<T, E> {
    next: SharedAsyncStrategy<T, E>,
    shared: Arc<FallbackShared<E, AsyncHandler<T, E>>>,
}

impl<T, E> AsyncFallback<T, E> {
    /// Creates the strategy around the next one in the chain.
    pub fn new(
        next: SharedAsyncStrategy<T, E>,
        config: FallbackConfig<E, AsyncHandler<T, E>>,
        inspect_cause_chain: bool,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            next,
            shared: FallbackShared::new(config, inspect_cause_chain)?,
        })
    }
}

impl<T, E> AsyncStrategy<T, E> for AsyncFallback<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    fn apply(&self, ctx: AsyncInvocation<T, E>) -> BoxFuture<'static, Result<T, GuardError<E>>> {
        let next = Arc::clone(&self.next);
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            let fault = match next.apply(ctx).await {
                Ok(value) => return Ok(value),
                Err(fault) => fault,
            };
            let substitute = match shared.select(&fault) {
                Some(handler) => {
                    shared.applied();
                    handler(&fault)
                }
                None => return Err(fault),
            };
            substitute.await.map_err(GuardError::Application)
        })
    }
}
