//! Configuration for the fallback strategy.

use std::sync::Arc;

use faultguard_core::classifier::FaultMatcher;
use faultguard_core::events::EventCallback;
use faultguard_core::{BoxFuture, GuardError};

use crate::events::FallbackEvent;

/// A synchronous fallback handler: substitutes an outcome for the fault.
pub type SyncHandler<T, E> = Arc<dyn Fn(&GuardError<E>) -> Result<T, E> + Send + Sync>;

/// An asynchronous fallback handler.
pub type AsyncHandler<T, E> =
    Arc<dyn Fn(&GuardError<E>) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Configuration for a fallback, generic over the handler shape.
pub struct FallbackConfig<E, H> {
    pub(crate) typed: Vec<(FaultMatcher<E>, H)>,
    pub(crate) catch_all: Vec<H>,
    pub(crate) apply_on: Vec<FaultMatcher<E>>,
    pub(crate) skip_on: Vec<FaultMatcher<E>>,
    pub(crate) name: String,
    pub(crate) callbacks: Vec<EventCallback<FallbackEvent>>,
}

/// Configuration for a synchronous fallback.
pub type SyncFallbackConfig<T, E> = FallbackConfig<E, SyncHandler<T, E>>;

/// Configuration for an asynchronous fallback.
pub type AsyncFallbackConfig<T, E> = FallbackConfig<E, AsyncHandler<T, E>>;

impl<E, H: Clone> Clone for FallbackConfig<E, H> {
    fn clone(&self) -> Self {
        Self {
            typed: self.typed.clone(),
            catch_all: self.catch_all.clone(),
            apply_on: self.apply_on.clone(),
            skip_on: self.skip_on.clone(),
            name: self.name.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<E, H> FallbackConfig<E, H> {
    /// Creates a new configuration builder.
    pub fn builder() -> FallbackConfigBuilder<E, H> {
        FallbackConfigBuilder::new()
    }
}

/// Builder for [`FallbackConfig`].
pub struct FallbackConfigBuilder<E, H> {
    typed: Vec<(FaultMatcher<E>, H)>,
    catch_all: Vec<H>,
    apply_on: Vec<FaultMatcher<E>>,
    skip_on: Vec<FaultMatcher<E>>,
    name: String,
    callbacks: Vec<EventCallback<FallbackEvent>>,
}

impl<E, H> FallbackConfigBuilder<E, H> {
    /// Creates a new builder. By default the fallback activates for
    /// every fault and has no handlers.
    pub fn new() -> Self {
        Self {
            typed: Vec::new(),
            catch_all: Vec::new(),
            apply_on: Vec::new(),
            skip_on: Vec::new(),
            name: "fallback".to_string(),
            callbacks: Vec::new(),
        }
    }

    /// Adds a matcher for faults the fallback activates on. With no
    /// matcher every fault activates it.
    pub fn apply_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.apply_on.push(matcher);
        self
    }

    /// Adds a matcher for faults that are rethrown untouched, taking
    /// priority over `apply_on`.
    pub fn skip_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.skip_on.push(matcher);
        self
    }

    /// Registers a handler for faults matching `matcher`. Typed handlers
    /// are consulted in registration order; at most one handler may be
    /// registered per fault kind or error type.
    pub fn handler_for(mut self, matcher: FaultMatcher<E>, handler: H) -> Self {
        self.typed.push((matcher, handler));
        self
    }

    /// Registers the handler used when no typed handler matches.
    pub fn handler(mut self, handler: H) -> Self {
        self.catch_all.push(handler);
        self
    }

    /// Sets the name of this fallback instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked whenever a handler substitutes the
    /// outcome.
    pub fn on_applied<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, FallbackEvent::Applied) {
                f();
            }
        }));
        self
    }

    /// Builds the configuration. Handler duplication is checked when the
    /// pipeline is built.
    pub fn build(self) -> FallbackConfig<E, H> {
        FallbackConfig {
            typed: self.typed,
            catch_all: self.catch_all,
            apply_on: self.apply_on,
            skip_on: self.skip_on,
            name: self.name,
            callbacks: self.callbacks,
        }
    }
}

impl<E, H> Default for FallbackConfigBuilder<E, H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a plain value-producing function as a synchronous handler.
pub fn sync_handler<T, E, F>(f: F) -> SyncHandler<T, E>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
{
    Arc::new(move |_fault| f())
}

/// Wraps a fault-inspecting function as a synchronous handler.
pub fn sync_handler_with_fault<T, E, F>(f: F) -> SyncHandler<T, E>
where
    F: Fn(&GuardError<E>) -> Result<T, E> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a future-producing function as an asynchronous handler.
pub fn async_handler<T, E, F, Fut>(f: F) -> AsyncHandler<T, E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
{
    Arc::new(move |_fault| Box::pin(f()))
}

/// Wraps a fault-inspecting, future-producing function as an
/// asynchronous handler.
pub fn async_handler_with_fault<T, E, F, Fut>(f: F) -> AsyncHandler<T, E>
where
    F: Fn(&GuardError<E>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
{
    Arc::new(move |fault| Box::pin(f(fault)))
}
