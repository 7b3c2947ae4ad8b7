//! Rate limit strategy implementation.

use std::sync::{Arc, Mutex};

use faultguard_core::clock::Stopwatch;
use faultguard_core::invocation::{AsyncInvocation, SyncInvocation};
use faultguard_core::strategy::{
    AsyncStrategy, SharedAsyncStrategy, SharedSyncStrategy, SyncStrategy,
};
use faultguard_core::{BoxFuture, DefinitionError, GuardError};

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::config::{RateLimitConfig, WindowType};
use crate::events::RateLimitEvent;
use crate::window::{FixedWindow, RollingWindow, SmoothWindow, TimeWindow};

struct RateLimitShared {
    window: Mutex<Box<dyn TimeWindow>>,
    config: RateLimitConfig,
}

impl RateLimitShared {
    fn new(config: RateLimitConfig, stopwatch: &dyn Stopwatch) -> Result<Arc<Self>, DefinitionError> {
        config.validate()?;
        let running = stopwatch.start();
        let window_millis = config.window.as_millis() as u64;
        let spacing_millis = config.min_spacing.as_millis() as u64;
        let window: Box<dyn TimeWindow> = match config.window_type {
            WindowType::Fixed => Box::new(FixedWindow::new(
                running,
                config.max_invocations,
                window_millis,
                spacing_millis,
            )),
            WindowType::Rolling => Box::new(RollingWindow::new(
                running,
                config.max_invocations,
                window_millis,
                spacing_millis,
            )),
            WindowType::Smooth => Box::new(SmoothWindow::new(
                running,
                config.max_invocations,
                window_millis,
                spacing_millis,
            )),
        };
        Ok(Arc::new(Self {
            window: Mutex::new(window),
            config,
        }))
    }

    /// Records the attempt; emits events outside the window lock.
    fn try_permit(&self) -> bool {
        let permitted = {
            let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
            window.record()
        };
        self.config.events.dispatch(if permitted {
            &RateLimitEvent::Permitted
        } else {
            &RateLimitEvent::Rejected
        });

        #[cfg(feature = "metrics")]
        counter!(
            "rate_limit_attempts_total",
            "rate_limit" => self.config.events.strategy().to_string(),
            "outcome" => if permitted { "permitted" } else { "rejected" }
        )
        .increment(1);

        permitted
    }
}

/// Rate limit for synchronous pipelines.
pub struct SyncRateLimit<T, E> {
    next: SharedSyncStrategy<T, E>,
    shared: Arc<RateLimitShared>,
}

impl<T, E> SyncRateLimit<T, E> {
    /// Creates the strategy around the next one in the chain.
    pub fn new(
        next: SharedSyncStrategy<T, E>,
        config: RateLimitConfig,
        stopwatch: &dyn Stopwatch,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            next,
            shared: RateLimitShared::new(config, stopwatch)?,
        })
    }
}

impl<T, E> SyncStrategy<T, E> for SyncRateLimit<T, E> {
    fn apply(&self, ctx: &mut SyncInvocation<'_, T, E>) -> Result<T, GuardError<E>> {
        if !self.shared.try_permit() {
            return Err(GuardError::RateLimited);
        }
        self.next.apply(ctx)
    }
}

/// Rate limit for asynchronous pipelines.
pub struct AsyncRateLimit<T, E> {
    next: SharedAsyncStrategy<T, E>,
    shared: Arc<RateLimitShared>,
}

impl<T, E> AsyncRateLimit<T, E> {
    /// Creates the strategy around the next one in the chain.
    pub fn new(
        next: SharedAsyncStrategy<T, E>,
        config: RateLimitConfig,
        stopwatch: &dyn Stopwatch,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            next,
            shared: RateLimitShared::new(config, stopwatch)?,
        })
    }
}

impl<T, E> AsyncStrategy<T, E> for AsyncRateLimit<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn apply(&self, ctx: AsyncInvocation<T, E>) -> BoxFuture<'static, Result<T, GuardError<E>>> {
        let next = Arc::clone(&self.next);
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            if !shared.try_permit() {
                return Err(GuardError::RateLimited);
            }
            next.apply(ctx).await
        })
    }
}
