//! Configuration for the rate limit strategy.

use std::sync::Arc;
use std::time::Duration;

use faultguard_core::events::{EventCallback, EventDispatcher};
use faultguard_core::DefinitionError;

use crate::events::RateLimitEvent;

/// How the trailing invocation history is accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    /// Non-overlapping intervals with a counter reset at each boundary.
    Fixed,
    /// A sliding log of recent admission timestamps.
    Rolling,
    /// A continuously refilling permit accumulator (token-bucket-like).
    Smooth,
}

/// Configuration for a rate limit.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub(crate) max_invocations: usize,
    pub(crate) window: Duration,
    pub(crate) min_spacing: Duration,
    pub(crate) window_type: WindowType,
    pub(crate) events: EventDispatcher<RateLimitEvent>,
}

impl RateLimitConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::new()
    }

    pub(crate) fn validate(&self) -> Result<(), DefinitionError> {
        if self.max_invocations == 0 {
            return Err(DefinitionError::InvalidConfiguration {
                strategy: "rate limit",
                message: "max_invocations must be at least 1".to_string(),
            });
        }
        if self.window.is_zero() {
            return Err(DefinitionError::InvalidConfiguration {
                strategy: "rate limit",
                message: "window must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`RateLimitConfig`].
pub struct RateLimitConfigBuilder {
    max_invocations: usize,
    window: Duration,
    min_spacing: Duration,
    window_type: WindowType,
    name: String,
    callbacks: Vec<EventCallback<RateLimitEvent>>,
}

impl RateLimitConfigBuilder {
    /// Creates a new builder with default values.
    ///
    /// Defaults: 100 invocations per 1 second fixed window, no minimum
    /// spacing.
    pub fn new() -> Self {
        Self {
            max_invocations: 100,
            window: Duration::from_secs(1),
            min_spacing: Duration::ZERO,
            window_type: WindowType::Fixed,
            name: "rate-limit".to_string(),
            callbacks: Vec::new(),
        }
    }

    /// Sets the maximum number of invocations per window.
    pub fn max_invocations(mut self, max: usize) -> Self {
        self.max_invocations = max;
        self
    }

    /// Sets the window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Sets the minimum spacing between consecutive invocations.
    pub fn min_spacing(mut self, spacing: Duration) -> Self {
        self.min_spacing = spacing;
        self
    }

    /// Sets the window type.
    pub fn window_type(mut self, window_type: WindowType) -> Self {
        self.window_type = window_type;
        self
    }

    /// Sets the name of this rate limit instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when an attempt is permitted.
    pub fn on_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, RateLimitEvent::Permitted) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when an attempt is rejected.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, RateLimitEvent::Rejected) {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> RateLimitConfig {
        RateLimitConfig {
            max_invocations: self.max_invocations,
            window: self.window,
            min_spacing: self.min_spacing,
            window_type: self.window_type,
            events: EventDispatcher::new(self.name, self.callbacks),
        }
    }
}

impl Default for RateLimitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
