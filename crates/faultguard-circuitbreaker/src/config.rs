//! Configuration for the circuit breaker strategy.

use std::sync::Arc;
use std::time::Duration;

use faultguard_core::classifier::FaultMatcher;
use faultguard_core::events::EventCallback;
use faultguard_core::DefinitionError;

use crate::breaker::CircuitState;
use crate::events::CircuitBreakerEvent;

/// Configuration for a circuit breaker.
pub struct CircuitBreakerConfig<E> {
    pub(crate) name: Option<String>,
    pub(crate) request_volume_threshold: usize,
    pub(crate) failure_ratio: f64,
    pub(crate) delay: Duration,
    pub(crate) success_threshold: u32,
    pub(crate) fail_on: Vec<FaultMatcher<E>>,
    pub(crate) skip_on: Vec<FaultMatcher<E>>,
    pub(crate) callbacks: Vec<EventCallback<CircuitBreakerEvent>>,
}

impl<E> Clone for CircuitBreakerConfig<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            request_volume_threshold: self.request_volume_threshold,
            failure_ratio: self.failure_ratio,
            delay: self.delay,
            success_threshold: self.success_threshold,
            fail_on: self.fail_on.clone(),
            skip_on: self.skip_on.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<E> CircuitBreakerConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder<E> {
        CircuitBreakerConfigBuilder::new()
    }

    pub(crate) fn validate(&self) -> Result<(), DefinitionError> {
        if self.request_volume_threshold == 0 {
            return Err(DefinitionError::InvalidConfiguration {
                strategy: "circuit breaker",
                message: "request_volume_threshold must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.failure_ratio) {
            return Err(DefinitionError::InvalidConfiguration {
                strategy: "circuit breaker",
                message: format!(
                    "failure_ratio must be between 0 and 1, got {}",
                    self.failure_ratio
                ),
            });
        }
        if self.success_threshold == 0 {
            return Err(DefinitionError::InvalidConfiguration {
                strategy: "circuit breaker",
                message: "success_threshold must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| "circuit-breaker".to_string())
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder<E> {
    name: Option<String>,
    request_volume_threshold: usize,
    failure_ratio: f64,
    delay: Duration,
    success_threshold: u32,
    fail_on: Vec<FaultMatcher<E>>,
    skip_on: Vec<FaultMatcher<E>>,
    callbacks: Vec<EventCallback<CircuitBreakerEvent>>,
}

impl<E> CircuitBreakerConfigBuilder<E> {
    /// Creates a new builder with default values.
    ///
    /// Defaults: window of 20 outcomes, open above a 0.5 failure ratio,
    /// 5 second delay, 1 successful trial to close, every fault counted
    /// as failure.
    pub fn new() -> Self {
        Self {
            name: None,
            request_volume_threshold: 20,
            failure_ratio: 0.5,
            delay: Duration::from_secs(5),
            success_threshold: 1,
            fail_on: Vec::new(),
            skip_on: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    /// Names the breaker, registering it with the process-wide
    /// maintenance surface at build time. Names must be unique.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the rolling window size: the number of recent outcomes the
    /// failure ratio is computed over.
    pub fn request_volume_threshold(mut self, size: usize) -> Self {
        self.request_volume_threshold = size;
        self
    }

    /// Sets the failure ratio above which a full window opens the
    /// breaker.
    pub fn failure_ratio(mut self, ratio: f64) -> Self {
        self.failure_ratio = ratio;
        self
    }

    /// Sets how long the breaker stays open before admitting trials.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets how many consecutive trial successes close the breaker.
    pub fn success_threshold(mut self, count: u32) -> Self {
        self.success_threshold = count;
        self
    }

    /// Adds a matcher for faults counted as failures. With no matcher
    /// every fault counts.
    pub fn fail_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.fail_on.push(matcher);
        self
    }

    /// Adds a matcher for faults treated as successes, taking priority
    /// over `fail_on`.
    pub fn skip_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.skip_on.push(matcher);
        self
    }

    /// Registers a callback observing state changes.
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if let CircuitBreakerEvent::StateChanged { from, to } = event {
                f(*from, *to);
            }
        }));
        self
    }

    /// Registers a callback invoked for every recorded success.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, CircuitBreakerEvent::Succeeded) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked for every recorded failure.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, CircuitBreakerEvent::Failed) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked for every prevented invocation.
    pub fn on_prevented<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, CircuitBreakerEvent::Prevented) {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CircuitBreakerConfig<E> {
        CircuitBreakerConfig {
            name: self.name,
            request_volume_threshold: self.request_volume_threshold,
            failure_ratio: self.failure_ratio,
            delay: self.delay,
            success_threshold: self.success_threshold,
            fail_on: self.fail_on,
            skip_on: self.skip_on,
            callbacks: self.callbacks,
        }
    }
}

impl<E> Default for CircuitBreakerConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
