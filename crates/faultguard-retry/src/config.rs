//! Configuration for the retry strategy.

use std::sync::Arc;
use std::time::Duration;

use faultguard_core::classifier::FaultMatcher;
use faultguard_core::events::{EventCallback, EventDispatcher};

use crate::backoff::{Backoff, ConstantBackoff, CustomBackoff, ExponentialBackoff, FibonacciBackoff};
use crate::events::RetryEvent;

/// Configuration for a retry.
pub struct RetryConfig<E> {
    pub(crate) max_retries: u32,
    pub(crate) max_duration: Duration,
    pub(crate) backoff: Arc<dyn Backoff<E>>,
    pub(crate) retry_on: Vec<FaultMatcher<E>>,
    pub(crate) abort_on: Vec<FaultMatcher<E>>,
    pub(crate) events: EventDispatcher<RetryEvent>,
}

impl<E> Clone for RetryConfig<E> {
    fn clone(&self) -> Self {
        Self {
            max_retries: self.max_retries,
            max_duration: self.max_duration,
            backoff: Arc::clone(&self.backoff),
            retry_on: self.retry_on.clone(),
            abort_on: self.abort_on.clone(),
            events: self.events.clone(),
        }
    }
}

impl<E> RetryConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_retries: u32,
    max_duration: Duration,
    delay: Duration,
    jitter: Duration,
    backoff: Option<Arc<dyn Backoff<E>>>,
    retry_on: Vec<FaultMatcher<E>>,
    abort_on: Vec<FaultMatcher<E>>,
    name: String,
    callbacks: Vec<EventCallback<RetryEvent>>,
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a new builder with default values.
    ///
    /// Defaults: 3 retries (so up to 4 attempts), no base delay with
    /// 200 ms of jitter, 3 minutes of total budget, every fault retried.
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            max_duration: Duration::from_secs(180),
            delay: Duration::ZERO,
            jitter: Duration::from_millis(200),
            backoff: None,
            retry_on: Vec::new(),
            abort_on: Vec::new(),
            name: "retry".to_string(),
            callbacks: Vec::new(),
        }
    }

    /// Sets the number of retries after the initial attempt.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the total time budget across all attempts and delays.
    /// `Duration::ZERO` means no budget.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Sets the base delay of the default constant schedule.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the jitter amplitude of the default constant schedule.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Uses an exponential backoff schedule instead of a constant delay.
    pub fn exponential_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Uses a Fibonacci backoff schedule instead of a constant delay.
    pub fn fibonacci_backoff(mut self, backoff: FibonacciBackoff) -> Self {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Uses a caller-supplied backoff schedule.
    pub fn custom_backoff<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, &faultguard_core::GuardError<E>) -> Duration + Send + Sync + 'static,
        E: 'static,
    {
        self.backoff = Some(Arc::new(CustomBackoff::new(f)));
        self
    }

    /// Adds a matcher for faults that are retried. With no matcher every
    /// fault is.
    pub fn retry_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.retry_on.push(matcher);
        self
    }

    /// Adds a matcher for faults that abort retrying immediately, taking
    /// priority over `retry_on`.
    pub fn abort_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.abort_on.push(matcher);
        self
    }

    /// Sets the name of this retry instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each retry, with the 1-based
    /// retry number and the delay preceding it.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if let RetryEvent::Retried { attempt, delay } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked on success, with the total attempt
    /// count.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if let RetryEvent::Succeeded { attempts } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when retrying gives up, with the
    /// total attempt count.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if let RetryEvent::Failed { attempts } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> RetryConfig<E> {
        let backoff = self
            .backoff
            .unwrap_or_else(|| Arc::new(ConstantBackoff::new(self.delay, self.jitter)));
        RetryConfig {
            max_retries: self.max_retries,
            max_duration: self.max_duration,
            backoff,
            retry_on: self.retry_on,
            abort_on: self.abort_on,
            events: EventDispatcher::new(self.name, self.callbacks),
        }
    }
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
