//! Configuration for the bulkhead strategy.

use std::sync::Arc;
use std::time::Duration;

use faultguard_core::events::{EventCallback, EventDispatcher};
use faultguard_core::DefinitionError;

use crate::events::BulkheadEvent;

/// Configuration for a bulkhead.
#[derive(Clone)]
pub struct BulkheadConfig {
    pub(crate) max_concurrent: usize,
    pub(crate) queue_size: usize,
    pub(crate) events: EventDispatcher<BulkheadEvent>,
}

impl BulkheadConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    pub(crate) fn validate(&self) -> Result<(), DefinitionError> {
        if self.max_concurrent == 0 {
            return Err(DefinitionError::InvalidConfiguration {
                strategy: "bulkhead",
                message: "max_concurrent must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`BulkheadConfig`].
pub struct BulkheadConfigBuilder {
    max_concurrent: usize,
    queue_size: usize,
    name: String,
    callbacks: Vec<EventCallback<BulkheadEvent>>,
}

impl BulkheadConfigBuilder {
    /// Creates a new builder with default values.
    ///
    /// Defaults: `max_concurrent = 10`, `queue_size = 10` (async only),
    /// name `"bulkhead"`.
    pub fn new() -> Self {
        Self {
            max_concurrent: 10,
            queue_size: 10,
            name: "bulkhead".to_string(),
            callbacks: Vec::new(),
        }
    }

    /// Sets the maximum number of concurrent invocations.
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Sets the queue length for waiting invocations. Only asynchronous
    /// pipelines queue; synchronous bulkheads reject immediately.
    pub fn queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    /// Sets the name of this bulkhead instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when an invocation acquires a permit,
    /// with the number of concurrent invocations after acquisition.
    pub fn on_accepted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if let BulkheadEvent::Accepted { concurrent } = event {
                f(*concurrent);
            }
        }));
        self
    }

    /// Registers a callback invoked when an invocation is rejected.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, BulkheadEvent::Rejected) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when a queued invocation leaves the
    /// queue, with the time it spent waiting.
    pub fn on_queue_left<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if let BulkheadEvent::QueueLeft { wait } = event {
                f(*wait);
            }
        }));
        self
    }

    /// Registers a callback invoked when an invocation releases its permit.
    pub fn on_finished<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, BulkheadEvent::Finished) {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> BulkheadConfig {
        BulkheadConfig {
            max_concurrent: self.max_concurrent,
            queue_size: self.queue_size,
            events: EventDispatcher::new(self.name, self.callbacks),
        }
    }
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
