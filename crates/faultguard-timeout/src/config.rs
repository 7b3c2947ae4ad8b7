//! Configuration for the timeout strategy.

use std::sync::Arc;
use std::time::Duration;

use faultguard_core::events::{EventCallback, EventDispatcher};
use faultguard_core::DefinitionError;

use crate::events::TimeoutEvent;

/// Configuration for a timeout.
#[derive(Clone)]
pub struct TimeoutConfig {
    pub(crate) duration: Duration,
    pub(crate) name: String,
    pub(crate) events: EventDispatcher<TimeoutEvent>,
}

impl TimeoutConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TimeoutConfigBuilder {
        TimeoutConfigBuilder::new()
    }

    pub(crate) fn validate(&self) -> Result<(), DefinitionError> {
        if self.duration.is_zero() {
            return Err(DefinitionError::InvalidConfiguration {
                strategy: "timeout",
                message: "duration must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`TimeoutConfig`].
pub struct TimeoutConfigBuilder {
    duration: Duration,
    name: String,
    callbacks: Vec<EventCallback<TimeoutEvent>>,
}

impl TimeoutConfigBuilder {
    /// Creates a new builder with a 1 second timeout.
    pub fn new() -> Self {
        Self {
            duration: Duration::from_secs(1),
            name: "timeout".to_string(),
            callbacks: Vec::new(),
        }
    }

    /// Sets how long the inner invocation may take.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the name of this timeout instance, used in events and in the
    /// timeout error message.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when the timer fires first.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, TimeoutEvent::TimedOut) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when the inner invocation finishes
    /// (successfully or not) before the timer fires.
    pub fn on_finished<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(move |event| {
            if matches!(event, TimeoutEvent::Finished) {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> TimeoutConfig {
        TimeoutConfig {
            duration: self.duration,
            events: EventDispatcher::new(self.name.clone(), self.callbacks),
            name: self.name,
        }
    }
}

impl Default for TimeoutConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
