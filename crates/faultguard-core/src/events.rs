//! How strategies report what they did.
//!
//! Each strategy instance owns an [`EventDispatcher`]: the callbacks its
//! builder registered, labeled with the instance's name. Strategies hand
//! the dispatcher a plain event value (a rejection, a state change, a
//! permit grant) and it fans the value out to every callback. Dispatch
//! always happens outside the strategy's own lock, and a panicking
//! callback is logged and swallowed — it never affects the guarded
//! invocation's outcome or the remaining callbacks.

use std::fmt;
use std::sync::Arc;

/// A registered event callback.
pub type EventCallback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// The callbacks one strategy instance reports its events to.
///
/// Cloning is cheap (the callbacks are shared), which lets a stateful
/// strategy snapshot its dispatcher under a lock and fire events after
/// releasing it.
pub struct EventDispatcher<E> {
    strategy: String,
    callbacks: Vec<EventCallback<E>>,
}

impl<E> Clone for EventDispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<E> EventDispatcher<E> {
    /// Creates a dispatcher for the named strategy instance.
    pub fn new(strategy: impl Into<String>, callbacks: Vec<EventCallback<E>>) -> Self {
        Self {
            strategy: strategy.into(),
            callbacks,
        }
    }

    /// A dispatcher with no callbacks.
    pub fn disconnected(strategy: impl Into<String>) -> Self {
        Self::new(strategy, Vec::new())
    }

    /// The name of the strategy instance this dispatcher belongs to.
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Registers another callback after construction.
    pub fn register<F>(&mut self, callback: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
    }

    /// Reports an event to every callback.
    ///
    /// A panicking callback does not prevent the remaining callbacks from
    /// running, and never propagates into the guarded invocation.
    pub fn dispatch(&self, event: &E)
    where
        E: fmt::Debug,
    {
        for callback in &self.callbacks {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(event);
            }));
            if outcome.is_err() {
                tracing::warn!(
                    strategy = %self.strategy,
                    event = ?event,
                    "event callback panicked; ignoring"
                );
            }
        }
    }
}

impl<E> fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("strategy", &self.strategy)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
