//! Events emitted by circuit breakers.

use crate::breaker::CircuitState;

/// Events emitted by a circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The breaker moved to a new state.
    StateChanged {
        /// The state left behind.
        from: CircuitState,
        /// The state entered.
        to: CircuitState,
    },
    /// An admitted invocation was recorded as a success.
    Succeeded,
    /// An admitted invocation was recorded as a failure.
    Failed,
    /// An invocation was prevented by the open breaker.
    Prevented,
}
