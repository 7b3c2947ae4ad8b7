//! Events emitted by timeouts.

/// Events emitted by a timeout strategy.
#[derive(Debug, Clone)]
pub enum TimeoutEvent {
    /// The timer fired before the inner invocation completed.
    TimedOut,
    /// The inner invocation reached a terminal state with no timeout.
    Finished,
}
