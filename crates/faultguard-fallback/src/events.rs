//! Events emitted by the fallback strategy.

/// Events emitted by a fallback strategy.
#[derive(Debug, Clone)]
pub enum FallbackEvent {
    /// A handler substituted the failed invocation's outcome.
    Applied,
}
