//! Events emitted by rate limiters.

/// Events emitted by a rate limit strategy.
#[derive(Debug, Clone)]
pub enum RateLimitEvent {
    /// An attempt was granted a permit.
    Permitted,
    /// An attempt was rejected.
    Rejected,
}
