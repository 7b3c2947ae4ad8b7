//! Events emitted by the retry strategy.

use std::time::Duration;

/// Events emitted by a retry strategy.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A failed attempt will be retried after the given delay.
    Retried {
        /// 1-based number of the retry about to happen.
        attempt: u32,
        /// The delay preceding it.
        delay: Duration,
    },
    /// The invocation succeeded.
    Succeeded {
        /// Total attempts made, the successful one included.
        attempts: u32,
    },
    /// The invocation failed for good: aborted, exhausted, or out of
    /// time.
    Failed {
        /// Total attempts made.
        attempts: u32,
    },
}
