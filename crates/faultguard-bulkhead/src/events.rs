//! Events emitted by bulkheads.

use std::time::Duration;

/// Events emitted by a bulkhead.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// An invocation acquired a permit.
    Accepted {
        /// Concurrent invocations holding a permit, including this one.
        concurrent: usize,
    },
    /// An invocation was rejected: no permit, and (async) no queue slot.
    Rejected,
    /// A queued invocation left the queue and acquired a permit.
    QueueLeft {
        /// How long the invocation waited in the queue.
        wait: Duration,
    },
    /// An accepted invocation released its permit.
    Finished,
}
