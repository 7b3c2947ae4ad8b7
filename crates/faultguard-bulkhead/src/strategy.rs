//! Bulkhead strategy implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use faultguard_core::invocation::{AsyncInvocation, SyncInvocation};
use faultguard_core::strategy::{
    AsyncStrategy, SharedAsyncStrategy, SharedSyncStrategy, SyncStrategy,
};
use faultguard_core::{BoxFuture, DefinitionError, GuardError};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::config::BulkheadConfig;
use crate::events::BulkheadEvent;

struct BulkheadShared {
    semaphore: Arc<Semaphore>,
    queued: AtomicUsize,
    config: BulkheadConfig,
}

impl BulkheadShared {
    fn new(config: BulkheadConfig) -> Result<Arc<Self>, DefinitionError> {
        config.validate()?;
        Ok(Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            queued: AtomicUsize::new(0),
            config,
        }))
    }

    fn concurrent(&self) -> usize {
        self.config.max_concurrent - self.semaphore.available_permits()
    }

    fn accepted(&self) {
        let concurrent = self.concurrent();
        self.config.events.dispatch(&BulkheadEvent::Accepted { concurrent });

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_accepted_total", "bulkhead" => self.config.events.strategy().to_string())
                .increment(1);
            gauge!("bulkhead_concurrent_calls", "bulkhead" => self.config.events.strategy().to_string())
                .set(concurrent as f64);
        }
    }

    fn rejected(&self) {
        self.config.events.dispatch(&BulkheadEvent::Rejected);

        #[cfg(feature = "metrics")]
        counter!("bulkhead_calls_rejected_total", "bulkhead" => self.config.events.strategy().to_string())
            .increment(1);
    }

    fn queue_left(&self, wait: std::time::Duration) {
        self.config.events.dispatch(&BulkheadEvent::QueueLeft { wait });

        #[cfg(feature = "metrics")]
        metrics::histogram!("bulkhead_queue_wait_seconds", "bulkhead" => self.config.events.strategy().to_string())
            .record(wait.as_secs_f64());
    }

    fn finished(&self) {
        self.config.events.dispatch(&BulkheadEvent::Finished);

        #[cfg(feature = "metrics")]
        gauge!("bulkhead_concurrent_calls", "bulkhead" => self.config.events.strategy().to_string())
            .set(self.concurrent() as f64);
    }

    fn rejection_error<E>(&self) -> GuardError<E> {
        GuardError::BulkheadRejected {
            max_concurrent: self.config.max_concurrent,
        }
    }
}

/// Decrements the queued-waiter count when dropped, so a cancelled waiter
/// frees its queue slot.
struct QueueSlot<'a> {
    queued: &'a AtomicUsize,
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bulkhead for synchronous pipelines: a permit or an immediate rejection.
pub struct SyncBulkhead<T, E> {
    next: SharedSyncStrategy<T, E>,
    shared: Arc<BulkheadShared>,
}

impl<T, E> SyncBulkhead<T, E> {
    /// Creates the strategy around the next one in the chain.
    pub fn new(
        next: SharedSyncStrategy<T, E>,
        config: BulkheadConfig,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            next,
            shared: BulkheadShared::new(config)?,
        })
    }
}

impl<T, E> SyncStrategy<T, E> for SyncBulkhead<T, E> {
    fn apply(&self, ctx: &mut SyncInvocation<'_, T, E>) -> Result<T, GuardError<E>> {
        let permit = match self.shared.semaphore.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                self.shared.rejected();
                return Err(self.shared.rejection_error());
            }
        };
        self.shared.accepted();
        let result = self.next.apply(ctx);
        drop(permit);
        self.shared.finished();
        result
    }
}

/// Bulkhead for asynchronous pipelines: a permit, a bounded FIFO queue
/// slot, or a rejection. The permit is released when the inner invocation
/// resolves or is cancelled, not when its future is created.
pub struct AsyncBulkhead<T, E> {
    next: SharedAsyncStrategy<T, E>,
    shared: Arc<BulkheadShared>,
}

impl<T, E> AsyncBulkhead<T, E> {
    /// Creates the strategy around the next one in the chain.
    pub fn new(
        next: SharedAsyncStrategy<T, E>,
        config: BulkheadConfig,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            next,
            shared: BulkheadShared::new(config)?,
        })
    }
}

impl<T, E> AsyncStrategy<T, E> for AsyncBulkhead<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn apply(&self, ctx: AsyncInvocation<T, E>) -> BoxFuture<'static, Result<T, GuardError<E>>> {
        let next = Arc::clone(&self.next);
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            let permit = match Arc::clone(&shared.semaphore).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    // No permit; try to enter the bounded queue.
                    let entered = shared.queued.fetch_update(
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                        |queued| {
                            if queued < shared.config.queue_size {
                                Some(queued + 1)
                            } else {
                                None
                            }
                        },
                    );
                    if entered.is_err() {
                        shared.rejected();
                        return Err(shared.rejection_error());
                    }
                    let slot = QueueSlot {
                        queued: &shared.queued,
                    };
                    let waiting_since = Instant::now();
                    let permit = match Arc::clone(&shared.semaphore).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_closed) => {
                            shared.rejected();
                            return Err(shared.rejection_error());
                        }
                    };
                    drop(slot);
                    shared.queue_left(waiting_since.elapsed());
                    permit
                }
            };
            shared.accepted();
            let result = next.apply(ctx).await;
            drop(permit);
            shared.finished();
            result
        })
    }
}
