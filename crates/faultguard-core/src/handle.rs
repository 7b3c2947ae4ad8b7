//! Completion handles for launched asynchronous invocations.
//!
//! A [`Handle`] refers to an in-flight guarded invocation that was
//! spawned through an [`AsyncExecutor`]: the action is already running
//! (eager), completion callbacks fire exactly once, cancellation is best
//! effort, and awaiting the handle yields the outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use futures::future::{AbortHandle, BoxFuture};

use crate::error::GuardError;
use crate::offload::{AsyncExecutor, RejectedExecution};

type CompletionCallback<T, E> = Box<dyn FnOnce(&Result<T, GuardError<E>>) + Send>;

struct HandleState<T, E> {
    outcome: Option<Result<T, GuardError<E>>>,
    callbacks: Vec<CompletionCallback<T, E>>,
    wakers: Vec<Waker>,
    /// A terminal outcome exists (it may be parked in `outcome`, on loan
    /// to a callback, or already consumed by an await).
    terminated: bool,
    /// The outcome was handed out by value to an awaiter.
    consumed: bool,
}

struct HandleShared<T, E> {
    state: Mutex<HandleState<T, E>>,
}

impl<T, E> HandleShared<T, E> {
    fn lock(&self) -> std::sync::MutexGuard<'_, HandleState<T, E>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records the terminal outcome, at most once.
    fn complete(&self, outcome: Result<T, GuardError<E>>) {
        let callbacks = {
            let mut state = self.lock();
            if state.terminated {
                return;
            }
            state.terminated = true;
            std::mem::take(&mut state.callbacks)
        };
        self.deliver(outcome, callbacks);
    }

    /// Runs callbacks outside the lock, draining any registered while the
    /// outcome was on loan, then parks the outcome for the awaiter.
    fn deliver(&self, outcome: Result<T, GuardError<E>>, mut callbacks: Vec<CompletionCallback<T, E>>) {
        loop {
            for callback in callbacks.drain(..) {
                let result =
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(&outcome)));
                if result.is_err() {
                    tracing::warn!("completion callback panicked; ignoring");
                }
            }
            let mut state = self.lock();
            if state.callbacks.is_empty() {
                state.outcome = Some(outcome);
                let wakers = std::mem::take(&mut state.wakers);
                drop(state);
                for waker in wakers {
                    waker.wake();
                }
                return;
            }
            callbacks = std::mem::take(&mut state.callbacks);
        }
    }
}

/// A single-value, completion-notifying reference to a launched guarded
/// invocation.
pub struct Handle<T, E> {
    shared: Arc<HandleShared<T, E>>,
    abort: AbortHandle,
}

impl<T, E> Handle<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Spawns the pipeline future through the executor, returning an
    /// eager handle on its completion.
    pub fn spawn(
        executor: &dyn AsyncExecutor,
        pipeline: BoxFuture<'static, Result<T, GuardError<E>>>,
    ) -> Result<Self, RejectedExecution> {
        let shared = Arc::new(HandleShared {
            state: Mutex::new(HandleState {
                outcome: None,
                callbacks: Vec::new(),
                wakers: Vec::new(),
                terminated: false,
                consumed: false,
            }),
        });
        let (abortable, abort) = futures::future::abortable(pipeline);
        let completer = Arc::clone(&shared);
        executor.execute(Box::pin(async move {
            let outcome = match abortable.await {
                Ok(result) => result,
                Err(_aborted) => Err(GuardError::Interrupted),
            };
            completer.complete(outcome);
        }))?;
        Ok(Self { shared, abort })
    }

    /// Registers a callback invoked exactly once with the outcome.
    ///
    /// A handle that already completed invokes the callback right away,
    /// unless the outcome was consumed by awaiting the handle.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&Result<T, GuardError<E>>) + Send + 'static,
    {
        let mut state = self.shared.lock();
        if !state.terminated {
            state.callbacks.push(Box::new(callback));
            return;
        }
        match state.outcome.take() {
            Some(outcome) => {
                drop(state);
                self.shared.deliver(outcome, vec![Box::new(callback)]);
            }
            // Consumed by an await, or on loan to an in-flight delivery
            // that will drain the queue.
            None if state.consumed => {}
            None => state.callbacks.push(Box::new(callback)),
        }
    }

    /// Requests cancellation of the invocation. Best effort: an
    /// invocation that already completed is unaffected. A cancelled
    /// handle completes with [`GuardError::Interrupted`].
    pub fn cancel(&self) {
        self.abort.abort();
        self.shared.complete(Err(GuardError::Interrupted));
    }

    /// Whether the invocation reached a terminal state.
    pub fn is_terminated(&self) -> bool {
        self.shared.lock().terminated
    }
}

impl<T, E> Future for Handle<T, E> {
    type Output = Result<T, GuardError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.lock();
        if let Some(outcome) = state.outcome.take() {
            state.consumed = true;
            return Poll::Ready(outcome);
        }
        if state.consumed {
            // The outcome was already taken by a previous await.
            return Poll::Ready(Err(GuardError::Interrupted));
        }
        state.wakers.push(cx.waker().clone());
        Poll::Pending
    }
}

impl<T, E> std::fmt::Debug for Handle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("terminated", &self.shared.lock().terminated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offload::TokioExecutor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn spawn_value(value: &'static str) -> Handle<&'static str, ()> {
        Handle::spawn(
            &TokioExecutor::current(),
            Box::pin(async move { Ok(value) }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn handle_resolves_with_the_outcome() {
        let handle = spawn_value("done");
        assert_eq!(handle.await.unwrap(), "done");
    }

    #[tokio::test]
    async fn callbacks_fire_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = spawn_value("done");

        let f = Arc::clone(&fired);
        handle.on_complete(move |outcome| {
            assert!(outcome.is_ok());
            f.fetch_add(1, Ordering::SeqCst);
        });

        // Wait for the spawned task to finish, then register another
        // callback; it must fire immediately.
        while !handle.is_terminated() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let f = Arc::clone(&fired);
        handle.on_complete(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancelled_handle_completes_interrupted() {
        let handle: Handle<(), ()> = Handle::spawn(
            &TokioExecutor::current(),
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }),
        )
        .unwrap();
        handle.cancel();
        assert!(handle.is_terminated());
        assert!(matches!(handle.await, Err(GuardError::Interrupted)));
    }
}
