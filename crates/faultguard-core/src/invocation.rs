//! Invocation contexts: the value every strategy transforms.
//!
//! A strategy never calls the guarded action directly; it delegates to the
//! next strategy in the chain, and the innermost strategy invokes the
//! target through one of these contexts. The synchronous context borrows a
//! re-invocable closure (retry calls it more than once) and carries the
//! invocation's [`InterruptToken`]; the asynchronous context is cheaply
//! cloneable so strategies returning `'static` futures can re-invoke it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;

/// Cooperative interruption flag for one synchronous invocation.
///
/// The Rust rendition of thread interruption: the flag can be raised by a
/// timeout watcher or by any other holder of a clone, guarded code and the
/// retry delay observe it, and the pipeline boundary clears it exactly
/// once on every exit path, translating a raised flag into
/// [`GuardError::Interrupted`](crate::GuardError::Interrupted).
#[derive(Clone, Default)]
pub struct InterruptToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    flag: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl InterruptToken {
    /// Creates a token in the not-interrupted state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag and wakes any waiter blocked in [`wait_for`].
    ///
    /// [`wait_for`]: InterruptToken::wait_for
    pub fn interrupt(&self) {
        let _guard = self.inner.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.cond.notify_all();
    }

    /// Returns the flag without clearing it.
    pub fn is_interrupted(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Clears the flag, returning whether it was set.
    pub fn clear(&self) -> bool {
        self.inner.flag.swap(false, Ordering::SeqCst)
    }

    /// Blocks the calling thread for `duration`, waking early if the token
    /// is interrupted. Returns whether the flag is set.
    pub fn wait_for(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.inner.lock.lock().unwrap_or_else(|e| e.into_inner());
        while !self.inner.flag.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (g, _timed_out) = self
                .inner
                .cond
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            guard = g;
        }
        self.inner.flag.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InterruptToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptToken")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Context of one synchronous guarded invocation.
pub struct SyncInvocation<'a, T, E> {
    target: &'a mut (dyn FnMut() -> Result<T, E> + 'a),
    interrupt: InterruptToken,
}

impl<'a, T, E> SyncInvocation<'a, T, E> {
    /// Wraps a target action with a fresh interrupt token.
    pub fn new(target: &'a mut (dyn FnMut() -> Result<T, E> + 'a)) -> Self {
        Self {
            target,
            interrupt: InterruptToken::new(),
        }
    }

    /// Wraps a target action observing an externally owned token.
    pub fn with_token(
        target: &'a mut (dyn FnMut() -> Result<T, E> + 'a),
        interrupt: InterruptToken,
    ) -> Self {
        Self { target, interrupt }
    }

    /// Invokes the target action. May be called repeatedly (retry).
    pub fn invoke(&mut self) -> Result<T, E> {
        (self.target)()
    }

    /// The interruption token of this invocation.
    pub fn interrupt_token(&self) -> &InterruptToken {
        &self.interrupt
    }
}

/// Context of one asynchronous guarded invocation.
///
/// Clones share the same target, so a strategy holding a clone can start
/// the action again (retry) or hand it to another thread (offload).
pub struct AsyncInvocation<T, E> {
    target: Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>,
}

impl<T, E> Clone for AsyncInvocation<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
        }
    }
}

impl<T, E> AsyncInvocation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wraps a future-producing action.
    pub fn new<F, Fut>(target: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            target: Arc::new(move || {
                let fut: BoxFuture<'static, Result<T, E>> = Box::pin(target());
                fut
            }),
        }
    }

    /// Starts the target action, returning its future.
    pub fn invoke(&self) -> BoxFuture<'static, Result<T, E>> {
        (self.target)()
    }
}
