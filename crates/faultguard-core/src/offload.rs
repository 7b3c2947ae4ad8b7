//! Thread offload: moving the rest of an async pipeline off the caller.
//!
//! The [`AsyncExecutor`] seam is how the pipeline submits work to whatever
//! runtime the host application uses; [`TokioExecutor`] is the default
//! implementation. [`ThreadOffload`] is the strategy itself: when enabled,
//! every invocation is scheduled through the executor and the result
//! travels back over a oneshot channel; when disabled, the pipeline keeps
//! running on the caller (the non-blocking mode).

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::GuardError;
use crate::invocation::AsyncInvocation;
use crate::strategy::{AsyncStrategy, SharedAsyncStrategy};

/// The executor refused to accept a task.
#[derive(Debug, Clone, thiserror::Error)]
#[error("async executor rejected the task")]
pub struct RejectedExecution;

/// Submits pipeline tasks for execution.
pub trait AsyncExecutor: Send + Sync {
    /// Runs the task to completion on the executor's threads.
    fn execute(&self, task: BoxFuture<'static, ()>) -> Result<(), RejectedExecution>;
}

/// Executor backed by a tokio runtime.
///
/// With no explicit handle, the runtime of the calling task is used; a
/// call from outside any runtime is rejected.
#[derive(Debug, Clone, Default)]
pub struct TokioExecutor {
    handle: Option<tokio::runtime::Handle>,
}

impl TokioExecutor {
    /// Uses the runtime current at submission time.
    pub fn current() -> Self {
        Self { handle: None }
    }

    /// Uses the given runtime handle.
    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl AsyncExecutor for TokioExecutor {
    fn execute(&self, task: BoxFuture<'static, ()>) -> Result<(), RejectedExecution> {
        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => tokio::runtime::Handle::try_current().map_err(|_| RejectedExecution)?,
        };
        handle.spawn(task);
        Ok(())
    }
}

/// Strategy scheduling the inner pipeline onto an [`AsyncExecutor`].
pub struct ThreadOffload<T, E> {
    next: SharedAsyncStrategy<T, E>,
    executor: Arc<dyn AsyncExecutor>,
    enabled: bool,
}

impl<T, E> ThreadOffload<T, E> {
    /// Creates the strategy. With `enabled == false` it is a pass-through.
    pub fn new(
        next: SharedAsyncStrategy<T, E>,
        executor: Arc<dyn AsyncExecutor>,
        enabled: bool,
    ) -> Self {
        Self {
            next,
            executor,
            enabled,
        }
    }
}

impl<T, E> AsyncStrategy<T, E> for ThreadOffload<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn apply(&self, ctx: AsyncInvocation<T, E>) -> BoxFuture<'static, Result<T, GuardError<E>>> {
        if !self.enabled {
            return self.next.apply(ctx);
        }
        let inner = self.next.apply(ctx);
        let executor = Arc::clone(&self.executor);
        Box::pin(async move {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let task: BoxFuture<'static, ()> = Box::pin(async move {
                let _ = tx.send(inner.await);
            });
            executor
                .execute(task)
                .map_err(|_| GuardError::ExecutionRejected)?;
            match rx.await {
                Ok(result) => result,
                // The executor dropped the task before completion.
                Err(_) => Err(GuardError::Interrupted),
            }
        })
    }
}
