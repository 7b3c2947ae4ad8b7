//! The asynchronous pipeline entry point.

use std::future::Future;
use std::sync::Arc;

use faultguard_core::handle::Handle;
use faultguard_core::invocation::AsyncInvocation;
use faultguard_core::offload::{AsyncExecutor, RejectedExecution};
use faultguard_core::strategy::SharedAsyncStrategy;
use faultguard_core::{BoxFuture, GuardError};

use crate::builder::AsyncGuardBuilder;

/// A configured asynchronous fault-tolerance pipeline.
///
/// Cloning shares the pipeline's strategy state.
pub struct AsyncGuard<T, E> {
    strategy: SharedAsyncStrategy<T, E>,
    executor: Arc<dyn AsyncExecutor>,
}

impl<T, E> Clone for AsyncGuard<T, E> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<T, E> AsyncGuard<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    /// Starts building a pipeline.
    pub fn builder() -> AsyncGuardBuilder<T, E> {
        AsyncGuardBuilder::new()
    }

    pub(crate) fn from_parts(
        strategy: SharedAsyncStrategy<T, E>,
        executor: Arc<dyn AsyncExecutor>,
    ) -> Self {
        Self { strategy, executor }
    }

    /// Invokes a future-producing action through the pipeline. The
    /// returned future is lazy: the guarded action starts when it is
    /// first polled, and dropping it cancels the invocation.
    pub async fn call<F, Fut>(&self, action: F) -> Result<T, GuardError<E>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let ctx = AsyncInvocation::new(action);
        self.strategy.apply(ctx).await
    }

    /// Starts a guarded invocation on the pipeline's executor, returning
    /// an eager [`Handle`] on its completion.
    pub fn launch<F, Fut>(&self, action: F) -> Result<Handle<T, E>, RejectedExecution>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let ctx = AsyncInvocation::new(action);
        Handle::spawn(self.executor.as_ref(), self.strategy.apply(ctx))
    }

    /// Binds an action to this pipeline, sharing its strategy state.
    /// Each call of the returned function starts a fresh guarded
    /// invocation.
    pub fn adapt<F, Fut>(&self, action: F) -> impl Fn() -> BoxFuture<'static, Result<T, GuardError<E>>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let strategy = self.strategy.clone();
        let ctx = AsyncInvocation::new(action);
        move || strategy.apply(ctx.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_runs_the_pipeline() {
        let guard: AsyncGuard<u32, &'static str> = AsyncGuard::builder().build().unwrap();
        assert_eq!(guard.call(|| async { Ok(5) }).await.unwrap(), 5);
        assert!(matches!(
            guard.call(|| async { Err("boom") }).await,
            Err(GuardError::Application("boom"))
        ));
    }

    #[tokio::test]
    async fn launch_returns_an_eager_handle() {
        let guard: AsyncGuard<&'static str, ()> = AsyncGuard::builder().build().unwrap();
        let handle = guard.launch(|| async { Ok("launched") }).unwrap();
        assert_eq!(handle.await.unwrap(), "launched");
    }

    #[tokio::test]
    async fn adapt_produces_reinvocable_actions() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let guard: AsyncGuard<usize, ()> = AsyncGuard::builder().build().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let bound = guard.adapt(move || {
            let counted = Arc::clone(&counted);
            async move { Ok(counted.fetch_add(1, Ordering::SeqCst) + 1) }
        });
        assert_eq!(bound().await.unwrap(), 1);
        assert_eq!(bound().await.unwrap(), 2);
    }
}
