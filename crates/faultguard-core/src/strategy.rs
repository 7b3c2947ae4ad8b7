//! The strategy chain.
//!
//! A fault-tolerance strategy is a uniform transformer over the "next"
//! invocation: it receives the invocation context, may short-circuit with
//! a [`GuardError`], or delegates inward and observes the outcome to
//! update its own state. Pipelines are ordered compositions of strategies
//! ending in the terminal [`Invoke`] / [`AsyncInvoke`] strategy, which
//! calls the target action.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::GuardError;
use crate::invocation::{AsyncInvocation, SyncInvocation};

/// A strategy guarding synchronous invocations.
pub trait SyncStrategy<T, E>: Send + Sync {
    /// Applies this strategy around the given invocation.
    fn apply(&self, ctx: &mut SyncInvocation<'_, T, E>) -> Result<T, GuardError<E>>;
}

/// A strategy guarding asynchronous invocations.
///
/// The returned future resolves only once the strategy has observed the
/// inner invocation's terminal state; dropping it cancels the inner
/// invocation.
pub trait AsyncStrategy<T, E>: Send + Sync {
    /// Applies this strategy around the given invocation.
    fn apply(&self, ctx: AsyncInvocation<T, E>) -> BoxFuture<'static, Result<T, GuardError<E>>>;
}

/// Terminal synchronous strategy: calls the target action.
///
/// A target that returns normally while the invocation's interrupt token
/// is raised still fails with [`GuardError::Interrupted`]; the outer
/// timeout strategy, if present, reinterprets that as a timeout when its
/// own watcher raised the token.
#[derive(Debug, Clone, Copy, Default)]
pub struct Invoke;

impl<T, E> SyncStrategy<T, E> for Invoke {
    fn apply(&self, ctx: &mut SyncInvocation<'_, T, E>) -> Result<T, GuardError<E>> {
        let result = ctx.invoke();
        if ctx.interrupt_token().is_interrupted() {
            return Err(GuardError::Interrupted);
        }
        result.map_err(GuardError::Application)
    }
}

/// Terminal asynchronous strategy: starts the target action and awaits it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncInvoke;

impl<T, E> AsyncStrategy<T, E> for AsyncInvoke
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn apply(&self, ctx: AsyncInvocation<T, E>) -> BoxFuture<'static, Result<T, GuardError<E>>> {
        Box::pin(async move { ctx.invoke().await.map_err(GuardError::Application) })
    }
}

/// Convenience alias for a shared synchronous strategy chain.
pub type SharedSyncStrategy<T, E> = Arc<dyn SyncStrategy<T, E>>;

/// Convenience alias for a shared asynchronous strategy chain.
pub type SharedAsyncStrategy<T, E> = Arc<dyn AsyncStrategy<T, E>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_wraps_application_errors() {
        let mut action = || Err::<(), _>("boom");
        let mut ctx = SyncInvocation::new(&mut action);
        match Invoke.apply(&mut ctx) {
            Err(GuardError::Application(e)) => assert_eq!(e, "boom"),
            other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn invoke_reports_interruption_even_on_success() {
        let mut action = || Ok::<_, ()>(42);
        let mut ctx = SyncInvocation::new(&mut action);
        ctx.interrupt_token().interrupt();
        assert!(matches!(
            Invoke.apply(&mut ctx),
            Err(GuardError::Interrupted)
        ));
    }

    #[tokio::test]
    async fn async_invoke_passes_value_through() {
        let ctx = AsyncInvocation::new(|| async { Ok::<_, ()>("value") });
        assert_eq!(AsyncInvoke.apply(ctx).await.unwrap(), "value");
    }
}
