//! The synchronous pipeline entry point.

use faultguard_core::invocation::SyncInvocation;
use faultguard_core::strategy::SharedSyncStrategy;
use faultguard_core::GuardError;

use crate::builder::GuardBuilder;

/// A configured synchronous fault-tolerance pipeline.
///
/// Cloning shares the pipeline's strategy state: clones of a guard with a
/// bulkhead contend for the same permits, clones with a circuit breaker
/// observe the same window.
pub struct Guard<T, E> {
    strategy: SharedSyncStrategy<T, E>,
}

impl<T, E> Clone for Guard<T, E> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy.clone(),
        }
    }
}

impl<T, E> Guard<T, E>
where
    T: 'static,
    E: 'static,
{
    /// Starts building a pipeline.
    pub fn builder() -> GuardBuilder<T, E> {
        GuardBuilder::new()
    }

    pub(crate) fn from_strategy(strategy: SharedSyncStrategy<T, E>) -> Self {
        Self { strategy }
    }

    /// Invokes a fallible action through the pipeline.
    ///
    /// The invocation's interrupt flag is cleared on every exit path; a
    /// raised flag turns the outcome into [`GuardError::Interrupted`].
    pub fn call<F>(&self, mut action: F) -> Result<T, GuardError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut ctx = SyncInvocation::new(&mut action);
        let result = self.strategy.apply(&mut ctx);
        if ctx.interrupt_token().clear() {
            return Err(GuardError::Interrupted);
        }
        result
    }

    /// Invokes a fallible action through the pipeline, observing an
    /// externally owned interrupt token. Another thread can raise the
    /// token to cancel the invocation cooperatively; the flag is cleared
    /// before this method returns.
    pub fn call_with_token<F>(
        &self,
        token: &faultguard_core::InterruptToken,
        mut action: F,
    ) -> Result<T, GuardError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut ctx = SyncInvocation::with_token(&mut action, token.clone());
        let result = self.strategy.apply(&mut ctx);
        if ctx.interrupt_token().clear() {
            return Err(GuardError::Interrupted);
        }
        result
    }

    /// Invokes an infallible supplier through the pipeline.
    pub fn get<F>(&self, mut supplier: F) -> Result<T, GuardError<E>>
    where
        F: FnMut() -> T,
    {
        self.call(|| Ok(supplier()))
    }

    /// Binds an action to this pipeline, sharing its strategy state.
    pub fn adapt<F>(&self, mut action: F) -> impl FnMut() -> Result<T, GuardError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let guard = self.clone();
        move || guard.call(&mut action)
    }
}

impl<E> Guard<(), E>
where
    E: 'static,
{
    /// Invokes a side-effecting action through the pipeline.
    pub fn run<F>(&self, mut action: F) -> Result<(), GuardError<E>>
    where
        F: FnMut(),
    {
        self.call(|| {
            action();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_passes_values_and_wraps_errors() {
        let guard: Guard<u32, &'static str> = Guard::builder().build().unwrap();
        assert_eq!(guard.call(|| Ok(5)).unwrap(), 5);
        assert!(matches!(
            guard.call(|| Err("boom")),
            Err(GuardError::Application("boom"))
        ));
    }

    #[test]
    fn get_wraps_a_supplier() {
        let guard: Guard<String, std::io::Error> = Guard::builder().build().unwrap();
        assert_eq!(guard.get(|| "value".to_string()).unwrap(), "value");
    }

    #[test]
    fn run_works_for_unit_pipelines() {
        let guard: Guard<(), std::io::Error> = Guard::builder().build().unwrap();
        let mut ran = false;
        guard.run(|| ran = true).unwrap();
        assert!(ran);
    }

    #[test]
    fn adapt_shares_pipeline_state() {
        let guard: Guard<u32, &'static str> = Guard::builder().build().unwrap();
        let mut calls = 0;
        {
            let mut bound = guard.adapt(|| {
                calls += 1;
                Ok(calls)
            });
            assert_eq!(bound().unwrap(), 1);
            assert_eq!(bound().unwrap(), 2);
        }
        assert_eq!(calls, 2);
    }
}
