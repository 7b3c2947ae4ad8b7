//! Core infrastructure for faultguard.
//!
//! This crate provides the shared machinery every faultguard strategy is
//! built from:
//! - the strategy chain ([`SyncStrategy`] / [`AsyncStrategy`]) and the
//!   invocation contexts it transforms
//! - the unified pipeline error ([`GuardError`]) and build-time
//!   validation error ([`DefinitionError`])
//! - fault classification (`retry_on` / `abort_on` / `fail_on` /
//!   `skip_on` / `apply_on` matcher sets)
//! - the event system strategies report through
//! - the time measurement seam ([`clock::Stopwatch`]) and the shared
//!   sync-side timer thread
//! - the async executor seam, thread offload, and completion handles

pub mod classifier;
pub mod clock;
pub mod error;
pub mod events;
pub mod handle;
pub mod invocation;
pub mod offload;
pub mod strategy;
pub mod timer;

pub use classifier::{FaultClassifier, FaultMatcher, MatcherIdentity};
pub use error::{DefinitionError, FaultKind, GuardError};
pub use events::{EventCallback, EventDispatcher};
pub use handle::Handle;
pub use invocation::{AsyncInvocation, InterruptToken, SyncInvocation};
pub use offload::{AsyncExecutor, RejectedExecution, ThreadOffload, TokioExecutor};
pub use strategy::{
    AsyncInvoke, AsyncStrategy, Invoke, SharedAsyncStrategy, SharedSyncStrategy, SyncStrategy,
};
pub use timer::{Timer, TimerHandle};

/// Boxed future alias used across the strategy chain.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;
