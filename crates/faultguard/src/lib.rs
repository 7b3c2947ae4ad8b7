//! Composable fault tolerance for callable actions.
//!
//! faultguard wraps synchronous and asynchronous actions in a pipeline of
//! fault-tolerance strategies: bulkhead, circuit breaker, rate limit,
//! retry, timeout, thread offload and fallback. Each strategy wraps the
//! next invocation uniformly, short-circuiting with its own failure or
//! delegating inward and observing the outcome to update its state.
//!
//! # Synchronous pipelines
//!
//! ```
//! use faultguard::{FaultKind, FaultMatcher, Guard};
//! use std::time::Duration;
//!
//! let guard: Guard<String, std::io::Error> = Guard::builder()
//!     .with_retry()
//!         .max_retries(2)
//!         .delay(Duration::from_millis(50))
//!         .jitter(Duration::ZERO)
//!         .done()
//!     .with_fallback()
//!         .handler(|| Ok("fallback".to_string()))
//!         .done()
//!     .build()
//!     .unwrap();
//!
//! let outcome = guard.call(|| Ok("value".to_string())).unwrap();
//! assert_eq!(outcome, "value");
//! ```
//!
//! # Asynchronous pipelines
//!
//! ```
//! use faultguard::{AsyncGuard, FaultKind, FaultMatcher};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let guard: AsyncGuard<String, std::io::Error> = AsyncGuard::builder()
//!     .with_timeout()
//!         .duration(Duration::from_secs(1))
//!         .on_timeout(|| eprintln!("too slow"))
//!         .done()
//!     .with_fallback()
//!         .apply_on(FaultMatcher::kind(FaultKind::Timeout))
//!         .handler(|| async { Ok("fallback".to_string()) })
//!         .done()
//!     .with_thread_offload(true)
//!     .build()
//!     .unwrap();
//!
//! let outcome = guard.call(|| async { Ok("value".to_string()) }).await;
//! # let _ = outcome;
//! # }
//! ```
//!
//! Strategies always compose in the canonical order — fallback → retry →
//! circuit breaker → rate limit → timeout → bulkhead → thread offload →
//! target — regardless of the order the sub-builders are invoked in.
//! Stateful strategies belong to the built pipeline: clones of a guard
//! share them, separately built guards do not (use [`StrategyCache`] to
//! share a pipeline across call sites).

pub mod async_guard;
pub mod builder;
pub mod cache;
pub mod config;
pub mod guard;

pub use async_guard::AsyncGuard;
pub use builder::{
    AsyncFallbackBuilder, AsyncGuardBuilder, BulkheadBuilder, CircuitBreakerBuilder,
    FallbackBuilder, GuardBuilder, RateLimitBuilder, RetryBuilder, StrategyCollector,
    TimeoutBuilder,
};
pub use cache::{InterceptionPoint, StrategyCache};
pub use config::{install_config_source, ConfigSource, EnvConfigSource, NON_FALLBACK_ENABLED_PROPERTY};
pub use guard::Guard;

pub use faultguard_core::classifier::{FaultClassifier, FaultMatcher};
pub use faultguard_core::clock::{ManualStopwatch, RunningStopwatch, Stopwatch, SystemStopwatch};
pub use faultguard_core::handle::Handle;
pub use faultguard_core::offload::{AsyncExecutor, RejectedExecution, TokioExecutor};
pub use faultguard_core::{DefinitionError, FaultKind, GuardError, InterruptToken};

pub use faultguard_circuitbreaker::{CircuitBreakerMaintenance, CircuitState};
pub use faultguard_ratelimiter::WindowType;
pub use faultguard_retry::{ConstantBackoff, CustomBackoff, ExponentialBackoff, FibonacciBackoff};
