//! Fluent pipeline builders.
//!
//! A pipeline is assembled from sub-builders, each opened with a
//! `with_*` method and closed with `done()`:
//!
//! ```
//! use faultguard::Guard;
//! use std::time::Duration;
//!
//! let guard: faultguard::Guard<u32, std::io::Error> = Guard::builder()
//!     .with_retry().max_retries(2).delay(Duration::ZERO).jitter(Duration::ZERO).done()
//!     .with_timeout().duration(Duration::from_secs(1)).done()
//!     .build()
//!     .unwrap();
//! ```
//!
//! Whatever order the sub-builders are invoked in, strategies compose in
//! the canonical order: fallback → retry → circuit breaker → rate limit
//! → timeout → bulkhead → thread offload → target.

use std::sync::Arc;
use std::time::Duration;

use faultguard_bulkhead::config::BulkheadConfigBuilder;
use faultguard_bulkhead::{AsyncBulkhead, BulkheadConfig, SyncBulkhead};
use faultguard_circuitbreaker::config::CircuitBreakerConfigBuilder;
use faultguard_circuitbreaker::{
    AsyncCircuitBreaker, CircuitBreakerConfig, CircuitState, SyncCircuitBreaker,
};
use faultguard_core::classifier::FaultMatcher;
use faultguard_core::clock::{Stopwatch, SystemStopwatch};
use faultguard_core::offload::{AsyncExecutor, ThreadOffload, TokioExecutor};
use faultguard_core::strategy::{AsyncInvoke, Invoke, SharedAsyncStrategy, SharedSyncStrategy};
use faultguard_core::{DefinitionError, GuardError};
use faultguard_fallback::config::FallbackConfigBuilder;
use faultguard_fallback::{
    async_handler, async_handler_with_fault, sync_handler, sync_handler_with_fault, AsyncFallback,
    AsyncFallbackConfig, SyncFallback, SyncFallbackConfig,
};
use faultguard_ratelimiter::config::RateLimitConfigBuilder;
use faultguard_ratelimiter::{AsyncRateLimit, RateLimitConfig, SyncRateLimit, WindowType};
use faultguard_retry::config::RetryConfigBuilder;
use faultguard_retry::{
    AsyncRetry, ExponentialBackoff, FibonacciBackoff, RetryConfig, SyncRetry,
};
use faultguard_timeout::config::TimeoutConfigBuilder;
use faultguard_timeout::{AsyncTimeout, SyncTimeout, TimeoutConfig};

use crate::async_guard::AsyncGuard;
use crate::config;
use crate::guard::Guard;

/// The strategy configurations shared by both pipeline modes.
pub struct StrategySet<E> {
    bulkhead: Option<BulkheadConfig>,
    circuit_breaker: Option<CircuitBreakerConfig<E>>,
    rate_limit: Option<RateLimitConfig>,
    retry: Option<RetryConfig<E>>,
    timeout: Option<TimeoutConfig>,
}

impl<E> Default for StrategySet<E> {
    fn default() -> Self {
        Self {
            bulkhead: None,
            circuit_breaker: None,
            rate_limit: None,
            retry: None,
            timeout: None,
        }
    }
}

/// Implemented by both pipeline builders so the strategy sub-builders
/// can hand their configuration back.
pub trait StrategyCollector: Sized {
    /// The fault type of the pipeline being built.
    type Err;

    #[doc(hidden)]
    fn strategies_mut(&mut self) -> &mut StrategySet<Self::Err>;
}

/// Sub-builder configuring a bulkhead.
pub struct BulkheadBuilder<P> {
    parent: P,
    inner: BulkheadConfigBuilder,
}

impl<P: StrategyCollector> BulkheadBuilder<P> {
    fn new(parent: P) -> Self {
        Self {
            parent,
            inner: BulkheadConfigBuilder::new(),
        }
    }

    /// See [`BulkheadConfigBuilder::max_concurrent`].
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.inner = self.inner.max_concurrent(max);
        self
    }

    /// See [`BulkheadConfigBuilder::queue_size`].
    pub fn queue_size(mut self, size: usize) -> Self {
        self.inner = self.inner.queue_size(size);
        self
    }

    /// See [`BulkheadConfigBuilder::name`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.name(name);
        self
    }

    /// See [`BulkheadConfigBuilder::on_accepted`].
    pub fn on_accepted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.inner = self.inner.on_accepted(f);
        self
    }

    /// See [`BulkheadConfigBuilder::on_rejected`].
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_rejected(f);
        self
    }

    /// See [`BulkheadConfigBuilder::on_queue_left`].
    pub fn on_queue_left<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.inner = self.inner.on_queue_left(f);
        self
    }

    /// See [`BulkheadConfigBuilder::on_finished`].
    pub fn on_finished<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_finished(f);
        self
    }

    /// Stores the bulkhead and returns to the pipeline builder.
    pub fn done(mut self) -> P {
        self.parent.strategies_mut().bulkhead = Some(self.inner.build());
        self.parent
    }
}

/// Sub-builder configuring a timeout.
pub struct TimeoutBuilder<P> {
    parent: P,
    inner: TimeoutConfigBuilder,
}

impl<P: StrategyCollector> TimeoutBuilder<P> {
    fn new(parent: P) -> Self {
        Self {
            parent,
            inner: TimeoutConfigBuilder::new(),
        }
    }

    /// See [`TimeoutConfigBuilder::duration`].
    pub fn duration(mut self, duration: Duration) -> Self {
        self.inner = self.inner.duration(duration);
        self
    }

    /// See [`TimeoutConfigBuilder::name`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.name(name);
        self
    }

    /// See [`TimeoutConfigBuilder::on_timeout`].
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_timeout(f);
        self
    }

    /// See [`TimeoutConfigBuilder::on_finished`].
    pub fn on_finished<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_finished(f);
        self
    }

    /// Stores the timeout and returns to the pipeline builder.
    pub fn done(mut self) -> P {
        self.parent.strategies_mut().timeout = Some(self.inner.build());
        self.parent
    }
}

/// Sub-builder configuring a rate limit.
pub struct RateLimitBuilder<P> {
    parent: P,
    inner: RateLimitConfigBuilder,
}

impl<P: StrategyCollector> RateLimitBuilder<P> {
    fn new(parent: P) -> Self {
        Self {
            parent,
            inner: RateLimitConfigBuilder::new(),
        }
    }

    /// See [`RateLimitConfigBuilder::max_invocations`].
    pub fn max_invocations(mut self, max: usize) -> Self {
        self.inner = self.inner.max_invocations(max);
        self
    }

    /// See [`RateLimitConfigBuilder::window`].
    pub fn window(mut self, window: Duration) -> Self {
        self.inner = self.inner.window(window);
        self
    }

    /// See [`RateLimitConfigBuilder::min_spacing`].
    pub fn min_spacing(mut self, spacing: Duration) -> Self {
        self.inner = self.inner.min_spacing(spacing);
        self
    }

    /// See [`RateLimitConfigBuilder::window_type`].
    pub fn window_type(mut self, window_type: WindowType) -> Self {
        self.inner = self.inner.window_type(window_type);
        self
    }

    /// See [`RateLimitConfigBuilder::name`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.name(name);
        self
    }

    /// See [`RateLimitConfigBuilder::on_permitted`].
    pub fn on_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_permitted(f);
        self
    }

    /// See [`RateLimitConfigBuilder::on_rejected`].
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_rejected(f);
        self
    }

    /// Stores the rate limit and returns to the pipeline builder.
    pub fn done(mut self) -> P {
        self.parent.strategies_mut().rate_limit = Some(self.inner.build());
        self.parent
    }
}

/// Sub-builder configuring a circuit breaker.
pub struct CircuitBreakerBuilder<P: StrategyCollector> {
    parent: P,
    inner: CircuitBreakerConfigBuilder<P::Err>,
}

impl<P: StrategyCollector> CircuitBreakerBuilder<P> {
    fn new(parent: P) -> Self {
        Self {
            parent,
            inner: CircuitBreakerConfigBuilder::new(),
        }
    }

    /// See [`CircuitBreakerConfigBuilder::name`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.name(name);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::request_volume_threshold`].
    pub fn request_volume_threshold(mut self, size: usize) -> Self {
        self.inner = self.inner.request_volume_threshold(size);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::failure_ratio`].
    pub fn failure_ratio(mut self, ratio: f64) -> Self {
        self.inner = self.inner.failure_ratio(ratio);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::delay`].
    pub fn delay(mut self, delay: Duration) -> Self {
        self.inner = self.inner.delay(delay);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::success_threshold`].
    pub fn success_threshold(mut self, count: u32) -> Self {
        self.inner = self.inner.success_threshold(count);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::fail_on`].
    pub fn fail_on(mut self, matcher: FaultMatcher<P::Err>) -> Self {
        self.inner = self.inner.fail_on(matcher);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::skip_on`].
    pub fn skip_on(mut self, matcher: FaultMatcher<P::Err>) -> Self {
        self.inner = self.inner.skip_on(matcher);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::on_state_change`].
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.inner = self.inner.on_state_change(f);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::on_success`].
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_success(f);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::on_failure`].
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_failure(f);
        self
    }

    /// See [`CircuitBreakerConfigBuilder::on_prevented`].
    pub fn on_prevented<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_prevented(f);
        self
    }

    /// Stores the circuit breaker and returns to the pipeline builder.
    pub fn done(mut self) -> P {
        self.parent.strategies_mut().circuit_breaker = Some(self.inner.build());
        self.parent
    }
}

/// Sub-builder configuring a retry.
pub struct RetryBuilder<P: StrategyCollector> {
    parent: P,
    inner: RetryConfigBuilder<P::Err>,
}

impl<P: StrategyCollector> RetryBuilder<P> {
    fn new(parent: P) -> Self {
        Self {
            parent,
            inner: RetryConfigBuilder::new(),
        }
    }

    /// See [`RetryConfigBuilder::max_retries`].
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.inner = self.inner.max_retries(max_retries);
        self
    }

    /// See [`RetryConfigBuilder::max_duration`].
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.inner = self.inner.max_duration(max_duration);
        self
    }

    /// See [`RetryConfigBuilder::delay`].
    pub fn delay(mut self, delay: Duration) -> Self {
        self.inner = self.inner.delay(delay);
        self
    }

    /// See [`RetryConfigBuilder::jitter`].
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.inner = self.inner.jitter(jitter);
        self
    }

    /// See [`RetryConfigBuilder::exponential_backoff`].
    pub fn exponential_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.inner = self.inner.exponential_backoff(backoff);
        self
    }

    /// See [`RetryConfigBuilder::fibonacci_backoff`].
    pub fn fibonacci_backoff(mut self, backoff: FibonacciBackoff) -> Self {
        self.inner = self.inner.fibonacci_backoff(backoff);
        self
    }

    /// See [`RetryConfigBuilder::custom_backoff`].
    pub fn custom_backoff<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, &GuardError<P::Err>) -> Duration + Send + Sync + 'static,
        P::Err: 'static,
    {
        self.inner = self.inner.custom_backoff(f);
        self
    }

    /// See [`RetryConfigBuilder::retry_on`].
    pub fn retry_on(mut self, matcher: FaultMatcher<P::Err>) -> Self {
        self.inner = self.inner.retry_on(matcher);
        self
    }

    /// See [`RetryConfigBuilder::abort_on`].
    pub fn abort_on(mut self, matcher: FaultMatcher<P::Err>) -> Self {
        self.inner = self.inner.abort_on(matcher);
        self
    }

    /// See [`RetryConfigBuilder::name`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.name(name);
        self
    }

    /// See [`RetryConfigBuilder::on_retry`].
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.inner = self.inner.on_retry(f);
        self
    }

    /// See [`RetryConfigBuilder::on_success`].
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.inner = self.inner.on_success(f);
        self
    }

    /// See [`RetryConfigBuilder::on_failure`].
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.inner = self.inner.on_failure(f);
        self
    }

    /// Stores the retry and returns to the pipeline builder.
    pub fn done(mut self) -> P {
        self.parent.strategies_mut().retry = Some(self.inner.build());
        self.parent
    }
}

/// Sub-builder configuring the fallback of a synchronous pipeline.
pub struct FallbackBuilder<T, E> {
    parent: GuardBuilder<T, E>,
    inner: FallbackConfigBuilder<E, faultguard_fallback::SyncHandler<T, E>>,
}

impl<T, E> FallbackBuilder<T, E>
where
    T: 'static,
    E: 'static,
{
    fn new(parent: GuardBuilder<T, E>) -> Self {
        Self {
            parent,
            inner: FallbackConfigBuilder::new(),
        }
    }

    /// See [`FallbackConfigBuilder::apply_on`].
    pub fn apply_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.inner = self.inner.apply_on(matcher);
        self
    }

    /// See [`FallbackConfigBuilder::skip_on`].
    pub fn skip_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.inner = self.inner.skip_on(matcher);
        self
    }

    /// Registers the handler used when no typed handler matches.
    pub fn handler<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.inner = self.inner.handler(sync_handler(f));
        self
    }

    /// Registers a handler for faults matching `matcher`; the handler
    /// receives the fault.
    pub fn handler_for<F>(mut self, matcher: FaultMatcher<E>, f: F) -> Self
    where
        F: Fn(&GuardError<E>) -> Result<T, E> + Send + Sync + 'static,
    {
        self.inner = self.inner.handler_for(matcher, sync_handler_with_fault(f));
        self
    }

    /// See [`FallbackConfigBuilder::name`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.name(name);
        self
    }

    /// See [`FallbackConfigBuilder::on_applied`].
    pub fn on_applied<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_applied(f);
        self
    }

    /// Stores the fallback and returns to the pipeline builder.
    pub fn done(mut self) -> GuardBuilder<T, E> {
        self.parent.fallback = Some(self.inner.build());
        self.parent
    }
}

/// Sub-builder configuring the fallback of an asynchronous pipeline.
pub struct AsyncFallbackBuilder<T, E> {
    parent: AsyncGuardBuilder<T, E>,
    inner: FallbackConfigBuilder<E, faultguard_fallback::AsyncHandler<T, E>>,
}

impl<T, E> AsyncFallbackBuilder<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    fn new(parent: AsyncGuardBuilder<T, E>) -> Self {
        Self {
            parent,
            inner: FallbackConfigBuilder::new(),
        }
    }

    /// See [`FallbackConfigBuilder::apply_on`].
    pub fn apply_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.inner = self.inner.apply_on(matcher);
        self
    }

    /// See [`FallbackConfigBuilder::skip_on`].
    pub fn skip_on(mut self, matcher: FaultMatcher<E>) -> Self {
        self.inner = self.inner.skip_on(matcher);
        self
    }

    /// Registers the handler used when no typed handler matches.
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
    {
        self.inner = self.inner.handler(async_handler(f));
        self
    }

    /// Registers a handler for faults matching `matcher`; the handler
    /// receives the fault.
    pub fn handler_for<F, Fut>(mut self, matcher: FaultMatcher<E>, f: F) -> Self
    where
        F: Fn(&GuardError<E>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
    {
        self.inner = self
            .inner
            .handler_for(matcher, async_handler_with_fault(f));
        self
    }

    /// See [`FallbackConfigBuilder::name`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.name(name);
        self
    }

    /// See [`FallbackConfigBuilder::on_applied`].
    pub fn on_applied<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner = self.inner.on_applied(f);
        self
    }

    /// Stores the fallback and returns to the pipeline builder.
    pub fn done(mut self) -> AsyncGuardBuilder<T, E> {
        self.parent.fallback = Some(self.inner.build());
        self.parent
    }
}

/// Builder of synchronous pipelines.
pub struct GuardBuilder<T, E> {
    strategies: StrategySet<E>,
    pub(crate) fallback: Option<SyncFallbackConfig<T, E>>,
    inspect_cause_chain: bool,
    stopwatch: Arc<dyn Stopwatch>,
}

impl<T, E> StrategyCollector for GuardBuilder<T, E> {
    type Err = E;

    fn strategies_mut(&mut self) -> &mut StrategySet<E> {
        &mut self.strategies
    }
}

impl<T, E> GuardBuilder<T, E>
where
    T: 'static,
    E: 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            strategies: StrategySet::default(),
            fallback: None,
            inspect_cause_chain: false,
            stopwatch: Arc::new(SystemStopwatch),
        }
    }

    /// Enables the cause-chain pass of every classifier in the pipeline:
    /// faults matched by neither set directly are re-examined against the
    /// application error's source chain.
    pub fn inspect_cause_chain(mut self, enabled: bool) -> Self {
        self.inspect_cause_chain = enabled;
        self
    }

    /// Replaces the stopwatch driving the time-based strategies. Intended
    /// for deterministic tests.
    pub fn stopwatch(mut self, stopwatch: Arc<dyn Stopwatch>) -> Self {
        self.stopwatch = stopwatch;
        self
    }

    /// Opens the bulkhead sub-builder.
    pub fn with_bulkhead(self) -> BulkheadBuilder<Self> {
        BulkheadBuilder::new(self)
    }

    /// Opens the circuit breaker sub-builder.
    pub fn with_circuit_breaker(self) -> CircuitBreakerBuilder<Self> {
        CircuitBreakerBuilder::new(self)
    }

    /// Opens the rate limit sub-builder.
    pub fn with_rate_limit(self) -> RateLimitBuilder<Self> {
        RateLimitBuilder::new(self)
    }

    /// Opens the retry sub-builder.
    pub fn with_retry(self) -> RetryBuilder<Self> {
        RetryBuilder::new(self)
    }

    /// Opens the timeout sub-builder.
    pub fn with_timeout(self) -> TimeoutBuilder<Self> {
        TimeoutBuilder::new(self)
    }

    /// Opens the fallback sub-builder.
    pub fn with_fallback(self) -> FallbackBuilder<T, E> {
        FallbackBuilder::new(self)
    }

    /// Builds the pipeline.
    pub fn build(self) -> Result<Guard<T, E>, DefinitionError> {
        let enabled = config::non_fallback_enabled();
        let mut strategy: SharedSyncStrategy<T, E> = Arc::new(Invoke);
        if enabled {
            if let Some(cfg) = self.strategies.bulkhead {
                strategy = Arc::new(SyncBulkhead::new(strategy, cfg)?);
            }
            if let Some(cfg) = self.strategies.timeout {
                strategy = Arc::new(SyncTimeout::new(strategy, cfg)?);
            }
            if let Some(cfg) = self.strategies.rate_limit {
                strategy = Arc::new(SyncRateLimit::new(strategy, cfg, self.stopwatch.as_ref())?);
            }
            if let Some(cfg) = self.strategies.circuit_breaker {
                strategy = Arc::new(SyncCircuitBreaker::new(
                    strategy,
                    cfg,
                    self.stopwatch.as_ref(),
                    self.inspect_cause_chain,
                )?);
            }
            if let Some(cfg) = self.strategies.retry {
                strategy = Arc::new(SyncRetry::new(
                    strategy,
                    cfg,
                    Arc::clone(&self.stopwatch),
                    self.inspect_cause_chain,
                )?);
            }
        }
        if let Some(cfg) = self.fallback {
            strategy = Arc::new(SyncFallback::new(strategy, cfg, self.inspect_cause_chain)?);
        }
        Ok(Guard::from_strategy(strategy))
    }

    /// Builds the pipeline bound to one action; the returned callable
    /// owns its strategy state.
    pub fn build_callable<F>(
        self,
        action: F,
    ) -> Result<impl FnMut() -> Result<T, GuardError<E>>, DefinitionError>
    where
        F: FnMut() -> Result<T, E>,
    {
        let guard = self.build()?;
        Ok(guard.adapt(action))
    }
}

/// Builder of asynchronous pipelines.
pub struct AsyncGuardBuilder<T, E> {
    strategies: StrategySet<E>,
    pub(crate) fallback: Option<AsyncFallbackConfig<T, E>>,
    thread_offload: bool,
    executor: Arc<dyn AsyncExecutor>,
    inspect_cause_chain: bool,
    stopwatch: Arc<dyn Stopwatch>,
}

impl<T, E> StrategyCollector for AsyncGuardBuilder<T, E> {
    type Err = E;

    fn strategies_mut(&mut self) -> &mut StrategySet<E> {
        &mut self.strategies
    }
}

impl<T, E> AsyncGuardBuilder<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            strategies: StrategySet::default(),
            fallback: None,
            thread_offload: false,
            executor: Arc::new(TokioExecutor::current()),
            inspect_cause_chain: false,
            stopwatch: Arc::new(SystemStopwatch),
        }
    }

    /// Enables the cause-chain pass of every classifier in the pipeline.
    pub fn inspect_cause_chain(mut self, enabled: bool) -> Self {
        self.inspect_cause_chain = enabled;
        self
    }

    /// Replaces the stopwatch driving the time-based strategies.
    pub fn stopwatch(mut self, stopwatch: Arc<dyn Stopwatch>) -> Self {
        self.stopwatch = stopwatch;
        self
    }

    /// With `true`, every invocation is scheduled through the executor;
    /// with `false` (the default), the pipeline runs on the caller's
    /// task.
    pub fn with_thread_offload(mut self, enabled: bool) -> Self {
        self.thread_offload = enabled;
        self
    }

    /// Replaces the executor used for thread offload and
    /// [`launch`](AsyncGuard::launch).
    pub fn with_executor(mut self, executor: Arc<dyn AsyncExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Opens the bulkhead sub-builder.
    pub fn with_bulkhead(self) -> BulkheadBuilder<Self> {
        BulkheadBuilder::new(self)
    }

    /// Opens the circuit breaker sub-builder.
    pub fn with_circuit_breaker(self) -> CircuitBreakerBuilder<Self> {
        CircuitBreakerBuilder::new(self)
    }

    /// Opens the rate limit sub-builder.
    pub fn with_rate_limit(self) -> RateLimitBuilder<Self> {
        RateLimitBuilder::new(self)
    }

    /// Opens the retry sub-builder.
    pub fn with_retry(self) -> RetryBuilder<Self> {
        RetryBuilder::new(self)
    }

    /// Opens the timeout sub-builder.
    pub fn with_timeout(self) -> TimeoutBuilder<Self> {
        TimeoutBuilder::new(self)
    }

    /// Opens the fallback sub-builder.
    pub fn with_fallback(self) -> AsyncFallbackBuilder<T, E> {
        AsyncFallbackBuilder::new(self)
    }

    /// Builds the pipeline.
    pub fn build(self) -> Result<AsyncGuard<T, E>, DefinitionError> {
        let enabled = config::non_fallback_enabled();
        let mut strategy: SharedAsyncStrategy<T, E> = Arc::new(AsyncInvoke);
        if self.thread_offload {
            strategy = Arc::new(ThreadOffload::new(
                strategy,
                Arc::clone(&self.executor),
                true,
            ));
        }
        if enabled {
            if let Some(cfg) = self.strategies.bulkhead {
                strategy = Arc::new(AsyncBulkhead::new(strategy, cfg)?);
            }
            if let Some(cfg) = self.strategies.timeout {
                strategy = Arc::new(AsyncTimeout::new(strategy, cfg)?);
            }
            if let Some(cfg) = self.strategies.rate_limit {
                strategy = Arc::new(AsyncRateLimit::new(strategy, cfg, self.stopwatch.as_ref())?);
            }
            if let Some(cfg) = self.strategies.circuit_breaker {
                strategy = Arc::new(AsyncCircuitBreaker::new(
                    strategy,
                    cfg,
                    self.stopwatch.as_ref(),
                    self.inspect_cause_chain,
                )?);
            }
            if let Some(cfg) = self.strategies.retry {
                strategy = Arc::new(AsyncRetry::new(
                    strategy,
                    cfg,
                    Arc::clone(&self.stopwatch),
                    self.inspect_cause_chain,
                )?);
            }
        }
        if let Some(cfg) = self.fallback {
            strategy = Arc::new(AsyncFallback::new(strategy, cfg, self.inspect_cause_chain)?);
        }
        Ok(AsyncGuard::from_parts(strategy, self.executor))
    }

    /// Builds the pipeline bound to one action; the returned callable
    /// owns its strategy state and produces a fresh guarded future per
    /// call.
    pub fn build_callable<F, Fut>(
        self,
        action: F,
    ) -> Result<
        impl Fn() -> faultguard_core::BoxFuture<'static, Result<T, GuardError<E>>>,
        DefinitionError,
    >
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
    {
        let guard = self.build()?;
        Ok(guard.adapt(action))
    }
}
