//! Delay schedules between retry attempts.
//!
//! A [`Backoff`] computes the delay before retry attempt `n` (0-based),
//! given the fault that triggered it. Jitter, when configured, is drawn
//! uniformly from `[-jitter, +jitter]`, applied after any maximum-delay
//! clamping, and the result never goes below zero.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use faultguard_core::GuardError;

/// A schedule of delays between retry attempts.
pub trait Backoff<E>: Send + Sync {
    /// The delay before retry attempt `attempt` (0-based), given the
    /// fault that made it necessary.
    fn delay_for(&self, attempt: u32, fault: &GuardError<E>) -> Duration;
}

pub(crate) fn apply_jitter(base: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return base;
    }
    let jitter_nanos = jitter.as_nanos() as i128;
    let offset = rand::thread_rng().gen_range(-jitter_nanos..=jitter_nanos);
    let nanos = (base.as_nanos() as i128 + offset).max(0);
    Duration::from_nanos(nanos as u64)
}

fn clamp(delay: Duration, max_delay: Duration) -> Duration {
    // A zero maximum means "no limit".
    if max_delay.is_zero() {
        delay
    } else {
        delay.min(max_delay)
    }
}

/// The same delay before every retry, plus jitter.
#[derive(Debug, Clone)]
pub struct ConstantBackoff {
    delay: Duration,
    jitter: Duration,
}

impl ConstantBackoff {
    /// Creates the schedule.
    pub fn new(delay: Duration, jitter: Duration) -> Self {
        Self { delay, jitter }
    }
}

impl<E> Backoff<E> for ConstantBackoff {
    fn delay_for(&self, _attempt: u32, _fault: &GuardError<E>) -> Duration {
        apply_jitter(self.delay, self.jitter)
    }
}

/// `delay * factor^n`, clamped to `max_delay`, plus jitter.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    factor: u32,
    max_delay: Duration,
    jitter: Duration,
}

impl ExponentialBackoff {
    /// Creates the schedule with factor 2 and a 1 minute delay cap.
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            factor: 2,
            max_delay: Duration::from_secs(60),
            jitter: Duration::ZERO,
        }
    }

    /// Sets the multiplication factor.
    pub fn factor(mut self, factor: u32) -> Self {
        self.factor = factor;
        self
    }

    /// Sets the delay cap; zero means unlimited.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the jitter amplitude.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }
}

impl<E> Backoff<E> for ExponentialBackoff {
    fn delay_for(&self, attempt: u32, _fault: &GuardError<E>) -> Duration {
        let multiplier = (self.factor as u64).saturating_pow(attempt);
        let delay = self.initial.saturating_mul(multiplier.min(u32::MAX as u64) as u32);
        apply_jitter(clamp(delay, self.max_delay), self.jitter)
    }
}

/// `fib(n) * delay`, clamped to `max_delay`, plus jitter.
///
/// The sequence starts `1, 1, 2, 3, 5, …`, so the first two retries wait
/// one base delay each.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    initial: Duration,
    max_delay: Duration,
    jitter: Duration,
}

impl FibonacciBackoff {
    /// Creates the schedule with a 1 minute delay cap.
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            max_delay: Duration::from_secs(60),
            jitter: Duration::ZERO,
        }
    }

    /// Sets the delay cap; zero means unlimited.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the jitter amplitude.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn fibonacci(attempt: u32) -> u64 {
        let mut previous: u64 = 1;
        let mut current: u64 = 1;
        for _ in 0..attempt {
            let next = previous.saturating_add(current);
            previous = current;
            current = next;
        }
        previous
    }
}

impl<E> Backoff<E> for FibonacciBackoff {
    fn delay_for(&self, attempt: u32, _fault: &GuardError<E>) -> Duration {
        let multiplier = Self::fibonacci(attempt);
        let delay = self
            .initial
            .saturating_mul(multiplier.min(u32::MAX as u64) as u32);
        apply_jitter(clamp(delay, self.max_delay), self.jitter)
    }
}

/// A caller-supplied schedule.
pub struct CustomBackoff<E> {
    f: Arc<dyn Fn(u32, &GuardError<E>) -> Duration + Send + Sync>,
}

impl<E> CustomBackoff<E> {
    /// Wraps a function from `(attempt, fault)` to the delay.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(u32, &GuardError<E>) -> Duration + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

impl<E> Backoff<E> for CustomBackoff<E> {
    fn delay_for(&self, attempt: u32, fault: &GuardError<E>) -> Duration {
        (self.f)(attempt, fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fault() -> GuardError<()> {
        GuardError::RateLimited
    }

    #[test]
    fn constant_backoff_without_jitter_is_constant() {
        let backoff = ConstantBackoff::new(Duration::from_millis(100), Duration::ZERO);
        assert_eq!(
            Backoff::<()>::delay_for(&backoff, 0, &fault()),
            Duration::from_millis(100)
        );
        assert_eq!(
            Backoff::<()>::delay_for(&backoff, 7, &fault()),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn constant_backoff_jitter_stays_in_range() {
        let backoff = ConstantBackoff::new(Duration::from_millis(100), Duration::from_millis(30));
        for attempt in 0..100 {
            let delay = Backoff::<()>::delay_for(&backoff, attempt, &fault());
            assert!(delay >= Duration::from_millis(70));
            assert!(delay <= Duration::from_millis(130));
        }
    }

    #[test]
    fn jitter_never_goes_below_zero() {
        let backoff = ConstantBackoff::new(Duration::from_millis(1), Duration::from_millis(100));
        for attempt in 0..100 {
            let _ = Backoff::<()>::delay_for(&backoff, attempt, &fault());
        }
    }

    #[test]
    fn exponential_backoff_doubles_and_clamps() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100))
            .max_delay(Duration::from_millis(500));
        assert_eq!(
            Backoff::<()>::delay_for(&backoff, 0, &fault()),
            Duration::from_millis(100)
        );
        assert_eq!(
            Backoff::<()>::delay_for(&backoff, 1, &fault()),
            Duration::from_millis(200)
        );
        assert_eq!(
            Backoff::<()>::delay_for(&backoff, 2, &fault()),
            Duration::from_millis(400)
        );
        assert_eq!(
            Backoff::<()>::delay_for(&backoff, 3, &fault()),
            Duration::from_millis(500)
        );
        assert_eq!(
            Backoff::<()>::delay_for(&backoff, 30, &fault()),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn zero_max_delay_means_unlimited() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(1)).max_delay(Duration::ZERO);
        assert_eq!(
            Backoff::<()>::delay_for(&backoff, 10, &fault()),
            Duration::from_secs(1024)
        );
    }

    #[test]
    fn fibonacci_backoff_follows_the_sequence() {
        let backoff =
            FibonacciBackoff::new(Duration::from_millis(10)).max_delay(Duration::ZERO);
        let expected = [1u64, 1, 2, 3, 5, 8, 13];
        for (attempt, multiplier) in expected.iter().enumerate() {
            assert_eq!(
                Backoff::<()>::delay_for(&backoff, attempt as u32, &fault()),
                Duration::from_millis(10 * multiplier)
            );
        }
    }

    #[test]
    fn custom_backoff_sees_the_fault() {
        let backoff: CustomBackoff<()> = CustomBackoff::new(|attempt, fault| {
            if fault.is_rate_limited() {
                Duration::from_millis(500)
            } else {
                Duration::from_millis(10 * (attempt as u64 + 1))
            }
        });
        assert_eq!(backoff.delay_for(0, &fault()), Duration::from_millis(500));
        assert_eq!(
            backoff.delay_for(2, &GuardError::Interrupted),
            Duration::from_millis(30)
        );
    }
}
