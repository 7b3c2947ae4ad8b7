//! Time measurement seam.
//!
//! Every time-window strategy measures elapsed time through a
//! [`Stopwatch`] rather than reading [`Instant::now`] directly, so tests
//! can drive rate limiters, circuit breakers and retry deadlines with a
//! [`ManualStopwatch`] instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of started stopwatches.
pub trait Stopwatch: Send + Sync {
    /// Starts measuring. The returned [`RunningStopwatch`] reports time
    /// elapsed since this call.
    fn start(&self) -> Box<dyn RunningStopwatch>;
}

/// A stopwatch that has been started.
pub trait RunningStopwatch: Send + Sync {
    /// Time elapsed since [`Stopwatch::start`].
    fn elapsed(&self) -> Duration;

    /// Elapsed time in whole milliseconds.
    fn elapsed_millis(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

/// Monotonic-clock stopwatch used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStopwatch;

impl Stopwatch for SystemStopwatch {
    fn start(&self) -> Box<dyn RunningStopwatch> {
        Box::new(RunningSystemStopwatch {
            start: Instant::now(),
        })
    }
}

struct RunningSystemStopwatch {
    start: Instant,
}

impl RunningStopwatch for RunningSystemStopwatch {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// A stopwatch whose elapsed time is set explicitly.
///
/// Cloning shares the underlying value, so a test can hold one handle and
/// hand a clone to the strategy under test:
///
/// ```
/// use faultguard_core::clock::{ManualStopwatch, Stopwatch};
/// use std::time::Duration;
///
/// let stopwatch = ManualStopwatch::new();
/// let running = stopwatch.start();
/// stopwatch.set_millis(250);
/// assert_eq!(running.elapsed(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualStopwatch {
    millis: Arc<AtomicU64>,
}

impl ManualStopwatch {
    /// Creates a stopwatch at zero elapsed time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the elapsed time, in milliseconds.
    pub fn set_millis(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Advances the elapsed time.
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Stopwatch for ManualStopwatch {
    fn start(&self) -> Box<dyn RunningStopwatch> {
        Box::new(self.clone())
    }
}

impl RunningStopwatch for ManualStopwatch {
    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}
