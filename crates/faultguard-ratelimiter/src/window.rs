//! Time-window accounting.
//!
//! Each window answers one question under the strategy's mutex: does the
//! attempt happening *now* get a permit? The three window types differ in
//! how they account for past attempts; all of them read time through a
//! [`RunningStopwatch`] so tests can drive them deterministically.

use std::collections::VecDeque;

use faultguard_core::clock::RunningStopwatch;

/// A rate-limiting time window.
pub(crate) trait TimeWindow: Send + Sync {
    /// Records an attempt at the current time and returns whether it is
    /// permitted.
    fn record(&mut self) -> bool;
}

/// Non-overlapping intervals of the window length; the permit counter
/// refreshes at each interval boundary.
///
/// Permits and the spacing timestamp are consumed on every attempt,
/// permitted or rejected.
pub(crate) struct FixedWindow {
    stopwatch: Box<dyn RunningStopwatch>,
    max_invocations: i64,
    window_millis: u64,
    min_spacing_millis: u64,
    // i64 rather than a narrower unsigned type: rejected attempts keep
    // decrementing, so the counter must tolerate going negative.
    permits: i64,
    next_refresh: u64,
    last_attempt: i64,
}

impl FixedWindow {
    pub(crate) fn new(
        stopwatch: Box<dyn RunningStopwatch>,
        max_invocations: usize,
        window_millis: u64,
        min_spacing_millis: u64,
    ) -> Self {
        Self {
            stopwatch,
            max_invocations: max_invocations as i64,
            window_millis,
            min_spacing_millis,
            permits: max_invocations as i64,
            next_refresh: window_millis,
            last_attempt: -(min_spacing_millis as i64),
        }
    }
}

impl TimeWindow for FixedWindow {
    fn record(&mut self) -> bool {
        let now = self.stopwatch.elapsed_millis();
        if now >= self.next_refresh {
            self.permits = self.max_invocations;
            // Advance by however many whole windows have passed, plus one.
            self.next_refresh +=
                self.window_millis * (1 + (now - self.next_refresh) / self.window_millis);
        }

        let mut allowed = self.permits > 0;
        if allowed
            && self.min_spacing_millis != 0
            && now as i64 - self.last_attempt < self.min_spacing_millis as i64
        {
            allowed = false;
        }

        self.permits -= 1;
        self.last_attempt = now as i64;

        allowed
    }
}

/// Time-ordered log of recent admissions; an attempt is permitted while
/// fewer than `max_invocations` admissions lie within the trailing
/// window. Only admissions enter the log; the spacing timestamp still
/// updates on every attempt.
pub(crate) struct RollingWindow {
    stopwatch: Box<dyn RunningStopwatch>,
    max_invocations: usize,
    window_millis: u64,
    min_spacing_millis: u64,
    admissions: VecDeque<u64>,
    last_attempt: i64,
}

impl RollingWindow {
    pub(crate) fn new(
        stopwatch: Box<dyn RunningStopwatch>,
        max_invocations: usize,
        window_millis: u64,
        min_spacing_millis: u64,
    ) -> Self {
        Self {
            stopwatch,
            max_invocations,
            window_millis,
            min_spacing_millis,
            admissions: VecDeque::with_capacity(max_invocations),
            last_attempt: -(min_spacing_millis as i64),
        }
    }
}

impl TimeWindow for RollingWindow {
    fn record(&mut self) -> bool {
        let now = self.stopwatch.elapsed_millis();
        while let Some(&oldest) = self.admissions.front() {
            if oldest < now.saturating_sub(self.window_millis) {
                self.admissions.pop_front();
            } else {
                break;
            }
        }

        let mut allowed = self.admissions.len() < self.max_invocations;
        if allowed
            && self.min_spacing_millis != 0
            && now as i64 - self.last_attempt < self.min_spacing_millis as i64
        {
            allowed = false;
        }

        if allowed {
            self.admissions.push_back(now);
        }
        self.last_attempt = now as i64;

        allowed
    }
}

/// Fractional permit accumulator: permits grow continuously at
/// `max_invocations / window` per unit time, capped at the window size,
/// starting from a single permit. Only admissions consume a permit, so
/// short bursts are possible after quiet periods while the long-run rate
/// never exceeds the configured one.
pub(crate) struct SmoothWindow {
    stopwatch: Box<dyn RunningStopwatch>,
    max_invocations: f64,
    increase_per_milli: f64,
    min_spacing_millis: u64,
    permits: f64,
    last_update: u64,
    last_attempt: i64,
}

impl SmoothWindow {
    pub(crate) fn new(
        stopwatch: Box<dyn RunningStopwatch>,
        max_invocations: usize,
        window_millis: u64,
        min_spacing_millis: u64,
    ) -> Self {
        Self {
            stopwatch,
            max_invocations: max_invocations as f64,
            increase_per_milli: max_invocations as f64 / window_millis as f64,
            min_spacing_millis,
            permits: 1.0,
            last_update: 0,
            last_attempt: -(min_spacing_millis as i64),
        }
    }
}

impl TimeWindow for SmoothWindow {
    fn record(&mut self) -> bool {
        let now = self.stopwatch.elapsed_millis();
        self.permits += (now - self.last_update) as f64 * self.increase_per_milli;
        if self.permits > self.max_invocations {
            self.permits = self.max_invocations;
        }
        self.last_update = now;

        let mut allowed = self.permits >= 1.0;
        if allowed
            && self.min_spacing_millis != 0
            && now as i64 - self.last_attempt < self.min_spacing_millis as i64
        {
            allowed = false;
        }

        if allowed {
            self.permits -= 1.0;
        }
        self.last_attempt = now as i64;

        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultguard_core::clock::{ManualStopwatch, Stopwatch};

    fn manual() -> ManualStopwatch {
        ManualStopwatch::new()
    }

    mod fixed {
        use super::*;

        #[test]
        fn refreshes_at_interval_boundaries() {
            let clock = manual();
            let mut window = FixedWindow::new(clock.start(), 2, 100, 0);

            assert!(window.record());
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(99);
            assert!(!window.record());

            clock.set_millis(100);
            assert!(window.record());
            assert!(window.record());
            assert!(!window.record());
        }

        #[test]
        fn rejected_attempts_consume_permits() {
            let clock = manual();
            let mut window = FixedWindow::new(clock.start(), 2, 100, 10);

            assert!(window.record());
            // Too close: rejected for spacing, but still consumes the
            // second permit.
            clock.set_millis(5);
            assert!(!window.record());
            // Spacing is fine now, but the window is out of permits.
            clock.set_millis(50);
            assert!(!window.record());

            clock.set_millis(100);
            assert!(window.record());
        }

        #[test]
        fn refresh_skips_missed_windows() {
            let clock = manual();
            let mut window = FixedWindow::new(clock.start(), 1, 100, 0);

            assert!(window.record());
            assert!(!window.record());

            // Far in the future; the next refresh lands strictly after
            // the current time, not at an already-elapsed boundary.
            clock.set_millis(350);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(399);
            assert!(!window.record());
            clock.set_millis(400);
            assert!(window.record());
        }
    }

    mod rolling {
        use super::*;

        #[test]
        fn admissions_expire_as_the_window_slides() {
            let clock = manual();
            let mut window = RollingWindow::new(clock.start(), 2, 100, 0);

            assert!(window.record());
            clock.set_millis(60);
            assert!(window.record());
            assert!(!window.record());

            // The admission at t=0 leaves the window.
            clock.set_millis(101);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(161);
            assert!(window.record());
        }

        #[test]
        fn rejected_attempts_do_not_occupy_the_log() {
            let clock = manual();
            let mut window = RollingWindow::new(clock.start(), 1, 100, 0);

            assert!(window.record());
            assert!(!window.record());
            assert!(!window.record());

            clock.set_millis(101);
            assert!(window.record());
        }

        #[test]
        fn spacing_applies_between_attempts() {
            let clock = manual();
            let mut window = RollingWindow::new(clock.start(), 10, 100, 20);

            assert!(window.record());
            clock.set_millis(10);
            assert!(!window.record());
            // Spacing is measured from the last attempt, not the last
            // admission.
            clock.set_millis(25);
            assert!(!window.record());
            clock.set_millis(45);
            assert!(window.record());
        }
    }

    mod smooth {
        use super::*;

        #[test]
        fn scenario_steady_rate() {
            let clock = manual();
            let mut window = SmoothWindow::new(clock.start(), 2, 100, 0);

            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(50);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(100);
            assert!(window.record());
            assert!(!window.record());
        }

        #[test]
        fn scenario_fractional_accumulation() {
            let clock = manual();
            let mut window = SmoothWindow::new(clock.start(), 2, 100, 0);

            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(50);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(120);
            assert!(window.record());

            clock.set_millis(190);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(210);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(290);
            assert!(window.record());
            assert!(!window.record());
        }

        #[test]
        fn scenario_burst_capacity_grows_to_the_window() {
            let clock = manual();
            let mut window = SmoothWindow::new(clock.start(), 4, 100, 0);

            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(50);
            assert!(window.record());
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(100);
            assert!(window.record());
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(200);
            assert!(window.record());
            assert!(window.record());
            assert!(window.record());
            assert!(window.record());
            assert!(!window.record());
        }

        #[test]
        fn scenario_burst_capacity_is_capped() {
            let clock = manual();
            let mut window = SmoothWindow::new(clock.start(), 4, 100, 0);

            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(50);
            assert!(window.record());
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(75);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(100);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(200);
            assert!(window.record());
            assert!(window.record());
            assert!(window.record());
            assert!(window.record());
            assert!(!window.record());
        }

        #[test]
        fn scenario_spacing() {
            let clock = manual();
            let mut window = SmoothWindow::new(clock.start(), 4, 100, 5);

            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(10);
            assert!(!window.record());

            clock.set_millis(13);
            assert!(!window.record());

            clock.set_millis(50);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(100);
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(120);
            assert!(window.record());

            clock.set_millis(130);
            assert!(window.record());
            assert!(!window.record());
        }

        #[test]
        fn scenario_long_idle_allows_a_full_burst() {
            let clock = manual();
            let mut window = SmoothWindow::new(clock.start(), 2, 100, 0);

            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(550);
            assert!(window.record());
            assert!(window.record());
            assert!(!window.record());

            clock.set_millis(1050);
            assert!(window.record());
            assert!(window.record());
            assert!(!window.record());
        }

        #[test]
        fn scenario_spacing_with_spread_out_attempts() {
            let clock = manual();
            let mut window = SmoothWindow::new(clock.start(), 4, 100, 5);

            assert!(window.record());

            clock.set_millis(25);
            assert!(window.record());

            clock.set_millis(28);
            assert!(!window.record());

            clock.set_millis(50);
            assert!(window.record());

            clock.set_millis(100);
            assert!(window.record());

            clock.set_millis(123);
            assert!(window.record());

            clock.set_millis(130);
            assert!(window.record());
        }
    }
}
