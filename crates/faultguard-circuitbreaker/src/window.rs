//! Rolling window of invocation outcomes.

/// Fixed-size ring of boolean outcomes (`true` = failure).
///
/// The failure ratio is meaningful only once the ring is full; until then
/// the breaker stays closed no matter what the partial contents look
/// like.
pub(crate) struct OutcomeWindow {
    slots: Vec<bool>,
    head: usize,
    len: usize,
    failures: usize,
}

impl OutcomeWindow {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            slots: vec![false; size],
            head: 0,
            len: 0,
            failures: 0,
        }
    }

    /// Appends an outcome, evicting the oldest once the ring is full.
    pub(crate) fn record(&mut self, failure: bool) {
        let size = self.slots.len();
        if self.len == size {
            if self.slots[self.head] {
                self.failures -= 1;
            }
        } else {
            self.len += 1;
        }
        self.slots[self.head] = failure;
        if failure {
            self.failures += 1;
        }
        self.head = (self.head + 1) % size;
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Failure ratio over the full ring.
    pub(crate) fn failure_ratio(&self) -> f64 {
        self.failures as f64 / self.slots.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_counts_only_the_most_recent_outcomes() {
        let mut window = OutcomeWindow::new(4);
        assert!(!window.is_full());

        window.record(true);
        window.record(true);
        window.record(false);
        assert!(!window.is_full());

        window.record(false);
        assert!(window.is_full());
        assert_eq!(window.failure_ratio(), 0.5);

        // The two oldest failures are evicted one by one.
        window.record(false);
        assert_eq!(window.failure_ratio(), 0.25);
        window.record(false);
        assert_eq!(window.failure_ratio(), 0.0);
    }

    #[test]
    fn eviction_wraps_around() {
        let mut window = OutcomeWindow::new(2);
        for _ in 0..5 {
            window.record(true);
        }
        assert_eq!(window.failure_ratio(), 1.0);
        window.record(false);
        window.record(false);
        assert_eq!(window.failure_ratio(), 0.0);
    }
}
