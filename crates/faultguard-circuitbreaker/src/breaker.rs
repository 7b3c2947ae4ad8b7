//! The circuit breaker state machine.

use std::sync::Mutex;

use faultguard_core::clock::{RunningStopwatch, Stopwatch};
use faultguard_core::events::EventDispatcher;

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::events::CircuitBreakerEvent;
use crate::window::OutcomeWindow;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Invocations flow through; outcomes fill the rolling window.
    Closed,
    /// Invocations are rejected until the delay elapses.
    Open,
    /// A limited number of trial invocations probe the target.
    HalfOpen,
}

enum StateData {
    Closed { window: OutcomeWindow },
    Open { since_millis: u64 },
    HalfOpen { successes: u32, in_flight: u32 },
}

impl StateData {
    fn state(&self) -> CircuitState {
        match self {
            StateData::Closed { .. } => CircuitState::Closed,
            StateData::Open { .. } => CircuitState::Open,
            StateData::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

/// The shared, mode-independent circuit breaker: rolling outcome window,
/// three-state machine, delay timer.
///
/// All state lives behind one mutex; events are collected during a
/// mutation and dispatched after the lock is released, so callbacks never
/// run under it. Transitions are therefore linearisable per breaker and
/// observed in order.
pub struct CircuitBreaker {
    name: Option<String>,
    display_name: String,
    request_volume_threshold: usize,
    failure_ratio: f64,
    delay_millis: u64,
    success_threshold: u32,
    stopwatch: Box<dyn RunningStopwatch>,
    state: Mutex<StateData>,
    events: Mutex<EventDispatcher<CircuitBreakerEvent>>,
}

impl CircuitBreaker {
    pub(crate) fn new(
        name: Option<String>,
        display_name: String,
        request_volume_threshold: usize,
        failure_ratio: f64,
        delay_millis: u64,
        success_threshold: u32,
        events: EventDispatcher<CircuitBreakerEvent>,
        stopwatch: &dyn Stopwatch,
    ) -> Self {
        Self {
            name,
            display_name,
            request_volume_threshold,
            failure_ratio,
            delay_millis,
            success_threshold,
            stopwatch: stopwatch.start(),
            state: Mutex::new(StateData::Closed {
                window: OutcomeWindow::new(request_volume_threshold),
            }),
            events: Mutex::new(events),
        }
    }

    /// The registry name, if the breaker was given one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The current state.
    pub fn state(&self) -> CircuitState {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .state()
    }

    /// Registers an additional event callback after construction (used
    /// by the maintenance surface).
    pub(crate) fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&CircuitBreakerEvent) + Send + Sync + 'static,
    {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .register(callback);
    }

    /// Asks for admission. Returns `false` when the breaker is open (or
    /// half-open with all trial slots taken).
    pub fn try_acquire(&self) -> bool {
        enum Admission {
            Admit,
            AdmitTrial,
            AdmitProbe,
            Reject,
        }

        let mut events = Vec::new();
        let admitted = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let decision = match &*state {
                StateData::Closed { .. } => Admission::Admit,
                StateData::Open { since_millis } => {
                    let now = self.stopwatch.elapsed_millis();
                    if now.saturating_sub(*since_millis) >= self.delay_millis {
                        Admission::AdmitTrial
                    } else {
                        Admission::Reject
                    }
                }
                StateData::HalfOpen {
                    successes,
                    in_flight,
                } => {
                    if successes + in_flight < self.success_threshold {
                        Admission::AdmitProbe
                    } else {
                        Admission::Reject
                    }
                }
            };
            match decision {
                Admission::Admit => true,
                Admission::AdmitTrial => {
                    // The delay elapsed; admit this invocation as the
                    // first trial.
                    self.transition(
                        &mut state,
                        StateData::HalfOpen {
                            successes: 0,
                            in_flight: 1,
                        },
                        &mut events,
                    );
                    true
                }
                Admission::AdmitProbe => {
                    if let StateData::HalfOpen { in_flight, .. } = &mut *state {
                        *in_flight += 1;
                    }
                    true
                }
                Admission::Reject => {
                    events.push(CircuitBreakerEvent::Prevented);
                    false
                }
            }
        };
        self.emit_all(events);

        #[cfg(feature = "metrics")]
        if !admitted {
            counter!("circuit_breaker_prevented_total", "circuit_breaker" => self.display_name.clone())
                .increment(1);
        }

        admitted
    }

    /// Records the outcome of an admitted invocation.
    pub fn record(&self, failure: bool) {
        enum Next {
            Stay,
            Open,
            Close,
        }

        let mut events = Vec::new();
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let next = match &mut *state {
                StateData::Closed { window } => {
                    window.record(failure);
                    if window.is_full() && window.failure_ratio() > self.failure_ratio {
                        Next::Open
                    } else {
                        Next::Stay
                    }
                }
                // A late completion from before the breaker opened.
                StateData::Open { .. } => Next::Stay,
                StateData::HalfOpen {
                    successes,
                    in_flight,
                } => {
                    if failure {
                        Next::Open
                    } else {
                        *in_flight = in_flight.saturating_sub(1);
                        *successes += 1;
                        if *successes >= self.success_threshold {
                            Next::Close
                        } else {
                            Next::Stay
                        }
                    }
                }
            };
            match next {
                Next::Stay => {}
                Next::Open => {
                    let since_millis = self.stopwatch.elapsed_millis();
                    self.transition(&mut state, StateData::Open { since_millis }, &mut events);
                }
                Next::Close => {
                    self.transition(
                        &mut state,
                        StateData::Closed {
                            window: OutcomeWindow::new(self.request_volume_threshold),
                        },
                        &mut events,
                    );
                }
            }
            events.push(if failure {
                CircuitBreakerEvent::Failed
            } else {
                CircuitBreakerEvent::Succeeded
            });
        }
        self.emit_all(events);

        #[cfg(feature = "metrics")]
        counter!(
            "circuit_breaker_calls_total",
            "circuit_breaker" => self.display_name.clone(),
            "outcome" => if failure { "failure" } else { "success" }
        )
        .increment(1);
    }

    /// Moves the breaker back to closed with an empty window.
    pub fn reset(&self) {
        let mut events = Vec::new();
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.state() != CircuitState::Closed {
                self.transition(
                    &mut state,
                    StateData::Closed {
                        window: OutcomeWindow::new(self.request_volume_threshold),
                    },
                    &mut events,
                );
            } else {
                *state = StateData::Closed {
                    window: OutcomeWindow::new(self.request_volume_threshold),
                };
            }
        }
        self.emit_all(events);
    }

    fn transition(
        &self,
        state: &mut StateData,
        to: StateData,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        let from = state.state();
        let to_state = to.state();
        *state = to;
        tracing::info!(
            breaker = %self.display_name,
            from = ?from,
            to = ?to_state,
            "circuit breaker state transition"
        );
        events.push(CircuitBreakerEvent::StateChanged {
            from,
            to: to_state,
        });

        #[cfg(feature = "metrics")]
        counter!(
            "circuit_breaker_transitions_total",
            "circuit_breaker" => self.display_name.clone()
        )
        .increment(1);
    }

    fn emit_all(&self, events: Vec<CircuitBreakerEvent>) {
        if events.is_empty() {
            return;
        }
        let dispatcher = self
            .events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for event in &events {
            dispatcher.dispatch(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultguard_core::clock::ManualStopwatch;

    fn breaker(clock: &ManualStopwatch) -> CircuitBreaker {
        CircuitBreaker::new(
            None,
            "test-breaker".to_string(),
            4,
            0.5,
            1000,
            2,
            EventDispatcher::disconnected("test-breaker"),
            clock,
        )
    }

    #[test]
    fn balanced_outcomes_keep_the_breaker_closed() {
        let clock = ManualStopwatch::new();
        let breaker = breaker(&clock);

        // Two failures and two successes: the ratio does not exceed 0.5.
        breaker.record(true);
        breaker.record(true);
        breaker.record(false);
        breaker.record(false);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire());
    }

    #[test]
    fn opens_recovers_through_trials_and_closes() {
        let clock = ManualStopwatch::new();
        let breaker = breaker(&clock);

        breaker.record(true);
        breaker.record(true);
        breaker.record(false);
        breaker.record(false);
        assert_eq!(breaker.state(), CircuitState::Closed);

        // Three failures in the window of four.
        breaker.record(true);
        breaker.record(true);
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record(true);
        assert_eq!(breaker.state(), CircuitState::Open);

        // Rejected until the delay elapses.
        clock.set_millis(999);
        assert!(!breaker.try_acquire());

        // First post-delay attempt is admitted as a trial.
        clock.set_millis(1001);
        assert!(breaker.try_acquire());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record(false);

        assert!(breaker.try_acquire());
        breaker.record(false);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_and_restarts_the_delay() {
        let clock = ManualStopwatch::new();
        let breaker = breaker(&clock);
        for _ in 0..4 {
            breaker.record(true);
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.set_millis(1500);
        assert!(breaker.try_acquire());
        breaker.record(true);
        assert_eq!(breaker.state(), CircuitState::Open);

        // The delay restarted at 1500.
        clock.set_millis(2400);
        assert!(!breaker.try_acquire());
        clock.set_millis(2500);
        assert!(breaker.try_acquire());
    }

    #[test]
    fn half_open_admits_at_most_the_success_threshold() {
        let clock = ManualStopwatch::new();
        let breaker = breaker(&clock);
        for _ in 0..4 {
            breaker.record(true);
        }
        clock.set_millis(1000);
        assert!(breaker.try_acquire());
        assert!(breaker.try_acquire());
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn reset_forgets_prior_outcomes() {
        let clock = ManualStopwatch::new();
        let breaker = breaker(&clock);
        for _ in 0..4 {
            breaker.record(true);
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);

        // Old failures no longer count towards the ratio.
        breaker.record(true);
        breaker.record(true);
        breaker.record(false);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn state_change_events_fire_in_order() {
        use std::sync::{Arc, Mutex};

        let clock = ManualStopwatch::new();
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&transitions);

        let breaker = breaker(&clock);
        breaker.subscribe(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateChanged { from, to } = event {
                seen.lock().unwrap().push((*from, *to));
            }
        });

        for _ in 0..4 {
            breaker.record(true);
        }
        clock.set_millis(1000);
        assert!(breaker.try_acquire());
        breaker.record(false);
        assert!(breaker.try_acquire());
        breaker.record(false);

        assert_eq!(
            transitions.lock().unwrap().clone(),
            vec![
                (CircuitState::Closed, CircuitState::Open),
                (CircuitState::Open, CircuitState::HalfOpen),
                (CircuitState::HalfOpen, CircuitState::Closed),
            ]
        );
    }
}
