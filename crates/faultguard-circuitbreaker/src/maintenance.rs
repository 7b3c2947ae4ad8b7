//! Process-wide registry of named circuit breakers.
//!
//! Only breakers that were given a name at build time are registered;
//! programmatically built unnamed breakers are not tracked. Registering
//! the same name twice is fatal at build time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;

use faultguard_core::DefinitionError;

use crate::breaker::{CircuitBreaker, CircuitState};
use crate::events::CircuitBreakerEvent;

lazy_static! {
    static ref REGISTRY: Mutex<HashMap<String, Arc<CircuitBreaker>>> = Mutex::new(HashMap::new());
}

pub(crate) fn register(breaker: &Arc<CircuitBreaker>) -> Result<(), DefinitionError> {
    let name = match breaker.name() {
        Some(name) => name.to_string(),
        None => return Ok(()),
    };
    let mut registry = REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
    if registry.contains_key(&name) {
        return Err(DefinitionError::DuplicateCircuitBreakerName(name));
    }
    registry.insert(name, Arc::clone(breaker));
    Ok(())
}

fn lookup(name: &str) -> Result<Arc<CircuitBreaker>, DefinitionError> {
    let registry = REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
    registry
        .get(name)
        .cloned()
        .ok_or_else(|| DefinitionError::UnknownCircuitBreaker(name.to_string()))
}

/// Maintenance surface over all named circuit breakers in the process.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerMaintenance;

impl CircuitBreakerMaintenance {
    /// Current state of the named breaker.
    pub fn current_state(name: &str) -> Result<CircuitState, DefinitionError> {
        Ok(lookup(name)?.state())
    }

    /// Resets the named breaker to closed with an empty rolling window.
    pub fn reset(name: &str) -> Result<(), DefinitionError> {
        lookup(name)?.reset();
        Ok(())
    }

    /// Resets every named breaker.
    pub fn reset_all() {
        let breakers: Vec<Arc<CircuitBreaker>> = {
            let registry = REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
            registry.values().cloned().collect()
        };
        for breaker in breakers {
            breaker.reset();
        }
    }

    /// Registers a callback observing state changes of the named breaker.
    pub fn on_state_change<F>(name: &str, callback: F) -> Result<(), DefinitionError>
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        let breaker = lookup(name)?;
        breaker.subscribe(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateChanged { from, to } = event {
                callback(*from, *to);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultguard_core::clock::ManualStopwatch;
    use faultguard_core::events::EventDispatcher;

    fn named(name: &str, clock: &ManualStopwatch) -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(
            Some(name.to_string()),
            name.to_string(),
            2,
            0.1,
            1000,
            1,
            EventDispatcher::disconnected(name),
            clock,
        ))
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let clock = ManualStopwatch::new();
        let first = named("maintenance-duplicate", &clock);
        register(&first).unwrap();

        let second = named("maintenance-duplicate", &clock);
        assert!(matches!(
            register(&second),
            Err(DefinitionError::DuplicateCircuitBreakerName(_))
        ));
    }

    #[test]
    fn unknown_names_are_definition_errors() {
        assert!(matches!(
            CircuitBreakerMaintenance::current_state("maintenance-no-such-breaker"),
            Err(DefinitionError::UnknownCircuitBreaker(_))
        ));
    }

    #[test]
    fn reset_all_restores_closed_state() {
        let clock = ManualStopwatch::new();
        let breaker = named("maintenance-reset-all", &clock);
        register(&breaker).unwrap();

        breaker.record(true);
        breaker.record(true);
        assert_eq!(breaker.state(), CircuitState::Open);

        CircuitBreakerMaintenance::reset_all();
        assert_eq!(
            CircuitBreakerMaintenance::current_state("maintenance-reset-all").unwrap(),
            CircuitState::Closed
        );
    }

    #[test]
    fn state_change_callbacks_attach_to_registered_breakers() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let clock = ManualStopwatch::new();
        let breaker = named("maintenance-observed", &clock);
        register(&breaker).unwrap();

        let changes = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&changes);
        CircuitBreakerMaintenance::on_state_change("maintenance-observed", move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        breaker.record(true);
        breaker.record(true);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }
}
