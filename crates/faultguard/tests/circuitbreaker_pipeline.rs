//! Circuit breaker behavior through the public pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use faultguard::{
    CircuitBreakerMaintenance, CircuitState, Guard, GuardError, ManualStopwatch,
};

#[test]
fn breaker_opens_rejects_and_recovers() {
    let clock = ManualStopwatch::new();
    let prevented = Arc::new(AtomicUsize::new(0));
    let p = Arc::clone(&prevented);

    let guard: Guard<&'static str, &'static str> = Guard::builder()
        .stopwatch(Arc::new(clock.clone()))
        .with_circuit_breaker()
        .request_volume_threshold(4)
        .failure_ratio(0.5)
        .delay(Duration::from_millis(1000))
        .success_threshold(2)
        .on_prevented(move || {
            p.fetch_add(1, Ordering::SeqCst);
        })
        .done()
        .build()
        .unwrap();

    // Two failures and two successes fill the window at exactly the
    // threshold ratio; the breaker stays closed.
    let _ = guard.call(|| Err("boom"));
    let _ = guard.call(|| Err("boom"));
    guard.call(|| Ok("fine")).unwrap();
    guard.call(|| Ok("fine")).unwrap();

    // A third failure in the window of four pushes the ratio past the
    // threshold.
    let _ = guard.call(|| Err("boom"));
    let _ = guard.call(|| Err("boom"));
    let _ = guard.call(|| Err("boom"));

    // Open: invocations are rejected without reaching the target.
    let calls = AtomicUsize::new(0);
    clock.set_millis(999);
    let rejected = guard.call(|| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok("unreachable")
    });
    assert!(matches!(
        rejected,
        Err(GuardError::CircuitBreakerOpen { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(prevented.load(Ordering::SeqCst), 1);

    // Past the delay, the trial is admitted; two successes close the
    // breaker again.
    clock.set_millis(1001);
    guard.call(|| Ok("trial")).unwrap();
    guard.call(|| Ok("trial")).unwrap();
    guard.call(|| Ok("closed again")).unwrap();
}

#[test]
fn named_breakers_are_maintained_process_wide() {
    let changes = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&changes);

    let guard: Guard<u32, &'static str> = Guard::builder()
        .with_circuit_breaker()
        .name("pipeline-maintained")
        .request_volume_threshold(2)
        .failure_ratio(0.1)
        .delay(Duration::from_secs(60))
        .done()
        .build()
        .unwrap();

    CircuitBreakerMaintenance::on_state_change("pipeline-maintained", move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    assert_eq!(
        CircuitBreakerMaintenance::current_state("pipeline-maintained").unwrap(),
        CircuitState::Closed
    );

    let _ = guard.call(|| Err("boom"));
    let _ = guard.call(|| Err("boom"));
    assert_eq!(
        CircuitBreakerMaintenance::current_state("pipeline-maintained").unwrap(),
        CircuitState::Open
    );
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    // Reset restores a closed breaker with a forgotten window: two more
    // outcomes are needed before it can open again.
    CircuitBreakerMaintenance::reset_all();
    assert_eq!(
        CircuitBreakerMaintenance::current_state("pipeline-maintained").unwrap(),
        CircuitState::Closed
    );
    let _ = guard.call(|| Err("boom"));
    assert_eq!(
        CircuitBreakerMaintenance::current_state("pipeline-maintained").unwrap(),
        CircuitState::Closed
    );
}

#[test]
fn duplicate_breaker_names_fail_the_build() {
    let first: Result<Guard<u32, &'static str>, _> = Guard::builder()
        .with_circuit_breaker()
        .name("pipeline-duplicate")
        .done()
        .build();
    assert!(first.is_ok());

    let second: Result<Guard<u32, &'static str>, _> = Guard::builder()
        .with_circuit_breaker()
        .name("pipeline-duplicate")
        .done()
        .build();
    assert!(second.is_err());
}
