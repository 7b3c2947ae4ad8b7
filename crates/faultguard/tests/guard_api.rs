//! Public surface behaviors: adaptation, rate limiting through the
//! pipeline, interruption discipline, the strategy cache.

use std::sync::Arc;
use std::time::Duration;

use faultguard::{
    Guard, GuardError, InterceptionPoint, ManualStopwatch, StrategyCache, WindowType,
};

#[test]
fn adapted_actions_behave_like_direct_calls() {
    let guard: Guard<u32, &'static str> = Guard::builder()
        .with_timeout()
        .duration(Duration::from_secs(5))
        .done()
        .with_fallback()
        .handler(|| Ok(0))
        .done()
        .build()
        .unwrap();

    assert_eq!(guard.call(|| Ok(41)).unwrap(), 41);
    let mut bound = guard.adapt(|| Ok(41));
    assert_eq!(bound().unwrap(), 41);

    assert_eq!(guard.call(|| Err("boom")).unwrap(), 0);
    let mut failing = guard.adapt(|| Err("boom"));
    assert_eq!(failing().unwrap(), 0);
}

#[test]
fn smooth_rate_limit_admits_at_the_configured_rate() {
    let clock = ManualStopwatch::new();
    let guard: Guard<u32, &'static str> = Guard::builder()
        .stopwatch(Arc::new(clock.clone()))
        .with_rate_limit()
        .max_invocations(2)
        .window(Duration::from_millis(100))
        .window_type(WindowType::Smooth)
        .done()
        .build()
        .unwrap();

    let permit = |guard: &Guard<u32, &'static str>| guard.call(|| Ok(1)).is_ok();

    assert!(permit(&guard));
    assert!(!permit(&guard));

    clock.set_millis(50);
    assert!(permit(&guard));
    assert!(!permit(&guard));

    clock.set_millis(100);
    assert!(permit(&guard));
    assert!(!permit(&guard));
}

#[test]
fn rejected_rate_limit_attempts_surface_as_rate_limited() {
    let guard: Guard<u32, &'static str> = Guard::builder()
        .with_rate_limit()
        .max_invocations(1)
        .window(Duration::from_secs(3600))
        .done()
        .build()
        .unwrap();

    guard.call(|| Ok(1)).unwrap();
    assert!(matches!(
        guard.call(|| Ok(1)),
        Err(GuardError::RateLimited)
    ));
}

#[test]
fn interrupt_flag_is_cleared_on_every_exit_path() {
    let guard: Guard<&'static str, &'static str> = Guard::builder().build().unwrap();

    // Another thread interrupts a cooperative action; the invocation
    // fails with Interrupted and the token comes back cleared.
    let token = faultguard::InterruptToken::new();
    let interrupter = token.clone();
    let waiter = token.clone();
    let background = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        interrupter.interrupt();
    });
    let result = guard.call_with_token(&token, move || {
        waiter.wait_for(Duration::from_secs(30));
        Ok("finished anyway")
    });
    background.join().unwrap();
    assert!(matches!(result, Err(GuardError::Interrupted)));
    assert!(!token.is_interrupted());

    // An interrupt raised during a successful invocation still turns the
    // outcome into Interrupted, and the flag is cleared again.
    let token = faultguard::InterruptToken::new();
    let raiser = token.clone();
    let result = guard.call_with_token(&token, move || {
        raiser.interrupt();
        Ok("value")
    });
    assert!(matches!(result, Err(GuardError::Interrupted)));
    assert!(!token.is_interrupted());
}

#[test]
fn strategy_cache_shares_one_pipeline_per_interception_point() {
    let cache = StrategyCache::new();

    let build = || {
        Guard::<u32, &'static str>::builder()
            .with_rate_limit()
            .max_invocations(1)
            .window(Duration::from_secs(3600))
            .done()
            .build()
    };

    let first = cache
        .get_or_create(InterceptionPoint::new("OrderService", "submit"), build)
        .unwrap();
    let second = cache
        .get_or_create(InterceptionPoint::new("OrderService", "submit"), build)
        .unwrap();

    // Both handles reach the same rate limit state: one permitted
    // invocation total, not one per handle.
    assert!(first.call(|| Ok(1)).is_ok());
    assert!(matches!(
        second.call(|| Ok(1)),
        Err(GuardError::RateLimited)
    ));

    // A different interception point builds fresh state.
    let other = cache
        .get_or_create(InterceptionPoint::new("OrderService", "cancel"), build)
        .unwrap();
    assert!(other.call(|| Ok(1)).is_ok());
}
