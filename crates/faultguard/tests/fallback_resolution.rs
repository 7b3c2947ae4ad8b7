//! Fallback handler resolution through the public pipeline.

use std::fmt;

use faultguard::{FaultKind, FaultMatcher, Guard, GuardError};

#[derive(Debug)]
enum ServiceError {
    BadArgument,
    Unavailable { cause: SocketError },
}

#[derive(Debug)]
struct SocketError;

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::BadArgument => write!(f, "bad argument"),
            ServiceError::Unavailable { .. } => write!(f, "unavailable"),
        }
    }
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket closed")
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::BadArgument => None,
            ServiceError::Unavailable { cause } => Some(cause),
        }
    }
}

impl std::error::Error for SocketError {}

fn guard() -> Guard<&'static str, ServiceError> {
    Guard::builder()
        .with_fallback()
        .handler_for(FaultMatcher::source_type::<ServiceError>(), |fault| {
            match fault {
                GuardError::Application(ServiceError::BadArgument) => Ok("bad argument handled"),
                _ => Ok("service error handled"),
            }
        })
        .handler_for(FaultMatcher::kind(FaultKind::Timeout), |_| {
            Ok("timeout handled")
        })
        .done()
        .build()
        .unwrap()
}

#[test]
fn the_same_fault_shape_always_selects_the_same_handler() {
    let guard = guard();
    for _ in 0..3 {
        let outcome = guard.call(|| Err(ServiceError::BadArgument)).unwrap();
        assert_eq!(outcome, "bad argument handled");
    }
}

#[test]
fn faults_with_no_candidate_are_rethrown() {
    // No catch-all is registered, and a bulkhead rejection matches
    // neither candidate.
    let guard: Guard<&'static str, ServiceError> = Guard::builder()
        .with_bulkhead()
        .max_concurrent(1)
        .done()
        .with_fallback()
        .handler_for(FaultMatcher::kind(FaultKind::Timeout), |_| {
            Ok("timeout handled")
        })
        .done()
        .build()
        .unwrap();

    let result = guard.call(|| Err(ServiceError::BadArgument));
    assert!(matches!(result, Err(GuardError::Application(_))));
}

#[test]
fn cause_chain_matching_is_a_pipeline_switch() {
    let strict: Guard<&'static str, ServiceError> = Guard::builder()
        .with_fallback()
        .handler_for(FaultMatcher::source_type::<SocketError>(), |_| {
            Ok("socket fallback")
        })
        .done()
        .build()
        .unwrap();

    // The socket error is only the cause, not the thrown error; the
    // strict pipeline rethrows.
    let result = strict.call(|| {
        Err(ServiceError::Unavailable {
            cause: SocketError,
        })
    });
    assert!(matches!(result, Err(GuardError::Application(_))));

    let deep: Guard<&'static str, ServiceError> = Guard::builder()
        .inspect_cause_chain(true)
        .with_fallback()
        .handler_for(FaultMatcher::source_type::<SocketError>(), |_| {
            Ok("socket fallback")
        })
        .done()
        .build()
        .unwrap();

    let outcome = deep
        .call(|| {
            Err(ServiceError::Unavailable {
                cause: SocketError,
            })
        })
        .unwrap();
    assert_eq!(outcome, "socket fallback");
}

#[test]
fn skip_on_beats_apply_on() {
    let guard: Guard<&'static str, ServiceError> = Guard::builder()
        .with_fallback()
        .skip_on(FaultMatcher::source_type::<ServiceError>())
        .handler(|| Ok("never used"))
        .done()
        .build()
        .unwrap();

    let result = guard.call(|| Err(ServiceError::BadArgument));
    assert!(matches!(result, Err(GuardError::Application(_))));
}

#[test]
fn duplicate_handlers_for_one_error_type_fail_the_build() {
    let result: Result<Guard<&'static str, ServiceError>, _> = Guard::builder()
        .with_fallback()
        .handler_for(FaultMatcher::source_type::<ServiceError>(), |_| Ok("a"))
        .handler_for(FaultMatcher::source_type::<ServiceError>(), |_| Ok("b"))
        .done()
        .build();
    assert!(result.is_err());
}
