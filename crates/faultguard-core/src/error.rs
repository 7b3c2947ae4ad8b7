//! Error types shared by every faultguard strategy.
//!
//! [`GuardError<E>`] is the single error type flowing out of a guarded
//! pipeline. Strategy-originated failures (timeout, open circuit breaker,
//! bulkhead rejection, exceeded rate limit, executor rejection,
//! interruption) each get their own variant; failures of the guarded
//! action itself are wrapped in [`GuardError::Application`]. Outer
//! strategies classify both kinds uniformly, so a retry can be configured
//! to retry on a timeout raised by an inner timeout strategy just as it
//! would retry on an application error.

use std::fmt;

/// The error produced by a guarded invocation.
///
/// # Type Parameters
///
/// - `E`: the error type of the guarded action
#[derive(Debug, Clone)]
pub enum GuardError<E> {
    /// The invocation did not complete within the configured duration.
    Timeout {
        /// Description of the guarded invocation, used in the message.
        description: String,
    },

    /// A circuit breaker is open and prevented the invocation.
    CircuitBreakerOpen {
        /// Circuit breaker name, if one was configured.
        name: Option<String>,
    },

    /// A bulkhead was at capacity (and, for async pipelines, its queue
    /// was full).
    BulkheadRejected {
        /// Maximum concurrent invocations allowed.
        max_concurrent: usize,
    },

    /// A rate limit rejected the invocation.
    RateLimited,

    /// The async executor refused to accept the offloaded invocation.
    ExecutionRejected,

    /// The invocation was interrupted or cancelled.
    Interrupted,

    /// The guarded action itself failed.
    Application(E),
}

/// Discriminant of a [`GuardError`], used by fault matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// See [`GuardError::Timeout`].
    Timeout,
    /// See [`GuardError::CircuitBreakerOpen`].
    CircuitBreakerOpen,
    /// See [`GuardError::BulkheadRejected`].
    BulkheadRejected,
    /// See [`GuardError::RateLimited`].
    RateLimited,
    /// See [`GuardError::ExecutionRejected`].
    ExecutionRejected,
    /// See [`GuardError::Interrupted`].
    Interrupted,
    /// See [`GuardError::Application`].
    Application,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::Timeout => "timeout",
            FaultKind::CircuitBreakerOpen => "circuit breaker open",
            FaultKind::BulkheadRejected => "bulkhead rejected",
            FaultKind::RateLimited => "rate limited",
            FaultKind::ExecutionRejected => "execution rejected",
            FaultKind::Interrupted => "interrupted",
            FaultKind::Application => "application",
        };
        f.write_str(name)
    }
}

impl<E> GuardError<E> {
    /// Returns the kind of this error.
    pub fn kind(&self) -> FaultKind {
        match self {
            GuardError::Timeout { .. } => FaultKind::Timeout,
            GuardError::CircuitBreakerOpen { .. } => FaultKind::CircuitBreakerOpen,
            GuardError::BulkheadRejected { .. } => FaultKind::BulkheadRejected,
            GuardError::RateLimited => FaultKind::RateLimited,
            GuardError::ExecutionRejected => FaultKind::ExecutionRejected,
            GuardError::Interrupted => FaultKind::Interrupted,
            GuardError::Application(_) => FaultKind::Application,
        }
    }

    /// Returns `true` if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, GuardError::Timeout { .. })
    }

    /// Returns `true` if this is a circuit breaker rejection.
    pub fn is_circuit_breaker_open(&self) -> bool {
        matches!(self, GuardError::CircuitBreakerOpen { .. })
    }

    /// Returns `true` if this is a bulkhead rejection.
    pub fn is_bulkhead_rejected(&self) -> bool {
        matches!(self, GuardError::BulkheadRejected { .. })
    }

    /// Returns `true` if this is a rate limit rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GuardError::RateLimited)
    }

    /// Returns `true` if the invocation was interrupted or cancelled.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, GuardError::Interrupted)
    }

    /// Returns `true` if this wraps an error of the guarded action.
    pub fn is_application(&self) -> bool {
        matches!(self, GuardError::Application(_))
    }

    /// Extracts the application error, if this is an `Application` variant.
    pub fn application_error(self) -> Option<E> {
        match self {
            GuardError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the application error using a function.
    pub fn map_application<F, T>(self, f: F) -> GuardError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            GuardError::Timeout { description } => GuardError::Timeout { description },
            GuardError::CircuitBreakerOpen { name } => GuardError::CircuitBreakerOpen { name },
            GuardError::BulkheadRejected { max_concurrent } => {
                GuardError::BulkheadRejected { max_concurrent }
            }
            GuardError::RateLimited => GuardError::RateLimited,
            GuardError::ExecutionRejected => GuardError::ExecutionRejected,
            GuardError::Interrupted => GuardError::Interrupted,
            GuardError::Application(e) => GuardError::Application(f(e)),
        }
    }
}

impl<E> fmt::Display for GuardError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::Timeout { description } => write!(f, "{} timed out", description),
            GuardError::CircuitBreakerOpen { name } => match name {
                Some(n) => write!(f, "circuit breaker '{}' is open", n),
                None => write!(f, "circuit breaker is open"),
            },
            GuardError::BulkheadRejected { max_concurrent } => {
                write!(f, "bulkhead full ({} concurrent invocations)", max_concurrent)
            }
            GuardError::RateLimited => write!(f, "rate limit exceeded"),
            GuardError::ExecutionRejected => write!(f, "async executor rejected the invocation"),
            GuardError::Interrupted => write!(f, "invocation was interrupted"),
            GuardError::Application(e) => write!(f, "{}", e),
        }
    }
}

impl<E> std::error::Error for GuardError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuardError::Application(e) => Some(e),
            _ => None,
        }
    }
}

/// A fault-tolerance pipeline was defined incorrectly.
///
/// Raised at build time, never during an invocation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DefinitionError {
    /// A circuit breaker name was registered twice.
    #[error("circuit breaker name '{0}' is already in use")]
    DuplicateCircuitBreakerName(String),

    /// A maintenance operation referred to a name that was never registered.
    #[error("no circuit breaker named '{0}' is registered")]
    UnknownCircuitBreaker(String),

    /// Two fallback handlers were registered for the same error shape.
    #[error("a fallback handler for {0} is already registered")]
    DuplicateFallbackHandler(String),

    /// A strategy parameter was out of its valid range.
    #[error("invalid {strategy} configuration: {message}")]
    InvalidConfiguration {
        /// The strategy that rejected its configuration.
        strategy: &'static str,
        /// Why the configuration was rejected.
        message: String,
    },
}
