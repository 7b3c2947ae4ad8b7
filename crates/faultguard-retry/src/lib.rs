//! Retry strategy for faultguard.
//!
//! Re-invokes the inner pipeline on classified failures, up to
//! `max_retries` extra attempts and within a total `max_duration` budget.
//! Faults matching `abort_on` (and interruptions) are never retried;
//! faults not matching `retry_on` propagate unchanged. Delays between
//! attempts come from a pluggable [`Backoff`] schedule — constant,
//! exponential, Fibonacci, or custom — with optional uniform jitter.
//!
//! Synchronous pipelines sleep the calling thread between attempts
//! (waking early on interruption); asynchronous pipelines suspend on the
//! tokio timer instead.

pub mod backoff;
pub mod config;
pub mod events;
pub mod strategy;

pub use backoff::{Backoff, ConstantBackoff, CustomBackoff, ExponentialBackoff, FibonacciBackoff};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use strategy::{AsyncRetry, SyncRetry};
