//! Circuit breaker strategy for faultguard.
//!
//! The breaker watches a rolling window of recent outcomes. While closed,
//! it opens as soon as the full window's failure ratio exceeds the
//! configured threshold; while open, every invocation is rejected with
//! [`GuardError::CircuitBreakerOpen`](faultguard_core::GuardError) until
//! the delay elapses, after which trial invocations probe the target. A
//! failed trial reopens the breaker and restarts the delay; enough
//! consecutive successful trials close it and reset the window.
//!
//! Breakers given a [`name`](CircuitBreakerConfigBuilder::name) are
//! additionally registered with the process-wide
//! [`CircuitBreakerMaintenance`] surface, which can inspect, observe and
//! reset them; duplicate names are rejected when the pipeline is built.

pub mod breaker;
pub mod config;
pub mod events;
pub mod maintenance;
pub mod strategy;
mod window;

pub use breaker::{CircuitBreaker, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use events::CircuitBreakerEvent;
pub use maintenance::CircuitBreakerMaintenance;
pub use strategy::{AsyncCircuitBreaker, SyncCircuitBreaker};
