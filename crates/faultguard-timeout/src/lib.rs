//! Timeout strategy for faultguard.
//!
//! Enforces that the inner invocation completes within a configured
//! duration.
//!
//! Synchronous pipelines schedule a watcher on the process-wide timer
//! thread. When the watcher fires it raises the invocation's interrupt
//! token (cooperative targets can observe it and bail out early); once
//! the inner invocation returns, a fired watcher always yields
//! [`GuardError::Timeout`](faultguard_core::GuardError) — even if the
//! inner returned a value in the meantime — and the interrupt flag is
//! cleared before the strategy returns.
//!
//! Asynchronous pipelines race the inner future against a tokio timer;
//! whichever resolves first wins, and the loser is dropped.

pub mod config;
pub mod events;
mod execution;
pub mod strategy;

pub use config::{TimeoutConfig, TimeoutConfigBuilder};
pub use events::TimeoutEvent;
pub use strategy::{AsyncTimeout, SyncTimeout};
