//! Fallback strategy for faultguard.
//!
//! When the inner pipeline fails, a fallback substitutes the outcome.
//! Activation follows the shared classification rules: faults matching
//! `skip_on` are rethrown, faults matching `apply_on` (by default, all of
//! them) activate the fallback, and when the pipeline enables cause-chain
//! inspection the same two checks are repeated over the application
//! error's source chain before giving up.
//!
//! An activated fallback then resolves a handler: typed candidates
//! (registered with [`FallbackConfigBuilder::handler_for`]) are consulted
//! in registration order and the first match wins, the untyped catch-all
//! handles the rest, and with no match at all the original fault
//! propagates as if no fallback were declared. Registering two candidates
//! for the same error type or fault kind fails the pipeline build.

pub mod candidates;
pub mod config;
pub mod events;
pub mod strategy;

pub use config::{
    async_handler, async_handler_with_fault, sync_handler, sync_handler_with_fault,
    AsyncFallbackConfig, AsyncHandler, FallbackConfig, FallbackConfigBuilder, SyncFallbackConfig,
    SyncHandler,
};
pub use events::FallbackEvent;
pub use strategy::{AsyncFallback, SyncFallback};
