//! Bulkhead strategy for faultguard.
//!
//! A bulkhead bounds the number of concurrent in-flight invocations.
//! Synchronous pipelines never wait: when no permit is available the
//! invocation fails immediately with
//! [`GuardError::BulkheadRejected`](faultguard_core::GuardError).
//! Asynchronous pipelines additionally queue up to `queue_size` waiting
//! invocations in strict FIFO order; a waiter is granted a permit the
//! moment one is released, and the permit itself is held until the inner
//! invocation resolves (or is cancelled), not merely until its future is
//! produced.
//!
//! ```
//! use faultguard_bulkhead::BulkheadConfig;
//!
//! let config = BulkheadConfig::builder()
//!     .max_concurrent(10)
//!     .queue_size(20)
//!     .name("downstream-calls")
//!     .on_rejected(|| eprintln!("bulkhead full"))
//!     .build();
//! ```

pub mod config;
pub mod events;
pub mod strategy;

pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use events::BulkheadEvent;
pub use strategy::{AsyncBulkhead, SyncBulkhead};
