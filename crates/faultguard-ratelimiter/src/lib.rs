//! Rate limit strategy for faultguard.
//!
//! Bounds how many invocations are attempted per time window, with an
//! optional minimum spacing between consecutive attempts. Three window
//! types are available (see [`WindowType`]):
//!
//! - **Fixed**: the time axis is divided into intervals of the window
//!   length and a permit counter resets at each boundary. Every attempt
//!   consumes a permit and advances the spacing timestamp, rejected
//!   attempts included.
//! - **Rolling**: a sliding log of recent admission timestamps; an
//!   attempt is admitted while fewer than the maximum lie within the
//!   trailing window.
//! - **Smooth**: permits refill continuously at the configured rate and
//!   accumulate (up to the window size) during quiet periods, allowing
//!   short bursts without ever exceeding the rate over longer intervals.
//!
//! Rejected attempts fail with
//! [`GuardError::RateLimited`](faultguard_core::GuardError).

pub mod config;
pub mod events;
pub mod strategy;
mod window;

pub use config::{RateLimitConfig, RateLimitConfigBuilder, WindowType};
pub use events::RateLimitEvent;
pub use strategy::{AsyncRateLimit, SyncRateLimit};
