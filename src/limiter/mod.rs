//! Permit issuing for outbound requests
//!
//! This module provides the rate limiter that gates every fetch.
//!
//! # Components
//!
//! - `RateLimiter`: Issues permits no closer together than `1 / rate` seconds
//! - `Cancelled`: Returned when a shutdown signal interrupts a pending acquire

mod rate_limiter;

// Re-export main types
pub use rate_limiter::{Cancelled, RateLimiter};
