//! Adaptive Fetcher: an HTTP fetcher that tunes its own request rate
//!
//! Every fetch is gated by a permit from a [`RateLimiter`]. After each
//! successful fetch the measured round-trip latency is fed back into the
//! limiter: slow responses back the rate off, fast responses speed it up, and
//! anything in between leaves it alone.

pub mod config;
pub mod fetcher;
pub mod limiter;
pub mod output;

use thiserror::Error;

/// Main error type for adaptive fetcher operations
#[derive(Debug, Error)]
pub enum FetcherError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Permit acquisition cancelled")]
    Cancelled(#[from] limiter::Cancelled),
}

/// Errors reported by a fetch collaborator
///
/// These are surfaced to the caller of a fetch cycle unchanged and never
/// feed back into the request rate.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Short label for grouping failures in statistics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::Connect { .. } => "connect",
            FetchError::Status { .. } => "status",
            FetchError::Http { .. } => "http",
            FetchError::Body { .. } => "body",
        }
    }
}

/// Invalid rate limiter settings
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("{name} must be a finite value greater than zero, got {value}")]
    NonPositiveRate { name: &'static str, value: f64 },

    #[error("min_rate ({min}) must not exceed max_rate ({max})")]
    InvertedBounds { min: f64, max: f64 },

    #[error("initial_rate ({initial}) must lie within [{min}, {max}]")]
    InitialOutOfBounds { initial: f64, min: f64, max: f64 },

    #[error("rate {rate} must lie within [{min}, {max}]")]
    OutOfBounds { rate: f64, min: f64, max: f64 },

    #[error("adjustment_factor must be within (0, 1), got {0}")]
    InvalidFactor(f64),

    #[error("fast_threshold_ms ({fast}) must not exceed slow_threshold_ms ({slow})")]
    InvertedThresholds { fast: u64, slow: u64 },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Rate(#[from] RateError),
}

// Re-export commonly used types
pub use config::{Config, RateConfig};
pub use fetcher::{AdaptiveFetchController, Fetch, FetchOutcome, HttpFetcher, RateAdjustment};
pub use limiter::RateLimiter;
