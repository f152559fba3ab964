//! Adaptive fetch controller
//!
//! Runs one fetch cycle at a time: acquire a permit, fetch, measure the
//! round trip, and feed the latency back into the limiter's rate.

use crate::config::{validate_rate_config, RateConfig};
use crate::limiter::RateLimiter;
use crate::{FetchError, FetcherError, RateError};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

/// Something that can retrieve a document by URL
///
/// The payload is opaque to the controller; only the time the call takes
/// matters for rate control.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// What a successful fetch produces
    type Payload: Send;

    /// Fetches `url`, returning the payload or the reason it failed
    async fn fetch(&self, url: &str) -> Result<Self::Payload, FetchError>;
}

/// Result of one successful fetch cycle
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<P> {
    /// Whatever the fetch collaborator returned
    pub payload: P,

    /// Wall-clock duration of the fetch call (milliseconds)
    pub elapsed_ms: u64,
}

/// Decision taken by the rate adjustment rule for one latency sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateAdjustment {
    /// Response was slower than the slow threshold and the rate dropped
    Decreased { from: f64, to: f64 },

    /// Response was faster than the fast threshold and the rate rose
    Increased { from: f64, to: f64 },

    /// Response fell inside the dead band, or the rate was already at the
    /// bound it was pushed towards
    Unchanged { rate: f64 },
}

impl RateAdjustment {
    /// The rate in effect after this adjustment
    pub fn rate(&self) -> f64 {
        match *self {
            RateAdjustment::Decreased { to, .. } | RateAdjustment::Increased { to, .. } => to,
            RateAdjustment::Unchanged { rate } => rate,
        }
    }
}

/// Computes the next rate for a latency sample
///
/// | Latency | New rate |
/// |---------|----------|
/// | `> slow_threshold_ms` | `max(min_rate, rate - rate * factor)` |
/// | `< fast_threshold_ms` | `min(max_rate, rate + rate * factor)` |
/// | otherwise | `rate` |
///
/// Both thresholds belong to the dead band. The clamp is applied after the
/// multiplicative step.
pub fn adjusted_rate(config: &RateConfig, rate: f64, elapsed_ms: u64) -> f64 {
    if elapsed_ms > config.slow_threshold_ms {
        config
            .min_rate
            .max(rate - rate * config.adjustment_factor)
    } else if elapsed_ms < config.fast_threshold_ms {
        config
            .max_rate
            .min(rate + rate * config.adjustment_factor)
    } else {
        rate
    }
}

/// Fetches through a rate limiter whose rate follows observed latency
///
/// The controller has no loop of its own; callers drive it one cycle at a
/// time (see [`run_fetch_loop`](crate::fetcher::run_fetch_loop)). All methods
/// take `&self`, so one controller can be shared by many tasks behind an
/// `Arc`.
pub struct AdaptiveFetchController<F> {
    limiter: RateLimiter,
    fetcher: F,
    config: RateConfig,
}

impl<F: Fetch> AdaptiveFetchController<F> {
    /// Creates a controller starting at `config.initial_rate`
    ///
    /// # Returns
    ///
    /// * `Ok(AdaptiveFetchController)` - Ready to fetch
    /// * `Err(RateError)` - The rate settings are unusable
    pub fn new(config: RateConfig, fetcher: F) -> Result<Self, RateError> {
        validate_rate_config(&config)?;
        let limiter = RateLimiter::new(config.initial_rate)?;

        Ok(Self {
            limiter,
            fetcher,
            config,
        })
    }

    /// Runs one fetch cycle
    ///
    /// Waits for a permit, fetches `url`, and adjusts the rate from the
    /// measured latency. A failed fetch is returned unchanged and leaves the
    /// rate alone.
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome<F::Payload>, FetchError> {
        let waited = self.limiter.acquire().await;
        tracing::trace!("Permit for {} after {:?}", url, waited);
        self.fetch_permitted(url).await
    }

    /// Runs one fetch cycle unless `shutdown` fires while waiting for a permit
    ///
    /// # Returns
    ///
    /// * `Ok(FetchOutcome)` - The fetch succeeded
    /// * `Err(FetcherError::Cancelled)` - Shutdown arrived before the permit; nothing was fetched
    /// * `Err(FetcherError::Fetch)` - The fetch collaborator failed
    pub async fn fetch_or_shutdown(
        &self,
        url: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<FetchOutcome<F::Payload>, FetcherError> {
        let waited = self.limiter.acquire_or_shutdown(shutdown).await?;
        tracing::trace!("Permit for {} after {:?}", url, waited);
        Ok(self.fetch_permitted(url).await?)
    }

    async fn fetch_permitted(&self, url: &str) -> Result<FetchOutcome<F::Payload>, FetchError> {
        let start = Instant::now();
        let result = self.fetcher.fetch(url).await;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(payload) => {
                self.adjust_rate(elapsed_ms);
                Ok(FetchOutcome {
                    payload,
                    elapsed_ms,
                })
            }
            Err(e) => {
                tracing::debug!("Fetch of {} failed after {}ms: {}", url, elapsed_ms, e);
                Err(e)
            }
        }
    }

    /// Feeds one latency sample into the rate
    ///
    /// The read, adjustment and write happen atomically with respect to
    /// other cycles sharing this controller.
    pub fn adjust_rate(&self, elapsed_ms: u64) -> RateAdjustment {
        let config = &self.config;
        let (from, to) = match self
            .limiter
            .update_rate(|rate| adjusted_rate(config, rate, elapsed_ms))
        {
            Ok(rates) => rates,
            Err(e) => {
                tracing::error!("Rejected rate adjustment for {}ms sample: {}", elapsed_ms, e);
                return RateAdjustment::Unchanged {
                    rate: self.limiter.rate(),
                };
            }
        };

        // A step clamped away entirely (already at a bound) counts as unchanged
        let adjustment = if to < from {
            RateAdjustment::Decreased { from, to }
        } else if to > from {
            RateAdjustment::Increased { from, to }
        } else {
            RateAdjustment::Unchanged { rate: to }
        };

        tracing::debug!(
            elapsed_ms,
            from,
            to,
            "Rate adjustment: {:?}",
            adjustment
        );

        adjustment
    }

    /// Current permit rate (requests per second)
    pub fn rate(&self) -> f64 {
        self.limiter.rate()
    }

    /// Overrides the current rate
    ///
    /// Only rates within `[min_rate, max_rate]` are accepted; anything else
    /// is rejected and the rate is left untouched.
    pub fn set_rate(&self, rate: f64) -> Result<(), RateError> {
        let (min, max) = (self.config.min_rate, self.config.max_rate);
        if !(min..=max).contains(&rate) {
            return Err(RateError::OutOfBounds { rate, min, max });
        }
        self.limiter.set_rate(rate)
    }

    /// The rate settings this controller was built with
    pub fn config(&self) -> &RateConfig {
        &self.config
    }

    /// The fetch collaborator
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}
