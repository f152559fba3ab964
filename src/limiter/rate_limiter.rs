use crate::config::validate_rate;
use crate::RateError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Upper bound on the spacing between two permits
const MAX_PERMIT_INTERVAL: Duration = Duration::from_secs(86400 * 365 * 30);

/// A pending acquire was interrupted by the shutdown signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("permit acquisition cancelled by shutdown")]
pub struct Cancelled;

/// Mutable limiter state, always accessed under one lock
#[derive(Debug)]
struct LimiterState {
    /// Permits per second
    rate: f64,

    /// Issue time of the most recently granted (or reserved) permit
    last_issue: Option<Instant>,
}

/// A permit slot claimed by one caller
#[derive(Debug, Clone, Copy)]
struct Reservation {
    issue_at: Instant,
    requested_at: Instant,
    previous: Option<Instant>,
}

impl Reservation {
    fn is_ready(&self) -> bool {
        self.issue_at <= self.requested_at
    }

    fn wait(&self) -> Duration {
        self.issue_at.saturating_duration_since(self.requested_at)
    }
}

/// Issues permits at a configurable, adjustable rate
///
/// Each permit is issued no earlier than `previous_issue + 1 / rate`, where
/// `rate` is the value in effect when the permit is requested. There is no
/// burst credit: an idle limiter hands out one immediate permit, after which
/// the spacing applies again.
///
/// The rate and the last issue time sit behind a single mutex that is never
/// held across an await point, so the limiter can be shared freely between
/// tasks and threads.
///
/// # Example
///
/// ```no_run
/// use adaptive_fetcher::RateLimiter;
///
/// # async fn run() {
/// let limiter = RateLimiter::new(4.0).unwrap();
/// limiter.acquire().await; // immediate
/// limiter.acquire().await; // ~250ms later
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Creates a limiter issuing `rate` permits per second
    ///
    /// # Returns
    ///
    /// * `Ok(RateLimiter)` - The limiter, with no permits issued yet
    /// * `Err(RateError)` - `rate` is not finite or not greater than zero
    pub fn new(rate: f64) -> Result<Self, RateError> {
        validate_rate("rate", rate)?;

        Ok(Self {
            state: Mutex::new(LimiterState {
                rate,
                last_issue: None,
            }),
        })
    }

    /// Returns the current rate in permits per second
    pub fn rate(&self) -> f64 {
        self.lock().rate
    }

    /// Sets the rate used for permits requested from now on
    ///
    /// Permits already granted or reserved keep their issue times.
    pub fn set_rate(&self, rate: f64) -> Result<(), RateError> {
        validate_rate("rate", rate)?;
        self.lock().rate = rate;
        Ok(())
    }

    /// Atomically replaces the rate with `f(current)`
    ///
    /// The read, the computation and the write happen under the limiter's
    /// lock, so concurrent updates are never lost. If `f` yields an invalid
    /// rate, the stored rate is left untouched.
    ///
    /// # Returns
    ///
    /// * `Ok((old, new))` - The rate before and after the update
    /// * `Err(RateError)` - `f` produced a non-positive or non-finite rate
    pub fn update_rate<F>(&self, f: F) -> Result<(f64, f64), RateError>
    where
        F: FnOnce(f64) -> f64,
    {
        let mut state = self.lock();
        let old = state.rate;
        let new = f(old);
        validate_rate("rate", new)?;
        state.rate = new;
        Ok((old, new))
    }

    /// Waits until a permit is available and consumes it
    ///
    /// Returns how long the caller was made to wait.
    pub async fn acquire(&self) -> Duration {
        let reservation = self.reserve();
        if reservation.is_ready() {
            return Duration::ZERO;
        }

        sleep_until(reservation.issue_at).await;
        reservation.wait()
    }

    /// Like [`acquire`](Self::acquire), but gives up when `shutdown` becomes `true`
    ///
    /// A cancelled caller hands its slot back unless another caller has
    /// already queued behind it. If the shutdown sender is dropped, the wait
    /// simply runs to completion.
    ///
    /// # Returns
    ///
    /// * `Ok(Duration)` - A permit was consumed after waiting this long
    /// * `Err(Cancelled)` - Shutdown was signalled before the permit was issued
    pub async fn acquire_or_shutdown(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Duration, Cancelled> {
        if *shutdown.borrow() {
            return Err(Cancelled);
        }

        let reservation = self.reserve();
        if reservation.is_ready() {
            return Ok(Duration::ZERO);
        }

        let stopped = tokio::select! {
            _ = sleep_until(reservation.issue_at) => false,
            signalled = async { shutdown.wait_for(|stop| *stop).await.is_ok() } => signalled,
        };

        if stopped {
            self.release(&reservation);
            tracing::debug!("Permit wait cancelled by shutdown");
            return Err(Cancelled);
        }

        // Sender dropped mid-wait: nobody can cancel us anymore
        sleep_until(reservation.issue_at).await;
        Ok(reservation.wait())
    }

    /// Claims the next permit slot under the current rate
    fn reserve(&self) -> Reservation {
        let now = Instant::now();
        let mut state = self.lock();

        let issue_at = match state.last_issue {
            Some(last) => next_issue(last, state.rate).max(now),
            None => now,
        };
        let previous = state.last_issue.replace(issue_at);

        tracing::trace!(
            rate = state.rate,
            wait_ms = issue_at.saturating_duration_since(now).as_millis() as u64,
            "Reserved permit"
        );

        Reservation {
            issue_at,
            requested_at: now,
            previous,
        }
    }

    /// Returns an unused slot if it is still the newest one
    fn release(&self, reservation: &Reservation) {
        let mut state = self.lock();
        if state.last_issue == Some(reservation.issue_at) {
            state.last_issue = reservation.previous;
        }
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Minimum spacing between permits at `rate`
fn permit_interval(rate: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / rate)
        .map(|interval| interval.min(MAX_PERMIT_INTERVAL))
        .unwrap_or(MAX_PERMIT_INTERVAL)
}

/// Earliest issue time following a permit issued at `last`
fn next_issue(last: Instant, rate: f64) -> Instant {
    last + permit_interval(rate)
}
