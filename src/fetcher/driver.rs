//! Fetch driver - repeats controller cycles until told to stop
//!
//! The controller only knows how to run a single cycle. This module owns the
//! loop around it:
//! - Stopping on a shutdown signal or after a fixed number of cycles
//! - Logging every outcome
//! - Carrying on past failed fetches
//! - Collecting run statistics

use crate::fetcher::{AdaptiveFetchController, Fetch};
use crate::output::FetchStatistics;
use crate::FetcherError;
use tokio::sync::watch;

/// How often (in cycles) a progress line is logged
const PROGRESS_INTERVAL: u64 = 10;

/// Repeatedly fetches `url` through `controller`
///
/// A failed fetch is logged and counted; the loop goes on. The loop ends when
/// `shutdown` becomes `true` (a pending permit wait is abandoned right away)
/// or after `max_cycles` cycles when a limit is given.
///
/// # Arguments
///
/// * `controller` - The adaptive controller to drive
/// * `url` - The URL fetched on every cycle
/// * `max_cycles` - Stop after this many cycles (`None` runs until shutdown)
/// * `shutdown` - Flips to `true` when the loop should stop
///
/// # Returns
///
/// Statistics for the run, already marked finished
pub async fn run_fetch_loop<F>(
    controller: &AdaptiveFetchController<F>,
    url: &str,
    max_cycles: Option<u64>,
    mut shutdown: watch::Receiver<bool>,
) -> FetchStatistics
where
    F: Fetch,
    F::Payload: AsRef<[u8]>,
{
    let mut stats = FetchStatistics::new(controller.rate());

    tracing::info!(
        "Starting fetch loop for {} at {:.3} requests/sec",
        url,
        controller.rate()
    );

    loop {
        if let Some(max) = max_cycles {
            if stats.cycles >= max {
                tracing::info!("Reached cycle limit of {}", max);
                break;
            }
        }

        if *shutdown.borrow() {
            tracing::info!("Shutdown requested, stopping");
            break;
        }

        match controller.fetch_or_shutdown(url, &mut shutdown).await {
            Ok(outcome) => {
                let bytes = outcome.payload.as_ref().len() as u64;
                let rate = controller.rate();
                stats.record_success(outcome.elapsed_ms, bytes, rate);

                tracing::info!(
                    "Fetched {} ({} bytes) in {}ms, rate now {:.3}/s",
                    url,
                    bytes,
                    outcome.elapsed_ms,
                    rate
                );
            }
            Err(FetcherError::Fetch(e)) => {
                stats.record_failure(&e, controller.rate());
                tracing::warn!("Fetch failed: {}", e);
            }
            Err(FetcherError::Cancelled(_)) => {
                tracing::info!("Shutdown requested while waiting for a permit, stopping");
                break;
            }
            Err(e) => {
                tracing::error!("Unexpected error in fetch loop: {}", e);
                break;
            }
        }

        if stats.cycles % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} cycles, {} ok, {} failed, rate {:.3}/s",
                stats.cycles,
                stats.successes,
                stats.failures,
                stats.final_rate
            );
        }
    }

    stats.finish();

    tracing::info!(
        "Fetch loop finished: {} cycles ({} ok, {} failed)",
        stats.cycles,
        stats.successes,
        stats.failures
    );

    stats
}
