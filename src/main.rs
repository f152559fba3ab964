//! Adaptive Fetcher main entry point
//!
//! This is the command-line interface: it fetches one URL over and over,
//! letting the controller tune the request rate, until interrupted.

use adaptive_fetcher::config::{load_config, validate_target_url, Config};
use adaptive_fetcher::fetcher::{run_fetch_loop, AdaptiveFetchController, HttpFetcher};
use adaptive_fetcher::output::print_statistics;
use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Adaptive Fetcher: fetch a URL repeatedly at a self-tuning rate
///
/// The request rate starts at the configured initial rate and follows the
/// server's response times: slow responses back off, fast ones speed up.
#[derive(Parser, Debug)]
#[command(name = "adaptive-fetcher")]
#[command(version)]
#[command(about = "Fetch a URL repeatedly at a latency-tuned rate", long_about = None)]
struct Cli {
    /// URL to fetch (overrides [fetch] url from the config file)
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this many fetch cycles (runs until Ctrl-C otherwise)
    #[arg(short = 'n', long, value_name = "N")]
    cycles: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    let url = cli
        .url
        .clone()
        .or_else(|| config.fetch.url.clone())
        .ok_or_else(|| anyhow!("No URL given: pass one on the command line or set [fetch] url"))?;
    validate_target_url(&url)?;

    tracing::info!(
        "Rate: initial {}/s, bounds [{}, {}], factor {}, dead band [{}ms, {}ms]",
        config.rate.initial_rate,
        config.rate.min_rate,
        config.rate.max_rate,
        config.rate.adjustment_factor,
        config.rate.fast_threshold_ms,
        config.rate.slow_threshold_ms
    );

    let fetcher = HttpFetcher::from_config(&config)?;
    let controller = AdaptiveFetchController::new(config.rate.clone(), fetcher)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current cycle");
            let _ = shutdown_tx.send(true);
        }
    });

    let stats = run_fetch_loop(&controller, &url, cli.cycles, shutdown_rx).await;

    if !cli.quiet {
        println!();
        print_statistics(&stats);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("adaptive_fetcher=info,warn"),
            1 => EnvFilter::new("adaptive_fetcher=debug,info"),
            2 => EnvFilter::new("adaptive_fetcher=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
