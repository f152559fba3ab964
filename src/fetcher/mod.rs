//! Fetcher module for rate-controlled document retrieval
//!
//! This module contains the fetch-side logic, including:
//! - The adaptive controller that ties fetches to the rate limiter
//! - The latency-driven rate adjustment rule
//! - An HTTP fetch collaborator
//! - A driver loop for continuous fetching

mod controller;
mod driver;
mod http;

pub use controller::{adjusted_rate, AdaptiveFetchController, Fetch, FetchOutcome, RateAdjustment};
pub use driver::run_fetch_loop;
pub use http::{build_http_client, fetch_page, HttpFetcher, Page};
