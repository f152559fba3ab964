//! Configuration module for the adaptive fetcher
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; a missing file section falls back to the defaults
//! the controller was tuned with.
//!
//! # Example
//!
//! ```no_run
//! use adaptive_fetcher::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("fetcher.toml")).unwrap();
//! println!("Starting at {} requests/sec", config.rate.initial_rate);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetchConfig, RateConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};

pub use validation::{validate_rate_config, validate_target_url};

pub(crate) use validation::validate_rate;
