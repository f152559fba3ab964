//! Output module for reporting on a fetch run
//!
//! This module handles recording per-cycle results and printing a summary
//! once the run ends.

pub mod stats;

pub use stats::{print_statistics, FetchStatistics};
