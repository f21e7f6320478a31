//! Output module for reporting index statistics
//!
//! This module handles:
//! - Rolling up totals and per-site details from storage
//! - Printing them for the command line

pub mod stats;

pub use stats::{load_statistics, print_statistics, SiteStatistics, Statistics, TotalStatistics};
