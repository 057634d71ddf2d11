//! Output module for reporting on the archive
//!
//! This module handles:
//! - Recording archive statistics
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};
