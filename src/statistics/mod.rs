//! Streaming aggregates over cubes
//!
//! # Organization
//!
//! - [`stats_info`]: combinable summary statistics
//! - [`diff_info`]: statistics of the difference between two cubes
//! - [`histogram`]: equal-width histograms and their ASCII rendering
//! - [`files`]: out-of-core drivers over raw files

pub mod diff_info;
pub mod files;
pub mod histogram;
pub mod stats_info;

pub use diff_info::{DiffInfo, DiffOptions, DEFAULT_EPSILON};
pub use files::{
    diff_files, diff_files_with_progress, histogram_file, stats_file, stats_file_with_progress,
};
pub use histogram::{histogram_lines, Histogram, HistogramMode};
pub use stats_info::{Extreme, StatsInfo};
