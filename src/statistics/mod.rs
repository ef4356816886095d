//! Zonal and depth reductions
//!
//! This module turns gridded rasters into scalar time series.
//!
//! # Organization
//!
//! - [`operations`]: NaN-skipping mean and the trapezoidal rule
//! - [`parallel`]: per-time-step reductions on the rayon pool
//! - [`zonal`]: zone selection, depth slicing and depth integration
//! - [`resample`]: calendar-week aggregation

pub mod operations;
pub mod parallel;
pub mod resample;
pub mod zonal;

pub use operations::{nan_mean, trapezoid};
pub use parallel::{parallel_depth_integral, parallel_spatial_mean};
pub use resample::{resample_series_weekly, resample_weekly, week_ending, WeeklyBins};
pub use zonal::{depth_integrated, depth_sliced, select_zone, zonal_mean, DepthTarget};
