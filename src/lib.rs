//! bgc_zones: zonal biogeochemistry diagnostics for NetCDF ocean rasters
//!
//! Loads regional ocean biogeochemistry rasters (chlorophyll, nitrate, oxygen,
//! net primary production), subsets them to named economic zones, reduces them
//! to time series and classifies the result against configurable thresholds.
//!
//! ## Key Features
//!
//! - **File Discovery**: dates recovered from `YYYYMMDD` or `YYYYDDD` file names
//! - **Tolerant Loading**: fill values masked, unreadable files skipped, variable aliases
//! - **Zonal Reductions**: NaN-skipping means, depth slices, trapezoidal depth integrals
//! - **Weekly Resampling**: calendar weeks ending on Sunday
//! - **Diagnostics**: bloom anomaly, ecosystem health, yield forecast, upwelling, hypoxia
//! - **Parallel Processing**: per-time-step reductions on a Rayon pool
//!
//! ## Module Organization
//!
//! - [`discovery`]: file listing and date parsing
//! - [`netcdf_io`]: raster reading and NetCDF export of reduced series
//! - [`dataset`]: time-indexed rasters, merged datasets and reduced series
//! - [`metadata`]: variable aliases and file inspection
//! - [`statistics`]: zonal, depth and weekly reductions
//! - [`diagnostics`]: threshold bands and analysis results
//! - [`report`] / [`plot`]: text reports and PNG charts
//! - [`pipeline`]: the analyses wired together
//! - [`config`], [`parallel`], [`errors`]: configuration, thread pool, error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bgc_zones::prelude::*;
//!
//! let config = AnalysisConfig {
//!     year: Some(2025),
//!     ..AnalysisConfig::default()
//! };
//! let run = bgc_zones::pipeline::run_forecast("Data/*.nc", &config).unwrap();
//! println!("{}", run.report());
//! ```

pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod discovery;
pub mod errors;
pub mod metadata;
pub mod netcdf_io;
pub mod parallel;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod statistics;

pub use errors::{BgcError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{AnalysisConfig, Thresholds, Zone};
    pub use crate::dataset::{Dataset, RasterTimeSeries, ReducedSeries};
    pub use crate::diagnostics::{Metric, Status};
    pub use crate::errors::{BgcError, Result};
    pub use crate::metadata::Quantity;
    pub use crate::netcdf_io::NetCDFWriter;
    pub use crate::parallel::ParallelConfig;
    pub use crate::pipeline::Analysis;
    pub use crate::statistics::DepthTarget;
}
