//! Per-time-step reductions using parallel processing
//!
//! Each time step is independent, so the rayon pool works through them in
//! parallel while results keep their time order.

use super::operations::{nan_mean, trapezoid};
use crate::dataset::RasterTimeSeries;
use log::debug;
use ndarray::Axis;
use rayon::prelude::*;

/// NaN-skipping mean over depth, latitude and longitude for every time step.
///
/// Values are accumulated in f64 to avoid precision loss; a time step with no
/// valid cell yields NaN.
pub fn parallel_spatial_mean(raster: &RasterTimeSeries) -> Vec<f64> {
    debug!(
        "Averaging {} time steps of '{}' across {} threads",
        raster.n_times(),
        raster.variable,
        rayon::current_num_threads()
    );

    (0..raster.n_times())
        .into_par_iter()
        .map(|t| {
            nan_mean(raster.time_slice(t).iter().map(|&v| f64::from(v))).unwrap_or(f64::NAN)
        })
        .collect()
}

/// Trapezoidal depth integral of every column, averaged horizontally.
///
/// `depths` are the levels of the raster's depth axis. Columns with a missing
/// level are left out of the mean; a time step without any complete column
/// yields NaN.
pub fn parallel_depth_integral(raster: &RasterTimeSeries, depths: &[f64]) -> Vec<f64> {
    debug!(
        "Integrating '{}' over {} depth levels for {} time steps",
        raster.variable,
        depths.len(),
        raster.n_times()
    );

    (0..raster.n_times())
        .into_par_iter()
        .map(|t| {
            let slice = raster.time_slice(t);
            // (depth, lat, lon) -> one integral per (lat, lon) column
            let columns = slice
                .lanes(Axis(0))
                .into_iter()
                .map(|column| {
                    let values: Vec<f64> = column.iter().map(|&v| f64::from(v)).collect();
                    trapezoid(depths, &values).unwrap_or(f64::NAN)
                })
                .collect::<Vec<_>>();
            nan_mean(columns).unwrap_or(f64::NAN)
        })
        .collect()
}
