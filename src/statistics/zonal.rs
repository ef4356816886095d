//! Zone selection and depth handling
//!
//! Selection works on coordinate values, not indices, so zones written north to
//! south select the same cells as zones written south to north, whatever the
//! storage order of the grid.

use super::parallel::{parallel_depth_integral, parallel_spatial_mean};
use crate::config::Zone;
use crate::dataset::{RasterTimeSeries, ReducedSeries};
use crate::errors::{BgcError, Result};
use log::{debug, info};
use ndarray::Axis;

const SELECT_EPSILON: f64 = 1e-9;

/// Which depth level a sliced series is taken from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthTarget {
    /// The shallowest level present
    Surface,
    /// The level nearest to this depth, clamped to the deepest level present
    Nearest(f64),
}

impl DepthTarget {
    /// Index of the chosen level in `depths`.
    #[must_use]
    pub fn resolve(self, depths: &[f64]) -> Option<usize> {
        let finite = || depths.iter().enumerate().filter(|(_, d)| d.is_finite());
        match self {
            DepthTarget::Surface => finite()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i),
            DepthTarget::Nearest(target) => {
                let deepest = finite().map(|(_, d)| *d).fold(f64::NEG_INFINITY, f64::max);
                let target = target.min(deepest);
                finite()
                    .min_by(|a, b| (a.1 - target).abs().total_cmp(&(b.1 - target).abs()))
                    .map(|(i, _)| i)
            }
        }
    }
}

fn indices_within(coords: &[f64], (lo, hi): (f64, f64)) -> Vec<usize> {
    coords
        .iter()
        .enumerate()
        .filter(|(_, c)| **c >= lo - SELECT_EPSILON && **c <= hi + SELECT_EPSILON)
        .map(|(i, _)| i)
        .collect()
}

/// Cut a raster down to the cells inside `zone`.
///
/// Fails with [`BgcError::EmptySelection`] when the bounds miss the grid and
/// with [`BgcError::ZoneAllMissing`] when every selected cell is missing. The
/// first time step is checked first; later steps are only scanned when it is
/// empty, so a cloudy first day does not hide a sea zone.
pub fn select_zone(raster: &RasterTimeSeries, zone: &Zone) -> Result<RasterTimeSeries> {
    let lat_idx = indices_within(&raster.latitudes, zone.lat_range());
    let lon_idx = indices_within(&raster.longitudes, zone.lon_range());

    if lat_idx.is_empty() || lon_idx.is_empty() {
        return Err(BgcError::EmptySelection {
            zone: zone.name.clone(),
            lat: zone.lat_range(),
            lon: zone.lon_range(),
        });
    }

    let data = raster
        .data
        .select(Axis(2), &lat_idx)
        .select(Axis(3), &lon_idx);

    let subset = RasterTimeSeries {
        variable: raster.variable.clone(),
        units: raster.units.clone(),
        times: raster.times.clone(),
        depths: raster.depths.clone(),
        latitudes: lat_idx.iter().map(|&i| raster.latitudes[i]).collect(),
        longitudes: lon_idx.iter().map(|&i| raster.longitudes[i]).collect(),
        data,
    };

    let valid = (0..subset.n_times())
        .map(|t| subset.valid_cells_at(t))
        .find(|&n| n > 0)
        .unwrap_or(0);

    if valid == 0 {
        return Err(BgcError::ZoneAllMissing {
            zone: zone.name.clone(),
            var: raster.variable.clone(),
            lat: zone.lat_range(),
            lon: zone.lon_range(),
        });
    }

    info!(
        "{} / {}: selected {} x {} cells ({} valid)",
        raster.variable,
        zone.name,
        subset.latitudes.len(),
        subset.longitudes.len(),
        valid
    );
    Ok(subset)
}

/// NaN-skipping spatial mean of a raster for every time step.
///
/// A raster with several depth levels is averaged over depth too.
pub fn zonal_mean(raster: &RasterTimeSeries) -> ReducedSeries {
    ReducedSeries::new(
        &raster.variable,
        raster.times.clone(),
        parallel_spatial_mean(raster),
    )
    .with_units(raster.units.clone())
}

/// Series at one depth level, with the depth that was actually used.
///
/// Rasters without a depth axis can only be sliced at the surface.
pub fn depth_sliced(
    raster: &RasterTimeSeries,
    target: DepthTarget,
) -> Result<(ReducedSeries, Option<f64>)> {
    let Some(depths) = &raster.depths else {
        return match target {
            DepthTarget::Surface => Ok((zonal_mean(raster), None)),
            DepthTarget::Nearest(_) => Err(BgcError::DimensionNotFound {
                var: raster.variable.clone(),
                dim: "depth".to_string(),
            }),
        };
    };

    let index = target
        .resolve(depths)
        .ok_or_else(|| BgcError::DimensionNotFound {
            var: raster.variable.clone(),
            dim: "depth".to_string(),
        })?;
    let depth = depths[index];
    debug!("{}: {:?} resolved to {:.2} m", raster.variable, target, depth);

    let level = RasterTimeSeries {
        variable: raster.variable.clone(),
        units: raster.units.clone(),
        times: raster.times.clone(),
        depths: Some(vec![depth]),
        latitudes: raster.latitudes.clone(),
        longitudes: raster.longitudes.clone(),
        data: raster.data.select(Axis(1), &[index]),
    };
    Ok((zonal_mean(&level), Some(depth)))
}

/// Integrate over the depth interval `range` (trapezoidal), then average horizontally.
pub fn depth_integrated(raster: &RasterTimeSeries, range: (f64, f64)) -> Result<ReducedSeries> {
    let depths = raster
        .depths
        .as_ref()
        .ok_or_else(|| BgcError::DimensionNotFound {
            var: raster.variable.clone(),
            dim: "depth".to_string(),
        })?;

    let mut levels = indices_within(depths, (range.0.min(range.1), range.0.max(range.1)));
    levels.sort_by(|&a, &b| depths[a].total_cmp(&depths[b]));

    if levels.len() < 2 {
        return Err(BgcError::StatisticsError(format!(
            "'{}' has {} depth level(s) within {}..{} m, at least 2 are needed to integrate",
            raster.variable,
            levels.len(),
            range.0,
            range.1
        )));
    }

    let level_depths: Vec<f64> = levels.iter().map(|&i| depths[i]).collect();
    let column = RasterTimeSeries {
        variable: raster.variable.clone(),
        units: raster.units.clone(),
        times: raster.times.clone(),
        depths: Some(level_depths.clone()),
        latitudes: raster.latitudes.clone(),
        longitudes: raster.longitudes.clone(),
        data: raster.data.select(Axis(1), &levels),
    };

    let values = parallel_depth_integral(&column, &level_depths);
    let units = raster.units.as_ref().map(|u| format!("{u} * m"));
    Ok(ReducedSeries::new(&raster.variable, raster.times.clone(), values).with_units(units))
}
