//! In-memory data model: gridded rasters, merged datasets and reduced series
//!
//! A [`RasterTimeSeries`] always stores its values as `(time, depth, lat, lon)`;
//! variables without a depth axis carry a depth axis of length one. Missing
//! cells are NaN.

use crate::errors::{BgcError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use ndarray::{concatenate, Array4, ArrayView3, Axis};
use std::collections::BTreeMap;

/// Absolute tolerance used when comparing coordinate values of two grids.
pub const COORD_TOLERANCE: f64 = 1e-4;

/// One gridded variable over time.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterTimeSeries {
    pub variable: String,
    pub units: Option<String>,
    pub times: Vec<NaiveDateTime>,
    /// Depth levels in metres, `None` for surface-only variables
    pub depths: Option<Vec<f64>>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub data: Array4<f32>,
}

impl RasterTimeSeries {
    /// Build a raster, checking that the coordinates match the data shape.
    pub fn new(
        variable: &str,
        times: Vec<NaiveDateTime>,
        depths: Option<Vec<f64>>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        data: Array4<f32>,
    ) -> Result<Self> {
        let depth_len = depths.as_ref().map_or(1, Vec::len);
        let expected = [times.len(), depth_len, latitudes.len(), longitudes.len()];
        if data.shape() != expected {
            return Err(BgcError::StatisticsError(format!(
                "data shape {:?} of '{}' does not match coordinates {:?}",
                data.shape(),
                variable,
                expected
            )));
        }
        Ok(Self {
            variable: variable.to_string(),
            units: None,
            times,
            depths,
            latitudes,
            longitudes,
            data,
        })
    }

    #[must_use]
    pub fn with_units(mut self, units: Option<String>) -> Self {
        self.units = units;
        self
    }

    #[must_use]
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Values of one time step as `(depth, lat, lon)`.
    #[must_use]
    pub fn time_slice(&self, index: usize) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(0), index)
    }

    /// Number of non-missing cells at one time step.
    #[must_use]
    pub fn valid_cells_at(&self, index: usize) -> usize {
        self.time_slice(index).iter().filter(|v| v.is_finite()).count()
    }

    /// Check that `other` lives on the same depth/lat/lon grid.
    pub fn check_same_grid(&self, other: &Self) -> Result<()> {
        let var = other.variable.clone();
        compare_coords(&var, "latitude", &self.latitudes, &other.latitudes)?;
        compare_coords(&var, "longitude", &self.longitudes, &other.longitudes)?;
        match (&self.depths, &other.depths) {
            (Some(a), Some(b)) => compare_coords(&var, "depth", a, b),
            (None, None) => Ok(()),
            _ => Err(BgcError::Alignment {
                var,
                coord: "depth".to_string(),
                message: "one grid has a depth axis and the other does not".to_string(),
            }),
        }
    }

    /// Reorder time steps chronologically and drop duplicate timestamps.
    ///
    /// The stable sort keeps the first occurrence of a repeated timestamp.
    #[must_use]
    pub fn sorted_by_time(self) -> Self {
        let mut order: Vec<usize> = (0..self.times.len()).collect();
        order.sort_by_key(|&i| self.times[i]);

        let mut keep = Vec::with_capacity(order.len());
        for i in order {
            match keep.last() {
                Some(&prev) if self.times[prev] == self.times[i] => warn!(
                    "Duplicate timestamp {} in '{}', keeping the first file",
                    self.times[i], self.variable
                ),
                _ => keep.push(i),
            }
        }

        let times = keep.iter().map(|&i| self.times[i]).collect();
        let data = self.data.select(Axis(0), &keep);
        Self {
            times,
            data,
            ..self
        }
    }

    /// Concatenate single-file rasters along time and sort chronologically.
    ///
    /// All parts must share the grid of the first part.
    pub fn concat_time(parts: Vec<Self>) -> Result<Self> {
        let first = parts.first().ok_or_else(|| {
            BgcError::StatisticsError("cannot concatenate an empty list of rasters".to_string())
        })?;
        for part in &parts[1..] {
            first.check_same_grid(part)?;
        }

        let views: Vec<_> = parts.iter().map(|p| p.data.view()).collect();
        let data = concatenate(Axis(0), &views)?;
        let times = parts.iter().flat_map(|p| p.times.iter().copied()).collect();

        let merged = Self {
            variable: first.variable.clone(),
            units: first.units.clone(),
            times,
            depths: first.depths.clone(),
            latitudes: first.latitudes.clone(),
            longitudes: first.longitudes.clone(),
            data,
        };
        Ok(merged.sorted_by_time())
    }
}

fn compare_coords(var: &str, coord: &str, a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(BgcError::Alignment {
            var: var.to_string(),
            coord: coord.to_string(),
            message: format!("{} vs {} points", a.len(), b.len()),
        });
    }
    if let Some((x, y)) = a
        .iter()
        .zip(b)
        .find(|(x, y)| (**x - **y).abs() > COORD_TOLERANCE)
    {
        return Err(BgcError::Alignment {
            var: var.to_string(),
            coord: coord.to_string(),
            message: format!("values differ ({x} vs {y})"),
        });
    }
    Ok(())
}

/// Variables from one or more files merged on a shared grid.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    variables: BTreeMap<String, RasterTimeSeries>,
}

impl Dataset {
    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RasterTimeSeries> {
        self.variables.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Add a variable, aligning it with what is already present.
    ///
    /// Time, latitude and longitude must match every existing variable; depth
    /// must match wherever both variables have one. A name that already exists
    /// keeps its first definition.
    pub fn insert(&mut self, raster: RasterTimeSeries) -> Result<()> {
        if self.variables.contains_key(&raster.variable) {
            warn!(
                "Variable '{}' appears in more than one file, keeping the first",
                raster.variable
            );
            return Ok(());
        }

        for existing in self.variables.values() {
            align_with(existing, &raster)?;
        }
        self.variables.insert(raster.variable.clone(), raster);
        Ok(())
    }
}

fn align_with(existing: &RasterTimeSeries, incoming: &RasterTimeSeries) -> Result<()> {
    let var = incoming.variable.as_str();
    if existing.times != incoming.times {
        return Err(BgcError::Alignment {
            var: var.to_string(),
            coord: "time".to_string(),
            message: format!(
                "{} time steps do not match the {} of '{}'",
                incoming.times.len(),
                existing.times.len(),
                existing.variable
            ),
        });
    }
    compare_coords(var, "latitude", &existing.latitudes, &incoming.latitudes)?;
    compare_coords(var, "longitude", &existing.longitudes, &incoming.longitudes)?;
    if let (Some(a), Some(b)) = (&existing.depths, &incoming.depths) {
        compare_coords(var, "depth", a, b)?;
    }
    Ok(())
}

/// One scalar per time step, NaN where no cell contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedSeries {
    pub label: String,
    pub units: Option<String>,
    pub times: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl ReducedSeries {
    pub fn new(label: &str, times: Vec<NaiveDateTime>, values: Vec<f64>) -> Self {
        Self {
            label: label.to_string(),
            units: None,
            times,
            values,
        }
    }

    #[must_use]
    pub fn with_units(mut self, units: Option<String>) -> Self {
        self.units = units;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(time, value)` pairs of the defined points only.
    pub fn valid_points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.times
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .filter(|(_, v)| v.is_finite())
    }

    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.valid_points().count()
    }

    /// Mean of the defined values, `None` when there are none.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        crate::statistics::operations::nan_mean(self.values.iter().copied())
    }

    /// Smallest defined value with its timestamp.
    #[must_use]
    pub fn min(&self) -> Option<(NaiveDateTime, f64)> {
        self.valid_points()
            .fold(None, |best, (t, v)| match best {
                Some((_, b)) if b <= v => best,
                _ => Some((t, v)),
            })
    }

    /// Largest defined value with its timestamp.
    #[must_use]
    pub fn max(&self) -> Option<(NaiveDateTime, f64)> {
        self.valid_points()
            .fold(None, |best, (t, v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((t, v)),
            })
    }

    /// The part of the series whose dates fall in `start..=end`.
    #[must_use]
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let (times, values) = self
            .times
            .iter()
            .zip(&self.values)
            .filter(|(t, _)| (start..=end).contains(&t.date()))
            .map(|(t, v)| (*t, *v))
            .unzip();
        Self {
            label: self.label.clone(),
            units: self.units.clone(),
            times,
            values,
        }
    }
}
