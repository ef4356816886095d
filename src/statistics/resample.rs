//! Calendar-week aggregation
//!
//! Weeks end on Sunday and are labelled by that Sunday. Every week between the
//! first and the last sample gets a bin; weeks without a valid sample stay
//! missing rather than becoming zero.

use crate::dataset::{RasterTimeSeries, ReducedSeries};
use crate::errors::Result;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use ndarray::{Array4, Axis, Zip};

/// The Sunday closing the week that contains `date`.
#[must_use]
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let offset = 6 - i64::from(date.weekday().num_days_from_monday());
    date + Duration::days(offset)
}

/// Assignment of time steps to consecutive weekly bins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyBins {
    /// Week-ending Sundays, one per bin, consecutive
    pub labels: Vec<NaiveDate>,
    /// Bin index of every input time step
    pub assignment: Vec<usize>,
}

impl WeeklyBins {
    pub fn from_times(times: &[NaiveDateTime]) -> Self {
        let ends: Vec<NaiveDate> = times.iter().map(|t| week_ending(t.date())).collect();
        let (Some(first), Some(last)) = (ends.iter().min(), ends.iter().max()) else {
            return Self {
                labels: Vec::new(),
                assignment: Vec::new(),
            };
        };

        let n_bins = ((*last - *first).num_days() / 7 + 1) as usize;
        let labels = (0..n_bins)
            .map(|i| *first + Duration::weeks(i as i64))
            .collect();
        let assignment = ends
            .iter()
            .map(|end| ((*end - *first).num_days() / 7) as usize)
            .collect();
        Self { labels, assignment }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn label_times(&self) -> Vec<NaiveDateTime> {
        self.labels
            .iter()
            .map(|d| d.and_time(NaiveTime::MIN))
            .collect()
    }
}

/// Weekly NaN-skipping mean of every cell.
pub fn resample_weekly(raster: &RasterTimeSeries) -> Result<RasterTimeSeries> {
    let bins = WeeklyBins::from_times(&raster.times);
    let (_, n_depth, n_lat, n_lon) = raster.data.dim();

    let mut sums = Array4::<f64>::zeros((bins.len(), n_depth, n_lat, n_lon));
    let mut counts = Array4::<u32>::zeros((bins.len(), n_depth, n_lat, n_lon));

    for (t, &bin) in bins.assignment.iter().enumerate() {
        Zip::from(sums.index_axis_mut(Axis(0), bin))
            .and(counts.index_axis_mut(Axis(0), bin))
            .and(raster.time_slice(t))
            .for_each(|sum, count, &value| {
                if value.is_finite() {
                    *sum += f64::from(value);
                    *count += 1;
                }
            });
    }

    #[allow(clippy::cast_possible_truncation)]
    let data = Zip::from(&sums).and(&counts).map_collect(|&sum, &count| {
        if count > 0 {
            (sum / f64::from(count)) as f32
        } else {
            f32::NAN
        }
    });

    let resampled = RasterTimeSeries::new(
        &raster.variable,
        bins.label_times(),
        raster.depths.clone(),
        raster.latitudes.clone(),
        raster.longitudes.clone(),
        data,
    )?;
    Ok(resampled.with_units(raster.units.clone()))
}

/// Weekly mean of a reduced series.
#[must_use]
pub fn resample_series_weekly(series: &ReducedSeries) -> ReducedSeries {
    let bins = WeeklyBins::from_times(&series.times);
    let mut sums = vec![0.0_f64; bins.len()];
    let mut counts = vec![0_u32; bins.len()];

    for (&bin, &value) in bins.assignment.iter().zip(&series.values) {
        if value.is_finite() {
            sums[bin] += value;
            counts[bin] += 1;
        }
    }

    let values = sums
        .iter()
        .zip(&counts)
        .map(|(&sum, &count)| {
            if count > 0 {
                sum / f64::from(count)
            } else {
                f64::NAN
            }
        })
        .collect();

    ReducedSeries::new(&series.label, bins.label_times(), values).with_units(series.units.clone())
}
