//! NetCDF I/O: reading gridded variables and writing reduced series
//!
//! Reading normalises whatever layout a provider uses (`lat`/`latitude`,
//! optional `depth`, optional `time`) into a [`RasterTimeSeries`] with fill
//! values masked to NaN and `scale_factor`/`add_offset` applied. Writing stores
//! reduced series with their time coordinate, long name and units.

use crate::dataset::{RasterTimeSeries, ReducedSeries};
use crate::errors::{BgcError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::{debug, warn};
use ndarray::{ArrayD, Axis, Ix4};
use netcdf::{create, AttributeValue, File, Variable};
use std::{fs, path::Path};

/// Accepted dimension names per axis, compared case-insensitively.
pub const TIME_DIMS: &[&str] = &["time", "t"];
pub const DEPTH_DIMS: &[&str] = &["depth", "deptht", "lev", "z"];
pub const LAT_DIMS: &[&str] = &["lat", "latitude"];
pub const LON_DIMS: &[&str] = &["lon", "longitude"];

/// Fill value written for missing points of exported series.
pub const EXPORT_FILL_VALUE: f32 = -999.0;

/// NetCDF's default fill for floats is 9.969e36; anything this large is fill.
const DEFAULT_FILL_MAGNITUDE: f64 = 9.0e36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisRole {
    Time,
    Depth,
    Lat,
    Lon,
}

fn role_of(dim_name: &str) -> Option<AxisRole> {
    let name = dim_name.to_lowercase();
    let is = |names: &[&str]| names.contains(&name.as_str());
    if is(TIME_DIMS) {
        Some(AxisRole::Time)
    } else if is(DEPTH_DIMS) {
        Some(AxisRole::Depth)
    } else if is(LAT_DIMS) {
        Some(AxisRole::Lat)
    } else if is(LON_DIMS) {
        Some(AxisRole::Lon)
    } else {
        None
    }
}

/// Names of the gridded variables of a file (those with latitude and longitude axes).
pub fn data_variable_names(file: &File) -> Vec<String> {
    let mut names: Vec<String> = file
        .variables()
        .filter(|var| {
            let roles: Vec<_> = var
                .dimensions()
                .iter()
                .filter_map(|d| role_of(&d.name()))
                .collect();
            roles.contains(&AxisRole::Lat) && roles.contains(&AxisRole::Lon)
        })
        .map(|var| var.name())
        .collect();
    names.sort();
    names
}

/// Numeric attribute as f64, taking the first element of array attributes.
pub fn attr_f64(var: &Variable, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Floats(v) => v.first().map(|x| f64::from(*x)),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Shorts(v) => v.first().map(|x| f64::from(*x)),
        _ => None,
    }
}

/// String attribute, if present and textual.
pub fn attr_string(var: &Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(v) => v.into_iter().next(),
        _ => None,
    }
}

/// Replace fill values with NaN, then apply `scale_factor` and `add_offset`.
#[allow(clippy::cast_possible_truncation)]
pub fn mask_and_scale(
    values: &mut [f32],
    fill: Option<f64>,
    scale_factor: Option<f64>,
    add_offset: Option<f64>,
) {
    let scale = scale_factor.unwrap_or(1.0);
    let offset = add_offset.unwrap_or(0.0);

    for value in values.iter_mut() {
        let raw = f64::from(*value);
        let is_fill = fill.is_some_and(|f| raw == f || (raw - f).abs() <= f.abs() * 1e-7);
        *value = if !raw.is_finite() || is_fill || raw.abs() >= DEFAULT_FILL_MAGNITUDE {
            f32::NAN
        } else {
            (raw * scale + offset) as f32
        };
    }
}

/// Read a 1-D coordinate variable.
fn read_coord(file: &File, var_name: &str, dim_name: &str) -> Result<Vec<f64>> {
    let coord = file
        .variable(dim_name)
        .ok_or_else(|| BgcError::DimensionNotFound {
            var: var_name.to_string(),
            dim: format!("{dim_name} (coordinate variable)"),
        })?;
    Ok(coord.get_values::<f64, _>(..)?)
}

/// Parse CF time units such as `days since 1950-01-01 00:00:00`.
///
/// Returns the length of one unit in seconds and the reference instant.
pub fn parse_time_units(units: &str) -> Option<(f64, NaiveDateTime)> {
    let (unit, reference) = units.split_once(" since ")?;
    let seconds = match unit.trim().to_lowercase().as_str() {
        "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        _ => return None,
    };

    let reference = reference
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();
    let datetime = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(reference, fmt).ok())
    .or_else(|| {
        NaiveDate::parse_from_str(reference, "%Y-%m-%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    })?;

    Some((seconds, datetime))
}

/// Decode the time coordinate of a file.
fn read_times(file: &File, dim_name: &str) -> Result<Vec<NaiveDateTime>> {
    let time_var = file
        .variable(dim_name)
        .ok_or_else(|| BgcError::TimeDecode {
            var: dim_name.to_string(),
            message: "no coordinate variable".to_string(),
        })?;
    let units = attr_string(&time_var, "units").ok_or_else(|| BgcError::TimeDecode {
        var: dim_name.to_string(),
        message: "missing 'units' attribute".to_string(),
    })?;
    let (unit_seconds, reference) =
        parse_time_units(&units).ok_or_else(|| BgcError::TimeDecode {
            var: dim_name.to_string(),
            message: format!("unsupported units '{units}'"),
        })?;

    time_var
        .get_values::<f64, _>(..)?
        .into_iter()
        .map(|v| {
            offset_time(reference, v * unit_seconds).ok_or_else(|| BgcError::TimeDecode {
                var: dim_name.to_string(),
                message: format!("value {v} is outside the representable date range"),
            })
        })
        .collect()
}

/// `reference` shifted by `seconds`, `None` when the result cannot be represented.
#[allow(clippy::cast_possible_truncation)]
fn offset_time(reference: NaiveDateTime, seconds: f64) -> Option<NaiveDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    let offset = Duration::try_milliseconds((seconds * 1000.0).round() as i64)?;
    reference.checked_add_signed(offset)
}

/// Load one gridded variable from an open file.
///
/// `fallback_time` is used when the file has no decodable time axis of its
/// own, which is the case for daily satellite products dated by file name.
pub fn read_raster(
    file: &File,
    var_name: &str,
    fallback_time: Option<NaiveDateTime>,
) -> Result<RasterTimeSeries> {
    let var = file
        .variable(var_name)
        .ok_or_else(|| BgcError::VariableNotFound {
            var: var_name.to_string(),
            available: data_variable_names(file),
        })?;

    let mut roles = Vec::new();
    let mut dim_names = Vec::new();
    let mut shape = Vec::new();
    for dim in var.dimensions() {
        match role_of(&dim.name()) {
            Some(role) => {
                roles.push(role);
                dim_names.push(dim.name());
                shape.push(dim.len());
            }
            None if dim.len() == 1 => debug!("Dropping singleton dimension '{}'", dim.name()),
            None => {
                return Err(BgcError::StatisticsError(format!(
                    "'{}' has unsupported dimension '{}' of length {}",
                    var_name,
                    dim.name(),
                    dim.len()
                )))
            }
        }
    }

    let dim_of = |role: AxisRole| roles.iter().position(|r| *r == role);
    let (Some(lat_pos), Some(lon_pos)) = (dim_of(AxisRole::Lat), dim_of(AxisRole::Lon)) else {
        return Err(BgcError::DimensionNotFound {
            var: var_name.to_string(),
            dim: "latitude/longitude".to_string(),
        });
    };

    let mut values = var.get_values::<f32, _>(..)?;
    let fill = attr_f64(&var, "_FillValue").or_else(|| attr_f64(&var, "missing_value"));
    mask_and_scale(
        &mut values,
        fill,
        attr_f64(&var, "scale_factor"),
        attr_f64(&var, "add_offset"),
    );

    let latitudes = read_coord(file, var_name, &dim_names[lat_pos])?;
    let longitudes = read_coord(file, var_name, &dim_names[lon_pos])?;
    let depths = match dim_of(AxisRole::Depth) {
        Some(pos) => Some(read_coord(file, var_name, &dim_names[pos])?),
        None => None,
    };

    let times = match dim_of(AxisRole::Time) {
        Some(pos) => match read_times(file, &dim_names[pos]) {
            Ok(times) => times,
            Err(e) => match fallback_time {
                Some(t) if shape[pos] == 1 => {
                    debug!("{e}; using the date from the file name");
                    vec![t]
                }
                _ => return Err(e),
            },
        },
        None => match fallback_time {
            Some(t) => vec![t],
            None => {
                return Err(BgcError::TimeDecode {
                    var: var_name.to_string(),
                    message: "no time axis and no date in the file name".to_string(),
                })
            }
        },
    };

    let mut data = ArrayD::from_shape_vec(shape, values)?;
    for role in [AxisRole::Time, AxisRole::Depth] {
        if !roles.contains(&role) {
            let ndim = data.ndim();
            data = data.insert_axis(Axis(ndim));
            roles.push(role);
        }
    }
    let order: Vec<usize> = [AxisRole::Time, AxisRole::Depth, AxisRole::Lat, AxisRole::Lon]
        .iter()
        .filter_map(|role| roles.iter().position(|r| r == role))
        .collect();
    let data = data
        .permuted_axes(order)
        .as_standard_layout()
        .into_owned()
        .into_dimensionality::<Ix4>()?;

    let raster =
        RasterTimeSeries::new(var_name, times, depths, latitudes, longitudes, data)?;
    Ok(raster.with_units(attr_string(&var, "units")))
}

/// Open a file and load one variable from it.
pub fn read_raster_from_path(
    path: &Path,
    var_name: &str,
    fallback_time: Option<NaiveDateTime>,
) -> Result<RasterTimeSeries> {
    let file = netcdf::open(path)?;
    read_raster(&file, var_name, fallback_time)
}

/// Writer for reduced series
pub struct NetCDFWriter<'a> {
    output_path: &'a Path,
}

fn sanitize(label: &str) -> String {
    let name: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let name = name.trim_matches('_').to_string();
    if name.is_empty() {
        "series".to_string()
    } else {
        name
    }
}

impl<'a> NetCDFWriter<'a> {
    /// Create a new NetCDF writer
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write series to one file; series sharing a time axis share a dimension.
    pub fn write_series(&self, series: &[ReducedSeries]) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;
        let epoch = DateTime::<Utc>::UNIX_EPOCH.naive_utc();

        let mut axes: Vec<(&[NaiveDateTime], String)> = Vec::new();
        let mut used_names: Vec<String> = Vec::new();

        for s in series {
            let dim_name = match axes.iter().find(|(times, _)| *times == s.times.as_slice()) {
                Some((_, name)) => name.clone(),
                None => {
                    let name = if axes.is_empty() {
                        "time".to_string()
                    } else {
                        format!("time{}", axes.len() + 1)
                    };
                    file.add_dimension(&name, s.times.len())?;

                    let offsets: Vec<f64> = s
                        .times
                        .iter()
                        .map(|t| (*t - epoch).num_seconds() as f64 / 86400.0)
                        .collect();
                    let mut time_var = file.add_variable::<f64>(&name, &[name.as_str()])?;
                    time_var.put_attribute("units", "days since 1970-01-01 00:00:00")?;
                    time_var.put_attribute("calendar", "standard")?;
                    time_var.put_values(&offsets, ..)?;

                    axes.push((s.times.as_slice(), name.clone()));
                    name
                }
            };

            let mut var_name = sanitize(&s.label);
            while used_names.contains(&var_name) || axes.iter().any(|(_, n)| *n == var_name) {
                var_name.push('_');
            }
            used_names.push(var_name.clone());

            #[allow(clippy::cast_possible_truncation)]
            let values: Vec<f32> = s
                .values
                .iter()
                .map(|v| if v.is_finite() { *v as f32 } else { EXPORT_FILL_VALUE })
                .collect();

            let mut var = file.add_variable::<f32>(&var_name, &[dim_name.as_str()])?;
            var.put_attribute("_FillValue", EXPORT_FILL_VALUE)?;
            var.put_attribute("long_name", s.label.as_str())?;
            if let Some(units) = &s.units {
                var.put_attribute("units", units.as_str())?;
            }
            var.put_values(&values, ..)?;
        }

        if series.is_empty() {
            warn!("No series to export, writing an empty file");
        }

        file.add_attribute(
            "history",
            format!("Created by bgc_zones on {}", Utc::now().to_rfc3339()),
        )?;

        Ok(())
    }
}

/// Writes reduced series to a new NetCDF file.
pub fn write_series_to_netcdf(series: &[ReducedSeries], output_path: &Path) -> Result<()> {
    NetCDFWriter::new(output_path).write_series(series)
}
