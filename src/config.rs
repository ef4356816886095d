//! Analysis configuration: zones, bloom window, depth targets and thresholds
//!
//! Everything the analyses compare against lives in [`AnalysisConfig`]. The
//! defaults describe the Konkan coast set-up; any field can be overridden from a
//! JSON file (missing keys keep their defaults) and most of them from the CLI.

use crate::errors::{BgcError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// A named rectangular bounding box.
///
/// Bounds may be written in either order; north-to-south latitude slices are
/// common for satellite grids stored top-down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub lat: [f64; 2],
    pub lon: [f64; 2],
}

impl Zone {
    pub fn new(name: &str, lat: [f64; 2], lon: [f64; 2]) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lon,
        }
    }

    /// Latitude interval as `(min, max)`.
    #[must_use]
    pub fn lat_range(&self) -> (f64, f64) {
        ordered(self.lat)
    }

    /// Longitude interval as `(min, max)`.
    #[must_use]
    pub fn lon_range(&self) -> (f64, f64) {
        ordered(self.lon)
    }

    /// Parse `NAME:LAT1:LAT2:LON1:LON2`.
    pub fn parse(arg: &str) -> std::result::Result<Self, String> {
        let parts: Vec<&str> = arg.split(':').collect();
        let [name, lat1, lat2, lon1, lon2] = parts.as_slice() else {
            return Err("Invalid format: Expected 'NAME:LAT1:LAT2:LON1:LON2'.".to_string());
        };
        if name.trim().is_empty() {
            return Err("Zone name must not be empty".to_string());
        }
        let num = |s: &str, what: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid {what} bound '{s}' for zone '{name}'"))
        };
        Ok(Self {
            name: name.trim().to_string(),
            lat: [num(lat1, "latitude")?, num(lat2, "latitude")?],
            lon: [num(lon1, "longitude")?, num(lon2, "longitude")?],
        })
    }
}

fn ordered(bounds: [f64; 2]) -> (f64, f64) {
    if bounds[0] <= bounds[1] {
        (bounds[0], bounds[1])
    } else {
        (bounds[1], bounds[0])
    }
}

/// Month/day bounds of the expected seasonal bloom, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomWindow {
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
}

impl Default for BloomWindow {
    fn default() -> Self {
        Self {
            start_month: 10,
            start_day: 1,
            end_month: 11,
            end_day: 30,
        }
    }
}

impl BloomWindow {
    /// Concrete date range of the window in `year`.
    pub fn dates(&self, year: i32) -> Result<(NaiveDate, NaiveDate)> {
        let start = NaiveDate::from_ymd_opt(year, self.start_month, self.start_day);
        let end = NaiveDate::from_ymd_opt(year, self.end_month, self.end_day);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => Ok((start, end)),
            (Some(_), Some(_)) => Err(BgcError::InvalidConfig {
                message: format!("bloom window starts after it ends in {year}"),
            }),
            _ => Err(BgcError::InvalidConfig {
                message: format!(
                    "bloom window {:02}-{:02}..{:02}-{:02} is not a valid date range in {year}",
                    self.start_month, self.start_day, self.end_month, self.end_day
                ),
            }),
        }
    }
}

/// Depth interval and target depths, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// Upper (shallow) end of the integration interval
    pub integration_min: f64,
    /// Lower (deep) end of the integration interval, the photic zone
    pub integration_max: f64,
    /// Nitrate reserve depth for the upwelling check
    pub deep_nitrate: f64,
    /// Fish habitat depth for the oxygen check
    pub oxygen: f64,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            integration_min: 0.0,
            integration_max: 100.0,
            deep_nitrate: 100.0,
            oxygen: 50.0,
        }
    }
}

/// Baselines, model constants and classification bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Healthy post-monsoon chlorophyll-a concentration (mg/m³)
    pub baseline_chl: f64,
    /// Fraction of a productivity change passed on to fisheries yield
    pub trophic_sensitivity: f64,
    /// Multiplier applied to positive yield forecasts
    pub optimism_damping: f64,
    /// Oxygen below this is hypoxic (mmol/m³)
    pub hypoxia: f64,
    /// Oxygen below this stresses sensitive species (mmol/m³)
    pub oxygen_stress: f64,
    /// Surface nitrate below this limits growth (mmol/m³)
    pub nutrient_limit: f64,
    pub efficient_gradient: f64,
    pub strong_gradient: f64,
    /// Bloom anomaly (%) above which the bloom is strong
    pub strong_bloom: f64,
    /// Bloom anomaly (%) at or below which the bloom failed
    pub normal_bloom: f64,
    /// PPI anomaly (%) below which the ecosystem is stressed
    pub stressed: f64,
    /// PPI anomaly (%) below which the ecosystem is critical
    pub critical: f64,
    /// Weekly chlorophyll peak below this is low productivity (mg/m³)
    pub low_productivity: f64,
    /// Weekly chlorophyll peak above this risks an algal bloom (mg/m³)
    pub very_high: f64,
    /// Upper edge of the shaded failure band on forecast charts (mg/m³)
    pub failure_band: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            baseline_chl: 2.0,
            trophic_sensitivity: 0.8,
            optimism_damping: 0.2,
            hypoxia: 60.0,
            oxygen_stress: 120.0,
            nutrient_limit: 0.5,
            efficient_gradient: 10.0,
            strong_gradient: 15.0,
            strong_bloom: 20.0,
            normal_bloom: 0.0,
            stressed: -20.0,
            critical: -50.0,
            low_productivity: 1.0,
            very_high: 5.0,
            failure_band: 1.0,
        }
    }
}

/// Complete configuration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis year; required before any bloom-window metric is computed
    pub year: Option<i32>,
    pub zones: Vec<Zone>,
    /// Zone used by the water-column profile analysis
    pub profile_zone: Zone,
    pub bloom_window: BloomWindow,
    pub depth: DepthConfig,
    pub thresholds: Thresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            year: None,
            zones: default_zones(),
            profile_zone: Zone::new("Ratnagiri", [16.5, 17.5], [72.0, 73.5]),
            bloom_window: BloomWindow::default(),
            depth: DepthConfig::default(),
            thresholds: Thresholds::default(),
        }
    }
}

/// Economic zones along the Konkan coast, latitude given north to south.
pub fn default_zones() -> Vec<Zone> {
    vec![
        Zone::new("Mumbai", [19.5, 18.5], [72.0, 73.0]),
        Zone::new("Ratnagiri", [17.5, 16.5], [72.0, 73.5]),
        Zone::new("Sindhudurg", [16.5, 15.5], [72.0, 73.5]),
    ]
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make every analysis meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.zones.is_empty() {
            return Err(BgcError::InvalidConfig {
                message: "at least one zone is required".to_string(),
            });
        }
        if self.depth.integration_max <= self.depth.integration_min {
            return Err(BgcError::InvalidConfig {
                message: format!(
                    "depth integration range {}..{} is empty",
                    self.depth.integration_min, self.depth.integration_max
                ),
            });
        }
        if self.thresholds.baseline_chl <= 0.0 {
            return Err(BgcError::InvalidConfig {
                message: "baseline_chl must be positive".to_string(),
            });
        }
        if self.thresholds.critical > self.thresholds.stressed
            || self.thresholds.hypoxia > self.thresholds.oxygen_stress
            || self.thresholds.normal_bloom > self.thresholds.strong_bloom
        {
            return Err(BgcError::InvalidConfig {
                message: "classification bounds must be ordered from most to least severe"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// The analysis year, or an error explaining how to supply it.
    pub fn require_year(&self) -> Result<i32> {
        self.year.ok_or_else(|| BgcError::InvalidConfig {
            message: "analysis year is required (use --year or \"year\" in the config file)"
                .to_string(),
        })
    }

    /// Bloom window dates for the configured year.
    pub fn bloom_dates(&self) -> Result<(NaiveDate, NaiveDate)> {
        self.bloom_window.dates(self.require_year()?)
    }
}
