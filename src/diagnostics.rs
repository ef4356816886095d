//! Threshold-based classification of reduced series
//!
//! Every rule is an ordered list of [`Band`]s built from
//! [`Thresholds`](crate::config::Thresholds). [`classify`] walks the list from
//! the most severe band to the least severe one and returns the label of the
//! first band that matches, or the fallback label when none does.

use crate::config::Thresholds;
use crate::dataset::ReducedSeries;
use crate::errors::BgcError;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Categorical outcome of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    BloomFailure,
    NormalBloom,
    StrongBloom,
    Stable,
    Stressed,
    Critical,
    Hypoxic,
    Caution,
    Healthy,
    NutrientLimitation,
    EfficientUtilization,
    VeryStrongUpwelling,
    NutrientsAvailable,
    LowProductivity,
    VeryHigh,
    HealthyNormal,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BloomFailure => "BLOOM FAILURE",
            Self::NormalBloom => "NORMAL BLOOM",
            Self::StrongBloom => "STRONG BLOOM",
            Self::Stable => "STABLE",
            Self::Stressed => "STRESSED",
            Self::Critical => "CRITICAL",
            Self::Hypoxic => "HYPOXIC",
            Self::Caution => "CAUTION",
            Self::Healthy => "HEALTHY",
            Self::NutrientLimitation => "NUTRIENT LIMITATION",
            Self::EfficientUtilization => "EFFICIENT UTILIZATION",
            Self::VeryStrongUpwelling => "VERY STRONG UPWELLING",
            Self::NutrientsAvailable => "NUTRIENTS AVAILABLE",
            Self::LowProductivity => "LOW PRODUCTIVITY",
            Self::VeryHigh => "VERY HIGH",
            Self::HealthyNormal => "HEALTHY/NORMAL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition of one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// value < limit
    Below(f64),
    /// value <= limit
    AtMost(f64),
    /// value > limit
    Above(f64),
}

impl Bound {
    #[must_use]
    pub fn matches(self, value: f64) -> bool {
        match self {
            Bound::Below(limit) => value < limit,
            Bound::AtMost(limit) => value <= limit,
            Bound::Above(limit) => value > limit,
        }
    }
}

/// A labelled threshold band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub bound: Bound,
    pub status: Status,
}

impl Band {
    pub const fn new(bound: Bound, status: Status) -> Self {
        Self { bound, status }
    }
}

/// First matching band wins; `fallback` when none matches.
#[must_use]
pub fn classify(value: f64, bands: &[Band], fallback: Status) -> Status {
    bands
        .iter()
        .find(|band| band.bound.matches(value))
        .map_or(fallback, |band| band.status)
}

impl Thresholds {
    /// Bloom anomaly (%) → failure / normal / strong.
    #[must_use]
    pub fn bloom_bands(&self) -> ([Band; 2], Status) {
        (
            [
                Band::new(Bound::AtMost(self.normal_bloom), Status::BloomFailure),
                Band::new(Bound::AtMost(self.strong_bloom), Status::NormalBloom),
            ],
            Status::StrongBloom,
        )
    }

    /// PPI anomaly (%) → critical / stressed / stable.
    #[must_use]
    pub fn health_bands(&self) -> ([Band; 2], Status) {
        (
            [
                Band::new(Bound::Below(self.critical), Status::Critical),
                Band::new(Bound::Below(self.stressed), Status::Stressed),
            ],
            Status::Stable,
        )
    }

    /// Minimum oxygen → hypoxic / caution / healthy.
    #[must_use]
    pub fn oxygen_bands(&self) -> ([Band; 2], Status) {
        (
            [
                Band::new(Bound::Below(self.hypoxia), Status::Hypoxic),
                Band::new(Bound::Below(self.oxygen_stress), Status::Caution),
            ],
            Status::Healthy,
        )
    }

    /// Weekly chlorophyll peak → low / very high / normal.
    #[must_use]
    pub fn peak_bands(&self) -> ([Band; 2], Status) {
        (
            [
                Band::new(Bound::Below(self.low_productivity), Status::LowProductivity),
                Band::new(Bound::Above(self.very_high), Status::VeryHigh),
            ],
            Status::HealthyNormal,
        )
    }
}

fn classify_with((bands, fallback): ([Band; 2], Status), value: f64) -> Status {
    classify(value, &bands, fallback)
}

/// A metric that is either computed or unavailable with a reason.
#[derive(Debug, Clone, PartialEq)]
pub enum Metric<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Metric<T> {
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    #[must_use]
    pub fn as_ref(&self) -> Metric<&T> {
        match self {
            Metric::Available(v) => Metric::Available(v),
            Metric::Unavailable(r) => Metric::Unavailable(r.clone()),
        }
    }

    #[must_use]
    pub fn available(&self) -> Option<&T> {
        match self {
            Metric::Available(v) => Some(v),
            Metric::Unavailable(_) => None,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Metric::Available(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metric<U> {
        match self {
            Metric::Available(v) => Metric::Available(f(v)),
            Metric::Unavailable(r) => Metric::Unavailable(r),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Metric<U>) -> Metric<U> {
        match self {
            Metric::Available(v) => f(v),
            Metric::Unavailable(r) => Metric::Unavailable(r),
        }
    }
}

impl<T> From<std::result::Result<T, BgcError>> for Metric<T> {
    fn from(result: std::result::Result<T, BgcError>) -> Self {
        match result {
            Ok(v) => Metric::Available(v),
            Err(e) => Metric::Unavailable(match e.hint() {
                Some(hint) => format!("{e}. {hint}"),
                None => e.to_string(),
            }),
        }
    }
}

/// What a bloom-period mean is compared against
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnomalyBaseline {
    /// The mean of the whole series
    SeriesMean,
    /// A fixed healthy-ecosystem value
    Constant(f64),
}

/// Bloom-period mean against a reference value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomAnomaly {
    pub bloom_mean: f64,
    pub reference: f64,
    /// (bloom − reference) / reference × 100
    pub anomaly_pct: f64,
}

impl BloomAnomaly {
    /// The anomaly as a fraction.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.anomaly_pct / 100.0
    }
}

/// Mean of `series` inside `window` compared with `baseline`.
pub fn bloom_anomaly(
    series: &ReducedSeries,
    window: (NaiveDate, NaiveDate),
    baseline: AnomalyBaseline,
) -> Metric<BloomAnomaly> {
    let Some(bloom_mean) = series.window(window.0, window.1).mean() else {
        return Metric::unavailable(format!(
            "no valid {} data between {} and {}",
            series.label, window.0, window.1
        ));
    };
    let reference = match baseline {
        AnomalyBaseline::Constant(value) => value,
        AnomalyBaseline::SeriesMean => match series.mean() {
            Some(mean) => mean,
            None => return Metric::unavailable(format!("no valid {} data", series.label)),
        },
    };
    if reference == 0.0 || !reference.is_finite() {
        return Metric::unavailable(format!(
            "reference value {reference} of {} cannot be used as a baseline",
            series.label
        ));
    }

    Metric::Available(BloomAnomaly {
        bloom_mean,
        reference,
        anomaly_pct: (bloom_mean - reference) / reference * 100.0,
    })
}

#[must_use]
pub fn classify_bloom(anomaly_pct: f64, thresholds: &Thresholds) -> Status {
    classify_with(thresholds.bloom_bands(), anomaly_pct)
}

#[must_use]
pub fn classify_health(anomaly_pct: f64, thresholds: &Thresholds) -> Status {
    classify_with(thresholds.health_bands(), anomaly_pct)
}

#[must_use]
pub fn classify_oxygen(minimum: f64, thresholds: &Thresholds) -> Status {
    classify_with(thresholds.oxygen_bands(), minimum)
}

#[must_use]
pub fn classify_peak(peak: f64, thresholds: &Thresholds) -> Status {
    classify_with(thresholds.peak_bands(), peak)
}

/// Predicted change of fisheries yield in percent.
///
/// Positive predictions are damped: ecosystems take time to recover but crash
/// quickly.
#[must_use]
pub fn yield_forecast(anomaly_fraction: f64, thresholds: &Thresholds) -> f64 {
    let forecast = anomaly_fraction * thresholds.trophic_sensitivity * 100.0;
    if forecast > 0.0 {
        forecast * thresholds.optimism_damping
    } else {
        forecast
    }
}

/// Surface and deep nitrate during the bloom window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Upwelling {
    pub surface: f64,
    pub deep: f64,
    pub gradient: f64,
    pub status: Status,
}

/// Upwelling rules, first match wins:
/// efficient utilization, very strong upwelling, nutrient limitation.
#[must_use]
pub fn classify_upwelling(surface: f64, gradient: f64, thresholds: &Thresholds) -> Status {
    let depleted = surface < thresholds.nutrient_limit;
    if depleted && gradient > thresholds.efficient_gradient {
        Status::EfficientUtilization
    } else if gradient > thresholds.strong_gradient {
        Status::VeryStrongUpwelling
    } else if depleted {
        Status::NutrientLimitation
    } else {
        Status::NutrientsAvailable
    }
}

pub fn upwelling(
    surface: &ReducedSeries,
    deep: &ReducedSeries,
    window: (NaiveDate, NaiveDate),
    thresholds: &Thresholds,
) -> Metric<Upwelling> {
    let surface_mean = surface.window(window.0, window.1).mean();
    let deep_mean = deep.window(window.0, window.1).mean();
    match (surface_mean, deep_mean) {
        (Some(surface), Some(deep)) => {
            let gradient = deep - surface;
            Metric::Available(Upwelling {
                surface,
                deep,
                gradient,
                status: classify_upwelling(surface, gradient, thresholds),
            })
        }
        _ => Metric::unavailable(format!(
            "no valid nitrate data between {} and {}",
            window.0, window.1
        )),
    }
}

/// Oxygen minimum over the whole period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OxygenCheck {
    pub minimum: f64,
    pub minimum_at: NaiveDateTime,
    pub mean: f64,
    pub status: Status,
}

pub fn hypoxia_check(oxygen: &ReducedSeries, thresholds: &Thresholds) -> Metric<OxygenCheck> {
    match (oxygen.min(), oxygen.mean()) {
        (Some((minimum_at, minimum)), Some(mean)) => Metric::Available(OxygenCheck {
            minimum,
            minimum_at,
            mean,
            status: classify_oxygen(minimum, thresholds),
        }),
        _ => Metric::unavailable(format!("no valid {} data", oxygen.label)),
    }
}

/// Weekly chlorophyll overview of one zone
#[derive(Debug, Clone, PartialEq)]
pub struct ChlorophyllSummary {
    pub zone: String,
    pub series: Metric<ReducedSeries>,
    pub mean: Option<f64>,
    pub peak: Option<(NaiveDateTime, f64)>,
    pub status: Option<Status>,
}

impl ChlorophyllSummary {
    pub fn new(zone: &str, series: Metric<ReducedSeries>, thresholds: &Thresholds) -> Self {
        let (mean, peak) = match &series {
            Metric::Available(s) => (s.mean(), s.max()),
            Metric::Unavailable(_) => (None, None),
        };
        Self {
            zone: zone.to_string(),
            series,
            mean,
            peak,
            status: peak.map(|(_, value)| classify_peak(value, thresholds)),
        }
    }
}

/// One row of the fisheries forecast table
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub zone: String,
    pub series: Metric<ReducedSeries>,
    /// Bloom-window chlorophyll against the healthy baseline
    pub anomaly: Metric<BloomAnomaly>,
    pub health: Option<Status>,
    pub yield_forecast: Option<f64>,
}

impl ForecastRow {
    pub fn new(
        zone: &str,
        series: Metric<ReducedSeries>,
        window: (NaiveDate, NaiveDate),
        thresholds: &Thresholds,
    ) -> Self {
        let anomaly = series.as_ref().and_then(|s| {
            bloom_anomaly(s, window, AnomalyBaseline::Constant(thresholds.baseline_chl))
        });
        let health = anomaly
            .available()
            .map(|a| classify_health(a.anomaly_pct, thresholds));
        let yield_forecast = anomaly
            .available()
            .map(|a| yield_forecast(a.fraction(), thresholds));
        Self {
            zone: zone.to_string(),
            series,
            anomaly,
            health,
            yield_forecast,
        }
    }
}

/// Integrated production of the water column
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub series: ReducedSeries,
    /// Set when chlorophyll stood in for missing primary production
    pub proxy: Option<String>,
    pub bloom: Metric<BloomAnomaly>,
    pub status: Option<Status>,
}

impl Production {
    pub fn new(
        series: ReducedSeries,
        proxy: Option<String>,
        window: (NaiveDate, NaiveDate),
        thresholds: &Thresholds,
    ) -> Self {
        let bloom = bloom_anomaly(&series, window, AnomalyBaseline::SeriesMean);
        let status = bloom
            .available()
            .map(|b| classify_bloom(b.anomaly_pct, thresholds));
        Self {
            series,
            proxy,
            bloom,
            status,
        }
    }
}

/// Nitrate profile of the water column
#[derive(Debug, Clone, PartialEq)]
pub struct Nutrients {
    pub surface: ReducedSeries,
    pub deep: ReducedSeries,
    pub surface_depth: Option<f64>,
    pub deep_depth: Option<f64>,
    pub upwelling: Metric<Upwelling>,
}

/// Oxygen at habitat depth
#[derive(Debug, Clone, PartialEq)]
pub struct Oxygen {
    pub series: ReducedSeries,
    pub depth: Option<f64>,
    pub check: Metric<OxygenCheck>,
}

/// Results of the water-column analysis of one zone
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    pub zone: String,
    pub year: i32,
    pub window: (NaiveDate, NaiveDate),
    pub production: Metric<Production>,
    pub nutrients: Metric<Nutrients>,
    pub oxygen: Metric<Oxygen>,
}

impl ProfileReport {
    /// True when not a single panel has data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.production.is_available()
            && !self.nutrients.is_available()
            && !self.oxygen.is_available()
    }
}
