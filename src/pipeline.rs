//! The analyses behind the subcommands
//!
//! Each analysis runs the same stages: discover files, load them one at a time,
//! reduce per zone, classify. Results come back as plain structs implementing
//! [`Analysis`] so the binary can print, plot and export them uniformly.
//!
//! Only errors for which [`BgcError::is_fatal`] holds leave these functions;
//! everything else ends up as a [`Metric::Unavailable`] entry in the result.

use crate::config::{AnalysisConfig, Thresholds, Zone};
use crate::dataset::{Dataset, RasterTimeSeries, ReducedSeries};
use crate::diagnostics::{
    hypoxia_check, upwelling, ChlorophyllSummary, ForecastRow, Metric, Nutrients, Oxygen,
    Production, ProfileReport,
};
use crate::discovery::{date_from_filename, discover, normalize_pattern, DatedFile};
use crate::errors::{BgcError, Result};
use crate::metadata::{list_variables_and_dimensions, Quantity};
use crate::netcdf_io::{data_variable_names, read_raster, write_series_to_netcdf};
use crate::plot;
use crate::report;
use crate::statistics::{
    depth_integrated, depth_sliced, resample_weekly, select_zone, zonal_mean, DepthTarget,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Result of one analysis run
pub trait Analysis {
    /// Text report for stdout
    fn report(&self) -> String;

    /// Render the chart to `path`
    fn plot(&self, path: &Path) -> Result<()>;

    /// Every reduced series, labelled for export
    fn series(&self) -> Vec<ReducedSeries>;

    /// File name used when no chart path is given
    fn default_chart_name(&self) -> String;
}

/// Write the chart and the series export of a finished analysis.
///
/// A chart that cannot be drawn is only logged: the report has already been
/// produced, and the export still runs. Export failures are returned.
pub fn save_outputs(
    outcome: &dyn Analysis,
    chart: Option<&Path>,
    export: Option<&Path>,
) -> Result<()> {
    if let Some(path) = chart {
        if let Err(e) = outcome.plot(path) {
            warn!("Chart {} was not written: {}", path.display(), e);
        }
    }

    if let Some(path) = export {
        write_series_to_netcdf(&outcome.series(), path)?;
    }
    Ok(())
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn date_of(path: &Path) -> Option<NaiveDateTime> {
    path.file_name()
        .and_then(|name| date_from_filename(&name.to_string_lossy()))
        .map(midnight)
}

fn log_summary(zone: &str, series: &ReducedSeries) {
    match (series.mean(), series.min(), series.max()) {
        (Some(mean), Some((_, min)), Some((_, max))) => info!(
            "{} / {}: mean {:.2}, range {:.2} to {:.2} ({} of {} steps valid)",
            zone,
            series.label,
            mean,
            min,
            max,
            series.valid_count(),
            series.len()
        ),
        _ => warn!("{} / {}: every value is missing", zone, series.label),
    }
}

fn with_label(series: &ReducedSeries, label: String) -> ReducedSeries {
    ReducedSeries {
        label,
        ..series.clone()
    }
}

fn open_and_read(
    dated: &DatedFile,
    quantity: Quantity,
    resolved: &mut Option<String>,
) -> Result<RasterTimeSeries> {
    let file = netcdf::open(&dated.path)?;
    let name = match resolved {
        Some(name) => name.clone(),
        None => {
            let available = data_variable_names(&file);
            let name = quantity
                .resolve(&available)
                .ok_or_else(|| BgcError::VariableNotFound {
                    var: quantity.aliases().join("|"),
                    available,
                })?;
            *resolved = Some(name.clone());
            name
        }
    };
    read_raster(&file, &name, Some(midnight(dated.date)))
}

/// Load one quantity from every dated file matching `input`.
///
/// The variable name is resolved on the first readable file and reused for
/// the rest. Files that fail to open or read, or whose grid differs from the
/// first loaded file, are skipped with a warning.
pub fn load_quantity(input: &str, quantity: Quantity) -> Result<RasterTimeSeries> {
    let discovery = discover(input)?;
    info!(
        "Found {} dated files. Loading sequentially...",
        discovery.files.len()
    );

    let mut resolved: Option<String> = None;
    let mut parts: Vec<RasterTimeSeries> = Vec::with_capacity(discovery.files.len());
    let mut skipped = discovery.skipped.len();

    for dated in &discovery.files {
        let raster = match open_and_read(dated, quantity, &mut resolved) {
            Ok(raster) => raster,
            Err(e @ BgcError::VariableNotFound { .. }) if resolved.is_none() => return Err(e),
            Err(e) => {
                warn!("Skipping {} due to error: {}", dated.path.display(), e);
                skipped += 1;
                continue;
            }
        };
        if let Some(first) = parts.first() {
            if let Err(e) = first.check_same_grid(&raster) {
                warn!("Skipping {}: {}", dated.path.display(), e);
                skipped += 1;
                continue;
            }
        }
        debug!("Loaded {} ({})", dated.path.display(), dated.date);
        parts.push(raster);
    }

    if parts.is_empty() {
        return Err(BgcError::NoUsableData {
            input: normalize_pattern(input),
            skipped,
        });
    }
    if skipped > 0 {
        warn!("{} file(s) skipped", skipped);
    }

    let raster = RasterTimeSeries::concat_time(parts)?;
    info!(
        "Successfully compiled '{}' with {} time steps.",
        raster.variable,
        raster.n_times()
    );
    Ok(raster)
}

/// Weekly zonal chlorophyll for every configured zone.
fn weekly_zone_series(
    input: &str,
    zones: &[Zone],
) -> Result<Vec<(String, Metric<ReducedSeries>)>> {
    let weekly = match load_quantity(input, Quantity::Chlorophyll).and_then(|raster| {
        info!("Aggregating data to weekly averages...");
        resample_weekly(&raster)
    }) {
        Err(e) if e.is_fatal() => return Err(e),
        other => other,
    };

    Ok(zones
        .iter()
        .map(|zone| {
            let series: Metric<ReducedSeries> = match &weekly {
                Ok(raster) => select_zone(raster, zone).map(|s| zonal_mean(&s)).into(),
                Err(e) => Metric::unavailable(e.to_string()),
            };
            match &series {
                Metric::Available(s) => log_summary(&zone.name, s),
                Metric::Unavailable(reason) => warn!("{}: {}", zone.name, reason),
            }
            (zone.name.clone(), series)
        })
        .collect())
}

/// Weekly chlorophyll overview
#[derive(Debug, Clone)]
pub struct ChlorophyllRun {
    pub year: i32,
    pub window: (NaiveDate, NaiveDate),
    pub summaries: Vec<ChlorophyllSummary>,
}

pub fn run_chlorophyll(input: &str, config: &AnalysisConfig) -> Result<ChlorophyllRun> {
    let year = config.require_year()?;
    let window = config.bloom_dates()?;
    let summaries = weekly_zone_series(input, &config.zones)?
        .into_iter()
        .map(|(zone, series)| ChlorophyllSummary::new(&zone, series, &config.thresholds))
        .collect();
    Ok(ChlorophyllRun {
        year,
        window,
        summaries,
    })
}

impl Analysis for ChlorophyllRun {
    fn report(&self) -> String {
        report::render_chlorophyll_report(&self.summaries)
    }

    fn plot(&self, path: &Path) -> Result<()> {
        plot::plot_chlorophyll(&self.summaries, self.window, self.year, path)
    }

    fn series(&self) -> Vec<ReducedSeries> {
        self.summaries
            .iter()
            .filter_map(|s| {
                s.series
                    .available()
                    .map(|series| with_label(series, format!("{}_{}_weekly", s.zone, series.label)))
            })
            .collect()
    }

    fn default_chart_name(&self) -> String {
        format!("chlorophyll_weekly_{}.png", self.year)
    }
}

/// Fisheries prediction
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub year: i32,
    pub window: (NaiveDate, NaiveDate),
    pub thresholds: Thresholds,
    pub rows: Vec<ForecastRow>,
}

pub fn run_forecast(input: &str, config: &AnalysisConfig) -> Result<ForecastRun> {
    let year = config.require_year()?;
    let window = config.bloom_dates()?;
    let rows = weekly_zone_series(input, &config.zones)?
        .into_iter()
        .map(|(zone, series)| ForecastRow::new(&zone, series, window, &config.thresholds))
        .collect();
    Ok(ForecastRun {
        year,
        window,
        thresholds: config.thresholds,
        rows,
    })
}

impl Analysis for ForecastRun {
    fn report(&self) -> String {
        report::render_forecast_report(&self.rows, &self.thresholds)
    }

    fn plot(&self, path: &Path) -> Result<()> {
        plot::plot_forecast(&self.rows, &self.thresholds, self.year, path)
    }

    fn series(&self) -> Vec<ReducedSeries> {
        self.rows
            .iter()
            .filter_map(|r| {
                r.series
                    .available()
                    .map(|series| with_label(series, format!("{}_{}_weekly", r.zone, series.label)))
            })
            .collect()
    }

    fn default_chart_name(&self) -> String {
        format!("fisheries_forecast_{}.png", self.year)
    }
}

/// Default file names of the three model products.
pub const BIO_FILE: &str = "konkan_bgc_chl_phyc.nc";
pub const NUTRIENT_FILE: &str = "konkan_bgc_no3.nc";
pub const PRODUCTION_FILE: &str = "konkan_bgc_nppv_o2.nc";

/// Model products feeding the water-column analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFiles {
    /// Chlorophyll and phytoplankton
    pub biology: PathBuf,
    /// Nitrate
    pub nutrients: PathBuf,
    /// Primary production and oxygen
    pub production: PathBuf,
}

impl ProfileFiles {
    pub fn in_dir(dir: &Path, biology: &str, nutrients: &str, production: &str) -> Self {
        Self {
            biology: dir.join(biology),
            nutrients: dir.join(nutrients),
            production: dir.join(production),
        }
    }

    fn roles(&self) -> [(&Path, &'static [Quantity]); 3] {
        [
            (self.production.as_path(), &[Quantity::PrimaryProduction, Quantity::Oxygen]),
            (self.nutrients.as_path(), &[Quantity::Nitrate]),
            (self.biology.as_path(), &[Quantity::Chlorophyll]),
        ]
    }
}

/// Variables merged from the model products, by quantity.
#[derive(Debug, Clone, Default)]
pub struct ProfileData {
    pub dataset: Dataset,
    pub names: HashMap<Quantity, String>,
}

impl ProfileData {
    /// The quantity restricted to `zone`.
    pub fn zone_raster(&self, quantity: Quantity, zone: &Zone) -> Result<RasterTimeSeries> {
        let raster = self
            .names
            .get(&quantity)
            .and_then(|name| self.dataset.get(name))
            .ok_or_else(|| BgcError::VariableNotFound {
                var: quantity.aliases().join("|"),
                available: self.dataset.variable_names(),
            })?;
        select_zone(raster, zone)
    }
}

/// Open every product and merge what it holds.
///
/// Missing or unreadable products are skipped with a warning; variables that
/// do not line up with what is already loaded abort the run.
pub fn load_profile_data(files: &ProfileFiles) -> Result<ProfileData> {
    let mut data = ProfileData::default();
    let mut skipped = 0;

    for (path, quantities) in files.roles() {
        if !path.is_file() {
            warn!("Missing {}", path.display());
            skipped += 1;
            continue;
        }
        let file = match netcdf::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Skipping {} due to error: {}", path.display(), e);
                skipped += 1;
                continue;
            }
        };
        let available = data_variable_names(&file);
        for &quantity in quantities {
            let Some(name) = quantity.resolve(&available) else {
                continue;
            };
            match read_raster(&file, &name, date_of(path)) {
                Ok(raster) => {
                    info!(
                        "Loaded {} '{}' from {} ({} time steps)",
                        quantity,
                        name,
                        path.display(),
                        raster.n_times()
                    );
                    data.dataset.insert(raster)?;
                    data.names.insert(quantity, name);
                }
                Err(e) => warn!("Could not read '{}' from {}: {}", name, path.display(), e),
            }
        }
    }

    if data.dataset.is_empty() {
        let dir = files
            .production
            .parent()
            .map_or_else(String::new, |p| p.display().to_string());
        return Err(BgcError::NoUsableData {
            input: dir,
            skipped,
        });
    }
    Ok(data)
}

fn production(
    data: &ProfileData,
    config: &AnalysisConfig,
    window: (NaiveDate, NaiveDate),
) -> Result<Production> {
    let zone = &config.profile_zone;
    let range = (config.depth.integration_min, config.depth.integration_max);
    let integrate = |quantity| {
        data.zone_raster(quantity, zone)
            .and_then(|raster| depth_integrated(&raster, range))
    };

    match integrate(Quantity::PrimaryProduction) {
        Ok(series) if series.mean().is_some_and(|mean| mean != 0.0) => {
            log_summary(&zone.name, &series);
            Ok(Production::new(series, None, window, &config.thresholds))
        }
        primary => {
            match primary {
                Ok(_) => warn!("Integrated primary production is zero or missing, trying chlorophyll"),
                Err(e) => warn!("{}; trying chlorophyll", e),
            }
            let series = integrate(Quantity::Chlorophyll)?;
            log_summary(&zone.name, &series);
            let proxy = series.label.clone();
            Ok(Production::new(series, Some(proxy), window, &config.thresholds))
        }
    }
}

fn nutrients(
    data: &ProfileData,
    config: &AnalysisConfig,
    window: (NaiveDate, NaiveDate),
) -> Result<Nutrients> {
    let raster = data.zone_raster(Quantity::Nitrate, &config.profile_zone)?;
    let (surface, surface_depth) = depth_sliced(&raster, DepthTarget::Surface)?;
    let (deep, deep_depth) =
        depth_sliced(&raster, DepthTarget::Nearest(config.depth.deep_nitrate))?;
    info!(
        "Nitrate levels: surface {:?} m, deep {:?} m",
        surface_depth, deep_depth
    );
    let upwelling = upwelling(&surface, &deep, window, &config.thresholds);
    Ok(Nutrients {
        surface,
        deep,
        surface_depth,
        deep_depth,
        upwelling,
    })
}

fn oxygen(data: &ProfileData, config: &AnalysisConfig) -> Result<Oxygen> {
    let raster = data.zone_raster(Quantity::Oxygen, &config.profile_zone)?;
    let (series, depth) = depth_sliced(&raster, DepthTarget::Nearest(config.depth.oxygen))?;
    log_summary(&config.profile_zone.name, &series);
    let check = hypoxia_check(&series, &config.thresholds);
    Ok(Oxygen {
        series,
        depth,
        check,
    })
}

/// Water-column analysis of the profile zone
#[derive(Debug, Clone)]
pub struct ProfileRun {
    pub report: ProfileReport,
    pub thresholds: Thresholds,
}

pub fn run_profile(files: &ProfileFiles, config: &AnalysisConfig) -> Result<ProfileRun> {
    let year = config.require_year()?;
    let window = config.bloom_dates()?;
    let data = load_profile_data(files)?;
    info!(
        "Merged {} variable(s): {}",
        data.dataset.len(),
        data.dataset.variable_names().join(", ")
    );

    let report = ProfileReport {
        zone: config.profile_zone.name.clone(),
        year,
        window,
        production: production(&data, config, window).into(),
        nutrients: nutrients(&data, config, window).into(),
        oxygen: oxygen(&data, config).into(),
    };
    for (section, reason) in [
        ("production", unavailable_reason(&report.production)),
        ("nutrients", unavailable_reason(&report.nutrients)),
        ("oxygen", unavailable_reason(&report.oxygen)),
    ] {
        if let Some(reason) = reason {
            warn!("{} unavailable: {}", section, reason);
        }
    }

    Ok(ProfileRun {
        report,
        thresholds: config.thresholds,
    })
}

fn unavailable_reason<T>(metric: &Metric<T>) -> Option<&str> {
    match metric {
        Metric::Available(_) => None,
        Metric::Unavailable(reason) => Some(reason.as_str()),
    }
}

impl Analysis for ProfileRun {
    fn report(&self) -> String {
        report::render_profile_report(&self.report)
    }

    fn plot(&self, path: &Path) -> Result<()> {
        if self.report.is_empty() {
            warn!("No data extracted, skipping the chart. Check the zone bounds or the data files");
            return Ok(());
        }
        plot::plot_profile(&self.report, &self.thresholds, path)
    }

    fn series(&self) -> Vec<ReducedSeries> {
        let zone = &self.report.zone;
        let mut out = Vec::new();
        if let Metric::Available(p) = &self.report.production {
            out.push(with_label(&p.series, format!("{zone}_{}_integrated", p.series.label)));
        }
        if let Metric::Available(n) = &self.report.nutrients {
            out.push(with_label(&n.surface, format!("{zone}_{}_surface", n.surface.label)));
            out.push(with_label(&n.deep, format!("{zone}_{}_deep", n.deep.label)));
        }
        if let Metric::Available(o) = &self.report.oxygen {
            out.push(with_label(&o.series, format!("{zone}_{}", o.series.label)));
        }
        out
    }

    fn default_chart_name(&self) -> String {
        format!(
            "{}_biogeochem_{}.png",
            self.report.zone.to_lowercase(),
            self.report.year
        )
    }
}

/// Zone mean of one variable of a single file
#[derive(Debug, Clone)]
pub struct ZoneMean {
    pub zone: String,
    pub series: Metric<ReducedSeries>,
}

/// List the contents of one file and the zone means of one of its variables.
///
/// Without `variable` the chlorophyll variable is used when there is one.
pub fn inspect(path: &Path, variable: Option<&str>, zones: &[Zone]) -> Result<Vec<ZoneMean>> {
    let file = netcdf::open(path)?;
    println!("Successfully opened NetCDF file: {}", path.display());
    list_variables_and_dimensions(&file)?;

    let name = match variable {
        Some(name) => name.to_string(),
        None => match Quantity::Chlorophyll.resolve(&data_variable_names(&file)) {
            Some(name) => name,
            None => return Ok(Vec::new()),
        },
    };
    let raster = read_raster(&file, &name, date_of(path))?;

    println!("\n Zone means of '{}'", name);
    println!("=====================");
    let means: Vec<ZoneMean> = zones
        .iter()
        .map(|zone| ZoneMean {
            zone: zone.name.clone(),
            series: select_zone(&raster, zone).map(|s| zonal_mean(&s)).into(),
        })
        .collect();
    for m in &means {
        match &m.series {
            Metric::Available(series) => match series.mean() {
                Some(mean) => println!(
                    "    {:<12} {:.3} {} ({} time step(s))",
                    m.zone,
                    mean,
                    series.units.as_deref().unwrap_or(""),
                    series.len()
                ),
                None => println!("    {:<12} no valid data", m.zone),
            },
            Metric::Unavailable(reason) => println!("    {:<12} unavailable: {}", m.zone, reason),
        }
    }
    Ok(means)
}
