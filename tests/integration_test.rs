use bgc_zones::config::{AnalysisConfig, Zone};
use bgc_zones::dataset::ReducedSeries;
use bgc_zones::diagnostics::{Metric, Status};
use bgc_zones::errors::BgcError;
use bgc_zones::metadata::Quantity;
use bgc_zones::netcdf_io::{write_series_to_netcdf, EXPORT_FILL_VALUE};
use bgc_zones::pipeline::{
    inspect, load_quantity, run_chlorophyll, run_forecast, run_profile, save_outputs, Analysis,
    ProfileFiles, BIO_FILE, NUTRIENT_FILE, PRODUCTION_FILE,
};
use bgc_zones::statistics::zonal_mean;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use netcdf::{create, open};
use std::path::Path;
use tempfile::tempdir;

const FILL: f32 = -32767.0;
const LATS: [f32; 3] = [17.5, 17.0, 16.5];
const LONS: [f32; 3] = [72.0, 72.5, 73.0];

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_time(NaiveTime::MIN)
}

fn coast() -> Zone {
    Zone::new("Coast", [16.4, 17.6], [71.9, 72.6])
}

fn config_2025(zones: Vec<Zone>) -> AnalysisConfig {
    AnalysisConfig {
        year: Some(2025),
        zones,
        profile_zone: Zone::new("Ratnagiri", [17.6, 16.4], [71.9, 73.1]),
        ..AnalysisConfig::default()
    }
}

/// A 2-D satellite-style grid dated only by its file name.
fn write_daily(path: &Path, var_name: &str, lons: &[f32], values: &[f32]) {
    let mut file = create(path).expect("Failed to create NetCDF file");
    file.add_dimension("lat", LATS.len())
        .expect("Failed to add dimension lat");
    file.add_dimension("lon", lons.len())
        .expect("Failed to add dimension lon");

    let mut lat = file
        .add_variable::<f32>("lat", &["lat"])
        .expect("Failed to add lat");
    lat.put_values(&LATS, ..).expect("Failed to write lat");
    let mut lon = file
        .add_variable::<f32>("lon", &["lon"])
        .expect("Failed to add lon");
    lon.put_values(lons, ..).expect("Failed to write lon");

    let mut var = file
        .add_variable::<f32>(var_name, &["lat", "lon"])
        .expect("Failed to add variable");
    var.put_attribute("units", "mg m^-3")
        .expect("Failed to add units");
    var.put_attribute("_FillValue", FILL)
        .expect("Failed to add fill value");
    var.put_values(values, ..).expect("Failed to write data");
}

/// Chlorophyll of `value` everywhere except the land column at 73°E.
fn coastal_values(value: f32) -> Vec<f32> {
    (0..LATS.len() * LONS.len())
        .map(|i| if i % LONS.len() == 2 { FILL } else { value })
        .collect()
}

const DEPTHS: [f32; 3] = [0.0, 50.0, 100.0];

/// A 4-D model product with two weekly time steps in October 2025.
///
/// Each variable is uniform in space; `profile` gives the value per depth level.
fn write_model(path: &Path, lats: &[f32], variables: &[(&str, [f32; 3])]) {
    let reference = at(1950, 1, 1);
    let hours: Vec<f64> = [at(2025, 10, 5), at(2025, 10, 12)]
        .iter()
        .map(|t| (*t - reference).num_hours() as f64)
        .collect();

    let mut file = create(path).expect("Failed to create NetCDF file");
    file.add_dimension("time", hours.len())
        .expect("Failed to add dimension time");
    file.add_dimension("depth", DEPTHS.len())
        .expect("Failed to add dimension depth");
    file.add_dimension("latitude", lats.len())
        .expect("Failed to add dimension latitude");
    file.add_dimension("longitude", LONS.len())
        .expect("Failed to add dimension longitude");

    let mut time = file
        .add_variable::<f64>("time", &["time"])
        .expect("Failed to add time");
    time.put_attribute("units", "hours since 1950-01-01")
        .expect("Failed to add time units");
    time.put_values(&hours, ..).expect("Failed to write time");

    let mut depth = file
        .add_variable::<f32>("depth", &["depth"])
        .expect("Failed to add depth");
    depth.put_values(&DEPTHS, ..).expect("Failed to write depth");
    let mut lat = file
        .add_variable::<f32>("latitude", &["latitude"])
        .expect("Failed to add latitude");
    lat.put_values(lats, ..).expect("Failed to write latitude");
    let mut lon = file
        .add_variable::<f32>("longitude", &["longitude"])
        .expect("Failed to add longitude");
    lon.put_values(&LONS, ..).expect("Failed to write longitude");

    let cells = lats.len() * LONS.len();
    for (name, profile) in variables {
        let values: Vec<f32> = (0..hours.len())
            .flat_map(|_| profile.iter().flat_map(move |v| std::iter::repeat(*v).take(cells)))
            .collect();
        let mut var = file
            .add_variable::<f32>(name, &["time", "depth", "latitude", "longitude"])
            .expect("Failed to add variable");
        var.put_values(&values, ..).expect("Failed to write data");
    }
}

#[test]
fn test_load_orders_files_by_name_date() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();

    // Both naming layouts, written out of chronological order
    write_daily(&dir.join("A2025003.L3m_CHL.nc"), "chlor_a", &LONS, &[3.0; 9]);
    write_daily(&dir.join("AQUA_MODIS.20250101.L3m.CHL.nc"), "chlor_a", &LONS, &[1.0; 9]);
    write_daily(&dir.join("A2025002.L3m_CHL.nc"), "chlor_a", &LONS, &[2.0; 9]);
    // No date in the name: skipped, not fatal
    write_daily(&dir.join("climatology.nc"), "chlor_a", &LONS, &[9.0; 9]);

    let raster = load_quantity(dir.to_str().unwrap(), Quantity::Chlorophyll)
        .expect("Failed to load chlorophyll");
    assert_eq!(
        raster.times,
        vec![at(2025, 1, 1), at(2025, 1, 2), at(2025, 1, 3)]
    );
    assert_eq!(raster.data.dim(), (3, 1, 3, 3));
    assert_eq!(raster.units.as_deref(), Some("mg m^-3"));
    assert_eq!(zonal_mean(&raster).values, vec![1.0, 2.0, 3.0]);

    // A glob pattern selects the same files
    let pattern = dir.join("A2025*.nc");
    let raster = load_quantity(pattern.to_str().unwrap(), Quantity::Chlorophyll)
        .expect("Failed to load from pattern");
    assert_eq!(raster.times, vec![at(2025, 1, 2), at(2025, 1, 3)]);
}

#[test]
fn test_fill_values_are_masked() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("AQUA_MODIS.20251015.L3m.CHL.nc");
    let values = [FILL, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 10.0];
    write_daily(&path, "chlor_a", &LONS, &values);

    let raster = load_quantity(path.to_str().unwrap(), Quantity::Chlorophyll)
        .expect("Failed to load chlorophyll");
    assert!(raster.data[[0, 0, 0, 0]].is_nan());
    assert_eq!(raster.times, vec![at(2025, 10, 15)]);

    let mean = zonal_mean(&raster).values[0];
    assert!((mean - 17.0 / 8.0).abs() < 1e-9);
}

#[test]
fn test_mismatched_grid_is_skipped() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    write_daily(&dir.join("A2025001.nc"), "chlor_a", &LONS, &[1.0; 9]);
    write_daily(&dir.join("A2025002.nc"), "chlor_a", &LONS, &[2.0; 9]);
    write_daily(
        &dir.join("A2025003.nc"),
        "chlor_a",
        &[72.0, 72.5, 73.0, 73.5],
        &[3.0; 12],
    );

    let raster = load_quantity(dir.to_str().unwrap(), Quantity::Chlorophyll)
        .expect("Failed to load chlorophyll");
    assert_eq!(raster.n_times(), 2);
    assert_eq!(raster.longitudes.len(), 3);
}

#[test]
fn test_discovery_failures() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();

    let result = load_quantity(dir.to_str().unwrap(), Quantity::Chlorophyll);
    assert!(matches!(result, Err(BgcError::NoInputFiles { .. })));

    write_daily(&dir.join("climatology.nc"), "chlor_a", &LONS, &[1.0; 9]);
    let result = load_quantity(dir.to_str().unwrap(), Quantity::Chlorophyll);
    match result {
        Err(e @ BgcError::NoUsableData { .. }) => assert!(e.is_fatal()),
        other => panic!("expected NoUsableData, got {other:?}"),
    }
}

/// A daily grid with its own CF time axis holding `days` since 1950.
fn write_timed(path: &Path, days: &[f64]) {
    let mut file = create(path).expect("Failed to create NetCDF file");
    file.add_dimension("time", days.len())
        .expect("Failed to add dimension time");
    file.add_dimension("lat", LATS.len())
        .expect("Failed to add dimension lat");
    file.add_dimension("lon", LONS.len())
        .expect("Failed to add dimension lon");

    let mut time = file
        .add_variable::<f64>("time", &["time"])
        .expect("Failed to add time");
    time.put_attribute("units", "days since 1950-01-01")
        .expect("Failed to add time units");
    time.put_values(days, ..).expect("Failed to write time");
    let mut lat = file
        .add_variable::<f32>("lat", &["lat"])
        .expect("Failed to add lat");
    lat.put_values(&LATS, ..).expect("Failed to write lat");
    let mut lon = file
        .add_variable::<f32>("lon", &["lon"])
        .expect("Failed to add lon");
    lon.put_values(&LONS, ..).expect("Failed to write lon");

    let values = vec![5.0_f32; days.len() * LATS.len() * LONS.len()];
    let mut var = file
        .add_variable::<f32>("chlor_a", &["time", "lat", "lon"])
        .expect("Failed to add variable");
    var.put_values(&values, ..).expect("Failed to write data");
}

#[test]
fn test_undecodable_time_skips_file() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    write_daily(&dir.join("A2025001.nc"), "chlor_a", &LONS, &[1.0; 9]);
    write_daily(&dir.join("A2025002.nc"), "chlor_a", &LONS, &[2.0; 9]);
    // Two steps, the second far outside any representable date
    write_timed(&dir.join("A2025003.nc"), &[27394.0, 1e12]);

    let raster = load_quantity(dir.to_str().unwrap(), Quantity::Chlorophyll)
        .expect("One bad time axis must not abort the load");
    assert_eq!(raster.times, vec![at(2025, 1, 1), at(2025, 1, 2)]);
    assert_eq!(zonal_mean(&raster).values, vec![1.0, 2.0]);

    // A single bad step falls back to the date in the file name
    let single = temp_dir.path().join("single");
    std::fs::create_dir(&single).expect("Failed to create dir");
    write_timed(&single.join("A2025004.nc"), &[f64::MAX]);
    let raster = load_quantity(single.to_str().unwrap(), Quantity::Chlorophyll)
        .expect("Failed to load with the file-name date");
    assert_eq!(raster.times, vec![at(2025, 1, 4)]);
}

#[test]
fn test_missing_variable_reports_available_names() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    write_daily(&dir.join("A2025280.nc"), "sst", &LONS, &[28.0; 9]);

    match load_quantity(dir.to_str().unwrap(), Quantity::Chlorophyll) {
        Err(BgcError::VariableNotFound { available, .. }) => {
            assert_eq!(available, vec!["sst".to_string()]);
        }
        other => panic!("expected VariableNotFound, got {other:?}"),
    }

    // Not fatal for an analysis: every zone is reported as unavailable
    let run = run_forecast(dir.to_str().unwrap(), &config_2025(vec![coast()]))
        .expect("Forecast should not abort");
    assert_eq!(run.rows.len(), 1);
    assert!(!run.rows[0].series.is_available());
    assert!(run.report().contains("UNAVAILABLE"));
}

fn write_october(dir: &Path) {
    for name in [
        "AQUA_MODIS.20251006.L3m.CHL.nc",
        "A2025281.L3m_CHL.nc",
        "AQUA_MODIS.20251015.L3m.CHL.nc",
    ] {
        write_daily(&dir.join(name), "chlor_a", &LONS, &coastal_values(2.5));
    }
}

#[test]
fn test_forecast_end_to_end() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    write_october(dir);

    let zones = vec![
        coast(),
        Zone::new("Land", [16.4, 17.6], [72.9, 73.1]),
        Zone::new("Offshore", [10.0, 11.0], [72.0, 73.0]),
    ];
    let run = run_forecast(dir.to_str().unwrap(), &config_2025(zones))
        .expect("Failed to run forecast");

    let coast_row = &run.rows[0];
    let series = coast_row.series.available().expect("Coast should have data");
    // 2025-10-06 and 2025-10-08 fall in the week ending 10-12, 10-15 in the next
    assert_eq!(series.times, vec![at(2025, 10, 12), at(2025, 10, 19)]);
    assert_eq!(series.values, vec![2.5, 2.5]);
    assert_eq!(coast_row.health, Some(Status::Stable));
    assert!((coast_row.yield_forecast.unwrap() - 4.0).abs() < 1e-6);

    match &run.rows[1].series {
        Metric::Unavailable(reason) => assert!(reason.contains("only missing values")),
        Metric::Available(_) => panic!("the land zone must be unavailable"),
    }
    assert!(run.rows[1].yield_forecast.is_none());
    assert!(!run.rows[2].series.is_available());

    let report = run.report();
    assert!(report.contains("PREDICTIVE GOVERNANCE REPORT"));
    assert!(report.contains("+4.0% Growth"));
    assert_eq!(run.default_chart_name(), "fisheries_forecast_2025.png");

    // Export the one available series and read it back
    let out = dir.join("series.nc");
    write_series_to_netcdf(&run.series(), &out).expect("Failed to export series");
    let file = open(&out).expect("Failed to open exported file");
    let var = file
        .variable("coast_chlor_a_weekly")
        .expect("Exported variable not found");
    let values = var.get_values::<f32, _>(..).expect("Failed to read values");
    assert_eq!(values, vec![2.5, 2.5]);
    assert!(file.variable("time").is_some());
}

#[test]
fn test_unwritable_chart_still_exports() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    write_october(dir);

    let run = run_forecast(dir.to_str().unwrap(), &config_2025(vec![coast()]))
        .expect("Failed to run forecast");
    let chart = dir.join("no_such_dir").join("chart.png");
    let out = dir.join("series.nc");

    save_outputs(&run, Some(chart.as_path()), Some(out.as_path()))
        .expect("A chart failure must not fail the run");
    assert!(!chart.exists());
    let file = open(&out).expect("Export should still be written");
    assert!(file.variable("coast_chlor_a_weekly").is_some());

    // Without any output requested nothing is touched
    save_outputs(&run, None, None).expect("Nothing to save");
}

#[test]
fn test_chlorophyll_overview() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    write_october(dir);

    let zones = vec![coast(), Zone::new("Offshore", [10.0, 11.0], [72.0, 73.0])];
    let run = run_chlorophyll(dir.to_str().unwrap(), &config_2025(zones))
        .expect("Failed to run chlorophyll overview");

    let summary = &run.summaries[0];
    assert_eq!(summary.mean, Some(2.5));
    assert_eq!(summary.peak, Some((at(2025, 10, 12), 2.5)));
    assert_eq!(summary.status, Some(Status::HealthyNormal));
    assert!(run.summaries[1].status.is_none());

    let report = run.report();
    assert!(report.contains("ZONE: Coast"));
    assert!(report.contains("HEALTHY/NORMAL"));
    assert!(report.contains("ZONE: Offshore"));
    assert_eq!(run.series().len(), 1);
}

#[test]
fn test_year_is_required() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_october(temp_dir.path());

    let config = AnalysisConfig::default();
    let result = run_forecast(temp_dir.path().to_str().unwrap(), &config);
    assert!(matches!(result, Err(BgcError::InvalidConfig { .. })));
}

fn profile_files(dir: &Path) -> ProfileFiles {
    ProfileFiles::in_dir(dir, BIO_FILE, NUTRIENT_FILE, PRODUCTION_FILE)
}

#[test]
fn test_profile_end_to_end() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    write_model(
        &dir.join(PRODUCTION_FILE),
        &LATS,
        &[("nppv", [3.0, 3.0, 3.0]), ("o2", [200.0, 45.0, 30.0])],
    );
    write_model(&dir.join(NUTRIENT_FILE), &LATS, &[("no3", [0.2, 5.0, 13.0])]);
    write_model(&dir.join(BIO_FILE), &LATS, &[("chl", [1.0, 1.0, 1.0])]);

    let run = run_profile(&profile_files(dir), &config_2025(vec![coast()]))
        .expect("Failed to run profile analysis");

    let production = run.report.production.available().expect("production");
    assert!(production.proxy.is_none());
    assert_eq!(production.series.label, "nppv");
    assert!(production
        .series
        .values
        .iter()
        .all(|v| (v - 300.0).abs() < 1e-6));

    let nutrients = run.report.nutrients.available().expect("nutrients");
    assert_eq!(nutrients.surface_depth, Some(0.0));
    assert_eq!(nutrients.deep_depth, Some(100.0));
    let upwelling = nutrients.upwelling.available().expect("upwelling");
    assert_eq!(upwelling.status, Status::EfficientUtilization);

    let oxygen = run.report.oxygen.available().expect("oxygen");
    assert_eq!(oxygen.depth, Some(50.0));
    assert_eq!(oxygen.check.available().unwrap().status, Status::Hypoxic);

    let report = run.report();
    assert!(report.contains("RATNAGIRI ZONE (2025)"));
    assert!(report.contains("DIAGNOSIS: EFFICIENT UTILIZATION"));
    assert!(report.contains("ALERT: HYPOXIC events detected"));
    assert_eq!(run.series().len(), 4);
    assert_eq!(run.default_chart_name(), "ratnagiri_biogeochem_2025.png");
}

#[test]
fn test_profile_falls_back_to_chlorophyll() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    write_model(
        &dir.join(PRODUCTION_FILE),
        &LATS,
        &[("nppv", [0.0, 0.0, 0.0]), ("o2", [200.0, 150.0, 100.0])],
    );
    write_model(&dir.join(BIO_FILE), &LATS, &[("chl", [1.0, 1.0, 1.0])]);
    // No nutrient product at all

    let run = run_profile(&profile_files(dir), &config_2025(vec![coast()]))
        .expect("Failed to run profile analysis");

    let production = run.report.production.available().expect("production");
    assert_eq!(production.proxy.as_deref(), Some("chl"));
    assert!((production.series.values[0] - 100.0).abs() < 1e-6);

    assert!(!run.report.nutrients.is_available());
    let oxygen = run.report.oxygen.available().expect("oxygen");
    assert_eq!(oxygen.check.available().unwrap().status, Status::Healthy);

    let report = run.report();
    assert!(report.contains("chl used as productivity proxy"));
    assert!(report.contains("2. UPWELLING STATUS: No data available"));
    assert!(report.contains("OXYGEN: HEALTHY levels throughout"));
}

#[test]
fn test_profile_rejects_misaligned_products() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    write_model(
        &dir.join(PRODUCTION_FILE),
        &LATS,
        &[("nppv", [3.0, 3.0, 3.0]), ("o2", [200.0, 150.0, 100.0])],
    );
    write_model(
        &dir.join(NUTRIENT_FILE),
        &[17.75, 17.25, 16.75],
        &[("no3", [0.2, 5.0, 13.0])],
    );

    match run_profile(&profile_files(dir), &config_2025(vec![coast()])) {
        Err(e @ BgcError::Alignment { .. }) => {
            assert!(e.is_fatal());
            assert!(e.to_string().contains("latitude"));
        }
        other => panic!("expected Alignment error, got {other:?}"),
    }
}

#[test]
fn test_profile_without_data() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();

    let result = run_profile(&profile_files(dir), &config_2025(vec![coast()]));
    assert!(matches!(result, Err(BgcError::NoUsableData { .. })));

    // Products exist but the zone misses the grid: nothing to plot
    write_model(
        &dir.join(PRODUCTION_FILE),
        &LATS,
        &[("nppv", [3.0, 3.0, 3.0]), ("o2", [200.0, 150.0, 100.0])],
    );
    let mut config = config_2025(vec![coast()]);
    config.profile_zone = Zone::new("Elsewhere", [10.0, 11.0], [72.0, 73.0]);
    let run = run_profile(&profile_files(dir), &config).expect("Failed to run profile");
    assert!(run.report.is_empty());

    let chart = dir.join("chart.png");
    run.plot(&chart).expect("An empty report skips the chart");
    assert!(!chart.exists());
}

#[test]
fn test_inspect_zone_means() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("AQUA_MODIS.20251015.L3m.CHL.nc");
    write_daily(&path, "chlor_a", &LONS, &coastal_values(2.5));

    let zones = vec![coast(), Zone::new("Offshore", [10.0, 11.0], [72.0, 73.0])];
    let means = inspect(&path, None, &zones).expect("Failed to inspect file");
    assert_eq!(means.len(), 2);
    let series = means[0].series.available().expect("Coast mean");
    assert_eq!(series.values, vec![2.5]);
    assert!(!means[1].series.is_available());

    let result = inspect(&path, Some("sst"), &zones);
    assert!(matches!(result, Err(BgcError::VariableNotFound { .. })));
}

#[test]
fn test_export_marks_missing_values() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let out = temp_dir.path().join("export.nc");

    let times = vec![at(2025, 10, 5), at(2025, 10, 12)];
    let series = vec![
        ReducedSeries::new("Mumbai chl", times.clone(), vec![1.5, f64::NAN]),
        ReducedSeries::new("Mumbai chl", times, vec![2.0, 3.0])
            .with_units(Some("mg m^-3".to_string())),
    ];
    write_series_to_netcdf(&series, &out).expect("Failed to export series");

    let file = open(&out).expect("Failed to open exported file");
    let first = file.variable("mumbai_chl").expect("First series not found");
    let values = first.get_values::<f32, _>(..).expect("Failed to read values");
    assert_eq!(values, vec![1.5, EXPORT_FILL_VALUE]);

    // Same label twice: the second gets a distinct name on the shared time axis
    let second = file.variable("mumbai_chl_").expect("Second series not found");
    assert_eq!(second.dimensions()[0].name(), "time");
    assert!(file.variable("time2").is_none());
}
