//! Creates a synthetic data set for trying out bgc-zones.
//!
//! Writes two directories:
//!
//! - `sample_data/daily/`: one chlorophyll grid per 4 days from September to
//!   December, half of them named `A2025DDD.L3m_CHL.nc` (day of year), the other
//!   half `AQUA_MODIS.YYYYMMDD.L3m.CHL.nc`, with land east of 73.3°E.
//! - `sample_data/biogeochem/`: the three 3-D model products used by `profile`.
//!
//! Then try:
//!   cargo run -- chlorophyll --input sample_data/daily --year 2025
//!   cargo run -- forecast --input "sample_data/daily/*.nc" --year 2025
//!   cargo run -- profile --data-dir sample_data/biogeochem --year 2025

use chrono::{Datelike, Duration, NaiveDate};
use netcdf::create;
use std::f32::consts::PI;
use std::fs;
use std::path::Path;

const FILL: f32 = -32767.0;

fn lats() -> Vec<f32> {
    // North to south, as in the satellite products
    (0..21).map(|i| 20.0 - i as f32 * 0.25).collect()
}

fn lons() -> Vec<f32> {
    (0..11).map(|i| 71.0 + i as f32 * 0.25).collect()
}

fn add_grid(file: &mut netcdf::FileMut, lat_name: &str, lon_name: &str) -> Result<(), netcdf::Error> {
    let (lat, lon) = (lats(), lons());
    file.add_dimension(lat_name, lat.len())?;
    file.add_dimension(lon_name, lon.len())?;

    let mut lat_var = file.add_variable::<f32>(lat_name, &[lat_name])?;
    lat_var.put_attribute("units", "degrees_north")?;
    lat_var.put_values(&lat, ..)?;

    let mut lon_var = file.add_variable::<f32>(lon_name, &[lon_name])?;
    lon_var.put_attribute("units", "degrees_east")?;
    lon_var.put_values(&lon, ..)?;
    Ok(())
}

/// Seasonal chlorophyll: low in summer, a bloom around late October.
fn chlorophyll(date: NaiveDate, lat: f32) -> f32 {
    let day = date.ordinal() as f32;
    let bloom = (-((day - 300.0) / 25.0).powi(2)).exp();
    let coastal = 1.0 + (19.5 - lat).abs() * 0.1;
    0.4 + 2.2 * bloom * coastal
}

fn write_daily(dir: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    let start = NaiveDate::from_ymd_opt(2025, 9, 1).ok_or("invalid start date")?;
    let (lat, lon) = (lats(), lons());
    let mut written = 0;

    for step in 0..30 {
        let date = start + Duration::days(step * 4);
        let name = if step % 2 == 0 {
            format!("A{}{:03}.L3m_CHL.nc", date.year(), date.ordinal())
        } else {
            format!("AQUA_MODIS.{}.L3m.CHL.nc", date.format("%Y%m%d"))
        };
        let path = dir.join(name);
        if path.exists() {
            fs::remove_file(&path)?;
        }

        let mut file = create(&path)?;
        file.add_attribute("title", "Synthetic chlorophyll-a")?;
        add_grid(&mut file, "lat", "lon")?;

        let mut values = Vec::with_capacity(lat.len() * lon.len());
        for (i, &y) in lat.iter().enumerate() {
            for (j, &x) in lon.iter().enumerate() {
                // Land, plus a cloud band moving south over time
                let cloudy = (i + j + step as usize) % 7 == 0;
                values.push(if x > 73.3 || cloudy { FILL } else { chlorophyll(date, y) });
            }
        }
        let mut var = file.add_variable::<f32>("chlor_a", &["lat", "lon"])?;
        var.put_attribute("units", "mg m^-3")?;
        var.put_attribute("long_name", "Chlorophyll Concentration, OCI Algorithm")?;
        var.put_attribute("_FillValue", FILL)?;
        var.put_values(&values, ..)?;
        written += 1;
    }
    Ok(written)
}

const DEPTHS: [f32; 7] = [0.494, 10.0, 25.0, 50.0, 75.0, 100.0, 150.0];

fn write_model_product(
    path: &Path,
    variables: &[(&str, &str, fn(NaiveDate, f32) -> f32)],
) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    let reference = NaiveDate::from_ymd_opt(1950, 1, 1).ok_or("invalid reference date")?;
    let dates: Vec<NaiveDate> = (0..52)
        .filter_map(|w| NaiveDate::from_ymd_opt(2025, 1, 5).map(|d| d + Duration::weeks(w)))
        .collect();
    let (lat, lon) = (lats(), lons());

    let mut file = create(path)?;
    file.add_attribute("title", "Synthetic biogeochemistry")?;
    file.add_dimension("time", dates.len())?;
    file.add_dimension("depth", DEPTHS.len())?;
    add_grid(&mut file, "latitude", "longitude")?;

    let hours: Vec<f64> = dates
        .iter()
        .map(|d| (*d - reference).num_hours() as f64)
        .collect();
    let mut time_var = file.add_variable::<f64>("time", &["time"])?;
    time_var.put_attribute("units", "hours since 1950-01-01")?;
    time_var.put_attribute("calendar", "gregorian")?;
    time_var.put_values(&hours, ..)?;

    let mut depth_var = file.add_variable::<f32>("depth", &["depth"])?;
    depth_var.put_attribute("units", "m")?;
    depth_var.put_attribute("positive", "down")?;
    depth_var.put_values(&DEPTHS, ..)?;

    for (name, units, profile) in variables {
        let mut values = Vec::with_capacity(dates.len() * DEPTHS.len() * lat.len() * lon.len());
        for &date in &dates {
            for &depth in &DEPTHS {
                for _ in &lat {
                    for &x in &lon {
                        values.push(if x > 73.3 { FILL } else { profile(date, depth) });
                    }
                }
            }
        }
        let mut var = file.add_variable::<f32>(name, &["time", "depth", "latitude", "longitude"])?;
        var.put_attribute("units", *units)?;
        var.put_attribute("_FillValue", FILL)?;
        var.put_values(&values, ..)?;
    }
    Ok(())
}

fn season(date: NaiveDate) -> f32 {
    (2.0 * PI * (date.ordinal() as f32 - 200.0) / 365.0).cos()
}

fn chl_profile(date: NaiveDate, depth: f32) -> f32 {
    (0.3 + 0.5 * (1.0 + season(date))) * (-depth / 40.0).exp()
}

fn phyc_profile(date: NaiveDate, depth: f32) -> f32 {
    chl_profile(date, depth) * 1.8
}

fn no3_profile(date: NaiveDate, depth: f32) -> f32 {
    0.2 + depth / 150.0 * (18.0 + 6.0 * season(date))
}

fn nppv_profile(date: NaiveDate, depth: f32) -> f32 {
    (10.0 + 8.0 * (1.0 + season(date))) * (-depth / 30.0).exp()
}

fn o2_profile(date: NaiveDate, depth: f32) -> f32 {
    210.0 - depth * (1.2 + 0.4 * season(date))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = Path::new("sample_data");

    println!("🔨 Creating synthetic daily chlorophyll files...");
    let written = write_daily(&root.join("daily"))?;
    println!("✅ Wrote {} files to {}", written, root.join("daily").display());

    println!("🔨 Creating synthetic 3-D model products...");
    let bgc = root.join("biogeochem");
    fs::create_dir_all(&bgc)?;
    write_model_product(
        &bgc.join("konkan_bgc_chl_phyc.nc"),
        &[("chl", "mg m-3", chl_profile), ("phyc", "mmol m-3", phyc_profile)],
    )?;
    write_model_product(&bgc.join("konkan_bgc_no3.nc"), &[("no3", "mmol m-3", no3_profile)])?;
    write_model_product(
        &bgc.join("konkan_bgc_nppv_o2.nc"),
        &[("nppv", "mg m-3 day-1", nppv_profile), ("o2", "mmol m-3", o2_profile)],
    )?;
    println!("✅ Wrote model products to {}", bgc.display());

    println!("\n🧪 Try:");
    println!("   cargo run -- chlorophyll --input sample_data/daily --year 2025");
    println!("   cargo run -- profile --data-dir sample_data/biogeochem --year 2025");
    Ok(())
}
