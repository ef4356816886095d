//! Defines command-line interface options using `clap` for the bgc-zones application.

use bgc_zones::config::Zone;
use bgc_zones::pipeline::{BIO_FILE, NUTRIENT_FILE, PRODUCTION_FILE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Zonal biogeochemistry diagnostics for NetCDF ocean rasters
#[derive(Parser, Debug)]
#[command(
    version,
    name = "bgc-zones",
    about = "Zonal chlorophyll, nutrient and oxygen diagnostics from NetCDF rasters"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file; flags below override its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Analysis year (sets the bloom window)
    #[arg(short, long, global = true, value_parser = parse_year)]
    pub year: Option<i32>,

    /// Zone as NAME:LAT1:LAT2:LON1:LON2. Repeat to define several; replaces the configured zones
    #[arg(long = "zone", global = true, value_parser = parse_zone)]
    pub zones: Vec<Zone>,

    /// Path of the PNG chart. Defaults to a name derived from the analysis
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Do not render a chart
    #[arg(long, global = true, default_value_t = false)]
    pub no_plot: bool,

    /// Write every reduced series to this NetCDF file
    #[arg(long, global = true)]
    pub export_netcdf: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Weekly chlorophyll overview of every zone
    Chlorophyll {
        /// Directory or glob pattern of daily/8-day files, e.g. "Data/*.nc"
        #[arg(short, long)]
        input: String,
    },

    /// Fisheries forecast from bloom-period chlorophyll
    Forecast {
        /// Directory or glob pattern of daily/8-day files, e.g. "Data/*.nc"
        #[arg(short, long)]
        input: String,
    },

    /// Water-column analysis of the profile zone from 3-D model output
    Profile {
        /// Directory holding the model products
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Chlorophyll/phytoplankton product
        #[arg(long, default_value = BIO_FILE)]
        bio: String,

        /// Nitrate product
        #[arg(long, default_value = NUTRIENT_FILE)]
        nut: String,

        /// Primary production/oxygen product
        #[arg(long, default_value = PRODUCTION_FILE)]
        prod: String,
    },

    /// List the contents of one file and the zone means of a variable
    Inspect {
        /// Path to the NetCDF file
        #[arg(short, long)]
        file: PathBuf,

        /// Variable to average; defaults to chlorophyll
        #[arg(long)]
        variable: Option<String>,
    },
}

fn parse_zone(s: &str) -> Result<Zone, String> {
    Zone::parse(s)
}

fn parse_year(s: &str) -> Result<i32, String> {
    let year = s
        .parse::<i32>()
        .map_err(|_| format!("Invalid year '{s}'"))?;
    if (1900..=2099).contains(&year) {
        Ok(year)
    } else {
        Err(format!("Year {year} is outside 1900-2099"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "bgc-zones",
            "forecast",
            "--input",
            "Data",
            "--year",
            "2025",
            "--zone",
            "Goa:15.8:14.9:73.0:74.0",
            "--no-plot",
        ])
        .unwrap();
        assert_eq!(args.year, Some(2025));
        assert!(args.no_plot);
        assert_eq!(args.zones.len(), 1);
        assert_eq!(args.zones[0].name, "Goa");
        assert!(matches!(args.command, Command::Forecast { ref input } if input == "Data"));
    }

    #[test]
    fn profile_defaults_to_model_file_names() {
        let args = Args::try_parse_from(["bgc-zones", "profile", "--data-dir", "biogeochem_data"])
            .unwrap();
        match args.command {
            Command::Profile { bio, nut, prod, .. } => {
                assert_eq!(bio, BIO_FILE);
                assert_eq!(nut, NUTRIENT_FILE);
                assert_eq!(prod, PRODUCTION_FILE);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_year() {
        assert!(parse_year("1850").is_err());
        assert!(parse_year("abc").is_err());
        assert_eq!(parse_year("2024"), Ok(2024));
    }
}
