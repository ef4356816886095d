//! Centralized error handling for bgc_zones
//!
//! Every pipeline stage returns [`Result`]. Whether an error is fatal for the run
//! or only marks one zone/variable as unavailable is decided by the caller; see
//! [`BgcError::is_fatal`].

use std::fmt;

/// Main error type for bgc_zones operations
#[derive(Debug)]
pub enum BgcError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Invalid glob pattern
    PatternError(glob::PatternError),

    /// Malformed JSON configuration
    ConfigParseError(serde_json::Error),

    /// Invalid configuration value
    InvalidConfig { message: String },

    /// The input pattern matched no regular files
    NoInputFiles { pattern: String },

    /// Files were found but none of them could be loaded
    NoUsableData { input: String, skipped: usize },

    /// No date could be recovered from a file name
    UnparseableTimestamp { file: String },

    /// Variable not found under any accepted alias
    VariableNotFound { var: String, available: Vec<String> },

    /// Dimension not found in variable
    DimensionNotFound { var: String, dim: String },

    /// Zone bounds select no grid points at all
    EmptySelection {
        zone: String,
        lat: (f64, f64),
        lon: (f64, f64),
    },

    /// Zone bounds select only missing cells (typically land)
    ZoneAllMissing {
        zone: String,
        var: String,
        lat: (f64, f64),
        lon: (f64, f64),
    },

    /// Grids of two variables or files do not line up
    Alignment {
        var: String,
        coord: String,
        message: String,
    },

    /// Time coordinate could not be decoded
    TimeDecode { var: String, message: String },

    /// Statistics computation errors
    StatisticsError(String),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Chart rendering error
    PlotError(String),
}

impl BgcError {
    /// Errors that must abort the whole run rather than one zone or metric.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoInputFiles { .. }
                | Self::NoUsableData { .. }
                | Self::Alignment { .. }
                | Self::PatternError(_)
                | Self::ConfigParseError(_)
                | Self::InvalidConfig { .. }
        )
    }

    /// Suggested remedy printed next to the error message.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NoInputFiles { .. } => Some(
                "Check the path and make sure the files end in .nc; a directory is searched for *.nc"
                    .to_string(),
            ),
            Self::NoUsableData { .. } => Some(
                "Ensure the files share one grid and carry a YYYYMMDD or YYYYDDD date in their names"
                    .to_string(),
            ),
            Self::UnparseableTimestamp { .. } => {
                Some("Rename the file to include a YYYYMMDD or YYYYDDD date".to_string())
            }
            Self::VariableNotFound { available, .. } => {
                Some(format!("Available variables: [{}]", available.join(", ")))
            }
            Self::EmptySelection { .. } | Self::ZoneAllMissing { .. } => {
                Some("Try widening the zone's lat/lon bounds towards open water".to_string())
            }
            Self::Alignment { .. } => Some(
                "Download the files with identical time, depth and lat/lon subsets".to_string(),
            ),
            Self::InvalidConfig { .. } | Self::ConfigParseError(_) => {
                Some("Fix the configuration file or the matching command-line flag".to_string())
            }
            _ => None,
        }
    }
}

fn fmt_bounds(bounds: (f64, f64)) -> String {
    format!("{:.2}..{:.2}", bounds.0, bounds.1)
}

impl fmt::Display for BgcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BgcError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            BgcError::IoError(e) => write!(f, "I/O error: {}", e),
            BgcError::ArrayError(e) => write!(f, "Array error: {}", e),
            BgcError::PatternError(e) => write!(f, "Invalid file pattern: {}", e),
            BgcError::ConfigParseError(e) => write!(f, "Could not parse configuration: {}", e),
            BgcError::InvalidConfig { message } => write!(f, "Invalid configuration: {}", message),
            BgcError::NoInputFiles { pattern } => {
                write!(f, "No .nc files found matching: {}", pattern)
            }
            BgcError::NoUsableData { input, skipped } => write!(
                f,
                "No valid datasets could be loaded from {} ({} file(s) skipped)",
                input, skipped
            ),
            BgcError::UnparseableTimestamp { file } => {
                write!(f, "Could not parse date from {}", file)
            }
            BgcError::VariableNotFound { var, .. } => {
                write!(f, "Variable '{}' not found in file", var)
            }
            BgcError::DimensionNotFound { var, dim } => {
                write!(f, "Dimension '{}' not found in variable '{}'", dim, var)
            }
            BgcError::EmptySelection { zone, lat, lon } => write!(
                f,
                "Zone '{}' selects no grid points (lat {}, lon {})",
                zone,
                fmt_bounds(*lat),
                fmt_bounds(*lon)
            ),
            BgcError::ZoneAllMissing { zone, var, lat, lon } => write!(
                f,
                "{}: zone '{}' contains only missing values, likely all land (lat {}, lon {})",
                var,
                zone,
                fmt_bounds(*lat),
                fmt_bounds(*lon)
            ),
            BgcError::Alignment { var, coord, message } => write!(
                f,
                "Cannot align '{}' on coordinate '{}': {}",
                var, coord, message
            ),
            BgcError::TimeDecode { var, message } => {
                write!(f, "Cannot decode time coordinate '{}': {}", var, message)
            }
            BgcError::StatisticsError(msg) => write!(f, "Statistics computation error: {}", msg),
            BgcError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            BgcError::PlotError(msg) => write!(f, "Plot error: {}", msg),
        }
    }
}

impl std::error::Error for BgcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BgcError::NetCDFError(e) => Some(e),
            BgcError::IoError(e) => Some(e),
            BgcError::ArrayError(e) => Some(e),
            BgcError::PatternError(e) => Some(e),
            BgcError::ConfigParseError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for BgcError {
    fn from(error: netcdf::Error) -> Self {
        BgcError::NetCDFError(error)
    }
}

impl From<std::io::Error> for BgcError {
    fn from(error: std::io::Error) -> Self {
        BgcError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for BgcError {
    fn from(error: ndarray::ShapeError) -> Self {
        BgcError::ArrayError(error)
    }
}

impl From<glob::PatternError> for BgcError {
    fn from(error: glob::PatternError) -> Self {
        BgcError::PatternError(error)
    }
}

impl From<serde_json::Error> for BgcError {
    fn from(error: serde_json::Error) -> Self {
        BgcError::ConfigParseError(error)
    }
}

/// Result type alias for bgc_zones operations
pub type Result<T> = std::result::Result<T, BgcError>;
