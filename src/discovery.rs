//! File discovery and recovery of timestamps from file names
//!
//! Satellite products such as `AQUA_MODIS.20250919.L3m.DAY.CHL.x_chlor_a.nc` or
//! `A2025274.L3m_DAY_CHL_chlor_a_4km.nc` carry their date only in the file name.
//! Two layouts are recognised, in priority order: `YYYYMMDD` and `YYYYDDD`
//! (day of year).

use crate::errors::{BgcError, Result};
use chrono::NaiveDate;
use glob::glob;
use log::{debug, info, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A file whose date was recovered from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedFile {
    pub path: PathBuf,
    pub date: NaiveDate,
}

/// Result of scanning a pattern: usable files plus the names that were skipped.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub files: Vec<DatedFile>,
    pub skipped: Vec<PathBuf>,
}

fn ymd_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"((?:19|20)\d{2})(\d{2})(\d{2})").expect("valid regex"))
}

fn ordinal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"((?:19|20)\d{2})(\d{3})").expect("valid regex"))
}

/// Recover a calendar date from a file name.
///
/// The first `YYYYMMDD` run forming a valid date wins. Only names without any
/// eight-digit run fall back to the first `YYYYDDD` run with a valid day of
/// year, so `20251301` is rejected rather than read as day 130. Returns `None`
/// when no valid date is found.
pub fn date_from_filename(name: &str) -> Option<NaiveDate> {
    let mut ymd_runs = ymd_regex().captures_iter(name).peekable();
    if ymd_runs.peek().is_some() {
        return ymd_runs.find_map(|caps| {
            let year = caps[1].parse::<i32>().ok()?;
            let month = caps[2].parse::<u32>().ok()?;
            let day = caps[3].parse::<u32>().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        });
    }

    ordinal_regex().captures_iter(name).find_map(|caps| {
        let year = caps[1].parse::<i32>().ok()?;
        let ordinal = caps[2].parse::<u32>().ok()?;
        NaiveDate::from_yo_opt(year, ordinal)
    })
}

/// Turn a directory into `<dir>/*.nc`; anything else is used as a glob pattern.
pub fn normalize_pattern(input: &str) -> String {
    let path = Path::new(input);
    if path.is_dir() {
        info!(
            "'{}' is a directory, searching for .nc files inside it",
            input
        );
        path.join("*.nc").to_string_lossy().to_string()
    } else {
        input.to_string()
    }
}

/// Sorted list of regular files matching a directory or glob pattern.
pub fn list_files(input: &str) -> Result<Vec<PathBuf>> {
    let pattern = normalize_pattern(input);
    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(path) => debug!("Skipping non-file match {}", path.display()),
            Err(e) => warn!("Bad path from glob: {}", e),
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(BgcError::NoInputFiles { pattern });
    }
    info!("Found {} file(s) matching {}", files.len(), pattern);
    Ok(files)
}

/// Discover files and attach the date recovered from each name.
///
/// Files without a recognisable date are skipped with a warning. Fails only
/// when nothing matches the pattern at all, or when no file carries a date.
pub fn discover(input: &str) -> Result<Discovery> {
    let mut discovery = Discovery::default();

    for path in list_files(input)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match date_from_filename(&name) {
            Some(date) => {
                debug!("{} -> {}", name, date);
                discovery.files.push(DatedFile { path, date });
            }
            None => {
                warn!("{}, skipping", BgcError::UnparseableTimestamp { file: name });
                discovery.skipped.push(path);
            }
        }
    }

    if discovery.files.is_empty() {
        return Err(BgcError::NoUsableData {
            input: normalize_pattern(input),
            skipped: discovery.skipped.len(),
        });
    }
    Ok(discovery)
}
