//! Variable naming across data providers and file inspection
//!
//! Providers disagree on names: MODIS calls chlorophyll `chlor_a`, the
//! Copernicus models call it `chl`. Each [`Quantity`] carries an ordered alias
//! list which is resolved once per load into one concrete variable name.

use crate::errors::Result;
use crate::netcdf_io::{attr_string, data_variable_names};
use log::{info, warn};
use netcdf::File;
use std::fmt;

/// Physical quantities the analyses know about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// Chlorophyll-a concentration (mg/m³)
    Chlorophyll,
    /// Phytoplankton carbon (mmol/m³)
    Phytoplankton,
    /// Nitrate (mmol/m³)
    Nitrate,
    /// Net primary production (mg C/m³/day)
    PrimaryProduction,
    /// Dissolved oxygen (mmol/m³)
    Oxygen,
}

impl Quantity {
    /// Accepted names, most specific first.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Chlorophyll => &["chlor_a", "chl"],
            Self::Phytoplankton => &["phyc"],
            Self::Nitrate => &["no3"],
            Self::PrimaryProduction => &["nppv"],
            Self::Oxygen => &["o2"],
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chlorophyll => "chlorophyll",
            Self::Phytoplankton => "phytoplankton",
            Self::Nitrate => "nitrate",
            Self::PrimaryProduction => "net primary production",
            Self::Oxygen => "oxygen",
        }
    }

    /// Pick the variable to use among `available`.
    ///
    /// Exact alias matches win, in alias order; then the first available name
    /// containing an alias, ignoring case. Substitutions are logged.
    pub fn resolve(self, available: &[String]) -> Option<String> {
        if let Some(exact) = self
            .aliases()
            .iter()
            .find(|alias| available.iter().any(|name| name == *alias))
        {
            return Some((*exact).to_string());
        }

        for alias in self.aliases() {
            let needle = alias.to_lowercase();
            if let Some(name) = available
                .iter()
                .find(|name| name.to_lowercase().contains(&needle))
            {
                info!("Using '{}' for requested '{}'", name, alias);
                return Some(name.clone());
            }
        }

        warn!(
            "No {} variable ({}) among [{}]",
            self.as_str(),
            self.aliases().join(", "),
            available.join(", ")
        );
        None
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lists all dimensions and gridded variables of a file.
pub fn list_variables_and_dimensions(file: &File) -> Result<()> {
    println!("\n Dimensions");
    println!("==============");

    let mut dimensions: Vec<_> = file.dimensions().collect();
    dimensions.sort_by_key(|d| d.name());

    if dimensions.is_empty() {
        println!("   (No dimensions found)");
    } else {
        for dim in dimensions {
            let length_info = if dim.is_unlimited() {
                format!("{} (unlimited)", dim.len())
            } else {
                dim.len().to_string()
            };
            println!("    {} = {}", dim.name(), length_info);
        }
    }

    println!("\n Gridded variables");
    println!("=====================");

    let names = data_variable_names(file);
    if names.is_empty() {
        println!("   (No latitude/longitude variables found)");
    }
    for name in &names {
        let Some(var) = file.variable(name) else {
            continue;
        };
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| format!("{}[{}]", d.name(), d.len()))
            .collect();
        let mut key_attrs = Vec::new();
        if let Some(units) = attr_string(&var, "units") {
            key_attrs.push(format!("units: {}", units));
        }
        if let Some(long_name) = attr_string(&var, "long_name") {
            key_attrs.push(format!("long_name: {}", long_name));
        }
        println!("    {} ({})", name, dims.join(", "));
        if !key_attrs.is_empty() {
            println!("      - {}", key_attrs.join(", "));
        }
    }

    let known: Vec<String> = [
        Quantity::Chlorophyll,
        Quantity::Phytoplankton,
        Quantity::Nitrate,
        Quantity::PrimaryProduction,
        Quantity::Oxygen,
    ]
    .iter()
    .filter_map(|q| {
        q.aliases()
            .iter()
            .find(|a| names.iter().any(|n| n == *a))
            .map(|a| format!("{} = {}", q, a))
    })
    .collect();
    if !known.is_empty() {
        println!("\n Recognised quantities: {}", known.join(", "));
    }

    Ok(())
}
