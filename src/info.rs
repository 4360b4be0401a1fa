//! # Dataset Information Module
//!
//! This module inspects a NetCDF file and reports its dimensions, variables
//! and attributes, plus what the animation pipeline will find in it: which of
//! the configured variables are present and which years the time axis covers.

use crate::dataset::{GridSource, NetCdfSource};
use crate::input::VariableNames;
use crate::time::{TimeUnits, year_strings};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

/// Information about a NetCDF dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// Information about a NetCDF variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub shape: Vec<usize>,
}

/// Years spanned by the time coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeCoverage {
    pub units: String,
    pub samples: usize,
    pub first_year: String,
    pub last_year: String,
    /// Complete 12-sample blocks available for yearly ranges
    pub complete_years: usize,
}

/// Complete information about a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub path: String,
    pub file_size: Option<u64>,
    pub dimensions: Vec<DimensionInfo>,
    pub variables: Vec<VariableInfo>,
    pub global_attributes: BTreeMap<String, String>,
    /// Configured variable names that the file lacks
    pub missing_variables: Vec<String>,
    pub time_coverage: Option<TimeCoverage>,
}

impl DatasetInfo {
    pub fn is_ready(&self) -> bool {
        self.missing_variables.is_empty() && self.time_coverage.is_some()
    }
}

/// Extracts structure information from a NetCDF file.
///
/// `variable` restricts the variable listing to one name; `detailed` adds
/// global attributes.
pub fn get_dataset_info(
    file_path: &str,
    names: &VariableNames,
    variable: Option<&str>,
    detailed: bool,
) -> Result<DatasetInfo> {
    debug!("Opening NetCDF file: {}", file_path);
    let source = NetCdfSource::open(file_path)
        .with_context(|| format!("Failed to open NetCDF file: {}", file_path))?;
    let file = source.file();

    let file_size = fs::metadata(file_path).ok().map(|m| m.len());

    let dimensions = file
        .dimensions()
        .map(|dim| DimensionInfo {
            name: dim.name().to_string(),
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let mut variables = Vec::new();
    for var in file.variables() {
        if variable.is_some_and(|wanted| var.name() != wanted) {
            continue;
        }
        let attributes = var
            .attributes()
            .filter_map(|attr| {
                attr.value()
                    .ok()
                    .map(|value| (attr.name().to_string(), format_attribute_value(&value)))
            })
            .collect();
        variables.push(VariableInfo {
            name: var.name().to_string(),
            data_type: format!("{:?}", var.vartype()),
            dimensions: var
                .dimensions()
                .iter()
                .map(|d| d.name().to_string())
                .collect(),
            attributes,
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
        });
    }

    let global_attributes = if detailed {
        file.attributes()
            .filter_map(|attr| {
                attr.value()
                    .ok()
                    .map(|value| (attr.name().to_string(), format_attribute_value(&value)))
            })
            .collect()
    } else {
        BTreeMap::new()
    };

    let missing_variables = [
        &names.time,
        &names.lat,
        &names.lon,
        &names.depth,
        &names.anomaly,
    ]
    .into_iter()
    .filter(|name| file.variable(name).is_none())
    .cloned()
    .collect();

    let time_coverage = time_coverage(&source, names);

    source.close().context("Failed to close NetCDF file")?;

    Ok(DatasetInfo {
        path: file_path.to_string(),
        file_size,
        dimensions,
        variables,
        global_attributes,
        missing_variables,
        time_coverage,
    })
}

fn time_coverage<S: GridSource>(source: &S, names: &VariableNames) -> Option<TimeCoverage> {
    let values = source.read_coordinate(&names.time).ok()?;
    let units = source.read_text_attribute(&names.time, "units").ok()?;
    let parsed = TimeUnits::parse(&units).ok()?;
    let years = year_strings(&values, &parsed).ok()?;
    Some(TimeCoverage {
        units,
        samples: years.len(),
        first_year: years.first()?.clone(),
        last_year: years.last()?.clone(),
        complete_years: years.len() / crate::extract::MONTHS_PER_YEAR,
    })
}

fn format_attribute_value(value: &netcdf::AttributeValue) -> String {
    match value {
        netcdf::AttributeValue::Str(s) => s.clone(),
        other => format!("{:?}", other),
    }
}

/// Print dataset info in human-readable format
pub fn print_file_info_human(info: &DatasetInfo) {
    println!("NetCDF File Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!("  Dimensions: {} total", info.dimensions.len());
    for dim in &info.dimensions {
        println!(
            "    {} ({}{})",
            dim.name,
            dim.length,
            if dim.is_unlimited { ", unlimited" } else { "" }
        );
    }
    println!("  Variables: {} total", info.variables.len());
    for var in &info.variables {
        println!(
            "    {} ({}) - dimensions: [{}]",
            var.name,
            var.data_type,
            var.dimensions.join(", ")
        );
        for (name, value) in &var.attributes {
            println!("      @{}: {}", name, value);
        }
    }
    if !info.global_attributes.is_empty() {
        println!("  Global Attributes:");
        for (name, value) in &info.global_attributes {
            println!("    @{}: {}", name, value);
        }
    }

    match &info.time_coverage {
        Some(coverage) => println!(
            "  Time: {} samples, {} to {} ({} complete years) [{}]",
            coverage.samples,
            coverage.first_year,
            coverage.last_year,
            coverage.complete_years,
            coverage.units
        ),
        None => println!("  Time: not decodable"),
    }
    if info.missing_variables.is_empty() {
        println!("  Ready for animation: yes");
    } else {
        println!(
            "  Ready for animation: no (missing {})",
            info.missing_variables.join(", ")
        );
    }
}

/// Print dataset info in JSON format
pub fn print_file_info_json(info: &DatasetInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

/// Print dataset info in YAML format
pub fn print_file_info_yaml(info: &DatasetInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize dataset info to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Print dataset info in CSV format (variables only)
pub fn print_file_info_csv(info: &DatasetInfo) -> Result<()> {
    println!("variable_name,data_type,dimensions,shape,attributes_count");
    for var in &info.variables {
        let shape: Vec<String> = var.shape.iter().map(|s| s.to_string()).collect();
        println!(
            "{},{},\"{}\",\"{}\",{}",
            var.name,
            var.data_type,
            var.dimensions.join(";"),
            shape.join(";"),
            var.attributes.len()
        );
    }
    Ok(())
}
