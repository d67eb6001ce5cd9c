//! Inspect command implementation.

use super::Format;
use datalog_core::{Config, DataLogger, VariableStats};
use serde::Serialize;
use std::path::Path;

/// Directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Logging directory path.
    pub path: String,
    /// Segment size limit in bytes.
    pub max_segment_size: u64,
    /// Segments retained per variable.
    pub retention: u64,
    /// Per-variable statistics.
    pub variables: Vec<VariableInfo>,
}

/// Statistics for a single variable.
#[derive(Debug, Serialize)]
pub struct VariableInfo {
    /// Variable name.
    pub name: String,
    /// Record size in bytes.
    pub record_size: usize,
    /// Current writable segment index.
    pub log_index: u64,
    /// Segments reachable from the index.
    pub segments: usize,
    /// Whole records on disk.
    pub records: u64,
    /// Segment bytes on disk.
    pub bytes_on_disk: u64,
}

impl From<VariableStats> for VariableInfo {
    fn from(stats: VariableStats) -> Self {
        Self {
            name: stats.name,
            record_size: stats.record_size,
            log_index: stats.log_index,
            segments: stats.segments,
            records: stats.records,
            bytes_on_disk: stats.bytes_on_disk,
        }
    }
}

/// Runs the inspect command.
pub fn run(
    dir: &Path,
    config: Config,
    name: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;
    let logger = DataLogger::open_with_config(dir, config)?;

    let names = match name {
        Some(name) => vec![name.to_string()],
        None => logger.registered_names()?,
    };
    let mut variables = Vec::with_capacity(names.len());
    for name in &names {
        variables.push(VariableInfo::from(logger.stats(name)?));
    }

    let result = InspectResult {
        path: dir.display().to_string(),
        max_segment_size: logger.config().max_segment_size,
        retention: logger.config().retention_count(),
        variables,
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Logging directory: {}", result.path);
    println!(
        "Segments: {} bytes max, {} retained per variable",
        result.max_segment_size, result.retention
    );
    println!();

    if result.variables.is_empty() {
        println!("No registered variables");
        return;
    }

    println!(
        "{:<24} {:>8} {:>8} {:>8} {:>10} {:>12}",
        "NAME", "SIZE", "INDEX", "SEGS", "RECORDS", "BYTES"
    );
    for v in &result.variables {
        println!(
            "{:<24} {:>8} {:>8} {:>8} {:>10} {:>12}",
            v.name, v.record_size, v.log_index, v.segments, v.records, v.bytes_on_disk
        );
    }
}
