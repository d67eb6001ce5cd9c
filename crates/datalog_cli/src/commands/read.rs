//! Read command implementation.

use super::{hex_encode, Format};
use datalog_core::{Config, DataLogger};
use serde::Serialize;
use std::path::Path;

/// Records read back from one variable.
#[derive(Debug, Serialize)]
pub struct ReadResult {
    /// Variable name.
    pub name: String,
    /// Records requested.
    pub requested: usize,
    /// Records available and returned.
    pub filled: usize,
    /// Size of each record in bytes.
    pub record_size: usize,
    /// Hex-encoded records, newest first.
    pub records: Vec<String>,
}

/// Runs the read command.
pub fn run(
    dir: &Path,
    config: Config,
    name: &str,
    count: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;
    let logger = DataLogger::open_with_config(dir, config)?;

    let needed = logger.prime_read(name, count)?;
    let mut buffer = vec![0u8; needed];
    let outcome = logger.perform_read(&mut buffer)?;

    let result = ReadResult {
        records: buffer[..outcome.bytes_filled()]
            .chunks_exact(outcome.record_size)
            .map(hex_encode)
            .collect(),
        name: outcome.name,
        requested: outcome.requested,
        filled: outcome.filled,
        record_size: outcome.record_size,
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &ReadResult) {
    println!(
        "'{}': {} of {} records ({} bytes each), newest first",
        result.name, result.filled, result.requested, result.record_size
    );
    for (age, record) in result.records.iter().enumerate() {
        if result.record_size == 4 {
            let value = super::hex_decode(record)
                .ok()
                .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
                .map(i32::from_le_bytes);
            match value {
                Some(v) => println!("  {age:>6}  {record}  ({v})"),
                None => println!("  {age:>6}  {record}"),
            }
        } else {
            println!("  {age:>6}  {record}");
        }
    }
}
