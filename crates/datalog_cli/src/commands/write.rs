//! Write command implementation.

use super::{hex_decode, CliError};
use datalog_core::{Config, DataLogger, Eviction};
use std::path::Path;

/// Converts command-line values into records.
fn parse_records(values: &[String], hex: bool) -> Result<Vec<Vec<u8>>, CliError> {
    values
        .iter()
        .map(|value| {
            if hex {
                hex_decode(value)
            } else {
                value
                    .parse::<i32>()
                    .map(|v| v.to_le_bytes().to_vec())
                    .map_err(|_| CliError::InvalidInteger(value.clone()))
            }
        })
        .collect()
}

/// Runs the write command.
pub fn run(
    dir: &Path,
    config: Config,
    name: &str,
    values: &[String],
    hex: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = parse_records(values, hex)?;
    let logger = DataLogger::open_with_config(dir, config)?;

    let mut rollovers = 0;
    for record in &records {
        let report = logger.append(name, record)?;
        if report.rolled_over {
            rollovers += 1;
        }
        match report.eviction {
            Eviction::Evicted(indices) => {
                for index in indices {
                    println!("Evicted segment {index}");
                }
            }
            Eviction::Failed(err) => eprintln!("warning: {err}"),
            Eviction::None => {}
        }
    }

    println!(
        "Wrote {} records to '{name}' (segment {}, {rollovers} rollovers)",
        records.len(),
        logger.get_log_index(name)?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn integers_are_little_endian() {
        let records = parse_records(&args(&["1", "-1"]), false).unwrap();
        assert_eq!(records, vec![vec![1, 0, 0, 0], vec![0xff; 4]]);
    }

    #[test]
    fn hex_values_are_raw_records() {
        let records = parse_records(&args(&["dead", "01"]), true).unwrap();
        assert_eq!(records, vec![vec![0xde, 0xad], vec![0x01]]);
    }

    #[test]
    fn bad_integer_rejected() {
        assert!(matches!(
            parse_records(&args(&["12", "x"]), false),
            Err(CliError::InvalidInteger(v)) if v == "x"
        ));
    }
}
