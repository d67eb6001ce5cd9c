//! Selftest command implementation.
//!
//! Registers `testmod_testvar` with 4-byte records in a scratch directory,
//! writes the values `0..128`, reads all 128 back and prints them as hex
//! together with the number of segments.

use super::hex_encode;
use datalog_core::{Config, DataLogger};

const NAME: &str = "testmod_testvar";
const COUNT: i32 = 128;

/// Runs the selftest command.
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let scratch = tempfile::tempdir()?;
    println!("Datalogger test start ({})", scratch.path().display());

    let logger = DataLogger::open_with_config(scratch.path(), config)?;

    println!("Registering {NAME}");
    logger.register(NAME, std::mem::size_of::<i32>())?;

    println!("Writing {NAME} 0..{COUNT}");
    for value in 0..COUNT {
        logger.append(NAME, &value.to_le_bytes())?;
    }

    println!("Priming read of {COUNT} records");
    let needed = logger.prime_read(NAME, COUNT as usize)?;
    let mut buffer = vec![0u8; needed];

    println!("Reading");
    let outcome = logger.perform_read(&mut buffer)?;

    println!("Read data:");
    let line: Vec<String> = buffer[..outcome.bytes_filled()]
        .chunks_exact(outcome.record_size)
        .map(hex_encode)
        .collect();
    println!("{}", line.join(" "));
    println!("Number of log files: {}", logger.count_logs(NAME)?);

    let filled = outcome.bytes_filled();
    let expected: Vec<u8> = (0..COUNT).rev().flat_map(i32::to_le_bytes).collect();
    if filled == 0 || buffer[..filled] != expected[..filled] {
        return Err("read data does not match what was written".into());
    }

    println!("Datalogger test end");
    Ok(())
}
