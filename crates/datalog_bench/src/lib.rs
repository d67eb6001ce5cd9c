//! Benchmark utilities.

use datalog_core::{Config, CoreResult, DataLogger};
use rand::Rng;

/// Generate random record data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a batch of random records.
pub fn generate_records(count: usize, record_size: usize) -> Vec<Vec<u8>> {
    (0..count).map(|_| random_data(record_size)).collect()
}

/// Creates an in-memory logger with `name` registered and `count` random
/// records appended.
pub fn populated_logger(
    config: Config,
    name: &str,
    record_size: usize,
    count: usize,
) -> CoreResult<DataLogger> {
    let logger = DataLogger::in_memory(config)?;
    logger.register(name, record_size)?;
    for record in generate_records(count, record_size) {
        logger.append(name, &record)?;
    }
    Ok(logger)
}
