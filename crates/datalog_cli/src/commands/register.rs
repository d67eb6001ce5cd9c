//! Register command implementation.

use datalog_core::{Config, DataLogger, RegisterOutcome};
use std::path::Path;

/// Runs the register command.
pub fn run(
    dir: &Path,
    config: Config,
    name: &str,
    size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let logger = DataLogger::open_with_config(dir, config)?;

    match logger.register(name, size)? {
        RegisterOutcome::Created => {
            println!("Registered '{name}' with {size}-byte records");
        }
        RegisterOutcome::Unchanged => {
            println!("'{name}' is already registered with {size}-byte records");
        }
        RegisterOutcome::Purged {
            previous_size,
            removed_segments,
        } => {
            let previous = previous_size.map_or_else(|| "unreadable".to_string(), |s| format!("{s}-byte"));
            println!(
                "Re-registered '{name}' with {size}-byte records (was {previous}; removed {removed_segments} segments)"
            );
        }
    }

    Ok(())
}
