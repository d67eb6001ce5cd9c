//! Datalog CLI
//!
//! Command-line tools for datalog directories.
//!
//! # Commands
//!
//! - `register` - Register a variable with a fixed record size
//! - `write` - Append records to a variable
//! - `read` - Read the most recent records of a variable
//! - `inspect` - Display per-variable statistics
//! - `verify` - Check (and optionally repair) index and segment consistency
//! - `selftest` - Exercise a scratch directory end to end

mod commands;

use clap::{Parser, Subcommand};
use datalog_core::{Config, CoreError, ReregisterPolicy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Datalog command-line tools.
#[derive(Parser)]
#[command(name = "dlgr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the logging directory
    #[arg(global = true, short, long)]
    dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Maximum size of one segment file in bytes
    #[arg(global = true, long)]
    max_segment_size: Option<u64>,

    /// Maximum bytes retained per variable
    #[arg(global = true, long)]
    max_log_set_size: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a variable with a fixed record size
    Register {
        /// Variable name
        name: String,

        /// Record size in bytes
        size: usize,

        /// Replace an existing registration with another size, deleting its data
        #[arg(long)]
        purge: bool,
    },

    /// Append one record per value
    Write {
        /// Variable name
        name: String,

        /// Values to append (little-endian i32 unless --hex)
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<String>,

        /// Treat each value as one hex-encoded record
        #[arg(long)]
        hex: bool,
    },

    /// Read the most recent records, newest first
    Read {
        /// Variable name
        name: String,

        /// Number of records to read
        count: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display per-variable statistics
    Inspect {
        /// Only this variable
        name: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check index and segment consistency
    Verify {
        /// Only this variable
        name: Option<String>,

        /// Fix what can be fixed
        #[arg(short, long)]
        repair: bool,
    },

    /// Register, write and read back a test variable in a scratch directory
    Selftest,

    /// Show version information
    Version,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(size) = self.max_segment_size {
            config = config.max_segment_size(size);
        }
        if let Some(size) = self.max_log_set_size {
            config = config.max_log_set_size(size);
        }
        config
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(cli) {
        if let Some(core) = err.downcast_ref::<CoreError>() {
            eprintln!("error: {core}");
            std::process::exit(commands::exit_code(core.kind()));
        }
        return Err(err);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config();
    tracing::debug!(?config, "effective configuration");

    match cli.command {
        Commands::Register { name, size, purge } => {
            let dir = cli.dir.ok_or("Logging directory required for register")?;
            let config = if purge {
                config.reregister(ReregisterPolicy::Purge)
            } else {
                config
            };
            commands::register::run(&dir, config, &name, size)?;
        }
        Commands::Write { name, values, hex } => {
            let dir = cli.dir.ok_or("Logging directory required for write")?;
            commands::write::run(&dir, config, &name, &values, hex)?;
        }
        Commands::Read {
            name,
            count,
            format,
        } => {
            let dir = cli.dir.ok_or("Logging directory required for read")?;
            commands::read::run(&dir, config, &name, count, &format)?;
        }
        Commands::Inspect { name, format } => {
            let dir = cli.dir.ok_or("Logging directory required for inspect")?;
            commands::inspect::run(&dir, config, name.as_deref(), &format)?;
        }
        Commands::Verify { name, repair } => {
            let dir = cli.dir.ok_or("Logging directory required for verify")?;
            commands::verify::run(&dir, config, name.as_deref(), repair)?;
        }
        Commands::Selftest => {
            commands::selftest::run(config)?;
        }
        Commands::Version => {
            println!("Datalog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Datalog Core v{}", datalog_core::VERSION);
        }
    }

    Ok(())
}
