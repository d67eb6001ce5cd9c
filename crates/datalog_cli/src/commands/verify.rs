//! Verify command implementation.

use datalog_core::{Config, ConsistencyReport, DataLogger};
use std::path::Path;

/// Runs the verify command.
///
/// The directory is opened with repair-on-open disabled so that findings
/// are reported before anything is changed.
pub fn run(
    dir: &Path,
    config: Config,
    name: Option<&str>,
    repair: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying logging directory at {:?}", dir);
    println!();

    let logger = DataLogger::open_with_config(dir, config.repair_on_open(false))?;
    let names = match name {
        Some(name) => vec![name.to_string()],
        None => logger.registered_names()?,
    };

    let mut unresolved = 0;
    let mut unrepairable = 0;
    for name in &names {
        let report = if repair {
            logger.repair(name)?
        } else {
            logger.verify(name)?
        };
        print_report(&report);
        if !report.is_consistent() && !report.repaired {
            unresolved += 1;
            if repair {
                unrepairable += 1;
            }
        }
    }

    println!();
    if unresolved == 0 {
        println!("✓ Verification passed ({} variables)", names.len());
        Ok(())
    } else if unrepairable > 0 {
        println!(
            "✗ {unrepairable} of {} variables could not be repaired; re-register them with --purge",
            names.len()
        );
        Err("Repair incomplete".into())
    } else {
        println!("✗ {unresolved} of {} variables inconsistent; rerun with --repair", names.len());
        Err("Verification failed".into())
    }
}

fn print_report(report: &ConsistencyReport) {
    if report.is_consistent() {
        println!("  {}: ok", report.name);
        return;
    }
    for finding in &report.findings {
        let state = if report.unrepaired.contains(finding) {
            "unrepaired"
        } else if report.repaired || !report.unrepaired.is_empty() {
            "repaired"
        } else {
            "found"
        };
        println!("  {}: {state}: {finding}", report.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn registered_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let logger = DataLogger::open(dir.path()).unwrap();
        logger.register("temp", 4).unwrap();
        logger.append("temp", &[1, 2, 3, 4]).unwrap();
        dir
    }

    #[test]
    fn consistent_directory_passes() {
        let dir = registered_dir();
        assert!(run(dir.path(), Config::default(), None, false).is_ok());
    }

    #[test]
    fn repairable_state_passes_with_repair() {
        let dir = registered_dir();
        std::fs::write(dir.path().join("temp.idx"), "1").unwrap();

        assert!(run(dir.path(), Config::default(), None, false).is_err());
        assert!(run(dir.path(), Config::default(), None, true).is_ok());
        assert!(run(dir.path(), Config::default(), None, false).is_ok());
    }

    #[test]
    fn corrupt_registration_fails_even_with_repair() {
        let dir = registered_dir();
        std::fs::write(dir.path().join("temp.reg"), "0").unwrap();

        let err = run(dir.path(), Config::default(), Some("temp"), true).unwrap_err();
        assert_eq!(err.to_string(), "Repair incomplete");
    }
}
