//! Command implementations.

pub mod completions;
pub mod list;
pub mod prompt;
pub mod pull;
pub mod push;
pub mod report;
pub mod scan;
pub mod setup;
pub mod status;
pub mod sync_all;
pub mod verify;
pub mod version;

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{status_path, SyncConfig};
use crate::error::Result;
use crate::sync::{persist, ProjectReport, SyncOptions, SyncState};

/// Load the config from `--config`, the environment or the default
/// locations.
fn load_config(config_path: Option<&PathBuf>) -> Result<SyncConfig> {
    SyncConfig::load(config_path.map(PathBuf::as_path))
}

/// Orchestrator options from the config plus global flags.
fn sync_options(config: &SyncConfig, dry_run: bool, timeout: Option<u64>) -> SyncOptions {
    let mut options = SyncOptions::from_config(config);
    options.dry_run = dry_run;
    if let Some(secs) = timeout {
        options.timeout = Duration::from_secs(secs);
    }
    options
}

/// Record, render and convert a single-project report.
///
/// A failed run is reported through its error alone.
fn finish(report: ProjectReport, json: bool) -> Result<()> {
    persist(status_path().as_deref(), [&report]);
    if report.final_state() != SyncState::Failed {
        report::print_project(&report, json)?;
    }
    report.into_result().map(|_| ())
}
