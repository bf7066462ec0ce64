//! Pull command implementation.

use std::path::PathBuf;

use crate::error::Result;
use crate::registry::{Approval, SyncCommand};
use crate::sync::{Orchestrator, RsyncTransport};

/// Copy one project's sessions from the server.
///
/// # Errors
///
/// Returns the run's error: unknown project, policy violation, bad rules
/// or a failed transfer.
pub fn execute(
    name: &str,
    config_path: Option<&PathBuf>,
    dry_run: bool,
    timeout: Option<u64>,
    json: bool,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let transport = RsyncTransport::new(&config);
    let orchestrator = Orchestrator::new(&config, &transport, super::sync_options(&config, dry_run, timeout));

    let report = orchestrator.run(name, SyncCommand::Pull, Approval::None);
    super::finish(report, json)
}
