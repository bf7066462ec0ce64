//! Sync-all command implementation.

use std::path::PathBuf;

use crate::config::status_path;
use crate::error::Result;
use crate::sync::{cancel_on_signal, persist, Orchestrator, RsyncTransport};

/// Pull every enabled project that allows pulling.
///
/// An interrupt stops the batch after the project in flight; the rest
/// are reported as skipped.
///
/// # Errors
///
/// Returns [`crate::Error::SyncFailed`] if any project failed; the others
/// are still synced and reported.
pub fn execute(
    config_path: Option<&PathBuf>,
    dry_run: bool,
    timeout: Option<u64>,
    json: bool,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let transport = RsyncTransport::new(&config);
    let options = super::sync_options(&config, dry_run, timeout);
    if let Err(e) = cancel_on_signal(&options.cancel) {
        tracing::warn!(error = %e, "could not install interrupt handlers");
    }
    let orchestrator = Orchestrator::new(&config, &transport, options);

    let summary = orchestrator.sync_all();
    persist(status_path().as_deref(), &summary.reports);
    super::report::print_batch(&summary, json)?;
    summary.check()
}
