//! Moving session files between the server and this machine.
//!
//! - **Orchestrator**: per-project state machine and the `sync-all` batch
//! - **Transport**: the trait the orchestrator drives, plus the rsync/SSH
//!   implementation with staging and hard timeouts
//! - **File**: atomic writes and project file enumeration
//! - **Status**: last result per project, persisted as JSON
//! - **Signal**: SIGINT/SIGTERM set the batch cancel flag
//!
//! # Example
//!
//! ```ignore
//! use ssync::config::SyncConfig;
//! use ssync::registry::{Approval, SyncCommand};
//! use ssync::sync::{Orchestrator, RsyncTransport, SyncOptions};
//!
//! let config = SyncConfig::load(None)?;
//! let transport = RsyncTransport::new(&config);
//! let orch = Orchestrator::new(&config, &transport, SyncOptions::from_config(&config));
//!
//! let report = orch.run("app", SyncCommand::Pull, Approval::None);
//! let summary = orch.sync_all();
//! ```

mod file;
mod orchestrator;
mod process;
mod rsync;
mod signal;
mod status;
mod transport;
mod types;

pub use file::{atomic_write, has_extension, list_files, replace_if_changed, set_mtime};
pub use orchestrator::{Orchestrator, SyncOptions};
pub use process::{run_with_timeout, ssh_options, CommandOutput};
pub use rsync::RsyncTransport;
pub use signal::cancel_on_signal;
pub use status::{persist, ProjectSyncInfo, SyncOutcome, SyncStatus};
pub use transport::{RewriteHook, TransferJob, Transport};
pub use types::{
    BatchSummary, CancelFlag, FailureKind, FileOutcome, FileStatus, ProjectReport, SyncFailure,
    SyncState, TransferError,
};
