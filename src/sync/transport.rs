//! The seam between the orchestrator and whatever moves the bytes.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::model::SyncDirection;

use super::types::{FileOutcome, TransferError};

/// Content-transform hook handed to [`Transport::transfer`].
///
/// Streams one file's source bytes into its destination and returns the
/// number of substitutions made.
pub type RewriteHook<'a> = dyn Fn(&mut dyn BufRead, &mut dyn Write) -> io::Result<u64> + 'a;

/// One project's transfer, fully resolved.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub project: String,
    pub direction: SyncDirection,
    /// Absolute project directory on the server.
    pub remote_dir: String,
    /// Absolute project directory on this machine.
    pub local_dir: PathBuf,
    /// Hard limit for the whole transfer. Zero disables it.
    pub timeout: Duration,
}

impl TransferJob {
    /// Human-readable source and destination, for logs and dry runs.
    #[must_use]
    pub fn endpoints(&self) -> (String, String) {
        let local = self.local_dir.display().to_string();
        match self.direction {
            SyncDirection::ServerToLocal => (self.remote_dir.clone(), local),
            SyncDirection::LocalToServer => (local, self.remote_dir.clone()),
        }
    }
}

/// Moves a project's files between the two roots.
///
/// Implementations copy additively: nothing at the destination is ever
/// deleted.
pub trait Transport {
    /// Relative names of the files that would move.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the source cannot be listed.
    fn list_candidates(&self, job: &TransferJob) -> Result<Vec<String>, TransferError>;

    /// Copy the project, running `hook` on every file in the rewrite set
    /// before it is written at the destination.
    ///
    /// Per-file problems are reported in the returned outcomes; an `Err`
    /// means the transfer as a whole failed.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] on spawn failure, non-zero exit,
    /// timeout or a missing source directory.
    fn transfer(
        &self,
        job: &TransferJob,
        hook: &RewriteHook<'_>,
    ) -> Result<Vec<FileOutcome>, TransferError>;
}
