//! Types shared by the orchestrator, the transports and the CLI.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::error::{Error, ErrorCode};
use crate::model::SyncDirection;
use crate::registry::SyncCommand;
use crate::rewrite::RewriteOp;

/// Errors raised while moving bytes between the two machines.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed: {message}")]
    CommandFailed {
        program: &'static str,
        message: String,
    },

    #[error("Transfer timed out after {0} seconds")]
    Timeout(u64),

    #[error("Source directory not found: {0}")]
    SourceMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Orchestrator states, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Resolving,
    DirectionCheck,
    ApprovalPending,
    Transforming,
    Transferring,
    Done,
    Failed,
}

impl SyncState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::ApprovalPending)
    }
}

/// Coarse classification of why a project failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Policy,
    Config,
    Transfer,
}

impl FailureKind {
    fn of(err: &Error) -> Self {
        match err.error_code() {
            ErrorCode::ProjectNotFound | ErrorCode::ConfigNotFound => Self::NotFound,
            ErrorCode::PolicyViolation | ErrorCode::InvalidArgument | ErrorCode::ApprovalRequired => {
                Self::Policy
            }
            ErrorCode::ConfigError => Self::Config,
            ErrorCode::TransferError
            | ErrorCode::SyncFailed
            | ErrorCode::IoError
            | ErrorCode::JsonError
            | ErrorCode::InternalError => Self::Transfer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Rewritten and written at the destination.
    Written { replacements: usize },
    /// Not in the rewrite set; copied byte for byte.
    Copied,
    /// Destination already had identical content.
    Unchanged,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn new(name: impl Into<String>, status: FileStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

/// Result of one orchestrator run for one project.
#[derive(Debug, Serialize)]
pub struct ProjectReport {
    pub project: String,
    pub command: SyncCommand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SyncDirection>,
    /// Every state visited, in order. The last one is terminal.
    pub states: Vec<SyncState>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pipeline: Vec<RewriteOp>,
    /// Files that would move; only filled in dry-run mode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SyncFailure>,
    pub dry_run: bool,
    pub duration_ms: u64,
    #[serde(skip)]
    error: Option<Error>,
}

impl ProjectReport {
    pub(crate) fn new(project: impl Into<String>, command: SyncCommand, dry_run: bool) -> Self {
        Self {
            project: project.into(),
            command,
            direction: None,
            states: vec![SyncState::Resolving],
            pipeline: Vec::new(),
            candidates: Vec::new(),
            files: Vec::new(),
            failure: None,
            dry_run,
            duration_ms: 0,
            error: None,
        }
    }

    pub(crate) fn enter(&mut self, state: SyncState) {
        debug_assert!(
            !self.final_state().is_terminal(),
            "{} entered {state:?} after {:?}",
            self.project,
            self.final_state()
        );
        tracing::trace!(project = %self.project, ?state, "state transition");
        self.states.push(state);
    }

    pub(crate) fn fail(&mut self, err: Error) {
        self.failure = Some(SyncFailure {
            kind: FailureKind::of(&err),
            message: err.to_string(),
        });
        self.error = Some(err);
        self.enter(SyncState::Failed);
    }

    #[must_use]
    pub fn final_state(&self) -> SyncState {
        self.states.last().copied().unwrap_or(SyncState::Resolving)
    }

    #[must_use]
    pub fn is_approval_pending(&self) -> bool {
        self.final_state() == SyncState::ApprovalPending
    }

    /// Done with no failed files.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.final_state() == SyncState::Done && self.files_failed() == 0
    }

    /// Counts as a failure in a batch summary.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        match self.final_state() {
            SyncState::Failed => true,
            SyncState::Done => self.files_failed() > 0,
            _ => false,
        }
    }

    #[must_use]
    pub fn files_written(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Written { .. } | FileStatus::Copied))
    }

    #[must_use]
    pub fn files_unchanged(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Unchanged))
    }

    #[must_use]
    pub fn files_failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed { .. }))
    }

    #[must_use]
    pub fn files_ok(&self) -> usize {
        self.files.len() - self.files_failed()
    }

    /// Total substitutions across written files.
    #[must_use]
    pub fn replacements(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.status {
                FileStatus::Written { replacements } => replacements,
                _ => 0,
            })
            .sum()
    }

    /// The error that failed the run, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Turn a failed run into its error; other outcomes pass through.
    ///
    /// A run that completed with per-file failures becomes
    /// [`Error::SyncFailed`] so the exit code reflects it.
    ///
    /// # Errors
    ///
    /// Returns the run's error when it ended in `Failed`, or
    /// `SyncFailed` when files failed.
    pub fn into_result(mut self) -> crate::error::Result<Self> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        if self.files_failed() > 0 {
            return Err(Error::SyncFailed {
                failed: 1,
                total: 1,
            });
        }
        Ok(self)
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.status)).count()
    }
}

/// Aggregate of a `sync-all` run.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub reports: Vec<ProjectReport>,
    /// Projects not attempted because the run was cancelled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    pub cancelled: bool,
}

impl BatchSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.reports.len() + self.skipped.len()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failure()).count()
    }

    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.reports.iter().filter(|r| r.succeeded()).count()
    }

    /// # Errors
    ///
    /// Returns [`Error::SyncFailed`] when any project failed.
    pub fn check(&self) -> crate::error::Result<()> {
        let failed = self.failed_count();
        if failed > 0 {
            return Err(Error::SyncFailed {
                failed,
                total: self.total(),
            });
        }
        Ok(())
    }
}

/// Cooperative cancellation for batch runs.
///
/// Checked between projects only; a transfer in flight always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
