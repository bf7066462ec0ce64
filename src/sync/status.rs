//! Persisted last-sync status per project.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::SyncDirection;

use super::file::atomic_write;
use super::types::ProjectReport;

/// Outcome of a project's last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Success,
    /// Some files synced, some failed.
    PartialFailure,
    Failed,
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::PartialFailure => write!(f, "partial_failure"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSyncInfo {
    pub last_sync: DateTime<Utc>,
    pub direction: Option<SyncDirection>,
    pub result: SyncOutcome,
    #[serde(default)]
    pub files_written: usize,
    #[serde(default)]
    pub files_unchanged: usize,
    #[serde(default)]
    pub files_failed: usize,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Contents of `sync_status.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectSyncInfo>,
}

impl SyncStatus {
    /// Load from `path`; a missing file is an empty status.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(Error::from)
    }

    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        atomic_write(path, content.as_bytes())?;
        Ok(())
    }

    /// Record a finished run. Dry runs and runs halted for approval are
    /// not recorded; returns whether anything changed.
    pub fn record(&mut self, report: &ProjectReport) -> bool {
        if report.dry_run || report.is_approval_pending() {
            return false;
        }

        let failed = report.files_failed();
        let result = if report.failure.is_some() {
            SyncOutcome::Failed
        } else if failed == 0 {
            SyncOutcome::Success
        } else if report.files_ok() > 0 {
            SyncOutcome::PartialFailure
        } else {
            SyncOutcome::Failed
        };

        self.projects.insert(
            report.project.clone(),
            ProjectSyncInfo {
                last_sync: Utc::now(),
                direction: report.direction,
                result,
                files_written: report.files_written(),
                files_unchanged: report.files_unchanged(),
                files_failed: failed,
                duration_ms: report.duration_ms,
                error: report.failure.as_ref().map(|f| f.message.clone()),
            },
        );
        true
    }

    #[must_use]
    pub fn get(&self, project: &str) -> Option<&ProjectSyncInfo> {
        self.projects.get(project)
    }
}

/// Record `reports` in the status file at `path`.
///
/// Failing to persist status never fails a sync; it is logged instead.
pub fn persist<'a>(path: Option<&Path>, reports: impl IntoIterator<Item = &'a ProjectReport>) {
    let Some(path) = path else {
        tracing::debug!("no home directory; sync status not recorded");
        return;
    };

    let mut status = match SyncStatus::load(path) {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable sync status; starting fresh");
            SyncStatus::default()
        }
    };

    let mut changed = false;
    for report in reports {
        changed |= status.record(report);
    }

    if changed {
        if let Err(e) = status.save(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to save sync status");
        }
    }
}
