//! rsync-over-SSH transport.
//!
//! Files never travel directly between a project directory and the other
//! machine. Pulls land in a per-project staging directory first and are
//! rewritten on their way into the local tree; pushes are rewritten into
//! staging and rsynced from there. The local tree is therefore only ever
//! touched by atomic writes of fully rewritten files.
//!
//! **IMPORTANT**: rsync is run WITHOUT `--delete`. Syncs are additive, so a
//! misconfigured or temporarily empty source can never wipe a destination.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::config::SyncConfig;
use crate::model::SyncDirection;

use super::file::{has_extension, join_relative, list_files, replace_if_changed, set_mtime};
use super::process::{run_with_timeout, ssh_options, CommandOutput};
use super::transport::{RewriteHook, TransferJob, Transport};
use super::types::{FileOutcome, FileStatus, TransferError};

/// rsync exit codes for I/O and daemon timeouts.
const RSYNC_TIMEOUT_CODES: [i32; 2] = [30, 35];

/// The default transport.
#[derive(Debug, Clone)]
pub struct RsyncTransport {
    program: PathBuf,
    ssh_alias: String,
    connect_timeout: u64,
    staging_root: PathBuf,
    extensions: Vec<String>,
}

impl RsyncTransport {
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            program: config.transfer.rsync.clone(),
            ssh_alias: config.ssh_alias.clone(),
            connect_timeout: config.transfer.connect_timeout,
            staging_root: config.transfer.staging_dir.clone(),
            extensions: config.transfer.extensions.clone(),
        }
    }

    /// Staging directory for one project and direction.
    #[must_use]
    pub fn staging_dir(&self, job: &TransferJob) -> PathBuf {
        let leg = match job.direction {
            SyncDirection::ServerToLocal => "pull",
            SyncDirection::LocalToServer => "push",
        };
        self.staging_root.join(&job.project).join(leg)
    }

    fn remote_spec(&self, remote_dir: &str) -> String {
        format!("{}:{}/", self.ssh_alias, remote_dir.trim_end_matches('/'))
    }

    fn ssh_command(&self) -> String {
        let mut parts = vec!["ssh".to_string()];
        parts.extend(ssh_options(self.connect_timeout));
        parts.join(" ")
    }

    fn rsync_command(&self, timeout: Duration) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "--protect-args", // spaces and specials in remote paths survive
            "--timeout",
            &timeout.as_secs().to_string(),
            "-e",
            &self.ssh_command(),
        ]);
        cmd
    }

    /// Copy `src` into `dst`. Both are rsync path specs ending in `/`.
    fn rsync(&self, src: &str, dst: &str, job: &TransferJob) -> Result<(), TransferError> {
        let mut cmd = self.rsync_command(job.timeout);
        // NOTE: NO --delete flag! Additive sync only.
        cmd.args(["-az", "--partial", "--", src, dst]);

        tracing::debug!(project = %job.project, %src, %dst, "starting rsync");
        let output = run_with_timeout(cmd, "rsync", job.timeout)?;
        if !output.status.success() {
            return Err(classify_failure(&output, &job.remote_dir, job.timeout));
        }
        Ok(())
    }

    fn list_remote(&self, job: &TransferJob) -> Result<Vec<String>, TransferError> {
        let mut cmd = self.rsync_command(job.timeout);
        cmd.args(["-r", "--list-only", "--", &self.remote_spec(&job.remote_dir)]);

        let output = run_with_timeout(cmd, "rsync", job.timeout)?;
        if !output.status.success() {
            return Err(classify_failure(&output, &job.remote_dir, job.timeout));
        }

        let mut names: Vec<String> = output
            .stdout_lossy()
            .lines()
            .filter_map(parse_list_only)
            .collect();
        names.sort();
        Ok(names)
    }

    fn pull(&self, job: &TransferJob, hook: &RewriteHook<'_>) -> Result<Vec<FileOutcome>, TransferError> {
        let staging = self.staging_dir(job);
        fs::create_dir_all(&staging)?;

        self.rsync(
            &self.remote_spec(&job.remote_dir),
            &dir_spec(&staging),
            job,
        )?;

        fs::create_dir_all(&job.local_dir)?;
        let outcomes = list_files(&staging)?
            .into_iter()
            .map(|name| self.deliver(&staging, &job.local_dir, &name, hook))
            .collect();
        Ok(outcomes)
    }

    fn push(&self, job: &TransferJob, hook: &RewriteHook<'_>) -> Result<Vec<FileOutcome>, TransferError> {
        if !job.local_dir.is_dir() {
            return Err(TransferError::SourceMissing(
                job.local_dir.display().to_string(),
            ));
        }

        // Start from an empty staging tree so only current files go out.
        let staging = self.staging_dir(job);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let outcomes: Vec<FileOutcome> = list_files(&job.local_dir)?
            .into_iter()
            .map(|name| self.deliver(&job.local_dir, &staging, &name, hook))
            .collect();

        self.rsync(
            &dir_spec(&staging),
            &self.remote_spec(&job.remote_dir),
            job,
        )?;
        Ok(outcomes)
    }

    /// Move one file from `from` to `to`, rewriting it if its extension is
    /// in the rewrite set.
    fn deliver(&self, from: &Path, to: &Path, name: &str, hook: &RewriteHook<'_>) -> FileOutcome {
        match self.deliver_file(from, to, name, hook) {
            Ok(status) => FileOutcome::new(name, status),
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "failed to write file");
                FileOutcome::new(name, FileStatus::Failed { message: e.to_string() })
            }
        }
    }

    fn deliver_file(
        &self,
        from: &Path,
        to: &Path,
        name: &str,
        hook: &RewriteHook<'_>,
    ) -> io::Result<FileStatus> {
        let src = join_relative(from, name);
        let dest = join_relative(to, name);
        let mtime = fs::metadata(&src)?.modified()?;
        let mut reader = BufReader::new(File::open(&src)?);

        let status = if has_extension(name, &self.extensions) {
            match replace_if_changed(&dest, |w| hook(&mut reader, w))? {
                (true, replacements) => FileStatus::Written {
                    replacements: usize::try_from(replacements).unwrap_or(usize::MAX),
                },
                (false, _) => FileStatus::Unchanged,
            }
        } else {
            match replace_if_changed(&dest, |w| io::copy(&mut reader, w))? {
                (true, _) => FileStatus::Copied,
                (false, _) => FileStatus::Unchanged,
            }
        };

        // Delivered files carry their source mtime.
        set_mtime(&dest, mtime)?;
        Ok(status)
    }
}

impl Transport for RsyncTransport {
    fn list_candidates(&self, job: &TransferJob) -> Result<Vec<String>, TransferError> {
        match job.direction {
            SyncDirection::ServerToLocal => self.list_remote(job),
            SyncDirection::LocalToServer => {
                if !job.local_dir.is_dir() {
                    return Err(TransferError::SourceMissing(
                        job.local_dir.display().to_string(),
                    ));
                }
                Ok(list_files(&job.local_dir)?)
            }
        }
    }

    fn transfer(
        &self,
        job: &TransferJob,
        hook: &RewriteHook<'_>,
    ) -> Result<Vec<FileOutcome>, TransferError> {
        match job.direction {
            SyncDirection::ServerToLocal => self.pull(job, hook),
            SyncDirection::LocalToServer => self.push(job, hook),
        }
    }
}

/// A local directory as an rsync spec: trailing slash copies its contents.
fn dir_spec(dir: &Path) -> String {
    format!("{}/", dir.display().to_string().trim_end_matches('/'))
}

/// Turn a failed run's stderr into a specific error.
fn classify_failure(output: &CommandOutput, remote_dir: &str, timeout: Duration) -> TransferError {
    if output
        .status
        .code()
        .is_some_and(|code| RSYNC_TIMEOUT_CODES.contains(&code))
    {
        return TransferError::Timeout(timeout.as_secs());
    }

    let stderr = output.stderr.trim();
    let message = if stderr.contains("Connection refused")
        || stderr.contains("Connection timed out")
        || stderr.contains("Could not resolve hostname")
    {
        format!("SSH connection failed: {stderr}")
    } else if stderr.contains("No such file or directory") {
        return TransferError::SourceMissing(remote_dir.to_string());
    } else if stderr.contains("Permission denied") {
        format!("Permission denied: {stderr}")
    } else if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    };

    tracing::warn!(remote_dir, error = %message, "rsync failed");
    TransferError::CommandFailed {
        program: "rsync",
        message,
    }
}

/// Parse one line of `rsync --list-only` output into a file name.
///
/// Lines look like `-rw-r--r--  1,234 2025/01/20 10:00:00 sub/a.jsonl`.
/// Directories, links and the summary lines are ignored.
fn parse_list_only(line: &str) -> Option<String> {
    if !line.starts_with('-') {
        return None;
    }

    // Skip the four leading columns; the name may itself contain spaces.
    let mut rest = line;
    for _ in 0..4 {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        rest = &rest[end..];
    }
    let name = rest.trim_start();
    (!name.is_empty()).then(|| name.to_string())
}
