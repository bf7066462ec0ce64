//! Listing project directory tokens under either root.
//!
//! Used by `scan` and by the setup wizard to offer projects for mapping.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::rewrite::{rewrite_str, Pipeline};
use crate::sync::{run_with_timeout, ssh_options, TransferError};

/// Project directories under `server_root` on the remote host.
///
/// # Errors
///
/// Returns [`Error::Transfer`] if `ssh` cannot be run, times out or exits
/// non-zero.
pub fn scan_server(
    ssh_alias: &str,
    server_root: &str,
    connect_timeout: u64,
    timeout: Duration,
) -> Result<Vec<String>> {
    let listing = format!("ls -1 -- {}", shell_quote(server_root));
    let stdout = run_ssh(ssh_alias, &listing, connect_timeout, timeout)?;
    Ok(tokens(stdout.lines()))
}

/// Project directories under `local_root`, skipping dot-directories.
///
/// # Errors
///
/// Returns an IO error if the root cannot be read.
pub fn scan_local(local_root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(local_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(tokens(names.iter().map(String::as_str)))
}

/// Check that `ssh_alias` accepts a non-interactive login.
///
/// # Errors
///
/// Returns [`Error::Transfer`] describing why the connection failed.
pub fn test_connection(ssh_alias: &str, connect_timeout: u64) -> Result<()> {
    let timeout = Duration::from_secs(connect_timeout.saturating_mul(2).max(5));
    let stdout = run_ssh(ssh_alias, "echo ok", connect_timeout, timeout)?;
    if stdout.trim() == "ok" {
        Ok(())
    } else {
        Err(Error::Transfer(TransferError::CommandFailed {
            program: "ssh",
            message: format!("unexpected reply: {}", stdout.trim()),
        }))
    }
}

/// Home directory of the login on `ssh_alias`.
///
/// # Errors
///
/// Returns [`Error::Transfer`] if `ssh` fails or the reply is not an
/// absolute path.
pub fn remote_home(ssh_alias: &str, connect_timeout: u64) -> Result<String> {
    let timeout = Duration::from_secs(connect_timeout.saturating_mul(2).max(5));
    let stdout = run_ssh(ssh_alias, r#"printf '%s' "$HOME""#, connect_timeout, timeout)?;
    let home = stdout.trim();
    if home.starts_with('/') {
        Ok(home.trim_end_matches('/').to_string())
    } else {
        Err(Error::Transfer(TransferError::CommandFailed {
            program: "ssh",
            message: format!("unexpected home directory: {home}"),
        }))
    }
}

/// Resolve a leading `~` in a server path against `home`.
#[must_use]
pub fn expand_remote_tilde(path: &str, home: &str) -> String {
    let path = path.trim();
    match path.strip_prefix('~') {
        Some("") => home.to_string(),
        Some(rest) if rest.starts_with('/') => format!("{home}{rest}"),
        _ => path.to_string(),
    }
}

/// Index of the local directory that `server_dir` becomes under the
/// server-to-local pipeline, if it exists.
#[must_use]
pub fn suggest_local(server_dir: &str, local_dirs: &[String], pipeline: &Pipeline) -> Option<usize> {
    let rewritten = rewrite_str(server_dir, pipeline);
    local_dirs.iter().position(|d| *d == rewritten)
}

/// A short nickname for a directory token: its last dash-separated part.
#[must_use]
pub fn suggest_name(dir: &str) -> String {
    dir.rsplit('-')
        .find(|part| !part.is_empty())
        .unwrap_or(dir)
        .to_lowercase()
}

fn run_ssh(ssh_alias: &str, remote_command: &str, connect_timeout: u64, timeout: Duration) -> Result<String> {
    let mut cmd = Command::new("ssh");
    cmd.args(ssh_options(connect_timeout))
        .arg("--")
        .arg(ssh_alias)
        .arg(remote_command);

    tracing::debug!(host = %ssh_alias, command = %remote_command, "running ssh");
    let output = run_with_timeout(cmd, "ssh", timeout)?;
    if !output.status.success() {
        let stderr = output.stderr.trim();
        return Err(Error::Transfer(TransferError::CommandFailed {
            program: "ssh",
            message: if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr.to_string()
            },
        }));
    }
    Ok(output.stdout_lossy())
}

fn tokens<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = names
        .map(str::trim)
        .filter(|n| !n.is_empty() && !n.starts_with('.'))
        .map(String::from)
        .collect();
    out.sort();
    out
}

/// Single-quote `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
