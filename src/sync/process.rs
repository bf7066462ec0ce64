//! Child process helpers for `ssh` and `rsync`.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::types::TransferError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Options that keep `ssh` from ever prompting.
#[must_use]
pub fn ssh_options(connect_timeout: u64) -> Vec<String> {
    vec![
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={connect_timeout}"),
    ]
}

/// Captured result of a finished child.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// A zero `timeout` waits indefinitely. Both pipes are drained on helper
/// threads so a chatty child cannot block on a full pipe while the
/// deadline is being polled.
///
/// # Errors
///
/// [`TransferError::Spawn`] if the program cannot be started,
/// [`TransferError::Timeout`] if the deadline passes.
pub fn run_with_timeout(
    mut cmd: Command,
    program: &'static str,
    timeout: Duration,
) -> Result<CommandOutput, TransferError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    // Keeps a terminal Ctrl-C away from the child; `sync::signal` decides.
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

    tracing::trace!(?cmd, "spawning");
    let mut child = cmd
        .spawn()
        .map_err(|source| TransferError::Spawn { program, source })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::warn!(program, timeout_secs = timeout.as_secs(), "killing child after timeout");
            let _ = child.kill();
            let _ = child.wait();
            return Err(TransferError::Timeout(timeout.as_secs()));
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        status,
        stdout: collect(stdout),
        stderr: String::from_utf8_lossy(&collect(stderr)).into_owned(),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
