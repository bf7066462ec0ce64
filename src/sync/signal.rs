//! Interrupt handling for batch runs.
//!
//! The first SIGINT or SIGTERM sets the cancel flag, so `sync-all` stops
//! once the project in flight is done. A second one exits at once.

use std::io;
use std::thread;

use tokio::runtime::Builder;

use super::types::CancelFlag;

/// Exit status after a second interrupt.
const INTERRUPTED: i32 = 130;

/// Cancel `flag` on the first SIGINT or SIGTERM.
///
/// The handlers are registered before this returns. Waiting happens on a
/// background thread for the rest of the process.
///
/// # Errors
///
/// Returns an error if the signal runtime or handlers cannot be set up.
pub fn cancel_on_signal(flag: &CancelFlag) -> io::Result<()> {
    let runtime = Builder::new_current_thread().enable_all().build()?;
    let mut signals = {
        let _guard = runtime.enter();
        Signals::register()?
    };

    let flag = flag.clone();
    thread::Builder::new()
        .name("ssync-signals".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let name = signals.recv().await;
                tracing::warn!(signal = name, "finishing the current project, then stopping");
                flag.cancel();

                let name = signals.recv().await;
                tracing::warn!(signal = name, "interrupted again, exiting");
                std::process::exit(INTERRUPTED);
            });
        })?;
    Ok(())
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    #[allow(clippy::unnecessary_wraps)]
    fn register() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "ctrl-c"
    }
}
