//! Push command implementation.

use std::io::Write;
use std::path::PathBuf;

use colored::Colorize;

use crate::error::{Error, Result};
use crate::model::SyncMode;
use crate::registry::{Approval, SyncCommand};
use crate::sync::{Orchestrator, RsyncTransport};

use super::prompt;

/// Copy one project's sessions to the server.
///
/// Pushes wait for approval: `--yes` covers bidirectional projects,
/// push-only projects always ask. Without a terminal to ask on, the push
/// fails with `ApprovalRequired`.
///
/// # Errors
///
/// Returns the run's error, or [`Error::ApprovalRequired`] when approval
/// is needed but cannot be asked for.
pub fn execute(
    name: &str,
    yes: bool,
    config_path: Option<&PathBuf>,
    dry_run: bool,
    timeout: Option<u64>,
    json: bool,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let transport = RsyncTransport::new(&config);
    let orchestrator = Orchestrator::new(&config, &transport, super::sync_options(&config, dry_run, timeout));

    let report = orchestrator.run(name, SyncCommand::Push, Approval::from_flag(yes));
    if !report.is_approval_pending() {
        return super::finish(report, json);
    }

    let mapping = config.registry.resolve(name)?;
    let local = config.local_project_dir(mapping);
    let remote = format!("{}:{}", config.ssh_alias, config.remote_project_dir(mapping));

    if dry_run {
        if !json {
            println!(
                "{}",
                format!("Pushing `{name}` will ask for confirmation.").yellow()
            );
        }
        let report = orchestrator.run(name, SyncCommand::Push, Approval::Confirmed);
        return super::finish(report, json);
    }

    if !prompt::is_interactive() {
        return Err(Error::ApprovalRequired {
            project: name.to_string(),
            mode: mapping.mode,
        });
    }

    let preview = Preview {
        name,
        from: local.display().to_string(),
        to: remote,
        push_only: mapping.mode == SyncMode::PushOnly,
    };
    // Stdout carries only the JSON document in JSON mode.
    if json {
        preview.write_to(&mut std::io::stderr())?;
    } else {
        preview.write_to(&mut std::io::stdout())?;
    }

    if !prompt::confirm("Overwrite the server copies with local sessions?", false)? {
        if json {
            println!("{}", serde_json::json!({ "project": name, "cancelled": true }));
        } else {
            println!("Cancelled.");
        }
        return Ok(());
    }

    let report = orchestrator.run(name, SyncCommand::Push, Approval::Confirmed);
    super::finish(report, json)
}

/// What a confirmed push will overwrite.
struct Preview<'a> {
    name: &'a str,
    from: String,
    to: String,
    push_only: bool,
}

impl Preview<'_> {
    fn write_to(&self, w: &mut impl Write) -> std::io::Result<()> {
        writeln!(w, "{} {}", "Push".bold(), self.name.bold())?;
        writeln!(w, "  from: {}", self.from)?;
        writeln!(w, "  to:   {}", self.to)?;
        if self.push_only {
            writeln!(w, "  {}", "This project is push-only.".yellow())?;
        }
        Ok(())
    }
}
