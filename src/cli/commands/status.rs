//! Status command implementation.

use std::path::PathBuf;

use chrono::Local;
use colored::Colorize;
use serde::Serialize;

use crate::config::{resolve_config_path, status_path};
use crate::error::Result;
use crate::sync::{ProjectSyncInfo, SyncOutcome, SyncStatus};

#[derive(Serialize)]
struct StatusEntry<'a> {
    project: &'a str,
    #[serde(flatten)]
    info: Option<&'a ProjectSyncInfo>,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    status_file: Option<String>,
    projects: Vec<StatusEntry<'a>>,
    count: usize,
}

/// Show the last sync result per project.
///
/// Configured projects that never synced are listed too when a config
/// can be found; status is shown either way.
///
/// # Errors
///
/// Returns an error if the status file exists but cannot be parsed.
pub fn execute(config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let path = status_path();
    let status = match &path {
        Some(p) => SyncStatus::load(p)?,
        None => SyncStatus::default(),
    };

    // A missing config is not an error here; only recorded projects show.
    let configured: Vec<String> = match resolve_config_path(config_path.map(PathBuf::as_path)) {
        Ok(_) => super::load_config(config_path)?
            .registry
            .list_all()
            .into_iter()
            .map(|m| m.name.clone())
            .collect(),
        Err(_) => Vec::new(),
    };

    let mut names: Vec<&str> = status.projects.keys().map(String::as_str).collect();
    for name in &configured {
        if !status.projects.contains_key(name) {
            names.push(name);
        }
    }

    let entries: Vec<StatusEntry<'_>> = names
        .into_iter()
        .map(|project| StatusEntry {
            project,
            info: status.get(project),
        })
        .collect();

    if json {
        let output = StatusOutput {
            status_file: path.map(|p| p.display().to_string()),
            count: entries.len(),
            projects: entries,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No syncs recorded yet.");
        return Ok(());
    }

    for entry in &entries {
        let Some(info) = entry.info else {
            println!("{} {:<20} {}", "·".dimmed(), entry.project, "never synced".dimmed());
            continue;
        };
        let mark = match info.result {
            SyncOutcome::Success => "✓".green(),
            SyncOutcome::PartialFailure => "!".yellow(),
            SyncOutcome::Failed => "✗".red(),
        };
        let when = info.last_sync.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        let direction = info.direction.map_or_else(String::new, |d| d.to_string());
        println!("{mark} {:<20} {when}  {direction}", entry.project);
        match &info.error {
            Some(error) => println!("    {}", error.red()),
            None => println!(
                "    {} written, {} unchanged, {} failed ({} ms)",
                info.files_written, info.files_unchanged, info.files_failed, info.duration_ms
            ),
        }
    }
    Ok(())
}
