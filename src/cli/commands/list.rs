//! List command implementation.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::error::Result;
use crate::model::{ProjectMapping, SyncMode};

#[derive(Serialize)]
struct ListOutput<'a> {
    ssh_alias: &'a str,
    server_root: &'a str,
    local_root: String,
    projects: Vec<&'a ProjectMapping>,
    count: usize,
}

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded.
pub fn execute(config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = super::load_config(config_path)?;
    let projects = config.registry.list_all();

    if json {
        let output = ListOutput {
            ssh_alias: &config.ssh_alias,
            server_root: &config.server_root,
            local_root: config.local_root.display().to_string(),
            count: projects.len(),
            projects,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Server: {}:{}", config.ssh_alias, config.server_root);
    println!("Local:  {}", config.local_root.display());
    println!();

    if projects.is_empty() {
        println!("No projects configured.");
        println!("  Run `ssync setup` to add some.");
        return Ok(());
    }

    println!("Projects ({}):", projects.len());
    for mapping in projects {
        let padded = format!("{:<20}", mapping.name);
        let name = if mapping.enabled {
            padded.bold()
        } else {
            padded.dimmed()
        };
        let disabled = if mapping.enabled { "" } else { " (disabled)" };
        println!("  {name} {}{}", mode_label(mapping.mode), disabled.dimmed());
        println!("    server: {}", mapping.remote_dir);
        println!("    local:  {}", mapping.local_dir);
    }
    Ok(())
}

fn mode_label(mode: SyncMode) -> colored::ColoredString {
    match mode {
        SyncMode::PullOnly => mode.to_string().cyan(),
        SyncMode::PushOnly => mode.to_string().magenta(),
        SyncMode::Bidirectional => mode.to_string().yellow(),
    }
}
