//! Scan command implementation.

use std::collections::HashSet;
use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::ScanTarget;
use crate::error::Result;
use crate::scan::{scan_local, scan_server};

#[derive(Serialize)]
struct ScanEntry<'a> {
    dir: &'a str,
    /// Name of the project already mapped to this directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<&'a str>,
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    target: &'static str,
    root: String,
    dirs: Vec<ScanEntry<'a>>,
    count: usize,
}

/// Execute the scan command.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or the root cannot be
/// listed.
pub fn execute(
    target: ScanTarget,
    config_path: Option<&PathBuf>,
    timeout: Option<u64>,
    json: bool,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let options = super::sync_options(&config, false, timeout);

    let (label, root, dirs) = match target {
        ScanTarget::Server => {
            let dirs = scan_server(
                &config.ssh_alias,
                &config.server_root,
                config.transfer.connect_timeout,
                options.timeout,
            )?;
            ("server", format!("{}:{}", config.ssh_alias, config.server_root), dirs)
        }
        ScanTarget::Local => {
            let dirs = scan_local(&config.local_root)?;
            ("local", config.local_root.display().to_string(), dirs)
        }
    };

    let mappings = config.registry.list_all();
    let entries: Vec<ScanEntry<'_>> = dirs
        .iter()
        .map(|dir| {
            let project = mappings
                .iter()
                .find(|m| match target {
                    ScanTarget::Server => m.remote_dir == *dir,
                    ScanTarget::Local => m.local_dir == *dir,
                })
                .map(|m| m.name.as_str());
            ScanEntry { dir, project }
        })
        .collect();

    if json {
        let output = ScanOutput {
            target: label,
            root,
            count: entries.len(),
            dirs: entries,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{} ({} directories)", root.bold(), entries.len());
    let mapped: HashSet<&str> = entries.iter().filter_map(|e| e.project).collect();
    for entry in &entries {
        match entry.project {
            Some(name) => println!("  {} {} {}", "✓".green(), entry.dir, format!("[{name}]").dimmed()),
            None => println!("    {}", entry.dir),
        }
    }
    if !entries.is_empty() && mapped.is_empty() {
        println!();
        println!("None of these are mapped yet. Run `ssync setup` to add them.");
    }
    Ok(())
}
