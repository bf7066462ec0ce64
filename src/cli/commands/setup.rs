//! Interactive setup wizard.
//!
//! Walks through the connection, both roots, the path rewrites and the
//! project pairs, then writes a config that `SyncConfig` accepts.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::config::{default_config_path, load_document, save_document, ConfigDocument, SyncConfig};
use crate::error::{Error, Result};
use crate::model::{ProjectMapping, SyncDirection, SyncMode};
use crate::rewrite::{resolve_pipeline, RuleEntry, RuleStore};
use crate::scan::{
    expand_remote_tilde, remote_home, scan_local, scan_server, suggest_local, suggest_name,
    test_connection,
};

use super::prompt;

const DEFAULT_PROJECTS_ROOT: &str = "~/.claude/projects";
/// Starting values for a fresh config.
const TEMPLATE: &str = include_str!("../../../config.example.json");
const MODES: [SyncMode; 3] = [SyncMode::PullOnly, SyncMode::PushOnly, SyncMode::Bidirectional];

/// Run the wizard and save the result.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] without a terminal, or the error
/// that stopped the wizard.
pub fn execute(config_path: Option<&PathBuf>, force: bool, timeout: Option<u64>) -> Result<()> {
    if !prompt::is_interactive() {
        return Err(Error::InvalidArgument(
            "setup is interactive; run it from a terminal".to_string(),
        ));
    }

    let target = match config_path {
        Some(path) => path.clone(),
        None => default_config_path()
            .ok_or_else(|| Error::Other("Could not determine home directory".to_string()))?,
    };

    let existing = if !force && target.is_file() {
        Some(load_document(&target)?)
    } else {
        None
    };

    let mut wizard = Wizard::new(existing, timeout);
    wizard.show_header(&target);
    wizard.stage_connection()?;
    wizard.stage_rewrites()?;
    wizard.stage_projects()?;
    wizard.show_summary();

    let doc = wizard.finish()?;
    if !prompt::confirm(&format!("Save to {}?", target.display()), true)? {
        println!("Not saved.");
        return Ok(());
    }
    save_document(&target, &doc)?;
    println!("{} Saved {}", "✓".green(), target.display());
    Ok(())
}

struct Wizard {
    doc: ConfigDocument,
    /// Suggestions for questions the document leaves open.
    template: ConfigDocument,
    extending: bool,
    server_home: Option<String>,
    timeout: Option<u64>,
}

impl Wizard {
    fn new(existing: Option<ConfigDocument>, timeout: Option<u64>) -> Self {
        Self {
            extending: existing.is_some(),
            doc: existing.unwrap_or_default(),
            template: template(),
            server_home: None,
            timeout,
        }
    }

    fn show_header(&self, target: &Path) {
        println!("{}", "session-sync setup".bold());
        if self.extending {
            println!(
                "Extending {} ({} projects configured)",
                target.display(),
                self.doc.projects.len()
            );
        } else {
            println!("Writing {}", target.display());
        }
        println!();
    }

    fn stage_connection(&mut self) -> Result<()> {
        let paths = &self.doc.paths;
        let alias = prompt::input(
            "SSH alias of the server",
            Some(or(&self.doc.ssh_alias, &self.template.ssh_alias)),
        )?;
        let server = prompt::input(
            "Projects root on the server",
            Some(or(&paths.server.claude_projects, DEFAULT_PROJECTS_ROOT)),
        )?;
        let local = prompt::input(
            "Projects root on this machine",
            Some(or(&paths.local.claude_projects, DEFAULT_PROJECTS_ROOT)),
        )?;

        self.doc.ssh_alias = alias;
        self.doc.paths.local.claude_projects = local;

        println!("Testing connection to {}...", self.doc.ssh_alias);
        let connect_timeout = self.doc.transfer.connect_timeout_secs;
        match test_connection(&self.doc.ssh_alias, connect_timeout) {
            Ok(()) => {
                println!("{} Connected", "✓".green());
                self.server_home = remote_home(&self.doc.ssh_alias, connect_timeout)
                    .map_err(|e| tracing::debug!(error = %e, "could not read the server home"))
                    .ok();
            }
            Err(e) => {
                println!("{} {e}", "✗".red());
                if !prompt::confirm("Continue without a working connection?", false)? {
                    return Err(e);
                }
            }
        }

        self.doc.paths.server.claude_projects = self.absolute_server_path(server)?;
        Ok(())
    }

    /// Session content holds absolute server paths, so `~` is resolved
    /// here while the server can still be asked.
    fn absolute_server_path(&self, path: String) -> Result<String> {
        let mut path = match &self.server_home {
            Some(home) => expand_remote_tilde(&path, home),
            None => path,
        };
        while !path.starts_with('/') {
            println!("{} `{path}` is not an absolute server path", "✗".red());
            path = prompt::input("Absolute path on the server", None)?;
        }
        Ok(path)
    }

    fn stage_rewrites(&mut self) -> Result<()> {
        println!();
        println!("{}", "Path rewrites".bold());

        if self.extending {
            let current = self.doc.rule_entries()?;
            if !current.is_empty() {
                for entry in &current {
                    println!("  {}", describe(entry));
                }
                if prompt::confirm("Keep these rewrites?", true)? {
                    return Ok(());
                }
            }
        }
        self.doc.rewrites.clear();

        self.stage_temp_paths()?;

        let mut extra = Vec::new();
        let local_home = directories::BaseDirs::new().map(|b| b.home_dir().display().to_string());
        if let (Some(server), Some(local)) = (self.server_home.as_deref(), local_home.as_deref()) {
            if server != local
                && prompt::confirm(&format!("Rewrite home directory {server} ↔ {local}?"), true)?
            {
                extra.extend(home_pairs(server, local));
            }
        }

        while prompt::confirm("Add another rewrite pair?", false)? {
            let server = prompt::input("Server form", None)?;
            let local = prompt::input("Local form", None)?;
            extra.push(RuleEntry::new(server, local));
            if let Err(e) = rules_with(&self.doc, &extra) {
                println!("{} {e}", "✗".red());
                extra.pop();
            }
        }

        let rules = rules_with(&self.doc, &extra)?;
        if !extra.is_empty() {
            self.doc.rewrites = rules.clone();
        }
        for entry in &rules {
            println!("  {} {}", "+".green(), describe(entry));
        }
        Ok(())
    }

    /// The temp/worktree base pair; the escaped forms follow from it.
    fn stage_temp_paths(&mut self) -> Result<()> {
        let template = &self.template.paths;
        let server_default = self
            .doc
            .paths
            .server
            .temp_base
            .clone()
            .or_else(|| template.server.temp_base.clone())
            .unwrap_or_default();
        let local_default = self
            .doc
            .paths
            .local
            .temp_base
            .clone()
            .or_else(|| template.local.temp_base.clone())
            .unwrap_or_default();

        loop {
            let server = prompt::input(
                "Temp/worktree base on the server (blank for none)",
                Some(server_default.as_str()),
            )?;
            let (server_paths, local_paths) = (&mut self.doc.paths.server, &mut self.doc.paths.local);
            if server.is_empty() {
                server_paths.temp_base = None;
                server_paths.temp_escaped = None;
                local_paths.temp_base = None;
                local_paths.temp_escaped = None;
                return Ok(());
            }
            let local = prompt::input("Temp/worktree base on this machine", Some(local_default.as_str()))?;

            server_paths.temp_escaped = Some(escape_path(&server));
            server_paths.temp_base = Some(server);
            local_paths.temp_escaped = Some(escape_path(&crate::config::expand_tilde(&local).display().to_string()));
            local_paths.temp_base = Some(local);

            match rules_with(&self.doc, &[]) {
                Ok(_) => return Ok(()),
                Err(e) => println!("{} {e}", "✗".red()),
            }
        }
    }

    fn stage_projects(&mut self) -> Result<()> {
        // Validates the roots and rules entered so far.
        let config = self.validated()?;
        let pipeline = resolve_pipeline(&config.rules, SyncDirection::ServerToLocal)?;

        let server_dirs = match scan_server(
            &config.ssh_alias,
            &config.server_root,
            config.transfer.connect_timeout,
            self.timeout
                .map_or(config.transfer.timeout, std::time::Duration::from_secs),
        ) {
            Ok(dirs) => dirs,
            Err(e) => {
                println!("{} Could not scan the server: {e}", "✗".red());
                Vec::new()
            }
        };
        let local_dirs = scan_local(&config.local_root).unwrap_or_else(|e| {
            println!("{} Could not scan {}: {e}", "✗".red(), config.local_root.display());
            Vec::new()
        });
        println!(
            "Found {} server and {} local project directories",
            server_dirs.len(),
            local_dirs.len()
        );

        loop {
            let unmapped: Vec<&String> = server_dirs
                .iter()
                .filter(|d| !self.doc.projects.iter().any(|m| m.remote_dir == **d))
                .collect();

            let server_dir = if unmapped.is_empty() {
                if !prompt::confirm("Add a project by name?", false)? {
                    break;
                }
                prompt::input("Server directory", None)?
            } else {
                let mut items: Vec<&str> = unmapped.iter().map(|d| d.as_str()).collect();
                items.push("Done");
                let choice = prompt::select("Server project to map", &items, 0)?;
                if choice == unmapped.len() {
                    break;
                }
                unmapped[choice].clone()
            };

            let Some(local_dir) = pick_local(&server_dir, &local_dirs, &pipeline)? else {
                println!("Skipped {server_dir}");
                continue;
            };

            let name = self.pick_name(&server_dir)?;
            let mode = MODES[prompt::select("Sync mode", &MODES, 0)?];

            println!("{} {name}: {server_dir} ↔ {local_dir} ({mode})", "+".green());
            self.doc
                .projects
                .push(ProjectMapping::new(name, server_dir, local_dir, mode));
        }
        Ok(())
    }

    fn pick_name(&self, server_dir: &str) -> Result<String> {
        let mut suggestion = suggest_name(server_dir);
        loop {
            let name = prompt::input("Nickname", Some(suggestion.as_str()))?;
            if name.is_empty() {
                continue;
            }
            if self.doc.projects.iter().any(|m| m.name == name) {
                println!("{} `{name}` is already taken", "✗".red());
                suggestion = format!("{name}-2");
                continue;
            }
            return Ok(name);
        }
    }

    fn show_summary(&self) {
        println!();
        println!("{}", "Projects".bold());
        if self.doc.projects.is_empty() {
            println!("  (none)");
        }
        for mapping in &self.doc.projects {
            println!("  {:<20} {}", mapping.name, mapping.mode);
        }
        println!();
    }

    fn validated(&self) -> Result<SyncConfig> {
        Ok(SyncConfig::from_document(&self.doc)?)
    }

    fn finish(self) -> Result<ConfigDocument> {
        self.validated()?;
        Ok(self.doc)
    }
}

/// Choose the local directory for `server_dir`; `None` skips the project.
fn pick_local(
    server_dir: &str,
    local_dirs: &[String],
    pipeline: &crate::rewrite::Pipeline,
) -> Result<Option<String>> {
    let manual = local_dirs.len();
    let skip = manual + 1;

    let mut items: Vec<&str> = local_dirs.iter().map(String::as_str).collect();
    items.push("Enter manually");
    items.push("Skip");

    let default = suggest_local(server_dir, local_dirs, pipeline).unwrap_or(manual);
    let choice = prompt::select(&format!("Local directory for {server_dir}"), &items, default)?;

    if choice == skip {
        Ok(None)
    } else if choice == manual {
        let typed = prompt::input("Local directory", None)?;
        Ok(Some(typed).filter(|t| !t.is_empty()))
    } else {
        Ok(Some(local_dirs[choice].clone()))
    }
}

fn or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

fn template() -> ConfigDocument {
    serde_json::from_str(TEMPLATE).unwrap_or_default()
}

fn describe(entry: &RuleEntry) -> String {
    format!(
        "{} ↔ {}",
        entry.server.as_deref().unwrap_or_default(),
        entry.local.as_deref().unwrap_or_default()
    )
}

/// A path as it appears in a project directory token.
fn escape_path(path: &str) -> String {
    path.trim_end_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Rewrites for a home directory in both spellings.
fn home_pairs(server_home: &str, local_home: &str) -> Vec<RuleEntry> {
    vec![
        RuleEntry::new(escape_path(server_home), escape_path(local_home)),
        RuleEntry::new(server_home, local_home),
    ]
}

/// The rules `doc`'s paths imply plus `extra`, checked in both directions.
fn rules_with(doc: &ConfigDocument, extra: &[RuleEntry]) -> Result<Vec<RuleEntry>> {
    let mut derived = doc.clone();
    derived.rewrites.clear();

    let mut entries = derived.rule_entries()?;
    entries.extend_from_slice(extra);

    let store = RuleStore::load(&entries)?;
    resolve_pipeline(&store, SyncDirection::ServerToLocal)?;
    resolve_pipeline(&store, SyncDirection::LocalToServer)?;
    Ok(entries)
}
