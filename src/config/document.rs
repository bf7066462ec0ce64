//! On-disk configuration document.
//!
//! The JSON shape is kept compatible with hand-written configs from older
//! sync scripts: the local side may be spelled `local`, `macos` or `mac`,
//! and rules may be given either as an explicit `rewrites` list or derived
//! from the per-side `paths` entries.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::ProjectMapping;
use crate::rewrite::RuleEntry;

use super::expand_tilde;

/// Default transfer timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Default SSH connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// The whole config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Host alias from `~/.ssh/config`.
    pub ssh_alias: String,

    pub paths: PathsConfig,

    /// Ordered rewrite rules. When empty, rules are derived from `paths`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rewrites: Vec<RuleEntry>,

    #[serde(default)]
    pub projects: Vec<ProjectMapping>,

    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Root and well-known paths on both machines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub server: SidePaths,
    #[serde(alias = "macos", alias = "mac")]
    pub local: SidePaths,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePaths {
    /// Directory holding one sub-directory per project.
    pub claude_projects: String,

    /// Escaped spelling of the temp/worktree base, as it appears in
    /// project directory tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_escaped: Option<String>,

    /// Absolute temp/worktree base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_base: Option<String>,
}

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Where files are staged between rsync and rewriting.
    /// Defaults to `<tmp>/session-sync`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<String>,

    /// Extensions (without dot) whose contents are rewritten.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// rsync binary to run. Defaults to `rsync` on `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsync_path: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            staging_dir: None,
            extensions: default_extensions(),
            rsync_path: None,
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_extensions() -> Vec<String> {
    vec!["jsonl".to_string()]
}

impl ConfigDocument {
    /// The rule entries in effect: explicit `rewrites`, or the ones
    /// implied by `paths` (escaped temp base, absolute temp base, projects
    /// root, in that order).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnpairedPath`] if a derived path is set on
    /// one side only, or [`ConfigError::Invalid`] if a server path to
    /// derive from is not absolute.
    pub fn rule_entries(&self) -> Result<Vec<RuleEntry>, ConfigError> {
        if !self.rewrites.is_empty() {
            return Ok(self.rewrites.clone());
        }

        let server = &self.paths.server;
        let local = &self.paths.local;
        let mut entries = Vec::new();

        let optional = [
            ("temp_escaped", &server.temp_escaped, &local.temp_escaped, false),
            ("temp_base", &server.temp_base, &local.temp_base, true),
        ];
        for (key, server_value, local_value, is_path) in optional {
            match (server_value, local_value) {
                (Some(s), Some(l)) if is_path => {
                    entries.push(RuleEntry::new(server_path(key, s)?, local_path(l)));
                }
                (Some(s), Some(l)) => entries.push(RuleEntry::new(s.clone(), l.clone())),
                (Some(_), None) => {
                    return Err(ConfigError::UnpairedPath {
                        key,
                        present: "server",
                        missing: "local",
                    });
                }
                (None, Some(_)) => {
                    return Err(ConfigError::UnpairedPath {
                        key,
                        present: "local",
                        missing: "server",
                    });
                }
                (None, None) => {}
            }
        }

        if !server.claude_projects.trim().is_empty() && !local.claude_projects.trim().is_empty() {
            let remote = server_path("claude_projects", &server.claude_projects)?;
            let local = local_path(&local.claude_projects);
            if remote != local {
                entries.push(RuleEntry::new(remote, local));
            }
        }

        Ok(entries)
    }
}

/// A server path as it appears in session content. `~` cannot be
/// expanded on this side, so it never becomes a rewrite form.
fn server_path(key: &str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim().trim_end_matches('/');
    if value.starts_with('/') {
        Ok(value.to_string())
    } else {
        Err(ConfigError::Invalid(format!(
            "`paths.server.{key}` must be an absolute path to derive a rewrite rule, got `{value}`; \
             make it absolute or list explicit `rewrites`"
        )))
    }
}

/// A local path as it appears in session content, `~` expanded.
fn local_path(value: &str) -> String {
    let expanded = expand_tilde(value.trim()).display().to_string();
    expanded.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"{
        "ssh_alias": "devbox",
        "paths": {
            "server": {
                "claude_projects": "/home/dev/.claude/projects",
                "temp_escaped": "-var-tmp-vibe-kanban-worktrees",
                "temp_base": "/var/tmp/vibe-kanban/worktrees"
            },
            "macos": {
                "claude_projects": "/Users/dev/.claude/projects",
                "temp_escaped": "-private-var-folders-dw-T-vibe-kanban-worktrees",
                "temp_base": "/private/var/folders/dw/T/vibe-kanban/worktrees"
            }
        },
        "projects": [
            {"name": "orch", "server_dir": "-var-tmp-orch", "macos_dir": "-private-var-orch", "sync": "server-to-mac"}
        ]
    }"#;

    #[test]
    fn test_legacy_document_parses() {
        let doc: ConfigDocument = serde_json::from_str(LEGACY).unwrap();
        assert_eq!(doc.ssh_alias, "devbox");
        assert_eq!(doc.paths.local.claude_projects, "/Users/dev/.claude/projects");
        assert_eq!(doc.projects.len(), 1);
        assert_eq!(doc.transfer, TransferConfig::default());
    }

    #[test]
    fn test_rules_derived_from_paths_in_order() {
        let doc: ConfigDocument = serde_json::from_str(LEGACY).unwrap();
        let entries = doc.rule_entries().unwrap();
        let servers: Vec<&str> = entries.iter().map(|e| e.server.as_deref().unwrap()).collect();
        assert_eq!(
            servers,
            vec![
                "-var-tmp-vibe-kanban-worktrees",
                "/var/tmp/vibe-kanban/worktrees",
                "/home/dev/.claude/projects",
            ]
        );
    }

    #[test]
    fn test_explicit_rewrites_take_precedence() {
        let mut doc: ConfigDocument = serde_json::from_str(LEGACY).unwrap();
        doc.rewrites = vec![RuleEntry::new("/srv", "/Volumes/srv")];
        let entries = doc.rule_entries().unwrap();
        assert_eq!(entries, vec![RuleEntry::new("/srv", "/Volumes/srv")]);
    }

    #[test]
    fn test_unpaired_path_is_config_error() {
        let mut doc: ConfigDocument = serde_json::from_str(LEGACY).unwrap();
        doc.paths.local.temp_base = None;
        let err = doc.rule_entries().unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnpairedPath {
                key: "temp_base",
                present: "server",
                missing: "local",
            }
        );
    }

    #[test]
    fn test_derived_local_paths_are_tilde_expanded() {
        let mut doc: ConfigDocument = serde_json::from_str(LEGACY).unwrap();
        doc.paths.local.claude_projects = "~/.claude/projects/".into();
        doc.paths.local.temp_base = Some("~/tmp/worktrees".into());

        let entries = doc.rule_entries().unwrap();
        for entry in &entries {
            assert!(!entry.local.as_deref().unwrap().starts_with('~'));
        }
        let root = entries.last().unwrap();
        assert_eq!(root.server.as_deref(), Some("/home/dev/.claude/projects"));
        assert_eq!(
            root.local.as_deref().map(std::path::PathBuf::from),
            Some(expand_tilde("~/.claude/projects"))
        );
    }

    #[test]
    fn test_relative_server_path_cannot_derive_rule() {
        let mut doc: ConfigDocument = serde_json::from_str(LEGACY).unwrap();
        doc.paths.server.claude_projects = "~/.claude/projects".into();
        assert!(matches!(doc.rule_entries(), Err(ConfigError::Invalid(_))));

        // Explicit rules make the server root's spelling irrelevant.
        doc.rewrites = vec![RuleEntry::new("-home-dev", "-Users-dev")];
        assert!(doc.rule_entries().is_ok());
    }
}
