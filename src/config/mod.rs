//! Configuration management.
//!
//! The config is a single JSON document describing the SSH alias, the
//! projects root on each machine, the rewrite rules and the project
//! mappings. It is loaded once at startup into an immutable [`SyncConfig`]
//! that is passed explicitly to everything that needs it.
//!
//! # Location
//!
//! Priority:
//! 1. `--config <path>`
//! 2. `SSYNC_CONFIG` environment variable
//! 3. `./config.json`
//! 4. `~/.session-sync/config.json`

mod document;

pub use document::{
    ConfigDocument, PathsConfig, SidePaths, TransferConfig, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_TIMEOUT_SECS,
};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Error, Result};
use crate::model::ProjectMapping;
use crate::registry::MappingRegistry;
use crate::rewrite::RuleStore;
use crate::sync::atomic_write;

/// Environment override for the config location.
pub const CONFIG_ENV: &str = "SSYNC_CONFIG";

const CONFIG_FILE: &str = "config.json";
const STATUS_FILE: &str = "sync_status.json";

/// `~/.session-sync`, home of the global config and the status file.
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".session-sync"))
}

/// Where `setup` writes by default.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// `~/.session-sync/sync_status.json`.
#[must_use]
pub fn status_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join(STATUS_FILE))
}

/// Resolve the config file to load.
///
/// An explicit path or env override is taken as-is and must exist; the
/// implicit locations are tried in order.
///
/// # Errors
///
/// Returns [`Error::ConfigNotFound`] listing every location tried.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let pinned = explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var(CONFIG_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    });

    let searched = match pinned {
        Some(path) => vec![path],
        None => {
            let mut paths = vec![PathBuf::from(CONFIG_FILE)];
            paths.extend(default_config_path());
            paths
        }
    };

    searched
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or(Error::ConfigNotFound { searched })
}

/// Read and parse a config document.
///
/// # Errors
///
/// Returns [`Error::ConfigUnreadable`] if the file cannot be read or is
/// not a valid document.
pub fn load_document(path: &Path) -> Result<ConfigDocument> {
    let unreadable = |message: String| Error::ConfigUnreadable {
        path: path.to_path_buf(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))
}

/// Write a config document atomically, pretty-printed.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save_document(path: &Path, doc: &ConfigDocument) -> Result<()> {
    let mut content = serde_json::to_string_pretty(doc)?;
    content.push('\n');
    atomic_write(path, content.as_bytes())?;
    tracing::info!(path = %path.display(), "saved configuration");
    Ok(())
}

/// Expand a leading `~` to this machine's home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = || directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf());

    if path == "~" {
        if let Some(home) = home() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Transport settings after defaults and overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    pub timeout: Duration,
    pub connect_timeout: u64,
    pub staging_dir: PathBuf,
    /// Extensions (without dot) whose contents are rewritten.
    pub extensions: Vec<String>,
    pub rsync: PathBuf,
}

impl TransferSettings {
    fn from_document(transfer: &TransferConfig) -> Self {
        Self {
            timeout: Duration::from_secs(transfer.timeout_secs),
            connect_timeout: transfer.connect_timeout_secs,
            staging_dir: transfer.staging_dir.as_deref().map_or_else(
                || std::env::temp_dir().join("session-sync"),
                expand_tilde,
            ),
            extensions: transfer
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            rsync: transfer
                .rsync_path
                .as_deref()
                .map_or_else(|| PathBuf::from("rsync"), expand_tilde),
        }
    }
}

/// The immutable, validated configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub ssh_alias: String,
    /// Projects root on the server, as rsync should see it.
    pub server_root: String,
    /// Projects root on this machine, `~` expanded.
    pub local_root: PathBuf,
    pub rules: RuleStore,
    pub registry: MappingRegistry,
    pub transfer: TransferSettings,
}

impl SyncConfig {
    /// Locate, read and validate the config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound`, `ConfigUnreadable` or a [`ConfigError`].
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(explicit)?;
        tracing::debug!(path = %path.display(), "loading configuration");
        let doc = load_document(&path)?;
        Ok(Self::from_document(&doc)?)
    }

    /// Validate a parsed document.
    ///
    /// Pipelines are not resolved here: an ambiguous rule set fails the
    /// operations that need it, not the whole process.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a missing alias or root, malformed
    /// rules or malformed mappings.
    pub fn from_document(doc: &ConfigDocument) -> std::result::Result<Self, ConfigError> {
        let ssh_alias = doc.ssh_alias.trim();
        if ssh_alias.is_empty() {
            return Err(ConfigError::Invalid("`ssh_alias` must not be empty".to_string()));
        }

        let server_root = remote_root(&doc.paths.server.claude_projects);
        if server_root.is_empty() {
            return Err(ConfigError::Invalid(
                "`paths.server.claude_projects` must not be empty".to_string(),
            ));
        }

        let local = doc.paths.local.claude_projects.trim();
        if local.is_empty() {
            return Err(ConfigError::Invalid(
                "`paths.local.claude_projects` must not be empty".to_string(),
            ));
        }

        let rules = RuleStore::load(&doc.rule_entries()?)?;
        let registry = MappingRegistry::new(doc.projects.clone())?;

        Ok(Self {
            ssh_alias: ssh_alias.to_string(),
            server_root,
            local_root: expand_tilde(local),
            rules,
            registry,
            transfer: TransferSettings::from_document(&doc.transfer),
        })
    }

    /// Absolute project directory on the server.
    #[must_use]
    pub fn remote_project_dir(&self, mapping: &ProjectMapping) -> String {
        format!("{}/{}", self.server_root, mapping.remote_dir)
    }

    /// Project directory on this machine.
    #[must_use]
    pub fn local_project_dir(&self, mapping: &ProjectMapping) -> PathBuf {
        self.local_root.join(&mapping.local_dir)
    }
}

/// Normalize the server root for rsync: `~/x` becomes `x`, which ssh
/// resolves against the remote home.
fn remote_root(path: &str) -> String {
    let path = path.trim().trim_end_matches('/');
    match path.strip_prefix("~/") {
        Some(rest) => rest.to_string(),
        None if path == "~" => ".".to_string(),
        None => path.to_string(),
    }
}
