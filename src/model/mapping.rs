//! Project mappings and sync directions.
//!
//! A mapping ties a short project nickname to the escaped directory token
//! the session logger uses on each machine, e.g. `-home-dev-app` on the
//! server and `-Users-dev-app` locally.

use serde::{Deserialize, Serialize};

/// Permitted sync direction(s) for a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Server → local only.
    #[default]
    #[serde(alias = "server-to-mac", alias = "server-to-local")]
    PullOnly,
    /// Local → server only, always behind an approval prompt.
    #[serde(alias = "mac-to-server", alias = "local-to-server")]
    PushOnly,
    /// Either way; `--yes` may pre-approve pushes.
    Bidirectional,
}

impl SyncMode {
    /// Whether `sync-all` picks this mapping up.
    #[must_use]
    pub const fn allows_pull(self) -> bool {
        matches!(self, Self::PullOnly | Self::Bidirectional)
    }

    #[must_use]
    pub const fn allows_push(self) -> bool {
        matches!(self, Self::PushOnly | Self::Bidirectional)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PullOnly => write!(f, "pull-only"),
            Self::PushOnly => write!(f, "push-only"),
            Self::Bidirectional => write!(f, "bidirectional"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pull-only" | "pull" | "server-to-mac" | "server-to-local" => Ok(Self::PullOnly),
            "push-only" | "push" | "mac-to-server" | "local-to-server" => Ok(Self::PushOnly),
            "bidirectional" | "both" => Ok(Self::Bidirectional),
            _ => Err(format!("Unknown sync mode: {s}")),
        }
    }
}

/// Which way bytes move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    ServerToLocal,
    LocalToServer,
}

impl SyncDirection {
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::ServerToLocal => Self::LocalToServer,
            Self::LocalToServer => Self::ServerToLocal,
        }
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerToLocal => write!(f, "server-to-local"),
            Self::LocalToServer => write!(f, "local-to-server"),
        }
    }
}

/// A configured project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMapping {
    /// Nickname used on the command line.
    pub name: String,

    /// Escaped directory token under the server root.
    #[serde(rename = "server_dir")]
    pub remote_dir: String,

    /// Escaped directory token under the local root.
    #[serde(rename = "local_dir", alias = "macos_dir", alias = "mac_dir")]
    pub local_dir: String,

    #[serde(rename = "sync", default)]
    pub mode: SyncMode,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl ProjectMapping {
    pub fn new(
        name: impl Into<String>,
        remote_dir: impl Into<String>,
        local_dir: impl Into<String>,
        mode: SyncMode,
    ) -> Self {
        Self {
            name: name.into(),
            remote_dir: remote_dir.into(),
            local_dir: local_dir.into(),
            mode,
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_deserializes_legacy_keys() {
        let json = r#"{
            "name": "vibe",
            "server_dir": "-var-tmp-vibe",
            "macos_dir": "-private-var-vibe",
            "sync": "server-to-mac"
        }"#;
        let mapping: ProjectMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.local_dir, "-private-var-vibe");
        assert_eq!(mapping.mode, SyncMode::PullOnly);
        assert!(mapping.enabled);
    }

    #[test]
    fn test_mapping_serializes_canonical_keys() {
        let mapping = ProjectMapping::new("app", "-home-dev-app", "-Users-dev-app", SyncMode::Bidirectional);
        let value = serde_json::to_value(&mapping).unwrap();
        assert_eq!(value["server_dir"], "-home-dev-app");
        assert_eq!(value["local_dir"], "-Users-dev-app");
        assert_eq!(value["sync"], "bidirectional");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("mac-to-server".parse::<SyncMode>().unwrap(), SyncMode::PushOnly);
        assert_eq!("Bidirectional".parse::<SyncMode>().unwrap(), SyncMode::Bidirectional);
        assert!("sideways".parse::<SyncMode>().is_err());
    }

    #[test]
    fn test_mode_permissions() {
        assert!(SyncMode::PullOnly.allows_pull());
        assert!(!SyncMode::PullOnly.allows_push());
        assert!(!SyncMode::PushOnly.allows_pull());
        assert!(SyncMode::Bidirectional.allows_push());
    }

    #[test]
    fn test_direction_inverse() {
        assert_eq!(SyncDirection::ServerToLocal.inverse(), SyncDirection::LocalToServer);
        assert_eq!(SyncDirection::LocalToServer.to_string(), "local-to-server");
    }
}
