//! Project mapping registry and direction policy.
//!
//! The registry is built once from the config and is read-only afterwards.
//! It answers three questions for the orchestrator: which mapping does a
//! name refer to, which mappings does a batch run cover, and is the
//! requested command allowed (and approved) for a mapping's mode.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{ConfigError, Error, Result};
use crate::model::{ProjectMapping, SyncDirection, SyncMode};

/// The command the user invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncCommand {
    Pull,
    Push,
}

impl SyncCommand {
    #[must_use]
    pub const fn direction(self) -> SyncDirection {
        match self {
            Self::Pull => SyncDirection::ServerToLocal,
            Self::Push => SyncDirection::LocalToServer,
        }
    }
}

impl std::fmt::Display for SyncCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Push => write!(f, "push"),
        }
    }
}

/// How much approval accompanies a push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    #[default]
    None,
    /// `--yes` on the command line. Only honored for bidirectional mappings.
    Override,
    /// A person answered the approval prompt.
    Confirmed,
}

impl Approval {
    #[must_use]
    pub const fn from_flag(yes: bool) -> Self {
        if yes { Self::Override } else { Self::None }
    }

    const fn covers(self, mode: SyncMode) -> bool {
        match self {
            Self::None => false,
            Self::Override => matches!(mode, SyncMode::Bidirectional),
            Self::Confirmed => true,
        }
    }
}

/// Outcome of the direction check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionDecision {
    Proceed(SyncDirection),
    /// Not an error: the push is legal but waits for a confirmation.
    RequiresApproval(SyncDirection),
}

/// All configured project mappings, keyed by unique name.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    mappings: Vec<ProjectMapping>,
}

impl MappingRegistry {
    /// Validate and index the mappings.
    ///
    /// Directory tokens are checked for shape only; whether they exist on
    /// either side is decided at transfer time.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for duplicate names or malformed tokens.
    pub fn new(mappings: Vec<ProjectMapping>) -> std::result::Result<Self, ConfigError> {
        let mut seen = HashSet::new();

        for mapping in &mappings {
            if mapping.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "Project entries need a non-empty `name`".to_string(),
                ));
            }
            if !seen.insert(mapping.name.as_str()) {
                return Err(ConfigError::DuplicateProject {
                    name: mapping.name.clone(),
                });
            }
            validate_token(&mapping.name, "server", &mapping.remote_dir)?;
            validate_token(&mapping.name, "local", &mapping.local_dir)?;
        }

        Ok(Self { mappings })
    }

    /// Look up an enabled mapping by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] if the name is unknown or the
    /// mapping is disabled.
    pub fn resolve(&self, name: &str) -> Result<&ProjectMapping> {
        self.mappings
            .iter()
            .find(|m| m.name == name && m.enabled)
            .ok_or_else(|| Error::ProjectNotFound {
                name: name.to_string(),
                available: self.enabled_names(),
            })
    }

    /// Every mapping, enabled or not, ordered by name.
    #[must_use]
    pub fn list_all(&self) -> Vec<&ProjectMapping> {
        let mut all: Vec<&ProjectMapping> = self.mappings.iter().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Mappings covered by `sync-all`: enabled and pullable, ordered by name.
    #[must_use]
    pub fn batch_candidates(&self) -> Vec<&ProjectMapping> {
        self.list_all()
            .into_iter()
            .filter(|m| m.enabled && m.mode.allows_pull())
            .collect()
    }

    /// Decide the direction for `command` on `mapping`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Policy`] when the mapping's mode forbids the
    /// command's direction.
    pub fn resolve_direction_for(
        &self,
        mapping: &ProjectMapping,
        command: SyncCommand,
        approval: Approval,
    ) -> Result<DirectionDecision> {
        let policy_error = || Error::Policy {
            project: mapping.name.clone(),
            mode: mapping.mode,
            command,
        };

        match command {
            SyncCommand::Pull => {
                if !mapping.mode.allows_pull() {
                    return Err(policy_error());
                }
                Ok(DirectionDecision::Proceed(command.direction()))
            }
            SyncCommand::Push => {
                if !mapping.mode.allows_push() {
                    return Err(policy_error());
                }
                if approval.covers(mapping.mode) {
                    Ok(DirectionDecision::Proceed(command.direction()))
                } else {
                    Ok(DirectionDecision::RequiresApproval(command.direction()))
                }
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn enabled_names(&self) -> Vec<String> {
        self.list_all()
            .into_iter()
            .filter(|m| m.enabled)
            .map(|m| m.name.clone())
            .collect()
    }
}

fn validate_token(
    name: &str,
    side: &'static str,
    dir: &str,
) -> std::result::Result<(), ConfigError> {
    let reason = if dir.is_empty() {
        Some("must not be empty")
    } else if dir.contains('/') || dir.contains('\\') {
        Some("must be a single escaped directory name, not a path")
    } else if dir == "." || dir == ".." {
        Some("must not refer to the root itself or its parent")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidDirectory {
            name: name.to_string(),
            side,
            dir: dir.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
