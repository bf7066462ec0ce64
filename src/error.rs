//! Error types for session-sync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (3=not_found, 4=policy, 6=transfer, 7=config, ...)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::model::SyncMode;
use crate::registry::SyncCommand;
use crate::sync::TransferError;

/// Result type alias for session-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts and schedulers match on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Not Found (exit 3)
    ProjectNotFound,
    ConfigNotFound,

    // Validation / policy (exit 4)
    InvalidArgument,
    PolicyViolation,

    // Approval (exit 5)
    ApprovalRequired,

    // Transfer (exit 6)
    TransferError,
    SyncFailed,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::ConfigNotFound => "CONFIG_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::PolicyViolation => "POLICY_VIOLATION",
            Self::ApprovalRequired => "APPROVAL_REQUIRED",
            Self::TransferError => "TRANSFER_ERROR",
            Self::SyncFailed => "SYNC_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::ProjectNotFound | Self::ConfigNotFound => 3,
            Self::InvalidArgument | Self::PolicyViolation => 4,
            Self::ApprovalRequired => 5,
            Self::TransferError | Self::SyncFailed => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether re-running the same invocation may succeed.
    ///
    /// Transfers fail on flaky networks; everything else needs a changed
    /// config or changed arguments first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransferError | Self::SyncFailed)
    }
}

// ── Configuration errors ──────────────────────────────────────

/// Problems with the rule set or the project mappings.
///
/// These are never auto-corrected: the offending entry is reported
/// verbatim so the config can be fixed by hand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Rewrite rule #{index} is missing its `{side}` form")]
    MissingForm { index: usize, side: &'static str },

    #[error("Rewrite rule #{index} maps `{form}` to itself")]
    IdenticalForms { index: usize, form: String },

    #[error("Rewrite rule #{index} contains a line break in its `{side}` form")]
    LineBreak { index: usize, side: &'static str },

    #[error("Rewrite rule #{index} duplicates rule #{first}")]
    DuplicateRule { index: usize, first: usize },

    #[error(
        "Ambiguous rewrite rules for {direction}: `{find}` maps to both `{first}` and `{second}`"
    )]
    AmbiguousRule {
        direction: String,
        find: String,
        first: String,
        second: String,
    },

    #[error(
        "Cascading rewrite rules for {direction}: replacement `{replace}` feeds `{find}` from another rule"
    )]
    CascadingRule {
        direction: String,
        replace: String,
        find: String,
    },

    #[error("Path `{key}` is set for the {present} side but not the {missing} side")]
    UnpairedPath {
        key: &'static str,
        present: &'static str,
        missing: &'static str,
    },

    #[error("Project `{name}` is configured more than once")]
    DuplicateProject { name: String },

    #[error("Project `{name}` has an invalid {side} directory `{dir}`: {reason}")]
    InvalidDirectory {
        name: String,
        side: &'static str,
        dir: String,
        reason: &'static str,
    },

    #[error("{0}")]
    Invalid(String),
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in session-sync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No configuration file found")]
    ConfigNotFound { searched: Vec<PathBuf> },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read configuration {path}: {message}")]
    ConfigUnreadable { path: PathBuf, message: String },

    #[error("Project not found or disabled: {name}")]
    ProjectNotFound { name: String, available: Vec<String> },

    #[error("Project `{project}` is {mode}; `{command}` is not allowed")]
    Policy {
        project: String,
        mode: SyncMode,
        command: SyncCommand,
    },

    #[error("Pushing `{project}` requires approval")]
    ApprovalRequired { project: String, mode: SyncMode },

    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("{failed} of {total} projects failed to sync")]
    SyncFailed { failed: usize, total: usize },

    #[error("Round-trip mismatch in {path}: {differing} line(s) differ")]
    RoundTripMismatch { path: PathBuf, differing: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Self::Config(_) | Self::ConfigUnreadable { .. } => ErrorCode::ConfigError,
            Self::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            Self::Policy { .. } => ErrorCode::PolicyViolation,
            Self::ApprovalRequired { .. } => ErrorCode::ApprovalRequired,
            Self::Transfer(_) => ErrorCode::TransferError,
            Self::SyncFailed { .. } | Self::RoundTripMismatch { .. } => ErrorCode::SyncFailed,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ConfigNotFound { searched } => {
                let mut hint = String::from("Searched:\n");
                for path in searched {
                    hint.push_str(&format!("    {}\n", path.display()));
                }
                hint.push_str("  Run `ssync setup` to create one, or pass --config <path>");
                Some(hint)
            }

            Self::ProjectNotFound { available, .. } => {
                if available.is_empty() {
                    Some("No enabled projects are configured. Run `ssync setup`.".to_string())
                } else {
                    Some(format!(
                        "Enabled projects: {}. Use `ssync list` for details.",
                        available.join(", ")
                    ))
                }
            }

            Self::Policy { mode, .. } => Some(format!(
                "The project's sync mode is `{mode}`. Change `sync` in the config to allow this direction."
            )),

            Self::ApprovalRequired { mode, .. } => match mode {
                SyncMode::Bidirectional => {
                    Some("Re-run with --yes, or run interactively to confirm.".to_string())
                }
                _ => Some(
                    "Push-only projects need an interactive confirmation; run from a terminal."
                        .to_string(),
                ),
            },

            Self::Config(ConfigError::AmbiguousRule { .. }) => Some(
                "Each form may map to exactly one counterpart. Remove or merge the conflicting rules."
                    .to_string(),
            ),

            Self::Config(ConfigError::CascadingRule { .. }) => Some(
                "A replacement must not contain or run into another rule's search form; split or reorder the rules by hand."
                    .to_string(),
            ),

            Self::SyncFailed { .. } => {
                Some("See the per-project lines above; `ssync status` shows the last results.".to_string())
            }

            Self::Transfer(TransferError::Timeout(_)) => {
                Some("Raise `transfer.timeout_secs` or pass --timeout.".to_string())
            }

            Self::RoundTripMismatch { .. } => Some(
                "The rules are not reversible for this content; check for overlapping forms.".to_string(),
            ),

            Self::Config(_)
            | Self::ConfigUnreadable { .. }
            | Self::Transfer(_)
            | Self::InvalidArgument(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        let not_found = Error::ProjectNotFound {
            name: "x".into(),
            available: vec![],
        };
        assert_eq!(not_found.exit_code(), 3);

        let policy = Error::Policy {
            project: "x".into(),
            mode: SyncMode::PullOnly,
            command: SyncCommand::Push,
        };
        assert_eq!(policy.exit_code(), 4);

        let config = Error::from(ConfigError::DuplicateProject { name: "x".into() });
        assert_eq!(config.exit_code(), 7);

        let batch = Error::SyncFailed { failed: 1, total: 3 };
        assert_eq!(batch.exit_code(), 6);
        assert_eq!(batch.to_string(), "1 of 3 projects failed to sync");
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::ProjectNotFound {
            name: "ghost".into(),
            available: vec!["app".into(), "infra".into()],
        };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "PROJECT_NOT_FOUND");
        assert_eq!(json["error"]["exit_code"], 3);
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].as_str().unwrap().contains("app, infra"));
    }

    #[test]
    fn test_policy_message_is_verbatim() {
        let err = Error::Policy {
            project: "logs".into(),
            mode: SyncMode::PullOnly,
            command: SyncCommand::Push,
        };
        assert_eq!(
            err.to_string(),
            "Project `logs` is pull-only; `push` is not allowed"
        );
    }

    #[test]
    fn test_transfer_errors_are_retryable() {
        let err = Error::Transfer(TransferError::Timeout(30));
        assert!(err.error_code().is_retryable());
        assert!(err.hint().is_some());
    }
}
