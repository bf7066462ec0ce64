//! Rewrite rules and the rule store.
//!
//! A rule pairs the server-side spelling of a path fragment with its
//! local spelling. Rules are loaded once at startup and never mutated.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A rule as written in the config file.
///
/// Both sides are optional at the serde level so that a missing side is
/// reported as a [`ConfigError`] naming the rule, not as a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(
        default,
        alias = "mac",
        alias = "macos",
        skip_serializing_if = "Option::is_none"
    )]
    pub local: Option<String>,
}

impl RuleEntry {
    pub fn new(server: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
            local: Some(local.into()),
        }
    }
}

/// A validated bidirectional rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteRule {
    /// Spelling on the server.
    pub remote: String,
    /// Spelling on the workstation.
    pub local: String,
}

/// Ordered, immutable set of rewrite rules.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: Vec<RewriteRule>,
}

impl RuleStore {
    /// Validate config entries and build the store, keeping declaration order.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a rule is missing a side, maps a form
    /// to itself, contains a line break, or duplicates an earlier rule.
    pub fn load(entries: &[RuleEntry]) -> Result<Self, ConfigError> {
        let mut rules: Vec<RewriteRule> = Vec::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            let index = i + 1;
            let remote = non_empty(entry.server.as_deref())
                .ok_or(ConfigError::MissingForm { index, side: "server" })?;
            let local = non_empty(entry.local.as_deref())
                .ok_or(ConfigError::MissingForm { index, side: "local" })?;

            if remote == local {
                return Err(ConfigError::IdenticalForms {
                    index,
                    form: remote.to_string(),
                });
            }
            if has_line_break(remote) {
                return Err(ConfigError::LineBreak { index, side: "server" });
            }
            if has_line_break(local) {
                return Err(ConfigError::LineBreak { index, side: "local" });
            }

            if let Some(first) = rules
                .iter()
                .position(|r| r.remote == remote && r.local == local)
            {
                return Err(ConfigError::DuplicateRule {
                    index,
                    first: first + 1,
                });
            }

            rules.push(RewriteRule {
                remote: remote.to_string(),
                local: local.to_string(),
            });
        }

        Ok(Self { rules })
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_preserves_order() {
        let store = RuleStore::load(&[
            RuleEntry::new("/home/dev", "/Users/dev"),
            RuleEntry::new("-var-tmp", "-private-var"),
        ])
        .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.rules()[0].remote, "/home/dev");
        assert_eq!(store.rules()[1].local, "-private-var");
    }

    #[test]
    fn test_missing_side_is_config_error() {
        let entry = RuleEntry {
            server: Some("/home/dev".into()),
            local: None,
        };
        let err = RuleStore::load(&[entry]).unwrap_err();
        assert_eq!(err, ConfigError::MissingForm { index: 1, side: "local" });

        let empty = RuleEntry::new("", "/Users/dev");
        let err = RuleStore::load(&[empty]).unwrap_err();
        assert_eq!(err, ConfigError::MissingForm { index: 1, side: "server" });
    }

    #[test]
    fn test_identical_forms_rejected() {
        let err = RuleStore::load(&[RuleEntry::new("/same", "/same")]).unwrap_err();
        assert!(matches!(err, ConfigError::IdenticalForms { index: 1, .. }));
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let err = RuleStore::load(&[
            RuleEntry::new("/a", "/b"),
            RuleEntry::new("/c", "/d"),
            RuleEntry::new("/a", "/b"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateRule { index: 3, first: 1 });
    }

    #[test]
    fn test_line_break_rejected() {
        let err = RuleStore::load(&[RuleEntry::new("/a\n", "/b")]).unwrap_err();
        assert_eq!(err, ConfigError::LineBreak { index: 1, side: "server" });
    }

    #[test]
    fn test_mac_alias_deserializes_as_local() {
        let entry: RuleEntry =
            serde_json::from_str(r#"{"server": "-var-tmp", "mac": "-private-var"}"#).unwrap();
        assert_eq!(entry.local.as_deref(), Some("-private-var"));
    }
}
