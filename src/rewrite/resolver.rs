//! Turns the rule store into an ordered rewrite pipeline for one direction.
//!
//! Ordering: longest search form first, ties broken by declaration order.
//! A short, general token (a bare home directory) must never consume part
//! of a longer, specific token (a full escaped temp directory) that a
//! later rule would otherwise have matched.

use serde::Serialize;

use super::rules::RuleStore;
use crate::error::ConfigError;
use crate::model::SyncDirection;

/// One literal find/replace step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteOp {
    pub find: String,
    pub replace: String,
}

/// Ordered rewrite operations for a single sync direction.
#[derive(Debug, Clone, Serialize)]
pub struct Pipeline {
    direction: SyncDirection,
    ops: Vec<RewriteOp>,
}

impl Pipeline {
    #[must_use]
    pub fn direction(&self) -> SyncDirection {
        self.direction
    }

    /// Direction of the pipeline that undoes this one.
    #[must_use]
    pub fn inverse_direction(&self) -> SyncDirection {
        self.direction.inverse()
    }

    /// Operations in application order.
    #[must_use]
    pub fn ops(&self) -> &[RewriteOp] {
        &self.ops
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Build the pipeline for `direction`.
///
/// # Errors
///
/// - [`ConfigError::AmbiguousRule`] when two rules share a search form but
///   disagree on its replacement.
/// - [`ConfigError::CascadingRule`] when a replacement contains the search
///   form of a different rule. Cascades are flagged, never chained.
pub fn resolve_pipeline(
    store: &RuleStore,
    direction: SyncDirection,
) -> Result<Pipeline, ConfigError> {
    let mut ops: Vec<RewriteOp> = store
        .rules()
        .iter()
        .map(|rule| match direction {
            SyncDirection::ServerToLocal => RewriteOp {
                find: rule.remote.clone(),
                replace: rule.local.clone(),
            },
            SyncDirection::LocalToServer => RewriteOp {
                find: rule.local.clone(),
                replace: rule.remote.clone(),
            },
        })
        .collect();

    // Vec::sort_by is stable: equal lengths keep config order.
    ops.sort_by(|a, b| b.find.len().cmp(&a.find.len()));

    check_ambiguity(&ops, direction)?;
    check_cascades(&ops, direction)?;

    Ok(Pipeline { direction, ops })
}

/// Two ops can only match at the same offset with equal length if their
/// search forms are identical, and equal lengths are adjacent after sorting.
fn check_ambiguity(ops: &[RewriteOp], direction: SyncDirection) -> Result<(), ConfigError> {
    for (i, op) in ops.iter().enumerate() {
        for other in ops[i + 1..]
            .iter()
            .take_while(|o| o.find.len() == op.find.len())
        {
            if other.find == op.find && other.replace != op.replace {
                return Err(ConfigError::AmbiguousRule {
                    direction: direction.to_string(),
                    find: op.find.clone(),
                    first: op.replace.clone(),
                    second: other.replace.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_cascades(ops: &[RewriteOp], direction: SyncDirection) -> Result<(), ConfigError> {
    for (i, op) in ops.iter().enumerate() {
        for (j, other) in ops.iter().enumerate() {
            if !op.replace.contains(other.find.as_str()) {
                continue;
            }
            if i == j || other.find == op.find {
                tracing::warn!(
                    %direction,
                    find = %op.find,
                    replace = %op.replace,
                    "replacement contains its own search form; rewriting is not idempotent"
                );
                continue;
            }
            return Err(ConfigError::CascadingRule {
                direction: direction.to_string(),
                replace: op.replace.clone(),
                find: other.find.clone(),
            });
        }
        for other in &ops[i + 1..] {
            if other.find != op.find && straddles(&op.replace, &other.find) {
                return Err(ConfigError::CascadingRule {
                    direction: direction.to_string(),
                    replace: op.replace.clone(),
                    find: other.find.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Whether `find` can match across an edge of `replace`: starting inside
/// it and ending after it, or starting before it and ending inside it.
fn straddles(replace: &str, find: &str) -> bool {
    replace.char_indices().skip(1).any(|(at, _)| {
        let (head, tail) = replace.split_at(at);
        (find.len() > tail.len() && find.starts_with(tail))
            || (find.len() > head.len() && find.ends_with(head))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::rules::RuleEntry;

    fn store(pairs: &[(&str, &str)]) -> RuleStore {
        let entries: Vec<RuleEntry> = pairs.iter().map(|(s, l)| RuleEntry::new(*s, *l)).collect();
        RuleStore::load(&entries).unwrap()
    }

    fn finds(pipeline: &Pipeline) -> Vec<&str> {
        pipeline.ops().iter().map(|op| op.find.as_str()).collect()
    }

    #[test]
    fn test_server_to_local_uses_remote_as_find() {
        let rules = store(&[("/home/dev", "/Users/dev")]);
        let pipeline = resolve_pipeline(&rules, SyncDirection::ServerToLocal).unwrap();
        assert_eq!(pipeline.ops()[0].find, "/home/dev");
        assert_eq!(pipeline.ops()[0].replace, "/Users/dev");

        let back = resolve_pipeline(&rules, SyncDirection::LocalToServer).unwrap();
        assert_eq!(back.ops()[0].find, "/Users/dev");
        assert_eq!(back.ops()[0].replace, "/home/dev");
    }

    #[test]
    fn test_longer_forms_come_first() {
        let rules = store(&[("-var-tmp", "A"), ("-var-tmp-extra", "B")]);
        let pipeline = resolve_pipeline(&rules, SyncDirection::ServerToLocal).unwrap();
        assert_eq!(finds(&pipeline), vec!["-var-tmp-extra", "-var-tmp"]);
    }

    #[test]
    fn test_equal_lengths_keep_config_order() {
        let rules = store(&[("/bbb", "/1"), ("/aaa", "/2"), ("/ccc", "/3")]);
        let pipeline = resolve_pipeline(&rules, SyncDirection::ServerToLocal).unwrap();
        assert_eq!(finds(&pipeline), vec!["/bbb", "/aaa", "/ccc"]);
    }

    #[test]
    fn test_shared_find_with_different_replace_is_ambiguous() {
        // Two server forms collapse onto one local form: fine going
        // server -> local, ambiguous coming back.
        let rules = store(&[("/srv/a", "/Users/x"), ("/srv/b", "/Users/x")]);
        assert!(resolve_pipeline(&rules, SyncDirection::ServerToLocal).is_ok());

        let err = resolve_pipeline(&rules, SyncDirection::LocalToServer).unwrap_err();
        assert_eq!(
            err,
            ConfigError::AmbiguousRule {
                direction: "local-to-server".into(),
                find: "/Users/x".into(),
                first: "/srv/a".into(),
                second: "/srv/b".into(),
            }
        );
    }

    #[test]
    fn test_cascading_replacement_is_rejected() {
        let rules = store(&[("/opt/data", "/Volumes/tmp/data"), ("/tmp", "/private/t")]);
        let err = resolve_pipeline(&rules, SyncDirection::ServerToLocal).unwrap_err();
        assert!(matches!(err, ConfigError::CascadingRule { ref find, .. } if find == "/tmp"));
    }

    #[test]
    fn test_cascade_across_replacement_end_is_rejected() {
        // `-var-tmp-vibe-q` would become `-private-var-q`, then `-private-Z`.
        let rules = store(&[("-var-tmp-vibe", "-private-var"), ("var-q", "Z")]);
        let err = resolve_pipeline(&rules, SyncDirection::ServerToLocal).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CascadingRule {
                direction: "server-to-local".into(),
                replace: "-private-var".into(),
                find: "var-q".into(),
            }
        );
    }

    #[test]
    fn test_cascade_across_replacement_start_is_rejected() {
        let rules = store(&[("/data/set", "/mnt/data"), ("x/mn", "Q")]);
        assert!(matches!(
            resolve_pipeline(&rules, SyncDirection::ServerToLocal),
            Err(ConfigError::CascadingRule { ref find, .. }) if find == "x/mn"
        ));
    }

    #[test]
    fn test_overlap_with_earlier_op_is_harmless() {
        // `-var-tmp-vibe` runs before `-var-tmp` produces `-private-var`.
        let rules = store(&[("-var-tmp-vibe", "-pv-vibe"), ("-var-tmp", "-private-var")]);
        assert!(resolve_pipeline(&rules, SyncDirection::ServerToLocal).is_ok());
    }

    #[test]
    fn test_self_containing_replacement_is_allowed() {
        let rules = store(&[("/tmp", "/private/tmp")]);
        assert!(resolve_pipeline(&rules, SyncDirection::ServerToLocal).is_ok());
    }

    #[test]
    fn test_prefix_rules_in_both_directions() {
        let rules = store(&[
            ("/home/user/.claude/projects", "/Users/user/.claude/projects"),
            ("-var-tmp-vibe", "-private-var-folders-vibe"),
            ("-var-tmp", "-private-var"),
        ]);

        let to_local = resolve_pipeline(&rules, SyncDirection::ServerToLocal).unwrap();
        let sources = finds(&to_local);
        let vibe = sources.iter().position(|f| *f == "-var-tmp-vibe").unwrap();
        let bare = sources.iter().position(|f| *f == "-var-tmp").unwrap();
        assert!(vibe < bare, "more specific patterns should be applied before broad ones");

        let to_server = resolve_pipeline(&rules, SyncDirection::LocalToServer).unwrap();
        assert_eq!(to_server.direction(), SyncDirection::LocalToServer);
        assert_eq!(to_server.inverse_direction(), SyncDirection::ServerToLocal);
        assert_eq!(to_server.len(), 3);
    }
}
