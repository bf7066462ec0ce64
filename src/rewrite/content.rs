//! Applies a rewrite pipeline to file contents.
//!
//! Every operation is a literal, left-to-right, non-overlapping global
//! replacement. Contents are treated as bytes; anything that is not a
//! search form (including invalid UTF-8) passes through untouched.

use std::io::{self, BufRead, Write};

use serde::Serialize;

use super::resolver::Pipeline;

/// A file after rewriting, ready to be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewrittenFile {
    /// Path relative to the project directory.
    pub name: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    /// Total substitutions made across all operations.
    pub replacements: usize,
}

impl RewrittenFile {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.replacements > 0
    }
}

/// Rewrite a whole buffer.
#[must_use]
pub fn rewrite(content: &[u8], pipeline: &Pipeline) -> Vec<u8> {
    apply(content, pipeline).0
}

/// Rewrite a string, e.g. a single path.
#[must_use]
pub fn rewrite_str(content: &str, pipeline: &Pipeline) -> String {
    pipeline
        .ops()
        .iter()
        .fold(content.to_string(), |acc, op| acc.replace(&op.find, &op.replace))
}

/// Rewrite one file's bytes, keeping its identity.
#[must_use]
pub fn rewrite_file(name: &str, content: &[u8], pipeline: &Pipeline) -> RewrittenFile {
    let (content, replacements) = apply(content, pipeline);
    RewrittenFile {
        name: name.to_string(),
        content,
        replacements,
    }
}

/// Rewrite line by line from `reader` into `writer`.
///
/// Rule forms never contain line breaks, so a token can never straddle
/// two reads. Returns the number of substitutions made.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub fn rewrite_stream<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    pipeline: &Pipeline,
) -> io::Result<u64> {
    let mut line = Vec::new();
    let mut total: u64 = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let (rewritten, count) = apply(&line, pipeline);
        writer.write_all(&rewritten)?;
        total += count as u64;
    }

    writer.flush()?;
    Ok(total)
}

fn apply(content: &[u8], pipeline: &Pipeline) -> (Vec<u8>, usize) {
    let mut current = content.to_vec();
    let mut total = 0;

    for op in pipeline.ops() {
        let find = op.find.as_bytes();
        if find_from(&current, find, 0).is_none() {
            continue;
        }
        let (next, count) = replace_all(&current, find, op.replace.as_bytes());
        current = next;
        total += count;
    }

    (current, total)
}

fn replace_all(haystack: &[u8], find: &[u8], replace: &[u8]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(haystack.len());
    let mut count = 0;
    let mut cursor = 0;

    while let Some(pos) = find_from(haystack, find, cursor) {
        out.extend_from_slice(&haystack[cursor..pos]);
        out.extend_from_slice(replace);
        cursor = pos + find.len();
        count += 1;
    }
    out.extend_from_slice(&haystack[cursor..]);

    (out, count)
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    let first = *needle.first()?;
    if haystack.len() < needle.len() {
        return None;
    }
    let last_start = haystack.len() - needle.len();

    let mut i = from;
    while i <= last_start {
        let offset = haystack[i..=last_start].iter().position(|&b| b == first)?;
        let pos = i + offset;
        if &haystack[pos..pos + needle.len()] == needle {
            return Some(pos);
        }
        i = pos + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyncDirection;
    use crate::rewrite::resolver::resolve_pipeline;
    use crate::rewrite::rules::{RuleEntry, RuleStore};

    fn pipelines(pairs: &[(&str, &str)]) -> (Pipeline, Pipeline) {
        let entries: Vec<RuleEntry> = pairs.iter().map(|(s, l)| RuleEntry::new(*s, *l)).collect();
        let store = RuleStore::load(&entries).unwrap();
        (
            resolve_pipeline(&store, SyncDirection::ServerToLocal).unwrap(),
            resolve_pipeline(&store, SyncDirection::LocalToServer).unwrap(),
        )
    }

    fn sample_rules() -> (Pipeline, Pipeline) {
        pipelines(&[
            ("/home/user/.claude/projects", "/Users/user/.claude/projects"),
            ("-var-tmp-vibe", "-private-var-folders-vibe"),
            ("-var-tmp", "-private-var"),
        ])
    }

    #[test]
    fn test_server_to_local() {
        let (to_local, _) = sample_rules();
        let content = "/home/user/.claude/projects/-var-tmp-vibe-kanban\nlink:-var-tmp\n";
        let expected = "/Users/user/.claude/projects/-private-var-folders-vibe-kanban\nlink:-private-var\n";
        assert_eq!(rewrite_str(content, &to_local), expected);
        assert_eq!(rewrite(content.as_bytes(), &to_local), expected.as_bytes());
    }

    #[test]
    fn test_local_to_server() {
        let (_, to_server) = sample_rules();
        let content = "/Users/user/.claude/projects/-private-var-folders-vibe-kanban\nlink:-private-var\n";
        let expected = "/home/user/.claude/projects/-var-tmp-vibe-kanban\nlink:-var-tmp\n";
        assert_eq!(rewrite_str(content, &to_server), expected);
    }

    #[test]
    fn test_round_trip_is_identity() {
        let (to_local, to_server) = sample_rules();
        let original = concat!(
            r#"{"cwd":"/home/user/.claude/projects/-var-tmp-vibe-x","msg":"ok"}"#,
            "\n",
            r#"{"path":"-var-tmp/-var-tmp-vibe/-var-tmp","n":1}"#,
            "\n",
            "plain line without tokens\n",
        );

        let there = rewrite(original.as_bytes(), &to_local);
        let back = rewrite(&there, &to_server);
        assert_eq!(back, original.as_bytes());
    }

    #[test]
    fn test_longer_token_wins_on_shared_prefix() {
        let (to_local, _) = pipelines(&[("-var-tmp", "A"), ("-var-tmp-extra", "B")]);
        assert_eq!(rewrite_str("x-var-tmp-extra/y-var-tmp", &to_local), "xB/yA");
    }

    #[test]
    fn test_idempotent_on_rewritten_content() {
        let (to_local, _) = sample_rules();
        let once = rewrite(b"/home/user/.claude/projects/-var-tmp-vibe/a.jsonl", &to_local);
        let twice = rewrite(&once, &to_local);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_escaped_worktree_example() {
        let (to_local, _) = pipelines(&[(
            "-var-tmp-vibe-kanban-worktrees-vk-2bd7-run-orch-n",
            "-private-var-folders-dw-d6symylx7sz0b30vzcrfkdg80000gq-T-vibe-kanban-worktrees-vk-2bd7-run-orch-n",
        )]);
        assert_eq!(
            rewrite_str("-var-tmp-vibe-kanban-worktrees-vk-2bd7-run-orch-n/session.jsonl", &to_local),
            "-private-var-folders-dw-d6symylx7sz0b30vzcrfkdg80000gq-T-vibe-kanban-worktrees-vk-2bd7-run-orch-n/session.jsonl"
        );
    }

    #[test]
    fn test_non_overlapping_left_to_right() {
        let (to_local, _) = pipelines(&[("aa", "b")]);
        assert_eq!(rewrite_str("aaa", &to_local), "ba");
        assert_eq!(rewrite(b"aaaa", &to_local), b"bb");
    }

    #[test]
    fn test_invalid_utf8_passes_through() {
        let (to_local, _) = pipelines(&[("/home/dev", "/Users/dev")]);
        let mut input = vec![0xff, 0xfe];
        input.extend_from_slice(b"/home/dev/x");
        let mut expected = vec![0xff, 0xfe];
        expected.extend_from_slice(b"/Users/dev/x");
        assert_eq!(rewrite(&input, &to_local), expected);
    }

    #[test]
    fn test_rewrite_file_counts_replacements() {
        let (to_local, _) = sample_rules();
        let file = rewrite_file("a.jsonl", b"-var-tmp -var-tmp-vibe none", &to_local);
        assert_eq!(file.name, "a.jsonl");
        assert_eq!(file.replacements, 2);
        assert!(file.is_changed());

        let untouched = rewrite_file("b.jsonl", b"nothing here", &to_local);
        assert!(!untouched.is_changed());
        assert_eq!(untouched.content, b"nothing here");
    }

    #[test]
    fn test_stream_matches_whole_buffer() {
        let (to_local, _) = sample_rules();
        let input = "first -var-tmp\nsecond /home/user/.claude/projects\nno newline -var-tmp-vibe";

        let mut out = Vec::new();
        let count = rewrite_stream(input.as_bytes(), &mut out, &to_local).unwrap();

        assert_eq!(out, rewrite(input.as_bytes(), &to_local));
        assert_eq!(count, 3);
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let store = RuleStore::load(&[]).unwrap();
        let pipeline = resolve_pipeline(&store, SyncDirection::ServerToLocal).unwrap();
        assert!(pipeline.is_empty());
        assert_eq!(rewrite(b"/home/dev", &pipeline), b"/home/dev");
    }
}
