//! Verify command implementation.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::cli::Side;
use crate::error::{Error, Result};
use crate::model::SyncDirection;
use crate::rewrite::{resolve_pipeline, rewrite, rewrite_file};

/// Differing lines shown on a mismatch.
const MAX_SHOWN: usize = 5;

#[derive(Serialize)]
struct LineDiff {
    line: usize,
    original: String,
    round_trip: String,
}

#[derive(Serialize)]
struct VerifyOutput<'a> {
    file: &'a Path,
    direction: SyncDirection,
    replacements: usize,
    identical: bool,
    differing_lines: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    first_differences: Vec<LineDiff>,
}

/// Rewrite `file` away from the side it was written on and back again.
///
/// # Errors
///
/// Returns [`Error::RoundTripMismatch`] when the result differs from the
/// original, or a config error if either direction's rules are ambiguous.
pub fn execute(file: &Path, from: Side, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = super::load_config(config_path)?;

    let direction = match from {
        Side::Server => SyncDirection::ServerToLocal,
        Side::Local => SyncDirection::LocalToServer,
    };
    let forward = resolve_pipeline(&config.rules, direction)?;
    let back = resolve_pipeline(&config.rules, forward.inverse_direction())?;

    let original = std::fs::read(file)?;
    let name = file.display().to_string();
    let rewritten = rewrite_file(&name, &original, &forward);
    let round_trip = rewrite(&rewritten.content, &back);

    let diffs = differing_lines(&original, &round_trip);
    let differing = diffs.len();
    let identical = original == round_trip;

    if json {
        let output = VerifyOutput {
            file,
            direction,
            replacements: rewritten.replacements,
            identical,
            differing_lines: differing,
            first_differences: diffs.into_iter().take(MAX_SHOWN).collect(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} ({direction})", file.display().to_string().bold());
        println!("  {} replacement(s) made", rewritten.replacements);
        if identical {
            println!("  {}", "Round trip is identical".green());
        } else {
            println!("  {}", format!("{differing} line(s) differ after the round trip").red());
            for diff in diffs.iter().take(MAX_SHOWN) {
                println!("  line {}:", diff.line);
                println!("    - {}", diff.original);
                println!("    + {}", diff.round_trip);
            }
        }
    }

    if identical {
        Ok(())
    } else {
        Err(Error::RoundTripMismatch {
            path: file.to_path_buf(),
            // A trailing-newline difference shows up as no differing line.
            differing: differing.max(1),
        })
    }
}

fn differing_lines(a: &[u8], b: &[u8]) -> Vec<LineDiff> {
    let a = String::from_utf8_lossy(a);
    let b = String::from_utf8_lossy(b);
    let mut left = a.lines();
    let mut right = b.lines();
    let mut diffs = Vec::new();

    for line in 1.. {
        match (left.next(), right.next()) {
            (None, None) => break,
            (l, r) if l == r => {}
            (l, r) => diffs.push(LineDiff {
                line,
                original: l.unwrap_or_default().to_string(),
                round_trip: r.unwrap_or_default().to_string(),
            }),
        }
    }
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_differing_lines() {
        let diffs = differing_lines(b"same\nold\nsame\n", b"same\nnew\nsame\nextra\n");
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].line, 2);
        assert_eq!(diffs[0].original, "old");
        assert_eq!(diffs[0].round_trip, "new");
        assert_eq!(diffs[1].line, 4);
        assert_eq!(diffs[1].original, "");
    }

    #[test]
    fn test_identical_has_no_diffs() {
        assert!(differing_lines(b"a\nb", b"a\nb").is_empty());
    }
}
