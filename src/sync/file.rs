//! Atomic file operations for sync.
//!
//! - Atomic writes: write to a temp file, sync to disk, then rename
//! - Skip-if-identical writes so unchanged session files keep their mtime
//! - Project file enumeration with stable, slash-separated names

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

/// Suffix for in-progress writes. Files carrying it are never listed.
const TEMP_SUFFIX: &str = ".ssync-tmp";

/// Write content to a file atomically.
///
/// The content goes to a sibling temp file first, is synced to disk and
/// then renamed over the target. If any step fails the original file (if
/// any) is left untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(path);
    prepare_parent(path)?;

    let result = write_temp(&temp_path, |w| w.write_all(content))
        .and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Stream new content for `path` through `fill` into a temp file, then
/// move it into place unless `path` already holds exactly those bytes.
///
/// Returns whether the file was replaced, and what `fill` returned.
///
/// # Errors
///
/// Returns an error if `fill` fails or any file operation fails. The
/// existing file is left untouched either way.
pub fn replace_if_changed<T>(
    path: &Path,
    fill: impl FnOnce(&mut dyn Write) -> io::Result<T>,
) -> io::Result<(bool, T)> {
    let temp_path = temp_path_for(path);
    prepare_parent(path)?;

    let result = write_temp(&temp_path, fill).and_then(|value| {
        if same_contents(&temp_path, path)? {
            fs::remove_file(&temp_path)?;
            Ok((false, value))
        } else {
            fs::rename(&temp_path, path)?;
            Ok((true, value))
        }
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Give `path` the modification time `mtime`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or its times set.
pub fn set_mtime(path: &Path, mtime: SystemTime) -> io::Result<()> {
    File::options().write(true).open(path)?.set_modified(mtime)
}

fn prepare_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn write_temp<T>(temp_path: &Path, fill: impl FnOnce(&mut dyn Write) -> io::Result<T>) -> io::Result<T> {
    let mut writer = BufWriter::new(File::create(temp_path)?);
    let value = fill(&mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(value)
}

/// Byte-for-byte comparison; a missing `existing` never matches.
fn same_contents(candidate: &Path, existing: &Path) -> io::Result<bool> {
    let existing_len = match fs::metadata(existing) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if fs::metadata(candidate)?.len() != existing_len {
        return Ok(false);
    }

    let mut left = BufReader::new(File::open(candidate)?);
    let mut right = BufReader::new(File::open(existing)?);
    loop {
        let a = left.fill_buf()?;
        let b = right.fill_buf()?;
        if a.is_empty() || b.is_empty() {
            return Ok(a.is_empty() && b.is_empty());
        }
        let n = a.len().min(b.len());
        if a[..n] != b[..n] {
            return Ok(false);
        }
        left.consume(n);
        right.consume(n);
    }
}

/// List regular files under `root`, relative and `/`-separated, sorted.
///
/// Hidden directories (and anything below them) and leftover temp files
/// are skipped.
///
/// # Errors
///
/// Returns an error if `root` cannot be walked.
pub fn list_files(root: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));

    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if name.ends_with(TEMP_SUFFIX) {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Whether `name`'s extension is one of `extensions` (compared without
/// the dot, case-insensitively).
#[must_use]
pub fn has_extension(name: &str, extensions: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Join a `/`-separated relative name onto `root`.
#[must_use]
pub fn join_relative(root: &Path, name: &str) -> PathBuf {
    name.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

fn is_hidden_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("session.jsonl");

        atomic_write(&path, b"line 1\nline 2\n").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"line 1\nline 2\n");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_replace_if_changed_skips_identical() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.jsonl");

        let (written, ()) = replace_if_changed(&path, |w| w.write_all(b"one")).unwrap();
        assert!(written);
        let (written, ()) = replace_if_changed(&path, |w| w.write_all(b"one")).unwrap();
        assert!(!written);
        let (written, ()) = replace_if_changed(&path, |w| w.write_all(b"onf")).unwrap();
        assert!(written);
        assert_eq!(fs::read(&path).unwrap(), b"onf");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_replace_if_changed_failure_keeps_original() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.jsonl");
        fs::write(&path, "original").unwrap();

        let err = replace_if_changed(&path, |w| {
            w.write_all(b"partial")?;
            Err::<(), _>(io::Error::other("reader broke"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "reader broke");
        assert_eq!(fs::read(&path).unwrap(), b"original");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_set_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.jsonl");
        fs::write(&path, "x").unwrap();

        let past = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        set_mtime(&path, past).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), past);
    }

    #[test]
    fn test_list_files_relative_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("b.jsonl"), "").unwrap();
        fs::write(root.join("a.jsonl"), "").unwrap();
        fs::write(root.join("sub").join("c.txt"), "").unwrap();
        fs::write(root.join(".cache").join("x.jsonl"), "").unwrap();
        fs::write(root.join("d.jsonl.ssync-tmp"), "").unwrap();

        assert_eq!(
            list_files(root).unwrap(),
            vec!["a.jsonl", "b.jsonl", "sub/c.txt"]
        );
    }

    #[test]
    fn test_has_extension() {
        let exts = vec!["jsonl".to_string()];
        assert!(has_extension("abc.jsonl", &exts));
        assert!(has_extension("sub/ABC.JSONL", &exts));
        assert!(!has_extension("abc.json", &exts));
        assert!(!has_extension("jsonl", &exts));
    }

    #[test]
    fn test_join_relative() {
        let joined = join_relative(Path::new("/root"), "sub/a.jsonl");
        assert_eq!(joined, Path::new("/root").join("sub").join("a.jsonl"));
    }
}
