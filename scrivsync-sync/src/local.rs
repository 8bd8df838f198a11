//! Local markdown side: enumeration, naming, and atomic writes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::error::{io_err, SyncError};
use crate::fingerprint::normalize_line_endings;

/// All `*.md` files below `dir`, sorted, as paths relative to `root`.
///
/// A missing `dir` yields an empty list.
pub fn list_markdown_files(root: &Path, dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            io_err(path, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        files.push(rel.to_path_buf());
    }
    Ok(files)
}

/// `chapter-one.md` → `Chapter One`.
pub fn title_from_filename(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    stem.replace('-', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// `Chapter One: Begin` → `chapter-one-begin`. Never empty.
pub fn sanitize_filename(title: &str) -> String {
    let mut name = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        match c {
            ' ' | '/' | '\\' | ':' => name.push('-'),
            '*' | '?' | '"' | '<' | '>' | '|' => {}
            other => name.push(other),
        }
    }
    while name.contains("--") {
        name = name.replace("--", "-");
    }
    let trimmed = name.trim_matches('-');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Title for a local path, derived from its file name.
pub fn title_for_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(title_from_filename)
        .unwrap_or_default()
}

pub fn read_file(path: &Path) -> Result<String, SyncError> {
    std::fs::read_to_string(path).map_err(|e| read_err(path, e))
}

/// Read `path`, or `None` if it does not exist.
pub fn read_if_exists(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(read_err(path, e)),
    }
}

fn read_err(path: &Path, e: std::io::Error) -> SyncError {
    if e.kind() == ErrorKind::InvalidData {
        SyncError::NotUtf8 {
            path: path.to_path_buf(),
        }
    } else {
        io_err(path, e)
    }
}

/// Modification time of `path`, or now if it cannot be read.
pub fn modified_at(path: &Path) -> DateTime<Utc> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

/// Write `content` to `path` via `<path>.scriv-sync.tmp` + rename.
///
/// Line endings are normalised to LF. Parent directories are created.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.scriv-sync.tmp", path.display()));
    let content = normalize_line_endings(content);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(&tmp, &content).map_err(|e| io_err(&tmp, e))?;

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    tracing::info!("wrote: {}", path.display());
    Ok(())
}

/// Remove `path`; already gone counts as success.
pub fn remove_file(path: &Path) -> Result<(), SyncError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!("removed: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(path, e)),
    }
}
