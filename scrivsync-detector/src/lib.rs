//! Mapping detection for `scriv-sync init`.
//!
//! `suggest_mappings(root, binder)` pairs each top-level binder folder with a
//! directory under the markdown root. A folder whose name matches a local
//! directory is suggested enabled; a folder with no counterpart is suggested
//! disabled, with a lower-cased directory name to create.

use std::fs;
use std::path::{Path, PathBuf};

use scrivsync_binder::Binder;
use scrivsync_core::types::FolderMapping;
use thiserror::Error;

/// Directory names never offered as mapping targets.
const IGNORED_DIRS: &[&str] = &["node_modules", "vendor", "target", "plans", "scriv-sync"];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// How a suggestion was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Directory name equals the folder title, ignoring case.
    High,
    /// Equal after treating spaces, dashes and underscores alike.
    Medium,
    /// No local directory found.
    None,
}

/// A proposed folder mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedMapping {
    pub markdown_dir: PathBuf,
    pub scrivener_folder: String,
    pub enabled: bool,
    /// Whether `markdown_dir` already exists under the root.
    pub dir_exists: bool,
    pub confidence: Confidence,
}

impl From<SuggestedMapping> for FolderMapping {
    fn from(s: SuggestedMapping) -> Self {
        FolderMapping {
            markdown_dir: s.markdown_dir,
            scrivener_folder: s.scrivener_folder,
            sync_enabled: s.enabled,
        }
    }
}

/// Errors from mapping detection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("local path does not exist or is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Immediate subdirectories of `root`, sorted. Hidden and tooling
/// directories are skipped, as are `.scriv` project bundles.
pub fn scan_local_directories(root: &Path) -> Result<Vec<String>, DetectError> {
    if !root.is_dir() {
        return Err(DetectError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    let entries = fs::read_dir(root).map_err(|e| DetectError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DetectError::Io {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || name.ends_with(".scriv") || IGNORED_DIRS.contains(&name.as_str())
        {
            continue;
        }
        dirs.push(name);
    }
    dirs.sort();
    Ok(dirs)
}

/// One suggestion per top-level binder folder, in binder order.
pub fn suggest_mappings(root: &Path, binder: &Binder) -> Result<Vec<SuggestedMapping>, DetectError> {
    let local_dirs = scan_local_directories(root)?;

    let suggestions = binder
        .top_level_folders()
        .map(|folder| {
            let title = folder.title.trim();
            let lower = title.to_lowercase();
            let (dir, confidence) = if let Some(d) = local_dirs.iter().find(|d| d.to_lowercase() == lower) {
                (Some(d), Confidence::High)
            } else if let Some(d) = local_dirs.iter().find(|d| slug(d) == slug(title)) {
                (Some(d), Confidence::Medium)
            } else {
                (None, Confidence::None)
            };

            match dir {
                Some(d) => SuggestedMapping {
                    markdown_dir: PathBuf::from(d),
                    scrivener_folder: folder.title.clone(),
                    enabled: true,
                    dir_exists: true,
                    confidence,
                },
                None => SuggestedMapping {
                    markdown_dir: PathBuf::from(lower),
                    scrivener_folder: folder.title.clone(),
                    enabled: false,
                    dir_exists: false,
                    confidence,
                },
            }
        })
        .collect();
    Ok(suggestions)
}

fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect()
}
