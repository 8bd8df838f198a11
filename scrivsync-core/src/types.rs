//! Domain types for the scriv-sync configuration.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! All types are serializable/deserializable via serde + serde_yaml.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Current on-disk config format version.
pub const CONFIG_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed alias naming one configured project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectAlias(pub String);

impl fmt::Display for ProjectAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectAlias {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectAlias {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What to do by default when both sides changed since the last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Ask the operator; skipped when running non-interactively.
    #[default]
    Prompt,
    /// Keep the markdown file, overwrite the binder document.
    #[serde(alias = "local")]
    Markdown,
    /// Keep the binder document, overwrite the markdown file.
    #[serde(alias = "external")]
    Scrivener,
    Skip,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Prompt => write!(f, "prompt"),
            ConflictPolicy::Markdown => write!(f, "markdown"),
            ConflictPolicy::Scrivener => write!(f, "scrivener"),
            ConflictPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// What to do by default with an item that vanished from one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPolicy {
    /// Ask the operator; skipped when running non-interactively.
    #[default]
    Prompt,
    /// Remove the surviving copy.
    Delete,
    /// Restore the missing copy from the surviving one.
    Recreate,
    Skip,
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionPolicy::Prompt => write!(f, "prompt"),
            DeletionPolicy::Delete => write!(f, "delete"),
            DeletionPolicy::Recreate => write!(f, "recreate"),
            DeletionPolicy::Skip => write!(f, "skip"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One correspondence between a local directory and a binder folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMapping {
    /// Directory relative to the project's `local_path`.
    pub markdown_dir: PathBuf,
    /// Title of the binder folder (matched case-insensitively).
    pub scrivener_folder: String,
    #[serde(default)]
    pub sync_enabled: bool,
}

/// Sync behaviour knobs for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    pub create_missing_folders: bool,
    pub default_conflict_resolution: ConflictPolicy,
    pub default_deletion_action: DeletionPolicy,
    /// Days a tombstone is kept after its last sync before it is forgotten.
    pub tombstone_retention_days: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            create_missing_folders: true,
            default_conflict_resolution: ConflictPolicy::Prompt,
            default_deletion_action: DeletionPolicy::Prompt,
            tombstone_retention_days: 30,
        }
    }
}

/// A single project: a markdown root paired with a binder project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the markdown root.
    pub local_path: PathBuf,
    /// Binder project directory; absolute, or relative to `local_path`.
    pub scriv_path: PathBuf,
    #[serde(default)]
    pub folder_mappings: Vec<FolderMapping>,
    #[serde(default)]
    pub options: SyncOptions,
}

impl ProjectConfig {
    pub fn new(local_path: PathBuf, scriv_path: PathBuf) -> Self {
        Self {
            local_path,
            scriv_path,
            folder_mappings: Vec::new(),
            options: SyncOptions::default(),
        }
    }

    /// Mappings with `sync_enabled: true`, in declaration order.
    pub fn enabled_mappings(&self) -> impl Iterator<Item = &FolderMapping> {
        self.folder_mappings.iter().filter(|m| m.sync_enabled)
    }

    pub fn add_mapping(
        &mut self,
        markdown_dir: impl Into<PathBuf>,
        scrivener_folder: impl Into<String>,
        enabled: bool,
    ) {
        self.folder_mappings.push(FolderMapping {
            markdown_dir: markdown_dir.into(),
            scrivener_folder: scrivener_folder.into(),
            sync_enabled: enabled,
        });
    }

    /// Binder project path, resolved against `local_path` when relative.
    pub fn resolved_scriv_path(&self) -> PathBuf {
        if self.scriv_path.is_absolute() {
            self.scriv_path.clone()
        } else {
            self.local_path.join(&self.scriv_path)
        }
    }

    /// Absolute local directory of `mapping`.
    pub fn mapping_dir(&self, mapping: &FolderMapping) -> PathBuf {
        self.local_path.join(&mapping.markdown_dir)
    }

    /// The most specific enabled mapping whose local directory contains
    /// `path`, if any.
    pub fn mapping_for_path(&self, path: &Path) -> Option<&FolderMapping> {
        self.enabled_mappings()
            .filter(|m| path.starts_with(self.mapping_dir(m)))
            .max_by_key(|m| m.markdown_dir.components().count())
    }
}

/// Root of `~/.scriv-sync/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub version: String,
    #[serde(default)]
    pub projects: BTreeMap<ProjectAlias, ProjectConfig>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            projects: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectConfig {
        let mut p = ProjectConfig::new(PathBuf::from("/books/novel"), PathBuf::from("Novel.scriv"));
        p.add_mapping("chapters", "Draft", true);
        p.add_mapping("notes", "Research", false);
        p
    }

    #[test]
    fn alias_display() {
        assert_eq!(ProjectAlias::from("novel").to_string(), "novel");
    }

    #[test]
    fn enabled_mappings_skips_disabled() {
        let p = project();
        let enabled: Vec<_> = p.enabled_mappings().collect();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].scrivener_folder, "Draft");
    }

    #[test]
    fn relative_scriv_path_resolves_against_local_root() {
        let p = project();
        assert_eq!(
            p.resolved_scriv_path(),
            PathBuf::from("/books/novel/Novel.scriv")
        );

        let mut abs = p.clone();
        abs.scriv_path = PathBuf::from("/elsewhere/Novel.scriv");
        assert_eq!(abs.resolved_scriv_path(), PathBuf::from("/elsewhere/Novel.scriv"));
    }

    #[test]
    fn mapping_for_path_finds_enclosing_dir() {
        let p = project();
        let found = p
            .mapping_for_path(Path::new("/books/novel/chapters/one.md"))
            .expect("mapping");
        assert_eq!(found.scrivener_folder, "Draft");
        // Disabled mappings never match.
        assert!(p.mapping_for_path(Path::new("/books/novel/notes/a.md")).is_none());
    }

    #[test]
    fn mapping_for_path_prefers_innermost_dir() {
        let mut p = project();
        p.add_mapping("chapters/part", "Part", true);
        let found = p
            .mapping_for_path(Path::new("/books/novel/chapters/part/scene.md"))
            .expect("mapping");
        assert_eq!(found.scrivener_folder, "Part");
    }

    #[test]
    fn options_default_when_missing_from_yaml() {
        let yaml = "local_path: /a\nscriv_path: b.scriv\n";
        let p: ProjectConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(p.options, SyncOptions::default());
        assert!(p.folder_mappings.is_empty());
    }

    #[test]
    fn policies_accept_engine_aliases() {
        let yaml = "default_conflict_resolution: local\ndefault_deletion_action: recreate\n";
        let opts: SyncOptions = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(opts.default_conflict_resolution, ConflictPolicy::Markdown);
        assert_eq!(opts.default_deletion_action, DeletionPolicy::Recreate);
        assert!(opts.create_missing_folders, "unspecified fields keep defaults");
    }

    #[test]
    fn policy_display() {
        assert_eq!(ConflictPolicy::Scrivener.to_string(), "scrivener");
        assert_eq!(DeletionPolicy::Delete.to_string(), "delete");
    }
}
