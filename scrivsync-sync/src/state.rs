//! Persistent sync state: what was last synced, where, and with which content.
//!
//! Persists a [`SyncState`] JSON document at
//! `<home>/.scriv-sync/state/<alias>.json`. Keys are local paths relative to
//! the project's markdown root. Writes use the same atomic `.tmp` + rename
//! pattern as the config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use scrivsync_binder::ItemId;
use scrivsync_core::config;
use scrivsync_core::types::{ProjectAlias, CONFIG_VERSION};

use crate::error::{io_err, SyncError};

/// One previously-synced pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    pub local_path: PathBuf,
    pub external_id: ItemId,
    /// Fingerprint of the content both sides held after the last sync.
    pub fingerprint: String,
    pub last_modified: DateTime<Utc>,
    pub last_synced_at: DateTime<Utc>,
}

/// Outcome of comparing both sides of a pairing against the last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Never synced before.
    NewPairing,
    BothUnchanged,
    LocalOnlyChanged,
    ExternalOnlyChanged,
    BothChanged,
}

/// On-disk sync state payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: BTreeMap<PathBuf, TrackedEntry>,
    /// Tombstones: entries removed on purpose, kept to recognise reappearances.
    #[serde(default)]
    pub deleted_files: BTreeMap<PathBuf, TrackedEntry>,
    #[serde(default)]
    pub project_path: PathBuf,
    #[serde(default = "default_config_version")]
    pub config_version: String,
}

fn default_config_version() -> String {
    CONFIG_VERSION.to_string()
}

impl SyncState {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            last_sync: None,
            files: BTreeMap::new(),
            deleted_files: BTreeMap::new(),
            project_path: project_path.into(),
            config_version: default_config_version(),
        }
    }

    // -- mutation -----------------------------------------------------------

    /// Insert or overwrite the live entry for `path` and forget any tombstone.
    pub fn record_entry(
        &mut self,
        path: impl Into<PathBuf>,
        external_id: ItemId,
        fingerprint: impl Into<String>,
        modified_at: DateTime<Utc>,
    ) {
        let path = path.into();
        self.deleted_files.remove(&path);
        self.files.insert(
            path.clone(),
            TrackedEntry {
                local_path: path,
                external_id,
                fingerprint: fingerprint.into(),
                last_modified: modified_at,
                last_synced_at: Utc::now(),
            },
        );
    }

    /// Move the live entry for `path` to the tombstone set. No-op if untracked.
    pub fn remove_entry(&mut self, path: &Path) {
        if let Some(entry) = self.files.remove(path) {
            self.deleted_files.insert(path.to_path_buf(), entry);
        }
    }

    /// Forget `path` entirely, live entry and tombstone alike.
    pub fn purge_entry(&mut self, path: &Path) {
        self.files.remove(path);
        self.deleted_files.remove(path);
    }

    /// Drop tombstones whose last sync is older than `retention`.
    /// Returns the expired paths.
    pub fn expire_tombstones(&mut self, now: DateTime<Utc>, retention: Duration) -> Vec<PathBuf> {
        let cutoff = now - retention;
        let expired: Vec<PathBuf> = self
            .deleted_files
            .iter()
            .filter(|(_, e)| e.last_synced_at < cutoff)
            .map(|(p, _)| p.clone())
            .collect();
        for path in &expired {
            self.deleted_files.remove(path);
        }
        expired
    }

    // -- queries ------------------------------------------------------------

    pub fn entry(&self, path: &Path) -> Option<&TrackedEntry> {
        self.files.get(path)
    }

    pub fn tombstone(&self, path: &Path) -> Option<&TrackedEntry> {
        self.deleted_files.get(path)
    }

    pub fn is_tombstoned(&self, path: &Path) -> bool {
        self.deleted_files.contains_key(path)
    }

    /// True when `path` is live or tombstoned.
    pub fn was_previously_synced(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.deleted_files.contains_key(path)
    }

    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    pub fn tombstoned_paths(&self) -> Vec<PathBuf> {
        self.deleted_files.keys().cloned().collect()
    }

    /// Live path currently paired with `id`.
    pub fn path_for_external_id(&self, id: &ItemId) -> Option<&Path> {
        self.files
            .values()
            .find(|e| &e.external_id == id)
            .map(|e| e.local_path.as_path())
    }

    /// Classify a pairing. Each side is compared with the last-synced
    /// fingerprint independently. `external_id` is informational: a
    /// pairing is keyed by local path alone.
    pub fn detect_conflict(
        &self,
        path: &Path,
        local_fp: &str,
        _external_id: &ItemId,
        external_fp: &str,
    ) -> ChangeKind {
        let Some(entry) = self.files.get(path) else {
            if self.is_tombstoned(path) {
                return ChangeKind::BothChanged;
            }
            return ChangeKind::NewPairing;
        };

        let local_changed = entry.fingerprint != local_fp;
        let external_changed = entry.fingerprint != external_fp;
        match (local_changed, external_changed) {
            (false, false) => ChangeKind::BothUnchanged,
            (true, false) => ChangeKind::LocalOnlyChanged,
            (false, true) => ChangeKind::ExternalOnlyChanged,
            (true, true) => ChangeKind::BothChanged,
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Load the state for `alias`.
///
/// Returns an empty state bound to `project_path` if the file does not yet
/// exist.
pub fn load_at(home: &Path, alias: &ProjectAlias, project_path: &Path) -> Result<SyncState, SyncError> {
    let path = config::state_path_at(home, alias);
    if !path.exists() {
        return Ok(SyncState::new(project_path));
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_json::from_str(&contents).map_err(|source| SyncError::StateCorrupt { path, source })
}

/// Save the state for `alias` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, alias: &ProjectAlias, state: &SyncState) -> Result<(), SyncError> {
    let path = config::state_path_at(home, alias);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn alias() -> ProjectAlias {
        ProjectAlias::from("novel")
    }

    fn tracked(fp: &str) -> SyncState {
        let mut s = SyncState::new("/books/novel");
        s.record_entry("chapters/one.md", ItemId::from("U1"), fp, Utc::now());
        s
    }

    #[test]
    fn empty_state_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let state = load_at(tmp.path(), &alias(), Path::new("/books/novel")).unwrap();
        assert!(state.files.is_empty());
        assert_eq!(state.project_path, PathBuf::from("/books/novel"));
        assert_eq!(state.config_version, CONFIG_VERSION);
    }

    #[test]
    fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut state = tracked("h1");
        state.record_entry("chapters/two.md", ItemId::from("U2"), "h2", Utc::now());
        state.remove_entry(Path::new("chapters/two.md"));
        state.last_sync = Some(Utc::now());

        save_at(tmp.path(), &alias(), &state).unwrap();
        let loaded = load_at(tmp.path(), &alias(), Path::new("/ignored")).unwrap();
        assert_eq!(loaded, state);
        assert!(!config::state_path_at(tmp.path(), &alias())
            .with_extension("json.tmp")
            .exists());
    }

    #[test]
    fn corrupt_file_is_an_error_naming_path() {
        let tmp = TempDir::new().unwrap();
        let path = config::state_path_at(tmp.path(), &alias());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ truncated").unwrap();

        let err = load_at(tmp.path(), &alias(), Path::new("/x")).unwrap_err();
        assert!(matches!(err, SyncError::StateCorrupt { .. }));
        assert!(err.to_string().contains("novel.json"));
    }

    #[rstest]
    #[case::unchanged("base", "base", ChangeKind::BothUnchanged)]
    #[case::local_only("edited", "base", ChangeKind::LocalOnlyChanged)]
    #[case::external_only("base", "edited", ChangeKind::ExternalOnlyChanged)]
    #[case::both("edited", "other", ChangeKind::BothChanged)]
    #[case::both_same_edit("edited", "edited", ChangeKind::BothChanged)]
    fn classification_grid(#[case] local: &str, #[case] external: &str, #[case] expected: ChangeKind) {
        let state = tracked("base");
        let got = state.detect_conflict(Path::new("chapters/one.md"), local, &"U1".into(), external);
        assert_eq!(got, expected);
    }

    #[test]
    fn untracked_is_new_pairing_and_tombstone_is_both_changed() {
        let mut state = tracked("base");
        let other = Path::new("chapters/new.md");
        assert_eq!(
            state.detect_conflict(other, "a", &"X".into(), "b"),
            ChangeKind::NewPairing
        );

        let one = Path::new("chapters/one.md");
        state.remove_entry(one);
        assert_eq!(
            state.detect_conflict(one, "base", &"U1".into(), "base"),
            ChangeKind::BothChanged
        );
    }

    #[test]
    fn path_is_in_at_most_one_set() {
        let mut state = tracked("base");
        let one = Path::new("chapters/one.md");

        state.remove_entry(one);
        assert!(state.entry(one).is_none());
        assert!(state.tombstone(one).is_some());
        assert!(state.was_previously_synced(one));

        state.record_entry(one, ItemId::from("U9"), "fresh", Utc::now());
        assert!(state.entry(one).is_some());
        assert!(state.tombstone(one).is_none());

        state.purge_entry(one);
        assert!(!state.was_previously_synced(one));
    }

    #[test]
    fn remove_untracked_is_noop() {
        let mut state = SyncState::new("/p");
        state.remove_entry(Path::new("nope.md"));
        assert!(state.deleted_files.is_empty());
    }

    #[test]
    fn tombstones_expire_after_retention() {
        let mut state = tracked("base");
        state.record_entry("chapters/old.md", ItemId::from("U2"), "h", Utc::now());
        state.remove_entry(Path::new("chapters/one.md"));
        state.remove_entry(Path::new("chapters/old.md"));
        if let Some(e) = state.deleted_files.get_mut(Path::new("chapters/old.md")) {
            e.last_synced_at = Utc::now() - Duration::days(40);
        }

        let expired = state.expire_tombstones(Utc::now(), Duration::days(30));
        assert_eq!(expired, vec![PathBuf::from("chapters/old.md")]);
        assert_eq!(state.tombstoned_paths(), vec![PathBuf::from("chapters/one.md")]);
    }

    #[test]
    fn lookup_by_external_id() {
        let state = tracked("base");
        assert_eq!(
            state.path_for_external_id(&"U1".into()),
            Some(Path::new("chapters/one.md"))
        );
        assert!(state.path_for_external_id(&"U2".into()).is_none());
    }
}
