//! Change detection: walk both sides of every enabled mapping and build a
//! [`Plan`].
//!
//! Items are paired by normalized title only. Each pairing is classified
//! against [`SyncState`]; unmatched items become creates, and tracked items
//! missing from one side become orphans.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use scrivsync_binder::{Binder, Node};
use scrivsync_core::types::{FolderMapping, ProjectConfig};

use crate::error::SyncError;
use crate::fingerprint::fingerprint;
use crate::local;
use crate::plan::{Conflict, ConflictReason, FileChange, Orphan, OrphanLocation, Plan};
use crate::state::{ChangeKind, SyncState};

pub struct Reconciler<'a> {
    project: &'a ProjectConfig,
    binder: &'a Binder,
}

impl<'a> Reconciler<'a> {
    pub fn new(project: &'a ProjectConfig, binder: &'a Binder) -> Self {
        Self { project, binder }
    }

    /// Build the plan for every enabled mapping.
    ///
    /// `state` is only touched for bookkeeping that needs no write on either
    /// side: identical first-contact pairings are adopted and entries gone
    /// from both sides are purged. Fails before any mutation when a mapping's
    /// folder is missing and may not be created.
    pub fn detect(&self, state: &mut SyncState) -> Result<Plan, SyncError> {
        for mapping in self.project.enabled_mappings() {
            if self.binder.find_folder(&mapping.scrivener_folder).is_none()
                && !self.project.options.create_missing_folders
            {
                return Err(SyncError::MappingTargetNotFound {
                    folder: mapping.scrivener_folder.clone(),
                });
            }
        }

        let mut plan = Plan::new();
        let mut reappeared = Vec::new();
        let mut paired = HashSet::new();
        for mapping in self.project.enabled_mappings() {
            self.detect_mapping(mapping, state, &mut plan, &mut reappeared, &mut paired)?;
        }
        self.detect_orphans(state, &paired, &mut plan)?;
        for orphan in reappeared {
            plan.add_orphan(orphan);
        }
        Ok(plan)
    }

    fn detect_mapping(
        &self,
        mapping: &FolderMapping,
        state: &mut SyncState,
        plan: &mut Plan,
        reappeared: &mut Vec<Orphan>,
        paired: &mut HashSet<PathBuf>,
    ) -> Result<(), SyncError> {
        let root = &self.project.local_path;
        let folder = self.binder.find_folder(&mapping.scrivener_folder);
        if folder.is_none() {
            tracing::debug!(
                "folder '{}' missing; it will be created on first write",
                mapping.scrivener_folder
            );
        }
        let mut index = folder
            .map(|f| self.binder.title_index(f))
            .unwrap_or_default();

        let files = local::list_markdown_files(root, &self.project.mapping_dir(mapping))?;
        let local_set: HashSet<&Path> = files.iter().map(PathBuf::as_path).collect();

        for rel in &files {
            let abs = root.join(rel);
            let owner = self.project.mapping_for_path(&abs);
            if owner.is_some_and(|m| m.markdown_dir != mapping.markdown_dir) {
                continue;
            }
            let title = local::title_for_path(rel);
            let content = local::read_file(&abs)?;

            let matched = index.take(&title).and_then(|n| self.binder.get(n));
            match matched {
                Some(doc) => {
                    paired.insert(rel.clone());
                    self.classify_pair(mapping, rel, &abs, title, content, doc, state, plan)
                }
                None if state.is_tombstoned(rel) => {
                    tracing::debug!("{}: reappeared locally after deletion", rel.display());
                    let last = state.tombstone(rel).map(|t| (t.external_id.clone(), t.last_synced_at));
                    if let Some((external_id, last_synced_at)) = last {
                        reappeared.push(Orphan {
                            local_path: rel.clone(),
                            location: OrphanLocation::Local,
                            external_id,
                            title,
                            content,
                            folder: Some(mapping.scrivener_folder.clone()),
                            last_synced_at: Some(last_synced_at),
                        });
                    }
                }
                None if state.entry(rel).is_some() => {}
                None => {
                    tracing::debug!("{}: new local file", rel.display());
                    plan.add_create_external(FileChange {
                        local_path: rel.clone(),
                        external_id: None,
                        title,
                        content,
                        folder: Some(mapping.scrivener_folder.clone()),
                        replaced: None,
                    });
                }
            }
        }

        for node_id in index.into_remaining() {
            let Some(doc) = self.binder.get(node_id) else {
                continue;
            };
            let rel = mapping
                .markdown_dir
                .join(format!("{}.md", local::sanitize_filename(&doc.title)));

            if state.is_tombstoned(&rel) {
                tracing::debug!("{}: reappeared in binder after deletion", doc.title);
                reappeared.push(Orphan {
                    local_path: rel.clone(),
                    location: OrphanLocation::External,
                    external_id: doc.id.clone(),
                    title: doc.title.clone(),
                    content: doc.content.clone(),
                    folder: None,
                    last_synced_at: state.tombstone(&rel).map(|t| t.last_synced_at),
                });
            } else if state.entry(&rel).is_some() || state.path_for_external_id(&doc.id).is_some() {
                // Tracked; orphan detection decides.
            } else if local_set.contains(rel.as_path()) {
                tracing::warn!(
                    "'{}' would be written to {}, which already holds a file with a different title; skipped",
                    doc.title,
                    rel.display()
                );
            } else {
                tracing::debug!("{}: new binder document", doc.title);
                plan.add_create_local(FileChange {
                    local_path: rel,
                    external_id: Some(doc.id.clone()),
                    title: doc.title.clone(),
                    content: doc.content.clone(),
                    folder: Some(mapping.scrivener_folder.clone()),
                    replaced: None,
                });
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn classify_pair(
        &self,
        mapping: &FolderMapping,
        rel: &Path,
        abs: &Path,
        title: String,
        content: String,
        doc: &Node,
        state: &mut SyncState,
        plan: &mut Plan,
    ) {
        let local_fp = fingerprint(&content);
        let external_fp = fingerprint(&doc.content);
        let kind = state.detect_conflict(rel, &local_fp, &doc.id, &external_fp);
        tracing::debug!("{}: {:?}", rel.display(), kind);

        let conflict = |reason| Conflict {
            local_path: rel.to_path_buf(),
            external_id: doc.id.clone(),
            title: title.clone(),
            local_content: content.clone(),
            external_content: doc.content.clone(),
            reason,
        };

        match kind {
            ChangeKind::BothUnchanged => {
                let stale = state
                    .entry(rel)
                    .filter(|e| e.external_id != doc.id)
                    .map(|e| e.fingerprint.clone());
                if let Some(fp) = stale {
                    tracing::debug!("{}: binder id changed to {}, re-pairing", rel.display(), doc.id);
                    state.record_entry(rel, doc.id.clone(), fp, local::modified_at(abs));
                }
            }
            ChangeKind::LocalOnlyChanged => plan.add_update_external(FileChange {
                local_path: rel.to_path_buf(),
                external_id: Some(doc.id.clone()),
                title: title.clone(),
                content: content.clone(),
                folder: Some(mapping.scrivener_folder.clone()),
                replaced: Some(doc.content.clone()),
            }),
            ChangeKind::ExternalOnlyChanged => plan.add_update_local(FileChange {
                local_path: rel.to_path_buf(),
                external_id: Some(doc.id.clone()),
                title: title.clone(),
                content: doc.content.clone(),
                folder: Some(mapping.scrivener_folder.clone()),
                replaced: Some(content.clone()),
            }),
            ChangeKind::BothChanged if state.is_tombstoned(rel) => {
                plan.add_conflict(conflict(ConflictReason::Tombstoned))
            }
            ChangeKind::BothChanged => plan.add_conflict(conflict(ConflictReason::BothChanged)),
            ChangeKind::NewPairing if local_fp == external_fp => {
                tracing::debug!("{}: identical on both sides, adopting", rel.display());
                state.record_entry(rel, doc.id.clone(), local_fp, local::modified_at(abs));
            }
            ChangeKind::NewPairing => plan.add_conflict(conflict(ConflictReason::FirstContact)),
        }
    }

    /// Tracked entries whose counterpart vanished from one side.
    ///
    /// Entries outside every enabled mapping, and paths already paired by
    /// title this run, are left alone.
    fn detect_orphans(
        &self,
        state: &mut SyncState,
        paired: &HashSet<PathBuf>,
        plan: &mut Plan,
    ) -> Result<(), SyncError> {
        let root = &self.project.local_path;
        for path in state.tracked_paths() {
            if paired.contains(&path) {
                continue;
            }
            let abs = root.join(&path);
            let Some(mapping) = self.project.mapping_for_path(&abs) else {
                continue;
            };
            let Some(entry) = state.entry(&path).cloned() else {
                continue;
            };

            let local_content = if abs.is_file() {
                local::read_if_exists(&abs)?
            } else {
                None
            };
            let external = self
                .binder
                .item(&entry.external_id)
                .filter(|n| !n.is_folder());

            match (local_content, external) {
                (Some(_), Some(_)) => {}
                (Some(content), None) => {
                    tracing::debug!("{}: binder document gone", path.display());
                    plan.add_orphan(Orphan {
                        title: local::title_for_path(&path),
                        local_path: path,
                        location: OrphanLocation::Local,
                        external_id: entry.external_id,
                        content,
                        folder: Some(mapping.scrivener_folder.clone()),
                        last_synced_at: Some(entry.last_synced_at),
                    });
                }
                (None, Some(doc)) => {
                    tracing::debug!("{}: local file gone", path.display());
                    plan.add_orphan(Orphan {
                        local_path: path,
                        location: OrphanLocation::External,
                        external_id: entry.external_id,
                        title: doc.title.clone(),
                        content: doc.content.clone(),
                        folder: None,
                        last_synced_at: Some(entry.last_synced_at),
                    });
                }
                (None, None) => {
                    tracing::warn!("{}: deleted on both sides, forgetting", path.display());
                    state.purge_entry(&path);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scrivsync_binder::{DocumentStore, ItemId, MemoryStore};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        project: ProjectConfig,
        store: MemoryStore,
        state: SyncState,
        draft: ItemId,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let mut project = ProjectConfig::new(tmp.path().to_path_buf(), "Novel.scriv".into());
        project.add_mapping("chapters", "Draft", true);
        std::fs::create_dir_all(tmp.path().join("chapters")).unwrap();
        let mut store = MemoryStore::new();
        let draft = store.create_folder("Draft", None).unwrap();
        let state = SyncState::new(tmp.path());
        Fixture {
            _tmp: tmp,
            project,
            store,
            state,
            draft,
        }
    }

    impl Fixture {
        fn write(&self, rel: &str, content: &str) {
            std::fs::write(self.project.local_path.join(rel), content).unwrap();
        }

        fn detect(&mut self) -> Plan {
            Reconciler::new(&self.project, self.store.binder())
                .detect(&mut self.state)
                .unwrap()
        }
    }

    #[test]
    fn unmatched_items_become_creates() {
        let mut f = fixture();
        f.write("chapters/intro.md", "hello");
        let draft = f.draft.clone();
        f.store
            .create_document("Epilogue", "the end", Some(&draft))
            .unwrap();

        let plan = f.detect();
        assert_eq!(plan.create_external.len(), 1);
        assert_eq!(plan.create_external[0].title, "Intro");
        assert_eq!(plan.create_external[0].folder.as_deref(), Some("Draft"));
        assert_eq!(plan.create_local.len(), 1);
        assert_eq!(
            plan.create_local[0].local_path,
            PathBuf::from("chapters/epilogue.md")
        );
    }

    #[test]
    fn title_match_is_case_insensitive() {
        let mut f = fixture();
        f.write("chapters/chapter-one.md", "same");
        let draft = f.draft.clone();
        let id = f
            .store
            .create_document("CHAPTER ONE", "same", Some(&draft))
            .unwrap();

        let plan = f.detect();
        assert!(plan.is_empty(), "identical pair needs no work: {plan:?}");
        let entry = f.state.entry(Path::new("chapters/chapter-one.md")).unwrap();
        assert_eq!(entry.external_id, id);
    }

    #[test]
    fn differing_first_contact_is_a_conflict() {
        let mut f = fixture();
        f.write("chapters/notes.md", "mine");
        let draft = f.draft.clone();
        f.store.create_document("Notes", "theirs", Some(&draft)).unwrap();

        let plan = f.detect();
        assert_eq!(plan.conflicts.len(), 1);
        assert_eq!(plan.conflicts[0].reason, ConflictReason::FirstContact);
        assert!(f.state.files.is_empty());
    }

    #[test]
    fn missing_folder_without_creation_fails() {
        let mut f = fixture();
        f.project.options.create_missing_folders = false;
        f.project.add_mapping("research", "Research", true);
        let err = Reconciler::new(&f.project, f.store.binder())
            .detect(&mut f.state)
            .unwrap_err();
        assert!(matches!(err, SyncError::MappingTargetNotFound { ref folder } if folder == "Research"));
    }

    #[test]
    fn missing_folder_with_creation_defers() {
        let mut f = fixture();
        f.project.add_mapping("research", "Research", true);
        std::fs::create_dir_all(f.project.local_path.join("research")).unwrap();
        f.write("research/sources.md", "refs");

        let plan = f.detect();
        assert_eq!(plan.create_external.len(), 1);
        assert_eq!(plan.create_external[0].folder.as_deref(), Some("Research"));
    }

    #[test]
    fn disabled_mappings_are_ignored() {
        let mut f = fixture();
        f.project.add_mapping("research", "Research", false);
        std::fs::create_dir_all(f.project.local_path.join("research")).unwrap();
        f.write("research/sources.md", "refs");
        assert!(f.detect().is_empty());
    }

    #[test]
    fn vanished_on_both_sides_is_purged() {
        let mut f = fixture();
        f.state.record_entry(
            "chapters/ghost.md",
            ItemId::from("GONE"),
            "fp",
            Utc::now(),
        );
        let plan = f.detect();
        assert!(plan.is_empty());
        assert!(!f.state.was_previously_synced(Path::new("chapters/ghost.md")));
    }

    #[test]
    fn tombstoned_reappearance_is_an_orphan() {
        let mut f = fixture();
        f.state
            .record_entry("chapters/old.md", ItemId::from("U1"), "fp", Utc::now());
        f.state.remove_entry(Path::new("chapters/old.md"));
        f.write("chapters/old.md", "back again");

        let plan = f.detect();
        assert!(plan.create_external.is_empty());
        assert_eq!(plan.orphans.len(), 1);
        assert_eq!(plan.orphans[0].location, OrphanLocation::Local);
        assert_eq!(plan.orphans[0].content, "back again");
    }

    #[test]
    fn nested_mapping_owns_its_files() {
        let mut f = fixture();
        f.project.add_mapping("chapters/part", "Part", true);
        std::fs::create_dir_all(f.project.local_path.join("chapters/part")).unwrap();
        f.write("chapters/part/scene.md", "mine");
        let part = f.store.create_folder("Part", None).unwrap();
        f.store.create_document("Scene", "theirs", Some(&part)).unwrap();

        let plan = f.detect();
        assert!(plan.create_external.is_empty(), "{plan:?}");
        assert_eq!(plan.conflicts.len(), 1);
        assert_eq!(plan.conflicts[0].local_path, PathBuf::from("chapters/part/scene.md"));
        assert_eq!(plan.total_operations(), 1);
    }

    #[test]
    fn colliding_generated_path_is_not_clobbered() {
        let mut f = fixture();
        f.write("chapters/part-1-begin.md", "local");
        let draft = f.draft.clone();
        f.store
            .create_document("Part 1: Begin", "binder", Some(&draft))
            .unwrap();

        let plan = f.detect();
        assert_eq!(plan.create_external.len(), 1);
        assert!(plan.create_local.is_empty());
    }
}
