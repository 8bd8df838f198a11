//! Plan execution.
//!
//! Order is fixed: conflicts, binder creates, local creates, binder updates,
//! local updates, orphans. Local writes land immediately (atomic per file);
//! binder writes are buffered by the store and flushed with one `persist`
//! at the end. State is saved last, and only after `persist` succeeded, so a
//! failed flush leaves the previous state on disk and the next run re-detects
//! the same work.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use scrivsync_binder::{normalize_title, DocumentStore, ItemId};
use scrivsync_core::types::{ProjectAlias, ProjectConfig};

use crate::error::{binder_err, SyncError};
use crate::fingerprint::fingerprint;
use crate::local;
use crate::plan::{Conflict, FileChange, Orphan, OrphanLocation, Plan};
use crate::policy::{ConflictResolution, OrphanAction, Resolver};
use crate::state::{self, SyncState};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    CreatedExternal,
    CreatedLocal,
    UpdatedExternal,
    UpdatedLocal,
    Conflict(ConflictResolution),
    Orphan(OrphanAction),
    /// Malformed item (missing binder id); nothing written.
    Ignored,
}

impl Outcome {
    pub fn is_skip(self) -> bool {
        matches!(
            self,
            Outcome::Conflict(ConflictResolution::Skip)
                | Outcome::Orphan(OrphanAction::Skip)
                | Outcome::Ignored
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::CreatedExternal => write!(f, "created in binder"),
            Outcome::CreatedLocal => write!(f, "created locally"),
            Outcome::UpdatedExternal => write!(f, "updated in binder"),
            Outcome::UpdatedLocal => write!(f, "updated locally"),
            Outcome::Conflict(r) => write!(f, "conflict: {r}"),
            Outcome::Orphan(a) => write!(f, "orphan: {a}"),
            Outcome::Ignored => write!(f, "ignored"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub local_path: PathBuf,
    pub outcome: Outcome,
}

/// Every operation the executor applied or skipped, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub entries: Vec<ReportEntry>,
}

impl ExecutionReport {
    fn push(&mut self, local_path: &Path, outcome: Outcome) {
        self.entries.push(ReportEntry {
            local_path: local_path.to_path_buf(),
            outcome,
        });
    }

    pub fn applied(&self) -> usize {
        self.entries.iter().filter(|e| !e.outcome.is_skip()).count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skip()).count()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor<'a, S: DocumentStore + ?Sized> {
    home: &'a Path,
    alias: &'a ProjectAlias,
    project: &'a ProjectConfig,
    store: &'a mut S,
    state: &'a mut SyncState,
    resolver: &'a mut dyn Resolver,
    folders: HashMap<String, ItemId>,
}

impl<'a, S: DocumentStore + ?Sized> Executor<'a, S> {
    pub fn new(
        home: &'a Path,
        alias: &'a ProjectAlias,
        project: &'a ProjectConfig,
        store: &'a mut S,
        state: &'a mut SyncState,
        resolver: &'a mut dyn Resolver,
    ) -> Self {
        Self {
            home,
            alias,
            project,
            store,
            state,
            resolver,
            folders: HashMap::new(),
        }
    }

    /// Apply `plan`, flush the binder, then save state stamped with
    /// `started_at`.
    ///
    /// The first failure aborts: local writes already made stay, buffered
    /// binder writes are dropped and state is not saved.
    pub fn execute(mut self, plan: &Plan, started_at: DateTime<Utc>) -> Result<ExecutionReport, SyncError> {
        let mut report = ExecutionReport::default();

        for conflict in &plan.conflicts {
            let outcome = self.apply_conflict(conflict)?;
            report.push(&conflict.local_path, outcome);
        }
        for change in &plan.create_external {
            let outcome = self.create_external(change)?;
            report.push(&change.local_path, outcome);
        }
        for change in &plan.create_local {
            let outcome = self.write_local(change, Outcome::CreatedLocal)?;
            report.push(&change.local_path, outcome);
        }
        for change in &plan.update_external {
            let outcome = self.update_external(change)?;
            report.push(&change.local_path, outcome);
        }
        for change in &plan.update_local {
            let outcome = self.write_local(change, Outcome::UpdatedLocal)?;
            report.push(&change.local_path, outcome);
        }
        for orphan in &plan.orphans {
            let outcome = self.apply_orphan(orphan)?;
            report.push(&orphan.local_path, outcome);
        }

        self.store
            .persist()
            .map_err(|e| binder_err("persisting", self.project.resolved_scriv_path().display(), e))?;

        self.state.last_sync = Some(started_at);
        state::save_at(self.home, self.alias, self.state)?;
        tracing::info!(
            "{}: {} applied, {} skipped",
            self.alias,
            report.applied(),
            report.skipped()
        );
        Ok(report)
    }

    fn abs(&self, rel: &Path) -> PathBuf {
        self.project.local_path.join(rel)
    }

    fn record(&mut self, rel: &Path, id: ItemId, content: &str) {
        let modified = local::modified_at(&self.abs(rel));
        self.state.record_entry(rel, id, fingerprint(content), modified);
    }

    /// Binder folder for `title`, created at the root when allowed.
    fn ensure_folder(&mut self, title: &str) -> Result<ItemId, SyncError> {
        let key = normalize_title(title);
        if let Some(id) = self.folders.get(&key) {
            return Ok(id.clone());
        }
        let id = match self.store.find_folder(title) {
            Some(id) => id,
            None if self.project.options.create_missing_folders => {
                tracing::info!("creating binder folder '{title}'");
                self.store
                    .create_folder(title, None)
                    .map_err(|e| binder_err("creating folder", title, e))?
            }
            None => {
                return Err(SyncError::MappingTargetNotFound {
                    folder: title.to_string(),
                })
            }
        };
        self.folders.insert(key, id.clone());
        Ok(id)
    }

    fn create_document_in(
        &mut self,
        folder: Option<&str>,
        title: &str,
        content: &str,
    ) -> Result<ItemId, SyncError> {
        let parent = match folder {
            Some(f) => Some(self.ensure_folder(f)?),
            None => None,
        };
        let id = self
            .store
            .create_document(title, content, parent.as_ref())
            .map_err(|e| binder_err("creating document", title, e))?;
        tracing::info!("binder: created '{title}' ({id})");
        Ok(id)
    }

    fn create_external(&mut self, change: &FileChange) -> Result<Outcome, SyncError> {
        let id = self.create_document_in(change.folder.as_deref(), &change.title, &change.content)?;
        self.record(&change.local_path, id, &change.content);
        Ok(Outcome::CreatedExternal)
    }

    fn update_external(&mut self, change: &FileChange) -> Result<Outcome, SyncError> {
        let Some(id) = change.external_id.clone() else {
            tracing::warn!("{}: update without binder id, ignored", change.local_path.display());
            return Ok(Outcome::Ignored);
        };
        self.store
            .update_content(&id, &change.content)
            .map_err(|e| binder_err("updating", &change.title, e))?;
        tracing::info!("binder: updated '{}' ({id})", change.title);
        self.record(&change.local_path, id, &change.content);
        Ok(Outcome::UpdatedExternal)
    }

    fn write_local(&mut self, change: &FileChange, outcome: Outcome) -> Result<Outcome, SyncError> {
        let Some(id) = change.external_id.clone() else {
            tracing::warn!("{}: local write without binder id, ignored", change.local_path.display());
            return Ok(Outcome::Ignored);
        };
        local::atomic_write(&self.abs(&change.local_path), &change.content)?;
        self.record(&change.local_path, id, &change.content);
        Ok(outcome)
    }

    fn apply_conflict(&mut self, conflict: &Conflict) -> Result<Outcome, SyncError> {
        let resolution = self.resolver.resolve_conflict(conflict)?;
        match resolution {
            ConflictResolution::UseLocal => {
                self.store
                    .update_content(&conflict.external_id, &conflict.local_content)
                    .map_err(|e| binder_err("updating", &conflict.title, e))?;
                tracing::info!("binder: '{}' overwritten with local version", conflict.title);
                self.record(
                    &conflict.local_path,
                    conflict.external_id.clone(),
                    &conflict.local_content,
                );
            }
            ConflictResolution::UseExternal => {
                local::atomic_write(&self.abs(&conflict.local_path), &conflict.external_content)?;
                self.record(
                    &conflict.local_path,
                    conflict.external_id.clone(),
                    &conflict.external_content,
                );
            }
            ConflictResolution::Skip => {
                tracing::warn!("skipped conflict: {}", conflict.local_path.display());
            }
        }
        Ok(Outcome::Conflict(resolution))
    }

    fn apply_orphan(&mut self, orphan: &Orphan) -> Result<Outcome, SyncError> {
        let action = self.resolver.resolve_orphan(orphan)?;
        match (action, orphan.location) {
            (OrphanAction::Delete, OrphanLocation::Local) => {
                local::remove_file(&self.abs(&orphan.local_path))?;
                self.state.remove_entry(&orphan.local_path);
            }
            (OrphanAction::Delete, OrphanLocation::External) => {
                if self.store.binder().contains(&orphan.external_id) {
                    self.store
                        .remove_document(&orphan.external_id)
                        .map_err(|e| binder_err("removing", &orphan.external_id, e))?;
                    tracing::info!("binder: removed '{}' ({})", orphan.title, orphan.external_id);
                }
                self.state.remove_entry(&orphan.local_path);
            }
            (OrphanAction::Recreate, OrphanLocation::Local) => {
                let id =
                    self.create_document_in(orphan.folder.as_deref(), &orphan.title, &orphan.content)?;
                self.record(&orphan.local_path, id, &orphan.content);
            }
            (OrphanAction::Recreate, OrphanLocation::External) => {
                local::atomic_write(&self.abs(&orphan.local_path), &orphan.content)?;
                self.record(&orphan.local_path, orphan.external_id.clone(), &orphan.content);
            }
            (OrphanAction::Skip, _) => {
                tracing::warn!("skipped orphan: {}", orphan.describe());
            }
        }
        Ok(Outcome::Orphan(action))
    }
}
