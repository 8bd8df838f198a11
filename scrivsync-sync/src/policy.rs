//! Conflict and orphan resolution.
//!
//! The executor asks a [`Resolver`] for every conflict and orphan. The engine
//! itself never talks to a terminal; interactive prompting lives in the CLI
//! as another `Resolver`.

use std::fmt;

use scrivsync_core::types::{ConflictPolicy, DeletionPolicy, SyncOptions};

use crate::error::SyncError;
use crate::plan::{Conflict, Orphan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Overwrite the binder document with the local file.
    UseLocal,
    /// Overwrite the local file with the binder document.
    UseExternal,
    Skip,
}

impl ConflictResolution {
    /// Non-blocking mapping of a configured default. `prompt` becomes `Skip`.
    pub fn from_policy(policy: ConflictPolicy) -> Self {
        match policy {
            ConflictPolicy::Markdown => ConflictResolution::UseLocal,
            ConflictPolicy::Scrivener => ConflictResolution::UseExternal,
            ConflictPolicy::Prompt | ConflictPolicy::Skip => ConflictResolution::Skip,
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictResolution::UseLocal => "use local version (overwrite binder)",
            ConflictResolution::UseExternal => "use binder version (overwrite local)",
            ConflictResolution::Skip => "skip",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanAction {
    /// Remove the surviving copy too.
    Delete,
    /// Restore the missing side from the surviving copy.
    Recreate,
    Skip,
}

impl OrphanAction {
    pub fn from_policy(policy: DeletionPolicy) -> Self {
        match policy {
            DeletionPolicy::Delete => OrphanAction::Delete,
            DeletionPolicy::Recreate => OrphanAction::Recreate,
            DeletionPolicy::Prompt | DeletionPolicy::Skip => OrphanAction::Skip,
        }
    }
}

impl fmt::Display for OrphanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrphanAction::Delete => "delete from the remaining side",
            OrphanAction::Recreate => "recreate on the missing side",
            OrphanAction::Skip => "skip",
        };
        f.write_str(s)
    }
}

/// Supplies a decision for each conflict and orphan in a plan.
pub trait Resolver {
    fn resolve_conflict(&mut self, conflict: &Conflict) -> Result<ConflictResolution, SyncError>;
    fn resolve_orphan(&mut self, orphan: &Orphan) -> Result<OrphanAction, SyncError>;
}

/// Applies the configured defaults without ever blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyResolver {
    pub conflict: ConflictPolicy,
    pub deletion: DeletionPolicy,
}

impl PolicyResolver {
    pub fn new(conflict: ConflictPolicy, deletion: DeletionPolicy) -> Self {
        Self { conflict, deletion }
    }

    pub fn from_options(options: &SyncOptions) -> Self {
        Self::new(
            options.default_conflict_resolution,
            options.default_deletion_action,
        )
    }
}

impl Resolver for PolicyResolver {
    fn resolve_conflict(&mut self, _conflict: &Conflict) -> Result<ConflictResolution, SyncError> {
        Ok(ConflictResolution::from_policy(self.conflict))
    }

    fn resolve_orphan(&mut self, _orphan: &Orphan) -> Result<OrphanAction, SyncError> {
        Ok(OrphanAction::from_policy(self.deletion))
    }
}

/// Direction of a one-way run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `pull`: binder → local.
    ToLocal,
    /// `push`: local → binder.
    ToExternal,
}

/// Forces every conflict towards one side; orphans go to `inner`.
pub struct DirectionalResolver<'a> {
    direction: Direction,
    inner: &'a mut dyn Resolver,
}

impl<'a> DirectionalResolver<'a> {
    pub fn new(direction: Direction, inner: &'a mut dyn Resolver) -> Self {
        Self { direction, inner }
    }
}

impl Resolver for DirectionalResolver<'_> {
    fn resolve_conflict(&mut self, _conflict: &Conflict) -> Result<ConflictResolution, SyncError> {
        Ok(match self.direction {
            Direction::ToLocal => ConflictResolution::UseExternal,
            Direction::ToExternal => ConflictResolution::UseLocal,
        })
    }

    fn resolve_orphan(&mut self, orphan: &Orphan) -> Result<OrphanAction, SyncError> {
        self.inner.resolve_orphan(orphan)
    }
}
