//! # scrivsync-sync
//!
//! Reconciliation engine between a markdown tree and a binder project.
//!
//! [`Reconciler`] compares both sides against the persisted [`SyncState`] and
//! produces a [`Plan`]; [`Executor`] applies it through a [`Resolver`]. Most
//! callers want [`pipeline::run`], which wires the two together.

pub mod diff;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod local;
pub mod pipeline;
pub mod plan;
pub mod policy;
pub mod reconciler;
pub mod state;

pub use diff::{diff_plan, DiffTarget, FileDiff};
pub use error::SyncError;
pub use executor::{ExecutionReport, Executor, Outcome, ReportEntry};
pub use fingerprint::fingerprint;
pub use pipeline::{run, run_with_store, RunOptions, RunOutcome, SyncMode};
pub use plan::{Conflict, ConflictReason, FileChange, Orphan, OrphanLocation, Plan};
pub use policy::{
    ConflictResolution, Direction, DirectionalResolver, OrphanAction, PolicyResolver, Resolver,
};
pub use reconciler::Reconciler;
pub use state::{ChangeKind, SyncState, TrackedEntry};
