//! Shared sync pipeline entrypoint used by every CLI command that touches a
//! project.

use std::path::Path;

use chrono::{Duration, Utc};

use scrivsync_binder::{DocumentStore, ProjectStore};
use scrivsync_core::{
    config,
    types::{ProjectAlias, ProjectConfig},
};

use crate::error::{binder_err, SyncError};
use crate::executor::{ExecutionReport, Executor};
use crate::plan::Plan;
use crate::policy::{Direction, DirectionalResolver, PolicyResolver, Resolver};
use crate::reconciler::Reconciler;
use crate::state::{self, SyncState};

/// What a pipeline run does with the detected plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Both directions.
    Sync,
    /// Binder → local only.
    Pull,
    /// Local → binder only.
    Push,
    /// Detect and report; never writes.
    Status,
}

#[derive(Default)]
pub struct RunOptions<'r> {
    pub dry_run: bool,
    /// Decides conflicts and orphans. Defaults to the project's configured
    /// policy.
    pub resolver: Option<&'r mut dyn Resolver>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// The plan after directional filtering.
    pub plan: Plan,
    /// `None` when nothing was executed.
    pub report: Option<ExecutionReport>,
    pub state_saved: bool,
    /// State as of the end of the run, tombstone expiry included. Not saved
    /// for status or dry runs.
    pub state: SyncState,
}

/// Load config and the on-disk project for `alias`, then run `mode`.
pub fn run(
    home: &Path,
    alias: &ProjectAlias,
    mode: SyncMode,
    options: RunOptions<'_>,
) -> Result<RunOutcome, SyncError> {
    let project = config::project_at(home, alias)?;
    let scriv_path = project.resolved_scriv_path();
    let mut store =
        ProjectStore::open(&scriv_path).map_err(|e| binder_err("opening", scriv_path.display(), e))?;
    run_with_store(home, alias, &project, &mut store, mode, options)
}

/// Same as [`run`] against an already-open store.
pub fn run_with_store<S: DocumentStore + ?Sized>(
    home: &Path,
    alias: &ProjectAlias,
    project: &ProjectConfig,
    store: &mut S,
    mode: SyncMode,
    options: RunOptions<'_>,
) -> Result<RunOutcome, SyncError> {
    config::validate(alias, project)?;
    let started_at = Utc::now();
    let mut state = state::load_at(home, alias, &project.local_path)?;
    let loaded = state.clone();

    let retention = Duration::days(i64::from(project.options.tombstone_retention_days));
    for path in state.expire_tombstones(started_at, retention) {
        tracing::debug!("tombstone expired: {}", path.display());
    }

    let plan = Reconciler::new(project, store.binder()).detect(&mut state)?;
    let plan = match mode {
        SyncMode::Pull => plan.pull_subset(),
        SyncMode::Push => plan.push_subset(),
        SyncMode::Sync | SyncMode::Status => plan,
    };
    tracing::info!("{alias}: {}", plan.summary());

    if mode == SyncMode::Status || options.dry_run {
        return Ok(RunOutcome {
            plan,
            report: None,
            state_saved: false,
            state,
        });
    }

    if plan.is_empty() {
        let changed = state != loaded;
        if changed {
            state.last_sync = Some(started_at);
            state::save_at(home, alias, &state)?;
        }
        return Ok(RunOutcome {
            plan,
            report: None,
            state_saved: changed,
            state,
        });
    }

    let mut fallback = PolicyResolver::from_options(&project.options);
    let base: &mut dyn Resolver = match options.resolver {
        Some(r) => r,
        None => &mut fallback,
    };
    let mut directional;
    let resolver: &mut dyn Resolver = match mode {
        SyncMode::Pull => {
            directional = DirectionalResolver::new(Direction::ToLocal, base);
            &mut directional
        }
        SyncMode::Push => {
            directional = DirectionalResolver::new(Direction::ToExternal, base);
            &mut directional
        }
        SyncMode::Sync | SyncMode::Status => base,
    };

    let report = Executor::new(home, alias, project, store, &mut state, resolver)
        .execute(&plan, started_at)?;
    Ok(RunOutcome {
        plan,
        report: Some(report),
        state_saved: true,
        state,
    })
}
