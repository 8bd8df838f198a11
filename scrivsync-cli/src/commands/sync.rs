//! `scriv-sync sync|pull|push <alias>`: detect and apply changes.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use scrivsync_binder::ProjectStore;
use scrivsync_core::{
    config,
    types::{ProjectAlias, ProjectConfig},
};
use scrivsync_sync::{run_with_store, Outcome, RunOptions, RunOutcome, SyncMode};

use super::prompt;
use crate::Globals;

/// Arguments for `scriv-sync sync`, `pull` and `push`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Alias of the project to sync.
    pub alias: String,
}

impl SyncArgs {
    pub fn run(self, mode: SyncMode, globals: Globals) -> Result<()> {
        let home = super::home()?;
        let alias = super::alias(&self.alias);

        let (project, mut store) = open_project(&home, &alias)?;
        let mut resolver = prompt::resolver_for(&project.options, globals.non_interactive);
        let outcome = run_with_store(
            &home,
            &alias,
            &project,
            &mut store,
            mode,
            RunOptions {
                dry_run: globals.dry_run,
                resolver: Some(resolver.as_mut()),
            },
        )
        .with_context(|| format!("{} failed for '{alias}'", verb(mode)))?;

        print_outcome(&alias, &outcome, globals.dry_run);
        Ok(())
    }
}

/// Load and validate `alias`, then open its binder project.
pub(crate) fn open_project(home: &Path, alias: &ProjectAlias) -> Result<(ProjectConfig, ProjectStore)> {
    let project = config::project_at(home, alias)
        .with_context(|| format!("failed to load project '{alias}'"))?;
    let scriv_path = project.resolved_scriv_path();
    let store = ProjectStore::open(&scriv_path)
        .with_context(|| format!("failed to open binder project {}", scriv_path.display()))?;
    Ok((project, store))
}

fn verb(mode: SyncMode) -> &'static str {
    match mode {
        SyncMode::Sync => "sync",
        SyncMode::Pull => "pull",
        SyncMode::Push => "push",
        SyncMode::Status => "status",
    }
}

fn print_outcome(alias: &ProjectAlias, outcome: &RunOutcome, dry_run: bool) {
    if dry_run {
        println!("[dry-run] '{alias}': no changes written");
        print!("{}", outcome.plan);
        return;
    }

    let Some(report) = &outcome.report else {
        println!("✓ '{alias}' is up to date");
        return;
    };

    println!(
        "✓ '{alias}' synced ({} applied, {} skipped)",
        report.applied(),
        report.skipped()
    );
    for entry in &report.entries {
        let marker = match entry.outcome {
            Outcome::CreatedExternal | Outcome::CreatedLocal => "+".green(),
            Outcome::UpdatedExternal | Outcome::UpdatedLocal => "~".yellow(),
            o if o.is_skip() => "·".dimmed(),
            _ => "!".red(),
        };
        println!("  {marker}  {} ({})", entry.local_path.display(), entry.outcome);
    }
}
