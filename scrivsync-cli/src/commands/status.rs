//! `scriv-sync status <alias>`: pending changes, without syncing.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use scrivsync_sync::{run_with_store, Plan, RunOptions, SyncMode};

use super::sync::open_project;

/// Arguments for `scriv-sync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Alias of the project to inspect.
    pub alias: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusJson<'a> {
    alias: &'a str,
    last_sync: Option<DateTime<Utc>>,
    tracked_files: usize,
    pending_operations: usize,
    summary: String,
    plan: &'a Plan,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let alias = super::alias(&self.alias);

        let (project, mut store) = open_project(&home, &alias)?;
        let outcome = run_with_store(
            &home,
            &alias,
            &project,
            &mut store,
            SyncMode::Status,
            RunOptions::default(),
        )
        .with_context(|| format!("status failed for '{alias}'"))?;
        let plan = &outcome.plan;
        let state = &outcome.state;

        if self.json {
            let report = StatusJson {
                alias: &self.alias,
                last_sync: state.last_sync,
                tracked_files: state.files.len(),
                pending_operations: plan.total_operations(),
                summary: plan.summary(),
                plan,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status")?
            );
            return Ok(());
        }

        println!("{} {}", "Project:".bold(), alias);
        println!("  Local:     {}", project.local_path.display());
        println!("  Binder:    {}", project.resolved_scriv_path().display());
        println!(
            "  Last sync: {}",
            state
                .last_sync
                .map(|at| format_age(at, Utc::now()))
                .unwrap_or_else(|| "never".to_string())
        );
        println!("  Tracked:   {} file(s)", state.files.len());
        println!();
        print!("{plan}");
        Ok(())
    }
}

fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
