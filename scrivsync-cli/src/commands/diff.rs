//! `scriv-sync diff <alias>`: unified diffs for what sync would write.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use scrivsync_sync::{diff_plan, run_with_store, DiffTarget, RunOptions, SyncMode};

use super::sync::open_project;

/// Arguments for `scriv-sync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Alias of the project to diff.
    pub alias: String,
}

impl DiffArgs {
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
        .with_context(|| format!("diff failed for '{alias}'"))?;

        let diffs = diff_plan(&outcome.plan);
        if diffs.is_empty() {
            println!("No differences for '{alias}'.");
            return Ok(());
        }

        for diff in diffs {
            let side = match diff.target {
                DiffTarget::Local => "local",
                DiffTarget::External => "binder",
            };
            println!(
                "{}",
                format!("=== {} ({}, {side})", diff.path.display(), diff.label).bold()
            );
            for line in diff.unified_diff.lines() {
                println!("{}", colorize(line));
            }
        }
        Ok(())
    }
}

fn colorize(line: &str) -> colored::ColoredString {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold()
    } else if line.starts_with('+') {
        line.green()
    } else if line.starts_with('-') {
        line.red()
    } else if line.starts_with("@@") {
        line.cyan()
    } else {
        line.normal()
    }
}
