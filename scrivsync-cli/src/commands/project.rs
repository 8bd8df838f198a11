//! `scriv-sync list` and `scriv-sync remove <alias>`

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use scrivsync_core::config;

use crate::Globals;

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "alias")]
    alias: String,
    #[tabled(rename = "local")]
    local: String,
    #[tabled(rename = "binder")]
    binder: String,
    #[tabled(rename = "mappings")]
    mappings: String,
}

/// Print every configured project.
pub fn list() -> Result<()> {
    let home = super::home()?;
    let config = config::load_at(&home).context("failed to load config")?;

    if config.projects.is_empty() {
        println!("No projects configured.");
        println!("Run: scriv-sync init --local <path> --scriv <path> --alias <name>");
        return Ok(());
    }

    let rows: Vec<ProjectRow> = config
        .projects
        .iter()
        .map(|(alias, project)| ProjectRow {
            alias: alias.to_string(),
            local: project.local_path.display().to_string(),
            binder: project.scriv_path.display().to_string(),
            mappings: format!(
                "{}/{} enabled",
                project.enabled_mappings().count(),
                project.folder_mappings.len()
            ),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

/// Arguments for `scriv-sync remove`.
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Alias of the project to remove.
    pub alias: String,

    /// Also delete the project's sync state.
    #[arg(long)]
    pub purge_state: bool,
}

impl RemoveArgs {
    pub fn run(self, globals: Globals) -> Result<()> {
        let home = super::home()?;
        let alias = super::alias(&self.alias);

        if globals.dry_run {
            config::project_at(&home, &alias)
                .with_context(|| format!("failed to load project '{alias}'"))?;
            println!("[dry-run] would remove project '{alias}'");
            return Ok(());
        }

        config::remove_project_at(&home, &alias)
            .with_context(|| format!("failed to remove project '{alias}'"))?;

        if self.purge_state {
            let state_path = config::state_path_at(&home, &alias);
            match std::fs::remove_file(&state_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to delete {}", state_path.display()))
                }
            }
        }

        println!("✓ Removed project '{alias}'");
        Ok(())
    }
}
