//! `scriv-sync init --local <dir> --scriv <project> --alias <name>`

use std::fmt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use inquire::{Confirm, MultiSelect};

use scrivsync_binder::{DocumentStore, ProjectStore};
use scrivsync_core::{
    config,
    types::{FolderMapping, ProjectConfig},
};
use scrivsync_detector::{suggest_mappings, SuggestedMapping};

use crate::Globals;

/// Register a project in `~/.scriv-sync/config.yaml`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Markdown root directory.
    #[arg(long)]
    pub local: PathBuf,

    /// Binder project directory.
    #[arg(long)]
    pub scriv: PathBuf,

    /// Name used to refer to the project in other commands.
    #[arg(long)]
    pub alias: String,
}

impl InitArgs {
    pub fn run(self, globals: Globals) -> Result<()> {
        let home = super::home()?;
        let alias = super::alias(&self.alias);

        let existing = config::load_at(&home).context("failed to load config")?;
        if existing.projects.contains_key(&alias) {
            bail!("project '{alias}' already exists; choose a different alias or remove the existing one");
        }

        let local = self
            .local
            .canonicalize()
            .with_context(|| format!("cannot resolve local path '{}'", self.local.display()))?;
        if !local.is_dir() {
            bail!("local path is not a directory: {}", local.display());
        }
        let scriv = self
            .scriv
            .canonicalize()
            .with_context(|| format!("cannot resolve binder path '{}'", self.scriv.display()))?;

        let store = ProjectStore::open(&scriv)
            .with_context(|| format!("failed to open binder project {}", scriv.display()))?;
        let folders: Vec<&str> = store
            .binder()
            .top_level_folders()
            .map(|f| f.title.as_str())
            .collect();
        println!("Binder folders: {}", list_or_none(&folders));

        let mut suggestions = suggest_mappings(&local, store.binder())
            .with_context(|| format!("failed to scan {}", local.display()))?;

        let interactive = !globals.non_interactive && std::io::stdin().is_terminal();
        if interactive && !suggestions.is_empty() {
            choose_mappings(&mut suggestions)?;
        }
        print_mappings(&suggestions);

        if globals.dry_run {
            println!("[dry-run] project '{alias}' not saved");
            return Ok(());
        }

        if interactive && suggestions.iter().any(|s| s.enabled && !s.dir_exists) {
            let create = Confirm::new("Create missing directories for enabled mappings?")
                .with_default(true)
                .prompt()
                .context("prompt failed")?;
            if create {
                create_missing_dirs(&local, &suggestions)?;
            }
        }

        let mut project = ProjectConfig::new(local, scriv);
        project
            .folder_mappings
            .extend(suggestions.into_iter().map(FolderMapping::from));
        let enabled = project.enabled_mappings().count();
        config::add_project_at(&home, alias.clone(), project)
            .with_context(|| format!("failed to save project '{alias}'"))?;

        println!(
            "✓ Added project '{alias}' to {} with {enabled} enabled mapping(s)",
            config::config_path_at(&home).display()
        );
        println!("  To sync, run: scriv-sync sync {alias}");
        Ok(())
    }
}

struct Choice<'a>(&'a SuggestedMapping);

impl fmt::Display for Choice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <-> {}/",
            self.0.scrivener_folder,
            self.0.markdown_dir.display()
        )?;
        if !self.0.dir_exists {
            write!(f, " (create)")?;
        }
        Ok(())
    }
}

fn choose_mappings(suggestions: &mut [SuggestedMapping]) -> Result<()> {
    let defaults: Vec<usize> = suggestions
        .iter()
        .enumerate()
        .filter(|(_, s)| s.enabled)
        .map(|(i, _)| i)
        .collect();
    let picked: Vec<String> = {
        let choices: Vec<Choice<'_>> = suggestions.iter().map(Choice).collect();
        let answer = MultiSelect::new("Folders to sync:", choices)
            .with_default(&defaults)
            .prompt_skippable()
            .context("prompt failed")?;
        match answer {
            Some(chosen) => chosen
                .into_iter()
                .map(|c| c.0.scrivener_folder.clone())
                .collect(),
            None => return Ok(()),
        }
    };
    for s in suggestions.iter_mut() {
        s.enabled = picked.contains(&s.scrivener_folder);
    }
    Ok(())
}

fn print_mappings(suggestions: &[SuggestedMapping]) {
    if suggestions.is_empty() {
        println!("No folder mappings suggested.");
        return;
    }
    println!("Folder mappings:");
    for s in suggestions {
        let check = if s.enabled { "[x]".green() } else { "[ ]".dimmed() };
        let dir = if s.dir_exists {
            format!("{}/", s.markdown_dir.display())
        } else {
            format!("(create) {}/", s.markdown_dir.display())
        };
        println!("  {check} {} <-> {dir}", s.scrivener_folder);
    }
}

fn create_missing_dirs(local: &Path, suggestions: &[SuggestedMapping]) -> Result<()> {
    for s in suggestions.iter().filter(|s| s.enabled && !s.dir_exists) {
        let dir = local.join(&s.markdown_dir);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        println!("  created {}", dir.display());
    }
    Ok(())
}

fn list_or_none(items: &[&str]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
