//! Interactive conflict and orphan resolution.

use std::fmt;
use std::io::IsTerminal;

use colored::Colorize;
use inquire::Select;

use scrivsync_core::types::SyncOptions;
use scrivsync_sync::{
    Conflict, ConflictResolution, Orphan, OrphanAction, OrphanLocation, PolicyResolver, Resolver,
    SyncError,
};

/// The resolver for a run: prompts when a terminal is attached and prompting
/// wasn't disabled, otherwise the configured defaults.
pub fn resolver_for(options: &SyncOptions, non_interactive: bool) -> Box<dyn Resolver> {
    let defaults = PolicyResolver::from_options(options);
    if non_interactive || !std::io::stdin().is_terminal() {
        tracing::debug!("prompts disabled; using configured defaults");
        Box::new(defaults)
    } else {
        Box::new(PromptResolver { defaults })
    }
}

/// Asks the operator about every conflict and orphan, with the configured
/// default preselected.
pub struct PromptResolver {
    defaults: PolicyResolver,
}

impl Resolver for PromptResolver {
    fn resolve_conflict(&mut self, conflict: &Conflict) -> Result<ConflictResolution, SyncError> {
        println!();
        println!(
            "{} {}",
            "Conflict:".yellow().bold(),
            conflict.local_path.display()
        );
        println!("  {} [{}]: {}", conflict.title, conflict.external_id, conflict.reason);

        let default = ConflictResolution::from_policy(self.defaults.conflict);
        choose(
            "How should this conflict be resolved?",
            vec![
                ConflictResolution::UseLocal,
                ConflictResolution::UseExternal,
                ConflictResolution::Skip,
            ],
            default,
            ConflictResolution::Skip,
        )
    }

    fn resolve_orphan(&mut self, orphan: &Orphan) -> Result<OrphanAction, SyncError> {
        println!();
        println!("{} {}", "Orphan:".yellow().bold(), orphan.describe());
        match orphan.location {
            OrphanLocation::Local => {
                println!("  The local file exists but its binder document was deleted.")
            }
            OrphanLocation::External => {
                println!("  The binder document exists but its local file was deleted.")
            }
        }
        if let Some(at) = orphan.last_synced_at {
            println!("  Last synced: {}", at.format("%Y-%m-%d %H:%M:%S"));
        }

        let default = OrphanAction::from_policy(self.defaults.deletion);
        choose(
            "What should happen to it?",
            vec![OrphanAction::Delete, OrphanAction::Recreate, OrphanAction::Skip],
            default,
            OrphanAction::Skip,
        )
    }
}

/// Esc answers `skip`; Ctrl-C aborts the run.
fn choose<T>(message: &str, options: Vec<T>, default: T, skip: T) -> Result<T, SyncError>
where
    T: fmt::Display + Copy + PartialEq,
{
    let cursor = starting_cursor(&options, default);
    let answer = Select::new(message, options)
        .with_starting_cursor(cursor)
        .prompt_skippable()
        .map_err(|e| SyncError::Prompt(e.to_string()))?;
    Ok(answer.unwrap_or(skip))
}

fn starting_cursor<T: PartialEq>(options: &[T], default: T) -> usize {
    options.iter().position(|o| *o == default).unwrap_or(0)
}
