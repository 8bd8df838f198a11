//! scriv-sync: keep a markdown tree and a binder project in step.
//!
//! # Usage
//!
//! ```text
//! scriv-sync init --local <dir> --scriv <project> --alias <name>
//! scriv-sync sync <alias>
//! scriv-sync pull <alias>
//! scriv-sync push <alias>
//! scriv-sync status <alias> [--json]
//! scriv-sync diff <alias>
//! scriv-sync list
//! scriv-sync remove <alias>
//! ```
//!
//! `--dry-run`, `--non-interactive` and `-v` are accepted by every command.

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{
    diff::DiffArgs,
    init::InitArgs,
    project::RemoveArgs,
    status::StatusArgs,
    sync::SyncArgs,
};
use scrivsync_sync::SyncMode;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "scriv-sync",
    version,
    about = "Bi-directional sync between a binder project and markdown files",
    long_about = None,
)]
struct Cli {
    /// Preview changes without applying them.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Never prompt; use the configured defaults.
    #[arg(long, global = true)]
    non_interactive: bool,

    /// More log output (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a project and its folder mappings.
    Init(InitArgs),

    /// Sync both directions.
    Sync(SyncArgs),

    /// Binder to markdown only; the binder wins conflicts.
    Pull(SyncArgs),

    /// Markdown to binder only; markdown wins conflicts.
    Push(SyncArgs),

    /// Show pending changes without syncing.
    Status(StatusArgs),

    /// Show unified diffs of what sync would write.
    Diff(DiffArgs),

    /// List configured projects.
    List,

    /// Remove a project from the config.
    Remove(RemoveArgs),
}

/// Flags shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Globals {
    pub dry_run: bool,
    pub non_interactive: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let globals = Globals {
        dry_run: cli.dry_run,
        non_interactive: cli.non_interactive,
    };
    match cli.command {
        Commands::Init(args) => args.run(globals),
        Commands::Sync(args) => args.run(SyncMode::Sync, globals),
        Commands::Pull(args) => args.run(SyncMode::Pull, globals),
        Commands::Push(args) => args.run(SyncMode::Push, globals),
        Commands::Status(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::List => commands::project::list(),
        Commands::Remove(args) => args.run(globals),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
