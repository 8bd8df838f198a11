use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;

use scrivsync_binder::{DocumentStore, ProjectStore};
use scrivsync_core::config;
use tempfile::TempDir;

fn scriv_sync(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("scriv-sync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

/// A markdown root with one chapter and a binder project with one different
/// chapter, both under a `Chapters` folder.
struct Fixture {
    home: TempDir,
    workspace: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let home = TempDir::new().expect("home");
        let workspace = TempDir::new().expect("workspace");

        let chapters = workspace.path().join("markdown/chapters");
        fs::create_dir_all(&chapters).expect("mkdir chapters");
        fs::write(chapters.join("chapter-one.md"), "Once upon a time.\n").expect("write chapter");

        let mut store = ProjectStore::create(workspace.path().join("Novel.scriv")).expect("create project");
        let folder = store.create_folder("Chapters", None).expect("folder");
        store
            .create_document("Prologue", "It begins.\n", Some(&folder))
            .expect("document");
        store.create_folder("Research", None).expect("research");
        store.persist().expect("persist");

        Self { home, workspace }
    }

    fn local(&self) -> PathBuf {
        self.workspace.path().join("markdown")
    }

    fn scriv(&self) -> PathBuf {
        self.workspace.path().join("Novel.scriv")
    }

    fn cmd(&self) -> Command {
        scriv_sync(self.home.path())
    }

    fn init(&self) {
        self.cmd()
            .args(["--non-interactive", "init", "--alias", "novel", "--local"])
            .arg(self.local())
            .arg("--scriv")
            .arg(self.scriv())
            .assert()
            .success();
    }

    fn state_path(&self) -> PathBuf {
        config::state_path_at(self.home.path(), &"novel".into())
    }
}

// ---------------------------------------------------------------------------
// init / list / remove
// ---------------------------------------------------------------------------

#[test]
fn init_registers_project_with_detected_mappings() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["--non-interactive", "init", "--alias", "novel", "--local"])
        .arg(fx.local())
        .arg("--scriv")
        .arg(fx.scriv())
        .assert()
        .success()
        .stdout(contains("Chapters, Research"))
        .stdout(contains("[x] Chapters <-> chapters/"))
        .stdout(contains("[ ] Research <-> (create) research/"))
        .stdout(contains("1 enabled mapping(s)"));

    let project = config::project_at(fx.home.path(), &"novel".into()).expect("saved project");
    assert_eq!(project.folder_mappings.len(), 2);
    let enabled: Vec<_> = project
        .enabled_mappings()
        .map(|m| m.scrivener_folder.as_str())
        .collect();
    assert_eq!(enabled, vec!["Chapters"]);
    assert!(!fx.local().join("research").exists());
}

#[test]
fn init_dry_run_saves_nothing() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["--dry-run", "--non-interactive", "init", "--alias", "novel", "--local"])
        .arg(fx.local())
        .arg("--scriv")
        .arg(fx.scriv())
        .assert()
        .success()
        .stdout(contains("[dry-run]"));

    assert!(!config::config_path_at(fx.home.path()).exists());
}

#[test]
fn init_rejects_duplicate_alias() {
    let fx = Fixture::new();
    fx.init();
    fx.cmd()
        .args(["--non-interactive", "init", "--alias", "novel", "--local"])
        .arg(fx.local())
        .arg("--scriv")
        .arg(fx.scriv())
        .assert()
        .failure()
        .stderr(contains("already exists"));
}

#[test]
fn init_requires_an_existing_binder_project() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["--non-interactive", "init", "--alias", "novel", "--local"])
        .arg(fx.local())
        .arg("--scriv")
        .arg(fx.local())
        .assert()
        .failure()
        .stderr(contains("failed to open binder project"));
}

#[test]
fn list_and_remove() {
    let fx = Fixture::new();
    fx.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No projects configured."));

    fx.init();
    fx.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("novel"))
        .stdout(contains("1/2 enabled"));

    fx.cmd()
        .args(["remove", "novel"])
        .assert()
        .success()
        .stdout(contains("Removed project 'novel'"));
    fx.cmd()
        .args(["remove", "novel"])
        .assert()
        .failure()
        .stderr(contains("not found"));
}

// ---------------------------------------------------------------------------
// status / diff / sync
// ---------------------------------------------------------------------------

#[test]
fn status_lists_pending_creates_on_both_sides() {
    let fx = Fixture::new();
    fx.init();
    fx.cmd()
        .args(["status", "novel"])
        .assert()
        .success()
        .stdout(contains("Last sync: never"))
        .stdout(contains("+ chapters/chapter-one.md"))
        .stdout(contains("+ chapters/prologue.md"));
    assert!(!fx.state_path().exists(), "status must not write state");
}

#[test]
fn status_json_is_machine_readable() {
    let fx = Fixture::new();
    fx.init();
    let output = fx
        .cmd()
        .args(["status", "novel", "--json"])
        .output()
        .expect("run status --json");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["alias"], "novel");
    assert_eq!(json["pending_operations"], 2);
    assert!(json["last_sync"].is_null());
    assert_eq!(json["plan"]["create_external"][0]["title"], "Chapter One");
    assert_eq!(json["plan"]["create_local"][0]["title"], "Prologue");
}

#[test]
fn status_json_counts_tracked_files_after_sync() {
    let fx = Fixture::new();
    fx.init();
    fx.cmd()
        .args(["--non-interactive", "sync", "novel"])
        .assert()
        .success();

    let output = fx
        .cmd()
        .args(["status", "novel", "--json"])
        .output()
        .expect("run status --json");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["tracked_files"], 2);
    assert_eq!(json["pending_operations"], 0);
    assert!(json["last_sync"].is_string());
}

#[test]
fn diff_shows_incoming_content() {
    let fx = Fixture::new();
    fx.init();
    fx.cmd()
        .args(["diff", "novel"])
        .assert()
        .success()
        .stdout(contains("+It begins."))
        .stdout(contains("+Once upon a time."));
}

#[test]
fn dry_run_sync_writes_nothing() {
    let fx = Fixture::new();
    fx.init();
    fx.cmd()
        .args(["--dry-run", "--non-interactive", "sync", "novel"])
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("chapters/prologue.md"));

    assert!(!fx.local().join("chapters/prologue.md").exists());
    assert!(!fx.state_path().exists());
    let store = ProjectStore::open(fx.scriv()).expect("reopen");
    assert_eq!(store.binder().documents().count(), 1);
}

#[test]
fn sync_applies_both_directions_then_is_idempotent() {
    let fx = Fixture::new();
    fx.init();
    fx.cmd()
        .args(["--non-interactive", "sync", "novel"])
        .assert()
        .success()
        .stdout(contains("2 applied, 0 skipped"));

    let prologue = fs::read_to_string(fx.local().join("chapters/prologue.md")).expect("pulled file");
    assert_eq!(prologue, "It begins.\n");

    let store = ProjectStore::open(fx.scriv()).expect("reopen");
    let folder = store.binder().find_folder("Chapters").expect("folder");
    let titles: Vec<_> = store
        .binder()
        .children(folder)
        .map(|n| n.title.clone())
        .collect();
    assert_eq!(titles, vec!["Prologue", "Chapter One"]);
    assert!(fx.state_path().exists());

    fx.cmd()
        .args(["--non-interactive", "sync", "novel"])
        .assert()
        .success()
        .stdout(contains("is up to date"));
    fx.cmd()
        .args(["status", "novel"])
        .assert()
        .success()
        .stdout(contains("Everything is in sync."));
}

#[test]
fn push_leaves_local_side_alone() {
    let fx = Fixture::new();
    fx.init();
    fx.cmd()
        .args(["--non-interactive", "push", "novel"])
        .assert()
        .success()
        .stdout(contains("chapters/chapter-one.md"))
        .stdout(contains("prologue").not());

    assert!(!fx.local().join("chapters/prologue.md").exists());
    let store = ProjectStore::open(fx.scriv()).expect("reopen");
    assert_eq!(store.binder().documents().count(), 2);
}

#[test]
fn unknown_alias_is_reported() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["status", "missing"])
        .assert()
        .failure()
        .stderr(contains("project 'missing' not found"));
}
