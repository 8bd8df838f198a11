//! The set of operations a sync run intends to perform.
//!
//! A [`Plan`] is built fresh on every run by the reconciler and never
//! persisted. It is either printed (status, dry-run, diff) or handed to the
//! executor.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scrivsync_binder::ItemId;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A single create or update in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Relative to the project's markdown root.
    pub local_path: PathBuf,
    /// `None` for documents that do not exist in the binder yet.
    pub external_id: Option<ItemId>,
    pub title: String,
    /// Content to write on the target side.
    pub content: String,
    /// Binder folder title to create under (external creates only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Content currently on the target side, for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Both sides changed since the last sync.
    BothChanged,
    /// Never synced, present on both sides with different content.
    FirstContact,
    /// Reappeared after a deliberate delete.
    Tombstoned,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictReason::BothChanged => "both sides modified",
            ConflictReason::FirstContact => "exists on both sides, never synced",
            ConflictReason::Tombstoned => "reappeared after deletion",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub local_path: PathBuf,
    pub external_id: ItemId,
    pub title: String,
    pub local_content: String,
    pub external_content: String,
    pub reason: ConflictReason,
}

/// Side on which the surviving copy of an orphan lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanLocation {
    Local,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orphan {
    pub local_path: PathBuf,
    pub location: OrphanLocation,
    pub external_id: ItemId,
    pub title: String,
    /// Content of the surviving copy.
    pub content: String,
    /// Binder folder to recreate into, for local survivors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Orphan {
    /// Human description of what happened to the other side.
    pub fn describe(&self) -> String {
        match self.location {
            OrphanLocation::Local => {
                format!("{} (deleted from binder)", self.local_path.display())
            }
            OrphanLocation::External => {
                format!("{} [{}] (deleted locally)", self.title, self.external_id)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub create_external: Vec<FileChange>,
    pub create_local: Vec<FileChange>,
    pub update_external: Vec<FileChange>,
    pub update_local: Vec<FileChange>,
    pub conflicts: Vec<Conflict>,
    pub orphans: Vec<Orphan>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_create_external(&mut self, change: FileChange) {
        self.create_external.push(change);
    }

    pub fn add_create_local(&mut self, change: FileChange) {
        self.create_local.push(change);
    }

    pub fn add_update_external(&mut self, change: FileChange) {
        self.update_external.push(change);
    }

    pub fn add_update_local(&mut self, change: FileChange) {
        self.update_local.push(change);
    }

    pub fn add_conflict(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    pub fn add_orphan(&mut self, orphan: Orphan) {
        self.orphans.push(orphan);
    }

    pub fn is_empty(&self) -> bool {
        self.total_operations() == 0
    }

    pub fn total_operations(&self) -> usize {
        self.create_external.len()
            + self.create_local.len()
            + self.update_external.len()
            + self.update_local.len()
            + self.conflicts.len()
            + self.orphans.len()
    }

    /// One-line summary, e.g. `2 to create in binder, 1 conflict`.
    pub fn summary(&self) -> String {
        let counts = [
            (self.create_external.len(), "to create in binder"),
            (self.create_local.len(), "to create locally"),
            (self.update_external.len(), "to update in binder"),
            (self.update_local.len(), "to update locally"),
        ];
        let mut parts: Vec<String> = counts
            .iter()
            .filter(|(n, _)| *n > 0)
            .map(|(n, label)| format!("{n} {label}"))
            .collect();
        if !self.conflicts.is_empty() {
            parts.push(plural(self.conflicts.len(), "conflict"));
        }
        if !self.orphans.is_empty() {
            parts.push(plural(self.orphans.len(), "orphan"));
        }

        if parts.is_empty() {
            "No changes to sync".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Subset applied by `pull`: everything flowing binder → local.
    ///
    /// Conflicts are kept; the caller forces them towards the local side.
    pub fn pull_subset(&self) -> Plan {
        Plan {
            create_local: self.create_local.clone(),
            update_local: self.update_local.clone(),
            conflicts: self.conflicts.clone(),
            orphans: self
                .orphans
                .iter()
                .filter(|o| o.location == OrphanLocation::Local)
                .cloned()
                .collect(),
            ..Plan::default()
        }
    }

    /// Subset applied by `push`: everything flowing local → binder.
    pub fn push_subset(&self) -> Plan {
        Plan {
            create_external: self.create_external.clone(),
            update_external: self.update_external.clone(),
            conflicts: self.conflicts.clone(),
            orphans: self
                .orphans
                .iter()
                .filter(|o| o.location == OrphanLocation::External)
                .cloned()
                .collect(),
            ..Plan::default()
        }
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "Everything is in sync.");
        }

        if !self.create_external.is_empty() {
            writeln!(f, "New in binder:")?;
            for c in &self.create_external {
                writeln!(f, "  + {}", c.local_path.display())?;
            }
        }
        if !self.create_local.is_empty() {
            writeln!(f, "New local files:")?;
            for c in &self.create_local {
                writeln!(f, "  + {} ({})", c.local_path.display(), id_or_dash(&c.external_id))?;
            }
        }
        if !self.update_external.is_empty() {
            writeln!(f, "Update in binder (local -> binder):")?;
            for c in &self.update_external {
                writeln!(f, "  ~ {} ({})", c.local_path.display(), id_or_dash(&c.external_id))?;
            }
        }
        if !self.update_local.is_empty() {
            writeln!(f, "Update local (binder -> local):")?;
            for c in &self.update_local {
                writeln!(f, "  ~ {} ({})", c.local_path.display(), id_or_dash(&c.external_id))?;
            }
        }
        if !self.conflicts.is_empty() {
            writeln!(f, "Conflicts:")?;
            for c in &self.conflicts {
                writeln!(
                    f,
                    "  ! {} ({}): {}",
                    c.local_path.display(),
                    c.external_id,
                    c.reason
                )?;
            }
        }
        if !self.orphans.is_empty() {
            writeln!(f, "Orphans:")?;
            for o in &self.orphans {
                writeln!(f, "  ? {}", o.describe())?;
            }
        }
        writeln!(f)?;
        writeln!(f, "{}", self.summary())
    }
}

fn id_or_dash(id: &Option<ItemId>) -> String {
    id.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str, id: Option<&str>) -> FileChange {
        FileChange {
            local_path: PathBuf::from(path),
            external_id: id.map(ItemId::from),
            title: "T".into(),
            content: "body".into(),
            folder: None,
            replaced: None,
        }
    }

    fn orphan(location: OrphanLocation) -> Orphan {
        Orphan {
            local_path: PathBuf::from("chapters/gone.md"),
            location,
            external_id: ItemId::from("U7"),
            title: "Gone".into(),
            content: "x".into(),
            folder: Some("Draft".into()),
            last_synced_at: None,
        }
    }

    fn mixed() -> Plan {
        let mut plan = Plan::new();
        plan.add_create_external(change("chapters/a.md", None));
        plan.add_create_local(change("chapters/b.md", Some("U2")));
        plan.add_update_external(change("chapters/c.md", Some("U3")));
        plan.add_update_local(change("chapters/d.md", Some("U4")));
        plan.add_conflict(Conflict {
            local_path: PathBuf::from("chapters/e.md"),
            external_id: ItemId::from("U5"),
            title: "E".into(),
            local_content: "l".into(),
            external_content: "r".into(),
            reason: ConflictReason::BothChanged,
        });
        plan.add_orphan(orphan(OrphanLocation::Local));
        plan.add_orphan(orphan(OrphanLocation::External));
        plan
    }

    #[test]
    fn empty_plan() {
        let plan = Plan::new();
        assert!(plan.is_empty());
        assert_eq!(plan.summary(), "No changes to sync");
        assert_eq!(plan.to_string(), "Everything is in sync.\n");
    }

    #[test]
    fn counts_and_summary() {
        let plan = mixed();
        assert_eq!(plan.total_operations(), 7);
        assert_eq!(
            plan.summary(),
            "1 to create in binder, 1 to create locally, 1 to update in binder, \
             1 to update locally, 1 conflict, 2 orphans"
        );
    }

    #[test]
    fn display_lists_every_item() {
        let text = mixed().to_string();
        for needle in [
            "chapters/a.md",
            "chapters/b.md (U2)",
            "chapters/c.md (U3)",
            "chapters/d.md (U4)",
            "chapters/e.md (U5): both sides modified",
            "chapters/gone.md (deleted from binder)",
            "Gone [U7] (deleted locally)",
        ] {
            assert!(text.contains(needle), "missing {needle:?} in:\n{text}");
        }
    }

    #[test]
    fn directional_subsets() {
        let plan = mixed();

        let pull = plan.pull_subset();
        assert!(pull.create_external.is_empty() && pull.update_external.is_empty());
        assert_eq!(pull.create_local.len(), 1);
        assert_eq!(pull.update_local.len(), 1);
        assert_eq!(pull.conflicts.len(), 1);
        assert_eq!(pull.orphans.len(), 1);
        assert_eq!(pull.orphans[0].location, OrphanLocation::Local);

        let push = plan.push_subset();
        assert!(push.create_local.is_empty() && push.update_local.is_empty());
        assert_eq!(push.create_external.len(), 1);
        assert_eq!(push.orphans[0].location, OrphanLocation::External);
    }

    #[test]
    fn serializes_with_snake_case_tags() {
        let json = serde_json::to_string(&mixed()).unwrap();
        assert!(json.contains(r#""reason":"both_changed""#));
        assert!(json.contains(r#""location":"local""#));
    }
}
