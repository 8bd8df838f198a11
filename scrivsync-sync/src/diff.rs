//! Unified diffs of a plan, for `scriv-sync diff`.
//!
//! `a/` is always the content about to be replaced and `b/` the incoming
//! content. Creates diff against empty content. Nothing is read from either
//! store: plans carry both sides.

use std::path::PathBuf;

use similar::TextDiff;

use crate::fingerprint::normalize_line_endings;
use crate::plan::{FileChange, Plan};

/// Target side of a diffed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTarget {
    Local,
    External,
}

/// A single unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub target: DiffTarget,
    pub label: &'static str,
    pub unified_diff: String,
}

/// Diffs for every create, update and conflict in `plan`.
///
/// Conflicts are shown as local → binder. Identical contents produce no
/// entry.
pub fn diff_plan(plan: &Plan) -> Vec<FileDiff> {
    let mut diffs = Vec::new();
    let groups: [(&[FileChange], DiffTarget, &'static str); 4] = [
        (plan.create_external.as_slice(), DiffTarget::External, "create in binder"),
        (plan.create_local.as_slice(), DiffTarget::Local, "create locally"),
        (plan.update_external.as_slice(), DiffTarget::External, "update in binder"),
        (plan.update_local.as_slice(), DiffTarget::Local, "update locally"),
    ];
    for (changes, target, label) in groups {
        for change in changes {
            let old = change.replaced.as_deref().unwrap_or("");
            push_diff(&mut diffs, change.local_path.clone(), target, label, old, &change.content);
        }
    }
    for conflict in &plan.conflicts {
        push_diff(
            &mut diffs,
            conflict.local_path.clone(),
            DiffTarget::External,
            "conflict",
            &conflict.external_content,
            &conflict.local_content,
        );
    }
    diffs
}

fn push_diff(
    diffs: &mut Vec<FileDiff>,
    path: PathBuf,
    target: DiffTarget,
    label: &'static str,
    old: &str,
    new: &str,
) {
    let old = normalize_line_endings(old);
    let new = normalize_line_endings(new);
    if old == new {
        return;
    }
    let old_header = format!("a/{}", path.display());
    let new_header = format!("b/{}", path.display());
    let unified = TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();
    diffs.push(FileDiff {
        path,
        target,
        label,
        unified_diff: unified,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Conflict, ConflictReason};
    use scrivsync_binder::ItemId;

    fn update(old: &str, new: &str) -> FileChange {
        FileChange {
            local_path: PathBuf::from("chapters/one.md"),
            external_id: Some(ItemId::from("U1")),
            title: "One".into(),
            content: new.into(),
            folder: None,
            replaced: Some(old.into()),
        }
    }

    #[test]
    fn update_produces_unified_diff() {
        let mut plan = Plan::new();
        plan.add_update_external(update("alpha\nbeta\n", "alpha\ngamma\n"));

        let diffs = diff_plan(&plan);
        assert_eq!(diffs.len(), 1);
        let d = &diffs[0].unified_diff;
        assert!(d.contains("--- a/chapters/one.md"));
        assert!(d.contains("+++ b/chapters/one.md"));
        assert!(d.contains("-beta"));
        assert!(d.contains("+gamma"));
        assert_eq!(diffs[0].target, DiffTarget::External);
    }

    #[test]
    fn create_diffs_against_empty() {
        let mut plan = Plan::new();
        let mut change = update("", "new text\n");
        change.replaced = None;
        plan.add_create_local(change);

        let diffs = diff_plan(&plan);
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].unified_diff.contains("+new text"));
    }

    #[test]
    fn line_ending_only_difference_is_hidden() {
        let mut plan = Plan::new();
        plan.add_update_local(update("a\r\nb\r\n", "a\nb\n"));
        assert!(diff_plan(&plan).is_empty());
    }

    #[test]
    fn conflict_diffs_binder_against_local() {
        let mut plan = Plan::new();
        plan.add_conflict(Conflict {
            local_path: PathBuf::from("chapters/c.md"),
            external_id: ItemId::from("U"),
            title: "C".into(),
            local_content: "mine\n".into(),
            external_content: "theirs\n".into(),
            reason: ConflictReason::BothChanged,
        });
        let diffs = diff_plan(&plan);
        assert_eq!(diffs[0].label, "conflict");
        assert!(diffs[0].unified_diff.contains("-theirs"));
        assert!(diffs[0].unified_diff.contains("+mine"));
    }
}
