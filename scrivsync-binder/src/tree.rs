//! Arena-backed binder tree.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]; parent
//! links are plain indices, so the tree has no ownership cycles. Removed nodes
//! leave an empty slot behind so outstanding `NodeId`s never alias a different
//! node. A side table maps each stable [`ItemId`] to its slot.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BinderError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable identifier of a binder item, as stored in the project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Fresh upper-case UUID v4, the format the writing application uses.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string().to_uppercase())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Index of a node inside one [`Binder`] arena. Not stable across loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    Document,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: ItemId,
    pub title: String,
    pub kind: ItemKind,
    /// Plain-text body. Always empty for folders.
    pub content: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Case-folded, trimmed title: the only key used to pair items across sides.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Binder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Binder {
    slots: Vec<Option<Node>>,
    roots: Vec<NodeId>,
    by_id: HashMap<ItemId, NodeId>,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new item under `parent` (or at the root).
    pub fn insert(
        &mut self,
        parent: Option<&ItemId>,
        id: ItemId,
        title: impl Into<String>,
        kind: ItemKind,
        content: impl Into<String>,
    ) -> Result<NodeId, BinderError> {
        if self.by_id.contains_key(&id) {
            return Err(BinderError::DuplicateItem { id });
        }
        let parent_node = match parent {
            Some(pid) => Some(
                self.lookup(pid)
                    .ok_or_else(|| BinderError::InvalidParent { id: pid.clone() })?,
            ),
            None => None,
        };

        let node_id = NodeId(self.slots.len());
        let content = match kind {
            ItemKind::Folder => String::new(),
            ItemKind::Document => content.into(),
        };
        self.slots.push(Some(Node {
            id: id.clone(),
            title: title.into(),
            kind,
            content,
            parent: parent_node,
            children: Vec::new(),
        }));
        self.by_id.insert(id, node_id);

        match parent_node.and_then(|p| self.slot_mut(p)) {
            Some(parent) => parent.children.push(node_id),
            None => self.roots.push(node_id),
        }
        Ok(node_id)
    }

    pub fn get(&self, node: NodeId) -> Option<&Node> {
        self.slots.get(node.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(node.0).and_then(Option::as_mut)
    }

    pub fn lookup(&self, id: &ItemId) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub fn item(&self, id: &ItemId) -> Option<&Node> {
        self.lookup(id).and_then(|n| self.get(n))
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.roots.iter().filter_map(|n| self.get(*n))
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = &Node> {
        self.get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|c| self.get(*c))
    }

    /// Every node below `node`, pre-order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let start = self
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        self.preorder(start)
    }

    /// Every node in the binder, pre-order.
    pub fn walk(&self) -> Vec<NodeId> {
        self.preorder(self.roots.clone())
    }

    fn preorder(&self, start: Vec<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = start.into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// First folder (pre-order) whose title matches case-insensitively.
    pub fn find_folder(&self, title: &str) -> Option<NodeId> {
        let wanted = normalize_title(title);
        self.walk().into_iter().find(|n| {
            self.get(*n)
                .is_some_and(|node| node.is_folder() && normalize_title(&node.title) == wanted)
        })
    }

    pub fn top_level_folders(&self) -> impl Iterator<Item = &Node> {
        self.roots().filter(|n| n.is_folder())
    }

    /// All leaf documents, pre-order.
    pub fn documents(&self) -> impl Iterator<Item = &Node> + '_ {
        self.walk()
            .into_iter()
            .filter_map(|n| self.get(n))
            .filter(|n| !n.is_folder())
    }

    /// Title index over the documents in `folder`'s subtree.
    ///
    /// When two documents share a normalized title the later one in pre-order
    /// wins.
    pub fn title_index(&self, folder: NodeId) -> TitleIndex {
        let mut entries = BTreeMap::new();
        for node_id in self.descendants(folder) {
            if let Some(node) = self.get(node_id) {
                if !node.is_folder() {
                    entries.insert(normalize_title(&node.title), node_id);
                }
            }
        }
        TitleIndex { entries }
    }

    pub fn set_content(&mut self, id: &ItemId, content: impl Into<String>) -> Result<(), BinderError> {
        let node_id = self
            .lookup(id)
            .ok_or_else(|| BinderError::UnknownItem { id: id.clone() })?;
        match self.slot_mut(node_id) {
            Some(node) if !node.is_folder() => {
                node.content = content.into();
                Ok(())
            }
            _ => Err(BinderError::UnknownItem { id: id.clone() }),
        }
    }

    /// Detach `id` and its whole subtree. Returns the removed ids, pre-order.
    pub fn remove(&mut self, id: &ItemId) -> Result<Vec<ItemId>, BinderError> {
        let node_id = self
            .lookup(id)
            .ok_or_else(|| BinderError::UnknownItem { id: id.clone() })?;

        let parent = self.get(node_id).and_then(|n| n.parent);
        match parent.and_then(|p| self.slot_mut(p)) {
            Some(p) => p.children.retain(|c| *c != node_id),
            None => self.roots.retain(|r| *r != node_id),
        }

        let mut doomed = vec![node_id];
        doomed.extend(self.descendants(node_id));
        let mut removed = Vec::with_capacity(doomed.len());
        for n in doomed {
            if let Some(node) = self.slots.get_mut(n.0).and_then(Option::take) {
                self.by_id.remove(&node.id);
                removed.push(node.id);
            }
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// TitleIndex
// ---------------------------------------------------------------------------

/// Normalized title → document, built once per folder mapping.
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    entries: BTreeMap<String, NodeId>,
}

impl TitleIndex {
    pub fn get(&self, title: &str) -> Option<NodeId> {
        self.entries.get(&normalize_title(title)).copied()
    }

    /// Remove and return the entry for `title`.
    pub fn take(&mut self, title: &str) -> Option<NodeId> {
        self.entries.remove(&normalize_title(title))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries not taken yet, ordered by normalized title.
    pub fn into_remaining(self) -> Vec<NodeId> {
        self.entries.into_values().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
