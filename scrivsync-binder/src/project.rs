//! On-disk project store.
//!
//! Layout of a project directory (`<name>.scriv/`):
//!
//! ```text
//! binder.json                 tree of items: id, title, kind, children
//! Files/Data/<ID>/content.txt plain-text body of each document
//! ```
//!
//! All mutations stay in memory until [`DocumentStore::persist`]. Persisting
//! writes dirty content files first, then the manifest, each via `.tmp` +
//! rename, and only then deletes data directories of removed items. A crash
//! part-way leaves the previous manifest in place.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, BinderError};
use crate::store::DocumentStore;
use crate::tree::{Binder, ItemId, ItemKind, NodeId};

const MANIFEST_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "binder.json";
const CONTENT_FILE: &str = "content.txt";

// ---------------------------------------------------------------------------
// Manifest wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    #[serde(default)]
    items: Vec<ManifestItem>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestItem {
    id: ItemId,
    title: String,
    kind: ItemKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<ManifestItem>,
}

// ---------------------------------------------------------------------------
// ProjectStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ProjectStore {
    root: PathBuf,
    binder: Binder,
    dirty: BTreeSet<ItemId>,
    removed: BTreeSet<ItemId>,
    structure_changed: bool,
}

impl ProjectStore {
    /// Open an existing project and load every document body.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, BinderError> {
        let root = root.into();
        let manifest_path = root.join(MANIFEST_FILE);
        if !root.is_dir() || !manifest_path.is_file() {
            return Err(BinderError::ProjectNotFound { path: root });
        }

        let raw = std::fs::read_to_string(&manifest_path).map_err(|e| io_err(&manifest_path, e))?;
        let manifest: Manifest =
            serde_json::from_str(&raw).map_err(|source| BinderError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;

        let mut binder = Binder::new();
        for item in manifest.items {
            load_item(&root, &mut binder, None, item)?;
        }
        tracing::debug!("opened {} ({} items)", root.display(), binder.len());

        Ok(Self {
            root,
            binder,
            dirty: BTreeSet::new(),
            removed: BTreeSet::new(),
            structure_changed: false,
        })
    }

    /// Create an empty project at `root` and write its manifest.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, BinderError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        let mut store = Self {
            root,
            binder: Binder::new(),
            dirty: BTreeSet::new(),
            removed: BTreeSet::new(),
            structure_changed: true,
        };
        store.persist()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether there are buffered changes not yet persisted.
    pub fn has_pending_changes(&self) -> bool {
        self.structure_changed || !self.dirty.is_empty() || !self.removed.is_empty()
    }

    fn content_path(&self, id: &ItemId) -> PathBuf {
        data_dir(&self.root, id).join(CONTENT_FILE)
    }

    fn manifest(&self) -> Manifest {
        Manifest {
            version: MANIFEST_VERSION,
            items: self
                .binder
                .root_ids()
                .iter()
                .filter_map(|n| manifest_item(&self.binder, *n))
                .collect(),
        }
    }
}

fn data_dir(root: &Path, id: &ItemId) -> PathBuf {
    root.join("Files").join("Data").join(&id.0)
}

fn load_item(
    root: &Path,
    binder: &mut Binder,
    parent: Option<&ItemId>,
    item: ManifestItem,
) -> Result<(), BinderError> {
    let content = match item.kind {
        ItemKind::Folder => String::new(),
        ItemKind::Document => {
            let path = data_dir(root, &item.id).join(CONTENT_FILE);
            match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(io_err(&path, e)),
            }
        }
    };
    binder.insert(parent, item.id.clone(), item.title, item.kind, content)?;
    for child in item.children {
        load_item(root, binder, Some(&item.id), child)?;
    }
    Ok(())
}

fn manifest_item(binder: &Binder, node: NodeId) -> Option<ManifestItem> {
    let n = binder.get(node)?;
    Some(ManifestItem {
        id: n.id.clone(),
        title: n.title.clone(),
        kind: n.kind,
        children: n
            .children()
            .iter()
            .filter_map(|c| manifest_item(binder, *c))
            .collect(),
    })
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), BinderError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

impl DocumentStore for ProjectStore {
    fn binder(&self) -> &Binder {
        &self.binder
    }

    fn create_document(
        &mut self,
        title: &str,
        content: &str,
        parent: Option<&ItemId>,
    ) -> Result<ItemId, BinderError> {
        let id = ItemId::generate();
        self.binder
            .insert(parent, id.clone(), title, ItemKind::Document, content)?;
        self.dirty.insert(id.clone());
        self.structure_changed = true;
        Ok(id)
    }

    fn create_folder(&mut self, title: &str, parent: Option<&ItemId>) -> Result<ItemId, BinderError> {
        let id = ItemId::generate();
        self.binder.insert(parent, id.clone(), title, ItemKind::Folder, "")?;
        self.structure_changed = true;
        Ok(id)
    }

    fn update_content(&mut self, id: &ItemId, content: &str) -> Result<(), BinderError> {
        self.binder.set_content(id, content)?;
        self.dirty.insert(id.clone());
        Ok(())
    }

    fn remove_document(&mut self, id: &ItemId) -> Result<(), BinderError> {
        for gone in self.binder.remove(id)? {
            self.dirty.remove(&gone);
            self.removed.insert(gone);
        }
        self.structure_changed = true;
        Ok(())
    }

    fn persist(&mut self) -> Result<(), BinderError> {
        for id in &self.dirty {
            if let Some(node) = self.binder.item(id) {
                write_atomic(&self.content_path(id), node.content.as_bytes())?;
            }
        }

        if self.structure_changed {
            let manifest_path = self.root.join(MANIFEST_FILE);
            let json = serde_json::to_string_pretty(&self.manifest()).map_err(|source| {
                BinderError::Manifest {
                    path: manifest_path.clone(),
                    source,
                }
            })?;
            write_atomic(&manifest_path, json.as_bytes())?;
        }

        for id in &self.removed {
            let dir = data_dir(&self.root, id);
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&dir, e)),
            }
        }

        tracing::info!(
            "persisted {}: {} content file(s), {} removal(s)",
            self.root.display(),
            self.dirty.len(),
            self.removed.len()
        );
        self.dirty.clear();
        self.removed.clear();
        self.structure_changed = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
