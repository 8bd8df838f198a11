//! The seam between the reconciler and wherever binder items actually live.

use crate::error::BinderError;
use crate::tree::{Binder, ItemId, ItemKind};

/// Read/write access to a writing-app project.
///
/// Mutations are buffered in memory; nothing is guaranteed to reach durable
/// storage until [`DocumentStore::persist`] returns `Ok`.
pub trait DocumentStore {
    fn binder(&self) -> &Binder;

    /// Create a leaf document and return its new id.
    fn create_document(
        &mut self,
        title: &str,
        content: &str,
        parent: Option<&ItemId>,
    ) -> Result<ItemId, BinderError>;

    fn create_folder(&mut self, title: &str, parent: Option<&ItemId>) -> Result<ItemId, BinderError>;

    fn update_content(&mut self, id: &ItemId, content: &str) -> Result<(), BinderError>;

    fn remove_document(&mut self, id: &ItemId) -> Result<(), BinderError>;

    fn find_folder(&self, title: &str) -> Option<ItemId> {
        let binder = self.binder();
        binder
            .find_folder(title)
            .and_then(|n| binder.get(n))
            .map(|n| n.id.clone())
    }

    /// Flush all buffered changes.
    fn persist(&mut self) -> Result<(), BinderError>;
}

/// In-memory store for tests. Can be told to fail `persist`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    binder: Binder,
    fail_persist: Option<String>,
    persist_calls: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `persist` fail with `reason`.
    pub fn fail_persist_with(&mut self, reason: impl Into<String>) {
        self.fail_persist = Some(reason.into());
    }

    /// Successful and failed `persist` calls alike.
    pub fn persist_calls(&self) -> usize {
        self.persist_calls
    }
}

impl DocumentStore for MemoryStore {
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
        Ok(id)
    }

    fn create_folder(&mut self, title: &str, parent: Option<&ItemId>) -> Result<ItemId, BinderError> {
        let id = ItemId::generate();
        self.binder.insert(parent, id.clone(), title, ItemKind::Folder, "")?;
        Ok(id)
    }

    fn update_content(&mut self, id: &ItemId, content: &str) -> Result<(), BinderError> {
        self.binder.set_content(id, content)
    }

    fn remove_document(&mut self, id: &ItemId) -> Result<(), BinderError> {
        self.binder.remove(id).map(|_| ())
    }

    fn persist(&mut self) -> Result<(), BinderError> {
        self.persist_calls += 1;
        match &self.fail_persist {
            Some(reason) => Err(BinderError::PersistFailed {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_find_through_trait() {
        let mut store = MemoryStore::new();
        let draft = store.create_folder("Draft", None).unwrap();
        let doc = store.create_document("Intro", "hello", Some(&draft)).unwrap();

        assert_eq!(store.find_folder("DRAFT"), Some(draft));
        assert_eq!(store.binder().item(&doc).unwrap().content, "hello");

        store.update_content(&doc, "bye").unwrap();
        assert_eq!(store.binder().item(&doc).unwrap().content, "bye");

        store.remove_document(&doc).unwrap();
        assert!(!store.binder().contains(&doc));
    }

    #[test]
    fn injected_persist_failure() {
        let mut store = MemoryStore::new();
        store.persist().unwrap();
        store.fail_persist_with("disk full");
        let err = store.persist().unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(store.persist_calls(), 2);
    }

    #[test]
    fn update_unknown_item_fails() {
        let mut store = MemoryStore::new();
        let err = store.update_content(&"MISSING".into(), "x").unwrap_err();
        assert!(matches!(err, BinderError::UnknownItem { .. }));
    }
}
