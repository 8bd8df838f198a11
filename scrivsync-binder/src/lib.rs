//! scrivsync-binder: the writing-app side of a sync: an arena tree of
//! folders and documents, the [`DocumentStore`] seam, and the on-disk
//! project store.

pub mod error;
pub mod project;
pub mod store;
pub mod tree;

pub use error::BinderError;
pub use project::ProjectStore;
pub use store::{DocumentStore, MemoryStore};
pub use tree::{normalize_title, Binder, ItemId, ItemKind, Node, NodeId, TitleIndex};
