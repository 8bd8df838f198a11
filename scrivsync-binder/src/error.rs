//! Error types for scrivsync-binder.

use std::path::PathBuf;

use thiserror::Error;

use crate::tree::ItemId;

/// All errors that can arise from reading or writing a binder.
#[derive(Debug, Error)]
pub enum BinderError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The binder manifest could not be parsed or serialized.
    #[error("failed to parse binder manifest at {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("binder project not found at {path}")]
    ProjectNotFound { path: PathBuf },

    #[error("no binder item with id {id}")]
    UnknownItem { id: ItemId },

    #[error("parent {id} not found")]
    InvalidParent { id: ItemId },

    #[error("binder item {id} appears more than once")]
    DuplicateItem { id: ItemId },

    /// Injected by [`crate::MemoryStore`] to exercise persistence failures.
    #[error("persist failed: {reason}")]
    PersistFailed { reason: String },
}

/// Convenience constructor for [`BinderError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BinderError {
    BinderError::Io {
        path: path.into(),
        source,
    }
}
