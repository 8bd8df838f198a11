//! Error types for scrivsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use scrivsync_binder::BinderError;
use scrivsync_core::ConfigError;

/// All errors that can arise from detecting or applying a sync plan.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A binder operation failed; `target` names the title or id involved.
    #[error("binder error while {op} '{target}': {source}")]
    Binder {
        op: &'static str,
        target: String,
        #[source]
        source: BinderError,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A markdown file whose bytes are not UTF-8 text.
    #[error("{path} is not valid UTF-8 text; only UTF-8 markdown can be synced")]
    NotUtf8 { path: PathBuf },

    /// JSON serialization error (sync state).
    #[error("sync state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binder folder '{folder}' not found and create_missing_folders is off")]
    MappingTargetNotFound { folder: String },

    #[error("sync state at {path} is corrupt: {source}")]
    StateCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The interactive resolver could not read a decision.
    #[error("prompt failed: {0}")]
    Prompt(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Binder`].
pub(crate) fn binder_err(op: &'static str, target: impl ToString, source: BinderError) -> SyncError {
    SyncError::Binder {
        op,
        target: target.to_string(),
        source,
    }
}
