//! Error types for scrivsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ProjectAlias;

/// All errors that can arise from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.scriv-sync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("project '{alias}' not found; run `scriv-sync list` to see configured projects")]
    UnknownProject { alias: ProjectAlias },

    #[error("project '{alias}' already exists; choose a different alias or remove the existing one")]
    DuplicateProject { alias: ProjectAlias },

    /// One or more semantic problems in a project entry.
    #[error("invalid config for project '{alias}': {}", problems.join("; "))]
    Invalid {
        alias: ProjectAlias,
        problems: Vec<String>,
    },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
