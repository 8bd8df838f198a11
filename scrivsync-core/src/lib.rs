//! scriv-sync core library: configuration types, YAML config store, errors.
//!
//! Public API surface:
//! - [`types`]: aliases, folder mappings, policies, project config
//! - [`error`]: [`ConfigError`]
//! - [`config`]: load / save / add / remove / validate

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::{
    ConflictPolicy, DeletionPolicy, FolderMapping, GlobalConfig, ProjectAlias, ProjectConfig,
    SyncOptions,
};
