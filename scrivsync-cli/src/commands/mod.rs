pub mod diff;
pub mod init;
pub mod project;
pub mod prompt;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

use scrivsync_core::types::ProjectAlias;

pub(crate) fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn alias(name: &str) -> ProjectAlias {
    ProjectAlias::from(name.to_string())
}
