//! Global YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.scriv-sync/
//!   config.yaml          (all project aliases, mode 0600)
//!   state/
//!     <alias>.json       (per-project sync state, owned by scrivsync-sync)
//! ```
//!
//! # API pattern
//!
//! Every function touching the filesystem has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::{FolderMapping, GlobalConfig, ProjectAlias, ProjectConfig};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.scriv-sync/`. Pure, no I/O.
pub fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".scriv-sync")
}

/// `<home>/.scriv-sync/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("config.yaml")
}

/// `<home>/.scriv-sync/state/<alias>.json`. Pure, no I/O.
pub fn state_path_at(home: &Path, alias: &ProjectAlias) -> PathBuf {
    config_dir_at(home)
        .join("state")
        .join(format!("{}.json", alias.0))
}

/// Resolve the user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.scriv-sync/config.yaml`.
///
/// Returns an empty [`GlobalConfig`] if the file does not yet exist,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<GlobalConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(GlobalConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<GlobalConfig, ConfigError> {
    load_at(&home()?)
}

/// Look up one project and validate it.
pub fn project_at(home: &Path, alias: &ProjectAlias) -> Result<ProjectConfig, ConfigError> {
    let config = load_at(home)?;
    let project = config
        .projects
        .get(alias)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownProject {
            alias: alias.clone(),
        })?;
    validate(alias, &project)?;
    Ok(project)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `<home>/.scriv-sync/config.yaml`.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// Also ensures the `state/` directory exists next to it.
pub fn save_at(home: &Path, config: &GlobalConfig) -> Result<(), ConfigError> {
    let dir = config_dir_at(home);
    let state_dir = dir.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| io_err(&state_dir, e))?;

    let path = config_path_at(home);
    let tmp_path = dir.join("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &GlobalConfig) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// 4. Mutations
// ---------------------------------------------------------------------------

/// Register `project` under `alias`. Fails if the alias is taken.
pub fn add_project_at(
    home: &Path,
    alias: ProjectAlias,
    project: ProjectConfig,
) -> Result<(), ConfigError> {
    let mut config = load_at(home)?;
    if config.projects.contains_key(&alias) {
        return Err(ConfigError::DuplicateProject { alias });
    }
    validate(&alias, &project)?;
    config.projects.insert(alias, project);
    save_at(home, &config)
}

/// Remove `alias` from the config. The project's state file is left alone.
pub fn remove_project_at(home: &Path, alias: &ProjectAlias) -> Result<ProjectConfig, ConfigError> {
    let mut config = load_at(home)?;
    let removed = config
        .projects
        .remove(alias)
        .ok_or_else(|| ConfigError::UnknownProject {
            alias: alias.clone(),
        })?;
    save_at(home, &config)?;
    Ok(removed)
}

/// `remove_project_at` convenience wrapper.
pub fn remove_project(alias: &ProjectAlias) -> Result<ProjectConfig, ConfigError> {
    remove_project_at(&home()?, alias)
}

// ---------------------------------------------------------------------------
// 5. Validation
// ---------------------------------------------------------------------------

/// Check a project entry for problems that would make a sync run unsafe.
///
/// All problems are collected into one [`ConfigError::Invalid`].
pub fn validate(alias: &ProjectAlias, project: &ProjectConfig) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    if project.local_path.as_os_str().is_empty() {
        problems.push("local_path is required".to_string());
    } else if !project.local_path.is_absolute() {
        problems.push(format!(
            "local_path must be absolute: {}",
            project.local_path.display()
        ));
    }
    if project.scriv_path.as_os_str().is_empty() {
        problems.push("scriv_path is required".to_string());
    }

    let mut seen_dirs = HashSet::new();
    for mapping in &project.folder_mappings {
        if mapping.scrivener_folder.trim().is_empty() {
            problems.push(format!(
                "mapping for '{}' has an empty scrivener_folder",
                mapping.markdown_dir.display()
            ));
        }
        if mapping.markdown_dir.is_absolute() {
            problems.push(format!(
                "markdown_dir must be relative to local_path: {}",
                mapping.markdown_dir.display()
            ));
        }
        if mapping.sync_enabled && !seen_dirs.insert(mapping.markdown_dir.clone()) {
            problems.push(format!(
                "markdown_dir '{}' is mapped more than once",
                mapping.markdown_dir.display()
            ));
        }
    }

    let enabled: Vec<&FolderMapping> = project.enabled_mappings().collect();
    for (i, outer) in enabled.iter().enumerate() {
        for inner in &enabled[i + 1..] {
            let (a, b) = (&outer.markdown_dir, &inner.markdown_dir);
            if a != b && (a.starts_with(b) || b.starts_with(a)) {
                problems.push(format!(
                    "markdown_dir '{}' overlaps '{}'; enabled mappings must not nest",
                    a.display(),
                    b.display()
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            alias: alias.clone(),
            problems,
        })
    }
}

// ---------------------------------------------------------------------------
// 6. Permission helpers (Unix only; no-op on other platforms)
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(local: &Path) -> ProjectConfig {
        let mut p = ProjectConfig::new(local.to_path_buf(), PathBuf::from("Novel.scriv"));
        p.add_mapping("chapters", "Draft", true);
        p
    }

    #[test]
    fn missing_config_loads_empty() {
        let home = TempDir::new().unwrap();
        let config = load_at(home.path()).unwrap();
        assert!(config.projects.is_empty());
        assert_eq!(config.version, crate::types::CONFIG_VERSION);
    }

    #[test]
    fn save_creates_state_dir() {
        let home = TempDir::new().unwrap();
        save_at(home.path(), &GlobalConfig::default()).unwrap();
        assert!(config_dir_at(home.path()).join("state").is_dir());
        assert!(config_path_at(home.path()).is_file());
    }

    #[test]
    fn add_then_lookup_project() {
        let home = TempDir::new().unwrap();
        let alias = ProjectAlias::from("novel");
        add_project_at(home.path(), alias.clone(), sample(home.path())).unwrap();

        let project = project_at(home.path(), &alias).unwrap();
        assert_eq!(project.folder_mappings.len(), 1);
    }

    #[test]
    fn duplicate_alias_rejected() {
        let home = TempDir::new().unwrap();
        let alias = ProjectAlias::from("novel");
        add_project_at(home.path(), alias.clone(), sample(home.path())).unwrap();
        let err = add_project_at(home.path(), alias, sample(home.path())).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProject { .. }), "got: {err}");
    }

    #[test]
    fn remove_unknown_alias_is_error() {
        let home = TempDir::new().unwrap();
        let err = remove_project_at(home.path(), &ProjectAlias::from("ghost")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProject { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut p = ProjectConfig::new(PathBuf::from("relative/root"), PathBuf::new());
        p.add_mapping("chapters", "Draft", true);
        p.add_mapping("chapters", " ", true);

        let err = validate(&ProjectAlias::from("bad"), &p).unwrap_err();
        let ConfigError::Invalid { problems, .. } = &err else {
            panic!("expected Invalid, got {err}");
        };
        assert_eq!(problems.len(), 4, "problems: {problems:?}");
    }

    #[test]
    fn duplicate_dir_allowed_when_one_is_disabled() {
        let home = TempDir::new().unwrap();
        let mut p = sample(home.path());
        p.add_mapping("chapters", "Old Draft", false);
        assert!(validate(&ProjectAlias::from("ok"), &p).is_ok());
    }
}
