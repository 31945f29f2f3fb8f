//! Command implementations

pub mod completions;
pub mod explain;
pub mod generate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use extloader::util::config::{global_config_path, load_config, project_config_path, Config};

/// Resolve the project root: the given path or the current directory.
pub fn project_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("failed to determine current directory"),
    }
}

/// Global config merged with the project's `.extloader/config.toml`.
pub fn config_for(root: &Path) -> Config {
    load_config(global_config_path().as_deref(), &project_config_path(root))
}
