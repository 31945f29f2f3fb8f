//! Configuration file support for extloader.
//!
//! Two configuration file locations are read:
//! - Global: `~/.extloader/config.toml` - User-wide defaults
//! - Project: `<root>/.extloader/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config; command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::EmitOptions;
use crate::core::errors::DescriptorError;

/// extloader configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation settings
    pub generate: GenerateConfig,
}

/// Where descriptors are read from and artifacts written to.
///
/// Relative paths are resolved against the project root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Descriptor directory (default `descriptors`)
    pub descriptor_dir: Option<PathBuf>,

    /// Header output directory (default `include/glloader`)
    pub header_dir: Option<PathBuf>,

    /// Implementation output directory (default `src`)
    pub source_dir: Option<PathBuf>,

    /// Prefix of artifact names and emitted identifiers (default `glloader`)
    pub artifact_stem: Option<String>,

    /// Leading comment for every artifact
    pub banner: Option<String>,

    /// Families generated in parallel (None = one per core)
    pub jobs: Option<usize>,
}

impl GenerateConfig {
    pub fn descriptor_dir(&self) -> &Path {
        self.descriptor_dir
            .as_deref()
            .unwrap_or(Path::new("descriptors"))
    }

    pub fn header_dir(&self) -> &Path {
        self.header_dir
            .as_deref()
            .unwrap_or(Path::new("include/glloader"))
    }

    pub fn source_dir(&self) -> &Path {
        self.source_dir.as_deref().unwrap_or(Path::new("src"))
    }

    pub fn artifact_stem(&self) -> &str {
        self.artifact_stem.as_deref().unwrap_or("glloader")
    }

    /// Emission options described by this section.
    pub fn emit_options(&self) -> Result<EmitOptions, DescriptorError> {
        Ok(EmitOptions::new(self.artifact_stem())?.with_banner(self.banner.clone()))
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let ours = &mut self.generate;
        let theirs = other.generate;

        if theirs.descriptor_dir.is_some() {
            ours.descriptor_dir = theirs.descriptor_dir;
        }
        if theirs.header_dir.is_some() {
            ours.header_dir = theirs.header_dir;
        }
        if theirs.source_dir.is_some() {
            ours.source_dir = theirs.source_dir;
        }
        if theirs.artifact_stem.is_some() {
            ours.artifact_stem = theirs.artifact_stem;
        }
        if theirs.banner.is_some() {
            ours.banner = theirs.banner;
        }
        if theirs.jobs.is_some() {
            ours.jobs = theirs.jobs;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.extloader/config.toml)
/// 2. Global config (~/.extloader/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global config directory (~/.extloader).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".extloader"))
}

/// Get the global config path (~/.extloader/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<root>/.extloader/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".extloader").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.generate.descriptor_dir(), Path::new("descriptors"));
        assert_eq!(config.generate.header_dir(), Path::new("include/glloader"));
        assert_eq!(config.generate.source_dir(), Path::new("src"));
        assert_eq!(config.generate.artifact_stem(), "glloader");
        assert!(config.generate.jobs.is_none());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[generate]
descriptor_dir = "xml"
artifact_stem = "myloader"
banner = "Generated."
jobs = 2
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.generate.descriptor_dir(), Path::new("xml"));
        assert_eq!(config.generate.artifact_stem(), "myloader");
        assert_eq!(config.generate.jobs, Some(2));

        let options = config.generate.emit_options().unwrap();
        assert_eq!(options.stem, "myloader");
        assert_eq!(options.banner.as_deref(), Some("Generated."));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.generate.header_dir = Some(PathBuf::from("inc"));
        base.generate.jobs = Some(4);

        let mut override_cfg = Config::default();
        override_cfg.generate.header_dir = Some(PathBuf::from("include"));

        base.merge(override_cfg);

        assert_eq!(base.generate.header_dir(), Path::new("include"));
        assert_eq!(base.generate.jobs, Some(4)); // Not overridden
    }

    #[test]
    fn test_invalid_stem_is_rejected() {
        let mut config = Config::default();
        config.generate.artifact_stem = Some("not a stem".to_string());
        assert!(config.generate.emit_options().is_err());
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[generate]\nsource_dir = \"gen\"\nartifact_stem = \"globalloader\"\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[generate]\nartifact_stem = \"projloader\"\n").unwrap();

        let config = load_config(Some(&global_path), &project_path);

        assert_eq!(config.generate.artifact_stem(), "projloader");
        assert_eq!(config.generate.source_dir(), Path::new("gen"));
    }

    #[test]
    fn test_broken_config_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[generate\n").unwrap();

        let config = Config::load_or_default(&path);
        assert_eq!(config.generate.artifact_stem(), "glloader");
    }
}
