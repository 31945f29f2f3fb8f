//! Descriptor discovery: find descriptor files and group them into families.
//!
//! The file stem names the capability. Everything up to the first `_` is the
//! family prefix, and stems containing `_VERSION_` are core descriptors.
//! Families come out in prefix order; within a family core descriptors
//! precede extensions and each group is in natural stem order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::core::capability::Capability;
use crate::core::descriptor::load_capability;
use crate::core::family::{classify_stem, natural_cmp, DescriptorKind, Family};
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::fs::glob_files;

/// Errors locating descriptor files.
#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("descriptor directory `{}` does not exist", path.display())]
    MissingDirectory { path: PathBuf },

    #[error("no descriptors found in `{}`", path.display())]
    NoDescriptors { path: PathBuf },

    #[error("descriptor file name `{}` is not valid UTF-8", path.display())]
    BadFileName { path: PathBuf },
}

impl DiscoverError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            DiscoverError::MissingDirectory { path } => Diagnostic::error(self.to_string())
                .with_location(path)
                .with_suggestion(suggestions::CHECK_CONFIG),

            DiscoverError::NoDescriptors { path } => Diagnostic::error(self.to_string())
                .with_location(path)
                .with_suggestion(suggestions::NO_DESCRIPTORS)
                .with_suggestion(suggestions::CHECK_CONFIG),

            DiscoverError::BadFileName { path } => Diagnostic::error(self.to_string())
                .with_location(path)
                .with_suggestion("Rename the file using ASCII characters only"),
        }
    }
}

/// One descriptor file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSource {
    pub path: PathBuf,
    pub stem: String,
    pub kind: DescriptorKind,
}

/// Descriptor files of one family, already in generation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilySources {
    pub prefix: String,
    pub core: Vec<DescriptorSource>,
    pub extensions: Vec<DescriptorSource>,
}

impl FamilySources {
    fn new(prefix: &str) -> Self {
        FamilySources {
            prefix: prefix.to_string(),
            core: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// All descriptor files, core first.
    pub fn iter(&self) -> impl Iterator<Item = &DescriptorSource> {
        self.core.iter().chain(&self.extensions)
    }

    pub fn len(&self) -> usize {
        self.core.len() + self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Find `*.toml` descriptors in `dir` and group them by family.
pub fn discover(dir: &Path) -> Result<Vec<FamilySources>> {
    if !dir.is_dir() {
        return Err(DiscoverError::MissingDirectory {
            path: dir.to_path_buf(),
        }
        .into());
    }

    let files = glob_files(dir, "*.toml")?;
    if files.is_empty() {
        return Err(DiscoverError::NoDescriptors {
            path: dir.to_path_buf(),
        }
        .into());
    }

    let mut families: BTreeMap<String, FamilySources> = BTreeMap::new();
    for path in files {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DiscoverError::BadFileName { path: path.clone() })?
            .to_string();
        let (prefix, kind) = classify_stem(&stem);
        tracing::debug!("found {} descriptor {} in family {}", kind, stem, prefix);

        let family = families
            .entry(prefix.to_string())
            .or_insert_with(|| FamilySources::new(prefix));
        let source = DescriptorSource {
            stem: stem.clone(),
            path,
            kind,
        };
        match kind {
            DescriptorKind::Core => family.core.push(source),
            DescriptorKind::Extension => family.extensions.push(source),
        }
    }

    let mut families: Vec<FamilySources> = families.into_values().collect();
    for family in &mut families {
        family.core.sort_by(|a, b| natural_cmp(&a.stem, &b.stem));
        family.extensions.sort_by(|a, b| natural_cmp(&a.stem, &b.stem));
    }

    tracing::info!(
        "discovered {} families in {}",
        families.len(),
        dir.display()
    );

    Ok(families)
}

/// A parsed family plus the advisories found while loading it.
#[derive(Debug, Clone)]
pub struct LoadedFamily {
    pub family: Family,
    /// Extension descriptors without a registry number.
    pub unregistered: Vec<PathBuf>,
}

/// Parse every descriptor of a family.
pub fn load_family(sources: &FamilySources) -> Result<LoadedFamily> {
    let mut core = Vec::with_capacity(sources.core.len());
    let mut extensions = Vec::with_capacity(sources.extensions.len());
    let mut unregistered = Vec::new();

    for source in sources.iter() {
        let capability: Capability = load_capability(&source.path)?;
        match source.kind {
            DescriptorKind::Core => core.push(capability),
            DescriptorKind::Extension => {
                if capability.registry_number.is_none() {
                    unregistered.push(source.path.clone());
                }
                extensions.push(capability);
            }
        }
    }

    let family = Family::from_parts(sources.prefix.as_str(), core, extensions)
        .with_context(|| format!("failed to assemble family `{}`", sources.prefix))?;

    Ok(LoadedFamily {
        family,
        unregistered,
    })
}
