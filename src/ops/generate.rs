//! Implementation of `extloader generate`.
//!
//! Discovers the descriptor families, renders each family's header and
//! implementation unit, and writes an artifact only when its content changed.
//! Families are independent and are generated in parallel; reporting happens
//! afterwards in prefix order so output is stable.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::builder::{generate_artifacts, EmitOptions};
use crate::ops::discover::{discover, load_family, FamilySources};
use crate::util::config::GenerateConfig;
use crate::util::diagnostic::suggestions;
use crate::util::fs::{read_existing, relative_path, write_if_changed, WriteOutcome};
use crate::util::hash::short_fingerprint;
use crate::util::shell::{Shell, Status};

/// Options for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Project root; configured directories are relative to it.
    pub root: PathBuf,

    /// Merged `[generate]` configuration.
    pub config: GenerateConfig,

    /// Report what would change without writing.
    pub dry_run: bool,
}

impl GenerateOptions {
    pub fn descriptor_dir(&self) -> PathBuf {
        self.root.join(self.config.descriptor_dir())
    }

    pub fn header_dir(&self) -> PathBuf {
        self.root.join(self.config.header_dir())
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(self.config.source_dir())
    }
}

/// What happened to one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeStatus {
    Updated,
    Unchanged,
    /// Dry run: the artifact would be written.
    WouldUpdate,
}

/// One written (or skipped) artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    /// Path relative to the project root.
    pub path: PathBuf,
    pub status: ChangeStatus,
    pub fingerprint: String,
}

/// Per-family outcome of a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub prefix: String,
    pub capabilities: usize,
    pub artifacts: Vec<ArtifactReport>,
    /// Extension descriptors without a registry number, relative to the root.
    pub unregistered: Vec<PathBuf>,
}

impl GenerationReport {
    pub fn changed(&self) -> bool {
        self.artifacts
            .iter()
            .any(|a| a.status != ChangeStatus::Unchanged)
    }
}

/// Run the batch driver over every family under the descriptor directory.
pub fn generate(opts: &GenerateOptions, shell: &Arc<Shell>) -> Result<Vec<GenerationReport>> {
    let emit = opts.config.emit_options()?;
    let descriptor_dir = opts.descriptor_dir();
    let families = discover(&descriptor_dir)?;

    let span = shell.span(
        Status::Generating,
        format!("{} families from {}", families.len(), descriptor_dir.display()),
    );
    let progress = Mutex::new(shell.progress(families.len() as u64, "Generating"));

    let run = || -> Result<Vec<GenerationReport>> {
        families
            .par_iter()
            .map(|sources| {
                let report = generate_family(sources, opts, &emit);
                if let Ok(mut progress) = progress.lock() {
                    progress.inc(1);
                }
                report
            })
            .collect()
    };

    let reports = match opts.config.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to start generation thread pool")?
            .install(run),
        None => run(),
    };

    if let Ok(progress) = progress.lock() {
        progress.finish();
    }
    let reports = reports?;

    for report in &reports {
        print_report(shell, report);
    }

    let changed = reports.iter().filter(|r| r.changed()).count();
    span.finish_with_message(format!(
        "{} families, {} changed",
        reports.len(),
        changed
    ));

    Ok(reports)
}

/// Load, render and persist one family.
fn generate_family(
    sources: &FamilySources,
    opts: &GenerateOptions,
    emit: &EmitOptions,
) -> Result<GenerationReport> {
    tracing::info!("generating family {} ({} descriptors)", sources.prefix, sources.len());

    let loaded = load_family(sources)?;
    let artifacts = generate_artifacts(&loaded.family, emit)
        .with_context(|| format!("failed to render family `{}`", sources.prefix))?;

    let header_path = opts.header_dir().join(&artifacts.header_name);
    let source_path = opts.source_dir().join(&artifacts.source_name);

    Ok(GenerationReport {
        prefix: sources.prefix.clone(),
        capabilities: loaded.family.len(),
        artifacts: vec![
            persist(&opts.root, &header_path, &artifacts.header, opts.dry_run)?,
            persist(&opts.root, &source_path, &artifacts.source, opts.dry_run)?,
        ],
        unregistered: loaded
            .unregistered
            .iter()
            .map(|p| relative_path(&opts.root, p))
            .collect(),
    })
}

fn persist(root: &Path, path: &Path, contents: &str, dry_run: bool) -> Result<ArtifactReport> {
    let status = if dry_run {
        match read_existing(path)? {
            Some(current) if current == contents => ChangeStatus::Unchanged,
            _ => ChangeStatus::WouldUpdate,
        }
    } else {
        match write_if_changed(path, contents)? {
            WriteOutcome::Written => ChangeStatus::Updated,
            WriteOutcome::Unchanged => ChangeStatus::Unchanged,
        }
    };

    Ok(ArtifactReport {
        path: relative_path(root, path),
        status,
        fingerprint: short_fingerprint(contents),
    })
}

fn print_report(shell: &Shell, report: &GenerationReport) {
    for path in &report.unregistered {
        shell.warn(format!(
            "{} has no registry number ({})",
            path.display(),
            suggestions::ADD_REG_NO.trim_start_matches("help: ")
        ));
    }

    if shell.is_json() {
        let event = serde_json::json!({
            "reason": "family-generated",
            "report": report,
        });
        shell.json_event(&event);
        return;
    }

    for artifact in &report.artifacts {
        match artifact.status {
            ChangeStatus::Updated => shell.status(
                Status::Updated,
                format!("{} ({})", artifact.path.display(), artifact.fingerprint),
            ),
            ChangeStatus::Unchanged => shell.status(
                Status::Skipped,
                format!("{} (no change)", artifact.path.display()),
            ),
            ChangeStatus::WouldUpdate => shell.status(
                Status::Info,
                format!("would update {}", artifact.path.display()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::{self, DescriptorTree};
    use crate::util::shell::{ColorChoice, Shell};
    use tempfile::TempDir;

    fn quiet() -> Arc<Shell> {
        Arc::new(Shell::from_flags(true, false, ColorChoice::Never, false))
    }

    fn options(root: &Path) -> GenerateOptions {
        GenerateOptions {
            root: root.to_path_buf(),
            ..GenerateOptions::default()
        }
    }

    #[test]
    fn test_generate_writes_both_artifacts() {
        let tmp = TempDir::new().unwrap();
        DescriptorTree::multitexture().write_to(tmp.path()).unwrap();

        let reports = generate(&options(tmp.path()), &quiet()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].prefix, "GL");
        assert_eq!(reports[0].capabilities, 2);

        let paths: Vec<_> = reports[0].artifacts.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("include/glloader/glloader_gl.h"),
                PathBuf::from("src/glloader_gl.c")
            ]
        );
        assert!(tmp.path().join("include/glloader/glloader_gl.h").exists());
        assert!(tmp.path().join("src/glloader_gl.c").exists());
    }

    #[test]
    fn test_second_run_reports_no_change() {
        let tmp = TempDir::new().unwrap();
        DescriptorTree::multitexture().write_to(tmp.path()).unwrap();
        let opts = options(tmp.path());

        let first = generate(&opts, &quiet()).unwrap();
        let source = std::fs::read(tmp.path().join("src/glloader_gl.c")).unwrap();
        let second = generate(&opts, &quiet()).unwrap();

        assert!(first[0].changed());
        assert!(!second[0].changed());
        assert_eq!(
            std::fs::read(tmp.path().join("src/glloader_gl.c")).unwrap(),
            source
        );
        assert_eq!(
            first[0].artifacts[0].fingerprint,
            second[0].artifacts[0].fingerprint
        );
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        DescriptorTree::multitexture().write_to(tmp.path()).unwrap();
        let opts = GenerateOptions {
            dry_run: true,
            ..options(tmp.path())
        };

        let reports = generate(&opts, &quiet()).unwrap();
        assert!(reports[0]
            .artifacts
            .iter()
            .all(|a| a.status == ChangeStatus::WouldUpdate));
        assert!(!tmp.path().join("src").exists());
    }

    #[test]
    fn test_families_in_prefix_order_with_jobs() {
        let tmp = TempDir::new().unwrap();
        DescriptorTree::multitexture()
            .with_descriptor("WGL_ARB_extensions_string", fixtures::WGL_EXTENSIONS_STRING)
            .write_to(tmp.path())
            .unwrap();
        let mut opts = options(tmp.path());
        opts.config.jobs = Some(2);

        let reports = generate(&opts, &quiet()).unwrap();
        let prefixes: Vec<_> = reports.iter().map(|r| r.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["GL", "WGL"]);
    }

    #[test]
    fn test_custom_layout_and_stem() {
        let tmp = TempDir::new().unwrap();
        DescriptorTree::multitexture().write_to(tmp.path()).unwrap();
        let mut opts = options(tmp.path());
        opts.config.header_dir = Some(PathBuf::from("inc"));
        opts.config.source_dir = Some(PathBuf::from("gen"));
        opts.config.artifact_stem = Some("myloader".to_string());

        generate(&opts, &quiet()).unwrap();
        assert!(tmp.path().join("inc/myloader_gl.h").exists());
        assert!(tmp.path().join("gen/myloader_gl.c").exists());
    }

    #[test]
    fn test_malformed_descriptor_aborts() {
        let tmp = TempDir::new().unwrap();
        DescriptorTree::multitexture()
            .with_descriptor("GL_EXT_broken", "name = \"GL_EXT_broken\"\n[[functions]]\nname = \"\"\n")
            .write_to(tmp.path())
            .unwrap();

        assert!(generate(&options(tmp.path()), &quiet()).is_err());
        assert!(!tmp.path().join("src/glloader_gl.c").exists());
    }

    #[test]
    fn test_unregistered_extensions_are_reported() {
        let tmp = TempDir::new().unwrap();
        DescriptorTree::multitexture()
            .with_descriptor("GL_EXT_unregistered", fixtures::UNREGISTERED)
            .write_to(tmp.path())
            .unwrap();

        let reports = generate(&options(tmp.path()), &quiet()).unwrap();
        assert_eq!(
            reports[0].unregistered,
            vec![PathBuf::from("descriptors/GL_EXT_unregistered.toml")]
        );
    }
}
