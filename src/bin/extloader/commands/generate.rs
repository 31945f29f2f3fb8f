//! `extloader generate` command

use std::sync::Arc;

use anyhow::Result;

use super::{config_for, project_root};
use crate::cli::GenerateArgs;
use extloader::ops::{generate, GenerateOptions};
use extloader::util::shell::{Shell, Status};

pub fn execute(args: GenerateArgs, shell: &Arc<Shell>) -> Result<()> {
    let root = project_root(args.root)?;
    let mut config = config_for(&root).generate;

    // CLI flags win over config files
    if let Some(dir) = args.descriptors {
        config.descriptor_dir = Some(dir);
    }
    if let Some(jobs) = args.jobs {
        config.jobs = Some(jobs);
    }

    let opts = GenerateOptions {
        root,
        config,
        dry_run: args.dry_run,
    };

    let reports = generate(&opts, shell)?;

    if opts.dry_run && reports.iter().any(|r| r.changed()) {
        shell.status(Status::Info, "dry run, nothing written");
    }

    Ok(())
}
