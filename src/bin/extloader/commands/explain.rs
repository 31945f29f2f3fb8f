//! `extloader explain` command

use std::sync::Arc;

use anyhow::Result;

use super::{config_for, project_root};
use crate::cli::ExplainArgs;
use extloader::ops::{explain, format_explanation, ExplainOptions};
use extloader::util::shell::Shell;

pub fn execute(args: ExplainArgs, shell: &Arc<Shell>) -> Result<()> {
    let root = project_root(args.root)?;
    let config = config_for(&root).generate;

    let explanation = explain(&ExplainOptions {
        root,
        config,
        capability: args.capability,
    })?;

    if shell.is_json() {
        shell.json_event(&serde_json::json!({
            "reason": "capability-explained",
            "explanation": explanation,
        }));
    } else {
        print!("{}", format_explanation(&explanation));
    }

    Ok(())
}
