//! Implementation of `extloader explain`.
//!
//! Shows how one capability resolves: its mapping plans, which entry points
//! have no substitute, and which promotion case applies.

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;

use crate::core::family::classify_stem;
use crate::ops::discover::{discover, load_family};
use crate::resolver::{uncovered, CapabilityPlan};
use crate::util::config::GenerateConfig;
use crate::util::diagnostic::{suggestions, Diagnostic};

#[derive(Debug, Error)]
#[error("capability `{name}` not found in family `{prefix}`")]
pub struct UnknownCapability {
    pub name: String,
    pub prefix: String,
}

impl UnknownCapability {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string()).with_suggestion(suggestions::UNKNOWN_CAPABILITY)
    }
}

/// Options for the explain command.
#[derive(Debug, Clone, Default)]
pub struct ExplainOptions {
    pub root: PathBuf,
    pub config: GenerateConfig,
    pub capability: String,
}

/// An entry point whose slot another capability declared first.
#[derive(Debug, Clone, Serialize)]
pub struct SharedEntryPoint {
    pub name: String,
    pub owner: String,
}

/// Resolution summary for one capability.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub prefix: String,
    pub plan: CapabilityPlan,
    pub registry_number: Option<u32>,
    pub uncovered: Vec<String>,
    pub shared: Vec<SharedEntryPoint>,
}

/// Load the capability's family and describe how it resolves.
pub fn explain(opts: &ExplainOptions) -> Result<Explanation> {
    let (prefix, _) = classify_stem(&opts.capability);
    let families = discover(&opts.root.join(opts.config.descriptor_dir()))?;

    let unknown = || UnknownCapability {
        name: opts.capability.clone(),
        prefix: prefix.to_string(),
    };

    let sources = families
        .iter()
        .find(|f| f.prefix == prefix)
        .ok_or_else(unknown)?;
    let loaded = load_family(sources)?;
    let family = &loaded.family;
    let capability = family.capability(&opts.capability).ok_or_else(unknown)?;

    let registry = family.entry_points();
    let shared = capability
        .entry_points
        .iter()
        .filter_map(|e| {
            let owner = registry.owner(&e.name)?;
            (owner != capability.name).then(|| SharedEntryPoint {
                name: e.name.clone(),
                owner: owner.to_string(),
            })
        })
        .collect();

    Ok(Explanation {
        prefix: family.prefix().to_string(),
        plan: CapabilityPlan::build(capability, family.capabilities()),
        registry_number: capability.registry_number,
        uncovered: uncovered(capability).into_iter().map(str::to_string).collect(),
        shared,
    })
}

/// Render an explanation for the terminal.
pub fn format_explanation(explanation: &Explanation) -> String {
    let mut output = String::new();
    // Writing to a String cannot fail.
    let _ = write_explanation(&mut output, explanation);
    output
}

fn write_explanation(out: &mut String, e: &Explanation) -> std::fmt::Result {
    let plan = &e.plan;

    writeln!(out, "{} (family {})", plan.name, e.prefix)?;
    match e.registry_number {
        Some(n) => writeln!(out, "  registry number: {}", n)?,
        None => writeln!(out, "  registry number: none")?,
    }
    if let Some(guard) = &plan.guard {
        writeln!(out, "  guard: {}", guard)?;
    }
    writeln!(out, "  entry points: {}", plan.entry_points.len())?;
    writeln!(out)?;

    if plan.plans.is_empty() {
        writeln!(out, "Mapping plans: none")?;
    } else {
        writeln!(out, "Mapping plans:")?;
        for (i, mapping) in plan.plans.iter().enumerate() {
            writeln!(out, "  {}. [{}]", i + 1, mapping.signature.join(", "))?;
            for member in &mapping.members {
                writeln!(
                    out,
                    "       {} <- {}",
                    member.entry_point,
                    member.substitutes.join(" | ")
                )?;
            }
        }
    }

    if !e.uncovered.is_empty() {
        writeln!(out)?;
        writeln!(out, "No substitute: {}", e.uncovered.join(", "))?;
    }

    if !plan.additional_entry_points.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "Also bound when native: {}",
            plan.additional_entry_points.join(", ")
        )?;
    }

    if !e.shared.is_empty() {
        writeln!(out)?;
        writeln!(out, "Slots declared by other capabilities:")?;
        for shared in &e.shared {
            writeln!(out, "  {} (first declared by {})", shared.name, shared.owner)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Promotion: {}", plan.promotion)?;
    Ok(())
}
