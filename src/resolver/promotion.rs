//! Promotion: declaring a capability supported without native support.
//!
//! A capability is only promoted when every one of its entry points can be
//! substituted. Where that decision lives depends on how many independent
//! conditions have to hold:
//!
//! - one fallback path and nothing else: the path's branch decides;
//! - several paths, or extra required capabilities: one aggregate test after
//!   all branches ran, a conjunction of OR-groups;
//! - some entry point has no substitute: never.

use std::fmt;

use serde::Serialize;

use crate::core::capability::Capability;
use crate::resolver::plan::{uncovered, MappingPlan};

/// How (and whether) a capability lacking native support becomes supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "case", rename_all = "snake_case")]
pub enum Promotion {
    /// No fallback strategy: supported natively or not at all.
    NativeOnly,

    /// Fallback paths exist but do not cover these entry points, so the
    /// capability is never promoted.
    Never { uncovered: Vec<String> },

    /// The single plan's branch promotes as soon as it binds.
    InBranch,

    /// Promote when every group has at least one supported member.
    Aggregate { groups: Vec<Vec<String>> },
}

impl Promotion {
    /// Decide the promotion case for `capability` given its plans.
    pub fn resolve(capability: &Capability, plans: &[MappingPlan]) -> Self {
        if !capability.has_backup() {
            return Promotion::NativeOnly;
        }

        if !capability.is_fully_covered() {
            return Promotion::Never {
                uncovered: uncovered(capability)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            };
        }

        // Additional groups always force the aggregate path; a single branch
        // cannot see them.
        if plans.len() == 1 && capability.fallback_groups.is_empty() {
            return Promotion::InBranch;
        }

        let groups = plans
            .iter()
            .map(|p| p.signature.clone())
            .chain(
                capability
                    .fallback_groups
                    .iter()
                    .map(|g| g.members().to_vec()),
            )
            .collect();

        Promotion::Aggregate { groups }
    }

    /// True when the promotion condition holds under `is_supported`.
    ///
    /// For `InBranch` this is the branch condition: any source of the single
    /// plan. `plans` must be the plans `self` was resolved from.
    pub fn holds(&self, plans: &[MappingPlan], is_supported: impl Fn(&str) -> bool) -> bool {
        match self {
            Promotion::NativeOnly | Promotion::Never { .. } => false,
            Promotion::InBranch => plans
                .first()
                .is_some_and(|p| p.signature.iter().any(|s| is_supported(s.as_str()))),
            Promotion::Aggregate { groups } => groups
                .iter()
                .all(|group| group.iter().any(|name| is_supported(name.as_str()))),
        }
    }

    /// Short label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Promotion::NativeOnly => "native only",
            Promotion::Never { .. } => "never (incomplete coverage)",
            Promotion::InBranch => "in branch",
            Promotion::Aggregate { .. } => "aggregate",
        }
    }
}

impl fmt::Display for Promotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Promotion::Aggregate { groups } => {
                let clauses: Vec<String> = groups
                    .iter()
                    .map(|g| {
                        if g.len() > 1 {
                            format!("({})", g.join(" || "))
                        } else {
                            g.join("")
                        }
                    })
                    .collect();
                write!(f, "aggregate: {}", clauses.join(" && "))
            }
            Promotion::Never { uncovered } => {
                write!(f, "never: no substitute for {}", uncovered.join(", "))
            }
            other => write!(f, "{}", other.label()),
        }
    }
}
