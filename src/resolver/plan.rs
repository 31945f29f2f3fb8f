//! Mapping plans.
//!
//! Entry points that can be substituted from the same ordered list of source
//! capabilities are bound together, so the generated resolver tests each
//! fallback path once instead of once per entry point.

use serde::Serialize;

use crate::core::capability::{Capability, EntryPoint};

/// One entry point inside a plan, with its substitute for each position of
/// the plan's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanMember {
    pub entry_point: String,
    /// `substitutes[i]` is the symbol taken from `signature[i]`.
    pub substitutes: Vec<String>,
}

/// Entry points sharing one fallback signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingPlan {
    /// Source capabilities in order of preference.
    pub signature: Vec<String>,
    pub members: Vec<PlanMember>,
}

impl MappingPlan {
    fn open(entry: &EntryPoint) -> Self {
        MappingPlan {
            signature: entry
                .fallback_signature()
                .into_iter()
                .map(str::to_string)
                .collect(),
            members: Vec::new(),
        }
    }

    fn matches(&self, entry: &EntryPoint) -> bool {
        self.signature.len() == entry.mappings.len()
            && self
                .signature
                .iter()
                .zip(&entry.mappings)
                .all(|(source, m)| *source == m.source_capability)
    }

    fn push(&mut self, entry: &EntryPoint) {
        self.members.push(PlanMember {
            entry_point: entry.name.clone(),
            substitutes: entry
                .mappings
                .iter()
                .map(|m| m.substitute_name.clone())
                .collect(),
        });
    }

    /// Members bound when `signature[position]` is the first supported source.
    pub fn bindings_at(&self, position: usize) -> impl Iterator<Item = (&str, &str)> {
        self.members
            .iter()
            .map(move |m| (m.entry_point.as_str(), m.substitutes[position].as_str()))
    }
}

/// Group a capability's entry points by fallback signature.
///
/// Plans appear in order of first occurrence. Entry points without mappings
/// belong to no plan.
pub fn build_plans(capability: &Capability) -> Vec<MappingPlan> {
    let mut plans: Vec<MappingPlan> = Vec::new();

    for entry in capability.entry_points.iter().filter(|e| e.has_fallback()) {
        match plans.iter_mut().find(|p| p.matches(entry)) {
            Some(plan) => plan.push(entry),
            None => {
                let mut plan = MappingPlan::open(entry);
                plan.push(entry);
                plans.push(plan);
            }
        }
    }

    tracing::debug!(
        "{}: {} mapping plan(s) for {} entry point(s)",
        capability.name,
        plans.len(),
        capability.entry_points.len()
    );

    plans
}

/// Entry points with no substitute at all.
pub fn uncovered(capability: &Capability) -> Vec<&str> {
    capability
        .entry_points
        .iter()
        .filter(|e| !e.has_fallback())
        .map(|e| e.name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::core::capability::SubstituteMapping;

    fn mapped(name: &str, sources: &[(&str, &str)]) -> EntryPoint {
        sources
            .iter()
            .fold(EntryPoint::new("void", name).unwrap(), |e, (from, sub)| {
                e.with_mapping(SubstituteMapping::new(*from, *sub).unwrap())
            })
    }

    #[test]
    fn test_entry_points_sharing_a_signature_share_a_plan() {
        let cap = Capability::new("GL_EXT_a")
            .unwrap()
            .with_entry_point(mapped("glA", &[("GL_B", "glAB")]))
            .with_entry_point(mapped("glC", &[("GL_D", "glCD")]))
            .with_entry_point(mapped("glE", &[("GL_B", "glEB")]));

        let plans = build_plans(&cap);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].signature, vec!["GL_B"]);
        assert_eq!(
            plans[0]
                .members
                .iter()
                .map(|m| m.entry_point.as_str())
                .collect::<Vec<_>>(),
            vec!["glA", "glE"]
        );
        assert_eq!(plans[1].signature, vec!["GL_D"]);
    }

    #[test]
    fn test_signature_is_order_sensitive() {
        let cap = Capability::new("GL_EXT_a")
            .unwrap()
            .with_entry_point(mapped("glA", &[("GL_B", "glA1"), ("GL_C", "glA2")]))
            .with_entry_point(mapped("glD", &[("GL_C", "glD1"), ("GL_B", "glD2")]));

        assert_eq!(build_plans(&cap).len(), 2);
    }

    #[test]
    fn test_prefix_signature_is_distinct() {
        let cap = Capability::new("GL_EXT_a")
            .unwrap()
            .with_entry_point(mapped("glA", &[("GL_B", "glA1"), ("GL_C", "glA2")]))
            .with_entry_point(mapped("glD", &[("GL_B", "glD1")]));

        assert_eq!(build_plans(&cap).len(), 2);
    }

    #[test]
    fn test_unmapped_entry_points_join_no_plan() {
        let cap = Capability::new("GL_EXT_a")
            .unwrap()
            .with_entry_point(EntryPoint::new("void", "glBare").unwrap())
            .with_entry_point(mapped("glA", &[("GL_B", "glAB")]));

        let plans = build_plans(&cap);
        assert_eq!(plans.len(), 1);
        assert_eq!(uncovered(&cap), vec!["glBare"]);
    }

    #[test]
    fn test_no_mappings_no_plans() {
        let cap = Capability::new("GL_EXT_a")
            .unwrap()
            .with_entry_point(EntryPoint::new("void", "glBare").unwrap());
        assert!(build_plans(&cap).is_empty());
    }

    #[test]
    fn test_plan_count_equals_distinct_signatures() {
        let signatures: [&[(&str, &str)]; 6] = [
            &[("GL_B", "x")],
            &[("GL_C", "x")],
            &[("GL_B", "x")],
            &[("GL_B", "x"), ("GL_C", "y")],
            &[("GL_C", "x")],
            &[("GL_B", "x"), ("GL_C", "y")],
        ];
        let cap = signatures
            .iter()
            .enumerate()
            .fold(Capability::new("GL_EXT_a").unwrap(), |cap, (i, sig)| {
                cap.with_entry_point(mapped(&format!("glF{i}"), sig))
            });

        let distinct: HashSet<Vec<&str>> = cap
            .entry_points
            .iter()
            .map(|e| e.fallback_signature())
            .collect();
        let plans = build_plans(&cap);

        assert_eq!(plans.len(), distinct.len());
        let total: usize = plans.iter().map(|p| p.members.len()).sum();
        assert_eq!(total, cap.entry_points.len());
    }

    #[test]
    fn test_bindings_at_position() {
        let cap = Capability::new("GL_EXT_a")
            .unwrap()
            .with_entry_point(mapped("glA", &[("GL_B", "glA_B"), ("GL_C", "glA_C")]))
            .with_entry_point(mapped("glD", &[("GL_B", "glD_B"), ("GL_C", "glD_C")]));

        let plans = build_plans(&cap);
        let second: Vec<_> = plans[0].bindings_at(1).collect();
        assert_eq!(second, vec![("glA", "glA_C"), ("glD", "glD_C")]);
    }
}
