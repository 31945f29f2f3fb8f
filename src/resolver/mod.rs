//! Fallback resolution planning.
//!
//! Turns a family of capabilities into the derived, read-only plan that both
//! the C emitter and the in-process runtime execute:
//!
//! 1. native support test;
//! 2. when unsupported, one branch per mapping plan, trying the plan's source
//!    capabilities in order of preference;
//! 3. the promotion decision for the capability.

pub mod plan;
pub mod promotion;

use serde::Serialize;

use crate::core::capability::{Capability, Linkage};
use crate::core::family::Family;

pub use plan::{build_plans, uncovered, MappingPlan, PlanMember};
pub use promotion::Promotion;

/// An entry point as far as binding is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySlot {
    pub name: String,
    pub linkage: Linkage,
}

/// Everything needed to resolve one capability at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityPlan {
    pub name: String,
    pub guard: Option<String>,
    /// Own entry points, bound natively when the capability is supported.
    pub entry_points: Vec<EntrySlot>,
    /// Entry points of capabilities named in the additional groups that live
    /// in the same family; also bound natively when supported.
    pub additional_entry_points: Vec<String>,
    pub plans: Vec<MappingPlan>,
    pub promotion: Promotion,
}

impl CapabilityPlan {
    /// Plan one capability. `family` supplies the entry points of its
    /// additional capabilities.
    pub fn build(capability: &Capability, family: &[Capability]) -> Self {
        let plans = build_plans(capability);
        let promotion = Promotion::resolve(capability, &plans);

        let additional_entry_points = capability
            .additional_names()
            .filter_map(|name| family.iter().find(|c| c.name == name))
            .flat_map(|c| c.entry_points.iter().map(|e| e.name.clone()))
            .collect();

        tracing::debug!("{}: promotion {}", capability.name, promotion);

        CapabilityPlan {
            name: capability.name.clone(),
            guard: capability.guard.clone(),
            entry_points: capability
                .entry_points
                .iter()
                .map(|e| EntrySlot {
                    name: e.name.clone(),
                    linkage: e.linkage,
                })
                .collect(),
            additional_entry_points,
            plans,
            promotion,
        }
    }

    /// True when the capability has a fallback section at all.
    pub fn has_backup(&self) -> bool {
        !matches!(self.promotion, Promotion::NativeOnly)
    }

    /// Entry points reachable through some mapping plan.
    pub fn covered_count(&self) -> usize {
        self.plans.iter().map(|p| p.members.len()).sum()
    }
}

/// Resolution plans for a whole family, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyPlan {
    pub prefix: String,
    pub capabilities: Vec<CapabilityPlan>,
}

impl FamilyPlan {
    pub fn build(family: &Family) -> Self {
        let capabilities = family
            .capabilities()
            .iter()
            .map(|cap| CapabilityPlan::build(cap, family.capabilities()))
            .collect();

        FamilyPlan {
            prefix: family.prefix().to_string(),
            capabilities,
        }
    }

    pub fn capability(&self, name: &str) -> Option<&CapabilityPlan> {
        self.capabilities.iter().find(|c| c.name == name)
    }

    /// Every entry-point name the family binds, first declaration wins.
    pub fn slot_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.capabilities
            .iter()
            .flat_map(|c| {
                c.entry_points
                    .iter()
                    .map(|e| e.name.as_str())
                    .chain(c.plans.iter().flat_map(|p| {
                        p.members.iter().map(|m| m.entry_point.as_str())
                    }))
                    .chain(c.additional_entry_points.iter().map(String::as_str))
            })
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;

    #[test]
    fn test_family_plan_follows_declaration_order() {
        let family = fixtures::multitexture_family();
        let plan = FamilyPlan::build(&family);

        let names: Vec<_> = plan.capabilities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["GL_VERSION_1_3", "GL_ARB_multitexture"]);
    }

    #[test]
    fn test_core_capability_is_native_only() {
        let plan = FamilyPlan::build(&fixtures::multitexture_family());
        let core = plan.capability("GL_VERSION_1_3").unwrap();
        assert_eq!(core.promotion, Promotion::NativeOnly);
        assert!(!core.has_backup());
    }

    #[test]
    fn test_extension_promotes_in_branch() {
        let plan = FamilyPlan::build(&fixtures::multitexture_family());
        let ext = plan.capability("GL_ARB_multitexture").unwrap();
        assert_eq!(ext.promotion, Promotion::InBranch);
        assert_eq!(ext.plans.len(), 1);
        assert_eq!(ext.covered_count(), 2);
    }

    #[test]
    fn test_additional_entry_points_come_from_family() {
        let family = fixtures::family_from(vec![
            fixtures::capability("GL_EXT_a", vec![fixtures::entry("glA")]),
            fixtures::capability("GL_EXT_b", vec![fixtures::entry("glB")])
                .requires("GL_EXT_a")
                .unwrap()
                .requires("GL_EXT_elsewhere")
                .unwrap(),
        ]);
        let plan = FamilyPlan::build(&family);

        let b = plan.capability("GL_EXT_b").unwrap();
        assert_eq!(b.additional_entry_points, vec!["glA".to_string()]);
    }

    #[test]
    fn test_slot_names_are_unique() {
        let family = fixtures::family_from(vec![
            fixtures::capability(
                "GL_A",
                vec![fixtures::entry("glShared"), fixtures::entry("glA")],
            ),
            fixtures::capability("GL_B", vec![fixtures::entry("glShared")]),
        ]);
        let plan = FamilyPlan::build(&family);
        assert_eq!(plan.slot_names(), vec!["glShared", "glA"]);
    }
}
