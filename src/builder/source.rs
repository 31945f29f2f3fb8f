//! Implementation unit: stand-ins, slots, per-capability resolvers and the
//! once-guarded family initializer.
//!
//! Every support query and entry-point slot starts out pointing at a
//! self-initializing stand-in. The first call runs the family initializer,
//! which rebinds the slots, and then forwards through the now-bound slot.
//! Calling an entry point that stayed unbound is a caller error.

use std::fmt;

use crate::builder::writer::CWriter;
use crate::builder::Naming;
use crate::core::capability::{Capability, EntryPoint};
use crate::core::family::Family;
use crate::resolver::{CapabilityPlan, FamilyPlan, Promotion};

/// Render the implementation unit of `family`.
pub fn render(
    family: &Family,
    plan: &FamilyPlan,
    naming: &Naming<'_>,
    banner: Option<&str>,
) -> Result<String, fmt::Error> {
    let mut w = CWriter::new();
    let caps = family.capabilities();

    if let Some(banner) = banner {
        w.comment(banner)?;
        w.blank();
    }

    w.directive(format_args!("#include <{}>", naming.umbrella_header()))?;
    w.directive("#include \"utils.h\"")?;
    w.blank();
    let family_macro = naming.family_macro();
    w.directive(format_args!("#ifdef {}", family_macro))?;
    w.blank();
    w.begin_extern_c()?;

    for cap in caps {
        w.guarded(cap.guard.as_deref(), |w| {
            w.line(format_args!("static char _{} = 0;", cap.name))
        })?;
    }
    w.blank();

    let registry = family.entry_points();
    for cap in caps {
        let owned: Vec<&EntryPoint> = registry.owned_by(&cap.name).collect();
        w.guarded(cap.guard.as_deref(), |w| {
            if cap.guard.is_some() {
                w.blank();
            }
            write_query(w, cap, naming)?;
            if !owned.is_empty() {
                write_stand_ins(w, cap, &owned, naming)?;
            }
            Ok(())
        })?;
        if cap.guard.is_some() {
            w.blank();
        }
    }

    for cap_plan in &plan.capabilities {
        w.guarded(cap_plan.guard.as_deref(), |w| write_resolver(w, cap_plan, naming))?;
        w.blank();
    }

    write_family_init(&mut w, caps, naming)?;

    w.end_extern_c()?;
    w.directive(format_args!("#endif /* {} */", family_macro))?;

    Ok(w.finish())
}

/// Support query: a direct flag read once ready, a stand-in before.
fn write_query(w: &mut CWriter, cap: &Capability, naming: &Naming<'_>) -> fmt::Result {
    let name = &cap.name;
    let query = naming.query(name);
    let apientry = naming.apientry();

    w.line(format_args!("static char {} _{}(void)", apientry, query))?;
    w.open()?;
    w.line(format_args!("return _{};", name))?;
    w.close()?;
    w.blank();

    w.line(format_args!("static char {} self_init_{}(void)", apientry, query))?;
    w.open()?;
    w.line(format_args!("{}();", naming.family_init()))?;
    w.line(format_args!("return {}();", query))?;
    w.close()?;
    w.line(format_args!("{0}FUNC {0} = self_init_{0};", query))?;
    w.blank();
    Ok(())
}

/// Entry-point stand-ins and slot definitions for the entry points `cap` owns.
fn write_stand_ins(
    w: &mut CWriter,
    cap: &Capability,
    owned: &[&EntryPoint],
    naming: &Naming<'_>,
) -> fmt::Result {
    let apientry = naming.apientry();

    w.directive(format_args!("#ifdef {}", cap.name))?;
    w.blank();
    for entry in owned {
        w.line(format_args!(
            "static {} {} self_init_{}({})",
            entry.return_type,
            apientry,
            entry.name,
            entry.params_decl()
        ))?;
        w.open()?;
        if entry.is_static() {
            w.line(format_args!("LOAD_FUNC1({});", entry.name))?;
        } else {
            w.line(format_args!("{}();", naming.family_init()))?;
        }
        let call = format!("{}({});", entry.name, entry.arg_names());
        if entry.returns_void() {
            w.line(call)?;
        } else {
            w.line(format_args!("return {}", call))?;
        }
        w.close()?;
    }
    w.blank();
    for entry in owned {
        w.line(format_args!("{0}FUNC {0} = self_init_{0};", entry.name))?;
    }
    w.blank();
    w.directive("#endif")?;
    w.blank();
    Ok(())
}

/// `init_NAME`: native test, fallback branches, then promotion.
fn write_resolver(w: &mut CWriter, cap: &CapabilityPlan, naming: &Naming<'_>) -> fmt::Result {
    let name = &cap.name;
    let query = naming.query(name);
    let is_supported = naming.is_supported();

    w.line(format_args!("static void init_{}(void)", name))?;
    w.open()?;
    w.line(format_args!("{0} = _{0};", query))?;
    w.blank();

    w.line(format_args!("_{} = 0;", name))?;
    w.line(format_args!("if ({}(\"{}\"))", is_supported, name))?;
    w.open()?;
    w.line(format_args!("_{} = 1;", name))?;
    let natives: Vec<&str> = cap
        .entry_points
        .iter()
        .map(|e| e.name.as_str())
        .chain(cap.additional_entry_points.iter().map(String::as_str))
        .collect();
    if !natives.is_empty() {
        w.blank();
    }
    for native in natives {
        w.line(format_args!("LOAD_FUNC1({});", native))?;
    }
    w.close()?;

    if cap.has_backup() {
        w.line("else")?;
        w.open()?;
        for plan in &cap.plans {
            for (position, source) in plan.signature.iter().enumerate() {
                let keyword = if position == 0 { "if" } else { "else if" };
                w.line(format_args!("{} ({}(\"{}\"))", keyword, is_supported, source))?;
                w.open()?;
                for (entry, substitute) in plan.bindings_at(position) {
                    w.line(format_args!("LOAD_FUNC2({}, {});", entry, substitute))?;
                }
                if cap.promotion == Promotion::InBranch {
                    w.blank();
                    write_promotion(w, name)?;
                }
                w.close()?;
            }
        }

        if let Promotion::Aggregate { groups } = &cap.promotion {
            if !cap.plans.is_empty() {
                w.blank();
            }
            let clauses: Vec<String> = groups
                .iter()
                .map(|group| {
                    let tests: Vec<String> = group
                        .iter()
                        .map(|member| format!("{}(\"{}\")", is_supported, member))
                        .collect();
                    if tests.len() > 1 {
                        format!("({})", tests.join(" || "))
                    } else {
                        tests.join("")
                    }
                })
                .collect();
            let last = clauses.len().saturating_sub(1);
            for (i, clause) in clauses.iter().enumerate() {
                let lead = if i == 0 { "if (" } else { "\t&& " };
                let tail = if i == last { ")" } else { "" };
                w.line(format_args!("{}{}{}", lead, clause, tail))?;
            }
            w.open()?;
            write_promotion(w, name)?;
            w.close()?;
        }
        w.close()?;
    }

    w.close()
}

fn write_promotion(w: &mut CWriter, name: &str) -> fmt::Result {
    w.line(format_args!("_{} = 1;", name))?;
    w.line(format_args!("promote_high(\"{}\");", name))
}

/// The family initializer runs every resolver exactly once per process.
fn write_family_init(w: &mut CWriter, caps: &[Capability], naming: &Naming<'_>) -> fmt::Result {
    let init = naming.family_init();

    w.line(format_args!(
        "static {} {}_once = {};",
        naming.once_flag_type(),
        init,
        naming.once_flag_init()
    ))?;
    w.blank();

    w.line(format_args!("static void {}_once_body(void)", init))?;
    w.open()?;
    for cap in caps {
        w.guarded(cap.guard.as_deref(), |w| {
            w.line(format_args!("init_{}();", cap.name))
        })?;
    }
    w.close()?;
    w.blank();

    w.line(format_args!("void {}(void)", init))?;
    w.open()?;
    w.line(format_args!(
        "{}(&{}_once, {}_once_body);",
        naming.call_once(),
        init,
        init
    ))?;
    w.close()?;
    w.blank();
    Ok(())
}
