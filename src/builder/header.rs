//! Public header: capability macros, tokens, typedefs, slots and queries.

use std::collections::HashSet;
use std::fmt;

use crate::builder::writer::CWriter;
use crate::builder::Naming;
use crate::core::capability::Capability;
use crate::core::family::Family;

/// Render the header of `family`.
pub fn render(family: &Family, naming: &Naming<'_>, banner: Option<&str>) -> Result<String, fmt::Error> {
    let mut w = CWriter::new();
    let caps = family.capabilities();

    if let Some(banner) = banner {
        w.comment(banner)?;
        w.blank();
    }

    let guard = naming.include_guard();
    w.directive(format_args!("#ifndef {}", guard))?;
    w.directive(format_args!("#define {}", guard))?;
    w.blank();
    w.begin_extern_c()?;

    for cap in caps {
        w.directive(format_args!("#ifndef {}", cap.name))?;
        w.directive(format_args!("#define {} 1", cap.name))?;
        w.directive("#endif")?;
        w.blank();
    }

    let mut tokens = HashSet::new();
    for cap in caps.iter().filter(|c| !c.constants.is_empty()) {
        capability_block(&mut w, cap, |w| {
            for constant in &cap.constants {
                if tokens.insert(constant.name.as_str()) {
                    w.directive(format_args!("#define {} {}", constant.name, constant.value))?;
                }
            }
            Ok(())
        })?;
    }

    let mut synonyms = HashSet::new();
    for cap in caps.iter().filter(|c| !c.typedefs.is_empty()) {
        capability_block(&mut w, cap, |w| {
            for alias in &cap.typedefs {
                if synonyms.insert(alias.synonym.as_str()) {
                    w.directive(format_args!("typedef {} {};", alias.type_name, alias.synonym))?;
                }
            }
            Ok(())
        })?;
    }

    let registry = family.entry_points();
    let apientry = naming.apientry();
    let api = naming.api();
    for cap in caps {
        let owned: Vec<_> = registry.owned_by(&cap.name).collect();
        if owned.is_empty() {
            continue;
        }
        capability_block(&mut w, cap, |w| {
            for entry in &owned {
                w.directive(format_args!(
                    "typedef {} ({} *{}FUNC)({});",
                    entry.return_type,
                    apientry,
                    entry.name,
                    entry.params_decl()
                ))?;
            }
            w.blank();
            for entry in &owned {
                w.directive(format_args!("extern {} {}FUNC {};", api, entry.name, entry.name))?;
            }
            Ok(())
        })?;
    }

    for cap in caps {
        w.directive(format_args!(
            "typedef char ({} *{}FUNC)(void);",
            apientry,
            naming.query(&cap.name)
        ))?;
    }
    w.blank();

    for cap in caps {
        let query = naming.query(&cap.name);
        w.directive(format_args!("extern {} {}FUNC {};", api, query, query))?;
    }
    w.blank();

    w.directive(format_args!("{} void {}(void);", api, naming.family_init()))?;
    w.blank();

    w.end_extern_c()?;
    w.directive(format_args!("#endif /* {} */", guard))?;

    Ok(w.finish())
}

/// `#ifdef NAME` (and `#ifdef guard`) around `body`, followed by a blank line.
fn capability_block<F>(w: &mut CWriter, cap: &Capability, body: F) -> fmt::Result
where
    F: FnOnce(&mut CWriter) -> fmt::Result,
{
    w.directive(format_args!("#ifdef {}", cap.name))?;
    w.blank();
    w.guarded(cap.guard.as_deref(), |w| {
        if cap.guard.is_some() {
            w.blank();
        }
        body(w)?;
        w.blank();
        Ok(())
    })?;
    if cap.guard.is_some() {
        w.blank();
    }
    w.directive("#endif")?;
    w.blank();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capability::{Constant, TypeAlias};
    use crate::test_support::fixtures;

    fn header(family: &Family) -> String {
        render(family, &Naming::new("glloader", family.prefix()), None).unwrap()
    }

    #[test]
    fn test_include_guard_and_init_declaration() {
        let text = header(&fixtures::multitexture_family());
        assert!(text.starts_with("#ifndef _GLLOADER_GL_H\n#define _GLLOADER_GL_H\n"));
        assert!(text.contains("GLLOADER_API void gl_init(void);"));
        assert!(text.trim_end().ends_with("#endif /* _GLLOADER_GL_H */"));
    }

    #[test]
    fn test_slots_and_queries() {
        let text = header(&fixtures::multitexture_family());
        assert!(text.contains(
            "typedef void (GLLOADER_APIENTRY *glActiveTextureARBFUNC)(GLenum texture);"
        ));
        assert!(text.contains("extern GLLOADER_API glActiveTextureARBFUNC glActiveTextureARB;"));
        assert!(text.contains(
            "typedef char (GLLOADER_APIENTRY *glloader_GL_ARB_multitextureFUNC)(void);"
        ));
        assert!(text.contains(
            "extern GLLOADER_API glloader_GL_ARB_multitextureFUNC glloader_GL_ARB_multitexture;"
        ));
        assert!(text.contains("#define GL_TEXTURE0_ARB 0x84C0"));
    }

    #[test]
    fn test_first_declaration_wins() {
        let family = fixtures::family_from(vec![
            fixtures::capability("GL_A", vec![fixtures::entry("glShared")]),
            fixtures::capability("GL_B", vec![fixtures::entry("glShared")]),
        ]);
        let text = header(&family);
        assert_eq!(text.matches("extern GLLOADER_API glSharedFUNC").count(), 1);
    }

    #[test]
    fn test_tokens_and_typedefs_deduplicated() {
        let a = fixtures::capability("GL_A", vec![])
            .with_constant(Constant::new("GL_ONE", "1").unwrap())
            .with_typedef(TypeAlias::new("int", "GLint").unwrap());
        let b = fixtures::capability("GL_B", vec![])
            .with_constant(Constant::new("GL_ONE", "1").unwrap())
            .with_constant(Constant::new("GL_TWO", "2").unwrap())
            .with_typedef(TypeAlias::new("int", "GLint").unwrap());
        let text = header(&fixtures::family_from(vec![a, b]));

        assert_eq!(text.matches("#define GL_ONE 1").count(), 1);
        assert_eq!(text.matches("#define GL_TWO 2").count(), 1);
        assert_eq!(text.matches("typedef int GLint;").count(), 1);
    }

    #[test]
    fn test_guarded_capability() {
        let cap = fixtures::capability("WGL_ARB_x", vec![fixtures::entry("wglX")])
            .with_guard("_WIN32")
            .unwrap();
        let family = crate::core::Family::new("WGL", vec![cap]).unwrap();
        let text = header(&family);

        let block = text.find("#ifdef WGL_ARB_x").unwrap();
        let guard = text[block..].find("#ifdef _WIN32").unwrap();
        let slot = text[block..].find("extern GLLOADER_API wglXFUNC").unwrap();
        assert!(guard < slot);
    }

    #[test]
    fn test_banner_comment() {
        let family = fixtures::multitexture_family();
        let text = render(
            &family,
            &Naming::new("glloader", "GL"),
            Some("Generated from descriptors."),
        )
        .unwrap();
        assert!(text.starts_with("/*\n * Generated from descriptors.\n */\n"));
    }
}
