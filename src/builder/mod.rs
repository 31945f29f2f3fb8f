//! C artifact emission.
//!
//! Each family produces two artifacts: a public header declaring the support
//! queries and entry-point slots, and an implementation unit holding the
//! self-initializing stand-ins, the per-capability resolvers and the
//! once-guarded family initializer. Output depends only on the family, so
//! regenerating unchanged descriptors yields identical bytes.

pub mod header;
pub mod source;
pub mod writer;

use anyhow::Result;

use crate::core::capability::validate_identifier;
use crate::core::errors::DescriptorError;
use crate::core::family::Family;
use crate::resolver::FamilyPlan;

pub use writer::CWriter;

/// Knobs that shape the emitted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Identifier prefix for files, macros and host helpers (`glloader`).
    pub stem: String,
    /// Text placed in a leading comment of both artifacts.
    pub banner: Option<String>,
}

impl EmitOptions {
    pub fn new(stem: impl Into<String>) -> Result<Self, DescriptorError> {
        let stem = stem.into();
        validate_identifier("artifact stem", &stem)?;
        Ok(EmitOptions { stem, banner: None })
    }

    pub fn with_banner(mut self, banner: Option<String>) -> Self {
        self.banner = banner.filter(|b| !b.trim().is_empty());
        self
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            stem: "glloader".to_string(),
            banner: None,
        }
    }
}

/// Names derived from the stem and the family prefix.
#[derive(Debug, Clone)]
pub struct Naming<'a> {
    stem: &'a str,
    prefix: &'a str,
}

impl<'a> Naming<'a> {
    pub fn new(stem: &'a str, prefix: &'a str) -> Self {
        Naming { stem, prefix }
    }

    fn upper_stem(&self) -> String {
        self.stem.to_uppercase()
    }

    pub fn header_file(&self) -> String {
        format!("{}_{}.h", self.stem, self.prefix.to_lowercase())
    }

    pub fn source_file(&self) -> String {
        format!("{}_{}.c", self.stem, self.prefix.to_lowercase())
    }

    pub fn include_guard(&self) -> String {
        format!("_{}_{}_H", self.upper_stem(), self.prefix.to_uppercase())
    }

    /// Macro the host defines to compile this family in.
    pub fn family_macro(&self) -> String {
        format!("{}_{}", self.upper_stem(), self.prefix.to_uppercase())
    }

    pub fn api(&self) -> String {
        format!("{}_API", self.upper_stem())
    }

    pub fn apientry(&self) -> String {
        format!("{}_APIENTRY", self.upper_stem())
    }

    pub fn umbrella_header(&self) -> String {
        format!("{0}/{0}.h", self.stem)
    }

    pub fn is_supported(&self) -> String {
        format!("{}_is_supported", self.stem)
    }

    /// Public support-query slot for `capability`.
    pub fn query(&self, capability: &str) -> String {
        format!("{}_{}", self.stem, capability)
    }

    pub fn family_init(&self) -> String {
        format!("{}_init", self.prefix.to_lowercase())
    }

    pub fn once_flag_type(&self) -> String {
        format!("{}_ONCE_FLAG", self.upper_stem())
    }

    pub fn once_flag_init(&self) -> String {
        format!("{}_ONCE_INIT", self.upper_stem())
    }

    pub fn call_once(&self) -> String {
        format!("{}_call_once", self.stem)
    }
}

/// The rendered artifacts of one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub header_name: String,
    pub header: String,
    pub source_name: String,
    pub source: String,
}

/// Render both artifacts for `family`.
pub fn generate_artifacts(family: &Family, options: &EmitOptions) -> Result<Artifacts> {
    let plan = FamilyPlan::build(family);
    let naming = Naming::new(&options.stem, family.prefix());

    tracing::debug!(
        "{}: emitting {} capabilities",
        family.prefix(),
        family.len()
    );

    Ok(Artifacts {
        header_name: naming.header_file(),
        header: header::render(family, &naming, options.banner.as_deref())?,
        source_name: naming.source_file(),
        source: source::render(family, &plan, &naming, options.banner.as_deref())?,
    })
}
