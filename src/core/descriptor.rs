//! Capability descriptor files.
//!
//! One TOML file describes one capability:
//!
//! ```toml
//! name = "GL_ARB_multitexture"
//! reg_no = 1
//!
//! [[tokens]]
//! name = "GL_TEXTURE0_ARB"
//! value = "0x84C0"
//!
//! [[functions]]
//! return = "void"
//! name = "glActiveTextureARB"
//! params = [{ type = "GLenum", name = "texture" }]
//! mappings = [{ from = "GL_VERSION_1_3", name = "glActiveTexture" }]
//!
//! [additionals]
//! exts = ["GL_ARB_foo"]
//! one_of = [["GL_EXT_bar", "GL_ARB_bar"]]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::capability::{
    Capability, Constant, EntryPoint, Linkage, Parameter, SubstituteMapping, TypeAlias,
};
use crate::core::errors::{DescriptorError, DescriptorSyntaxError};

/// Raw descriptor as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorFile {
    pub name: String,

    /// Registry number; capabilities without one get an advisory warning.
    #[serde(default)]
    pub reg_no: Option<u32>,

    /// Guard macro the whole capability is emitted under.
    #[serde(default)]
    pub predefined: Option<String>,

    #[serde(default)]
    pub typedefs: Vec<TypedefSpec>,

    #[serde(default)]
    pub tokens: Vec<TokenSpec>,

    #[serde(default)]
    pub functions: Vec<FunctionSpec>,

    #[serde(default)]
    pub additionals: AdditionalsSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypedefSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    pub synonym: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSpec {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpec {
    #[serde(rename = "return")]
    pub return_type: String,
    pub name: String,
    #[serde(default)]
    pub link: Linkage,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub mappings: Vec<MappingSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingSpec {
    pub from: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdditionalsSpec {
    /// Each entry is a group that requires exactly that capability.
    #[serde(default)]
    pub exts: Vec<String>,

    /// Each entry is a group satisfied by any one of its members.
    #[serde(default)]
    pub one_of: Vec<Vec<String>>,
}

impl DescriptorFile {
    /// Parse descriptor text. `file` names the source in diagnostics.
    pub fn parse(file: &str, contents: &str) -> Result<Self, DescriptorSyntaxError> {
        toml::from_str(contents)
            .map_err(|e| DescriptorSyntaxError::from_toml(file, contents.to_string(), &e))
    }

    /// Validate and convert into the capability model.
    pub fn into_capability(self) -> Result<Capability, DescriptorError> {
        let mut cap = Capability::new(self.name)?;

        if let Some(guard) = self.predefined {
            cap = cap.with_guard(guard)?;
        }
        if let Some(number) = self.reg_no {
            cap = cap.with_registry_number(number);
        }

        for typedef in self.typedefs {
            cap = cap.with_typedef(TypeAlias::new(typedef.type_name, typedef.synonym)?);
        }

        for token in self.tokens {
            cap = cap.with_constant(Constant::new(token.name, token.value)?);
        }

        for function in self.functions {
            let mut entry = EntryPoint::new(function.return_type, function.name)?
                .with_linkage(function.link);
            for param in function.params {
                entry = entry.with_param(Parameter::new(param.type_name, param.name)?);
            }
            for mapping in function.mappings {
                entry = entry.with_mapping(SubstituteMapping::new(mapping.from, mapping.name)?);
            }
            cap = cap.with_entry_point(entry);
        }

        for ext in self.additionals.exts {
            cap = cap.requires(ext)?;
        }
        for group in self.additionals.one_of {
            cap = cap.requires_any_of(group)?;
        }

        Ok(cap)
    }
}

/// Parse and validate descriptor text into a capability.
pub fn parse_capability(file: &str, contents: &str) -> Result<Capability> {
    let descriptor = DescriptorFile::parse(file, contents)?;
    let cap = descriptor
        .into_capability()
        .map_err(|e| e.in_file(file))?;
    Ok(cap)
}

/// Load a capability from a descriptor file.
pub fn load_capability(path: &Path) -> Result<Capability> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read descriptor: {}", path.display()))?;
    parse_capability(&path.display().to_string(), &contents)
}
