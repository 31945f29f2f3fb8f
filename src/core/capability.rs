//! In-memory capability model.
//!
//! A capability is one optional feature of the graphics API (an extension or
//! a core version). Values are validated when they are constructed and are
//! immutable afterwards; everything downstream reads them by reference.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::DescriptorError;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// Check that `value` is a non-empty C identifier.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), DescriptorError> {
    if value.is_empty() {
        return Err(DescriptorError::EmptyField { kind });
    }
    if !IDENTIFIER.is_match(value) {
        return Err(DescriptorError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn validate_non_empty(kind: &'static str, value: &str) -> Result<(), DescriptorError> {
    if value.trim().is_empty() {
        return Err(DescriptorError::EmptyField { kind });
    }
    Ok(())
}

/// A `typedef <type> <synonym>;` the capability introduces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeAlias {
    pub type_name: String,
    pub synonym: String,
}

impl TypeAlias {
    pub fn new(
        type_name: impl Into<String>,
        synonym: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        let alias = TypeAlias {
            type_name: type_name.into(),
            synonym: synonym.into(),
        };
        validate_non_empty("typedef type", &alias.type_name)?;
        validate_identifier("typedef synonym", &alias.synonym)?;
        Ok(alias)
    }
}

/// A named constant (`#define NAME value`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constant {
    pub name: String,
    pub value: String,
}

impl Constant {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, DescriptorError> {
        let constant = Constant {
            name: name.into(),
            value: value.into(),
        };
        validate_identifier("token name", &constant.name)?;
        validate_non_empty("token value", &constant.value)?;
        Ok(constant)
    }
}

/// A single entry-point parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub type_name: String,
    pub name: String,
}

impl Parameter {
    pub fn new(
        type_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        let param = Parameter {
            type_name: type_name.into(),
            name: name.into(),
        };
        validate_non_empty("parameter type", &param.type_name)?;
        validate_identifier("parameter name", &param.name)?;
        Ok(param)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_name, self.name)
    }
}

/// How an entry point is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Bound lazily through the family initializer.
    #[default]
    Dynamic,
    /// Looked up once by name and then called directly; never re-enters the
    /// family initializer.
    Static,
}

impl std::str::FromStr for Linkage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dynamic" => Ok(Linkage::Dynamic),
            "static" => Ok(Linkage::Static),
            _ => Err(format!(
                "invalid linkage '{}'; expected 'dynamic' or 'static'",
                s
            )),
        }
    }
}

/// An alternate symbol, exported by another capability, that can stand in
/// for an entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstituteMapping {
    /// Capability that exports the substitute.
    pub source_capability: String,
    /// Symbol name of the substitute.
    pub substitute_name: String,
}

impl SubstituteMapping {
    pub fn new(
        source_capability: impl Into<String>,
        substitute_name: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        let mapping = SubstituteMapping {
            source_capability: source_capability.into(),
            substitute_name: substitute_name.into(),
        };
        validate_identifier("mapping source", &mapping.source_capability)?;
        validate_identifier("mapping name", &mapping.substitute_name)?;
        Ok(mapping)
    }
}

/// A callable operation exposed by a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub return_type: String,
    pub name: String,
    pub params: Vec<Parameter>,
    pub linkage: Linkage,
    /// Ordered by preference: earlier mappings win.
    pub mappings: Vec<SubstituteMapping>,
}

impl EntryPoint {
    /// Create an entry point with no parameters and no mappings.
    pub fn new(
        return_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        let entry = EntryPoint {
            return_type: return_type.into(),
            name: name.into(),
            params: Vec::new(),
            linkage: Linkage::Dynamic,
            mappings: Vec::new(),
        };
        validate_non_empty("return type", &entry.return_type)?;
        validate_identifier("entry point name", &entry.name)?;
        Ok(entry)
    }

    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn with_mapping(mut self, mapping: SubstituteMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// The ordered list of capabilities this entry point can be substituted from.
    pub fn fallback_signature(&self) -> Vec<&str> {
        self.mappings
            .iter()
            .map(|m| m.source_capability.as_str())
            .collect()
    }

    pub fn has_fallback(&self) -> bool {
        !self.mappings.is_empty()
    }

    pub fn returns_void(&self) -> bool {
        matches!(self.return_type.as_str(), "void" | "VOID")
    }

    pub fn is_static(&self) -> bool {
        self.linkage == Linkage::Static
    }

    /// Parameter list as it appears in a C prototype.
    pub fn params_decl(&self) -> String {
        if self.params.is_empty() {
            return "void".to_string();
        }
        self.params
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Argument list for forwarding a call.
    pub fn arg_names(&self) -> String {
        self.params
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Extra capabilities that must be present for equivalence-based promotion.
///
/// Groups in a capability's list are conjoined; members of one group are
/// alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "members", rename_all = "snake_case")]
pub enum FallbackGroup {
    Requires(String),
    AnyOf(Vec<String>),
}

impl FallbackGroup {
    pub fn members(&self) -> &[String] {
        match self {
            FallbackGroup::Requires(name) => std::slice::from_ref(name),
            FallbackGroup::AnyOf(names) => names,
        }
    }
}

/// A named optional feature with its entry points, constants and type aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub name: String,
    /// Compile-time condition the whole capability lives under.
    pub guard: Option<String>,
    /// Number in the public extension registry, if the capability has one.
    pub registry_number: Option<u32>,
    pub typedefs: Vec<TypeAlias>,
    pub constants: Vec<Constant>,
    pub entry_points: Vec<EntryPoint>,
    pub fallback_groups: Vec<FallbackGroup>,
}

impl Capability {
    pub fn new(name: impl Into<String>) -> Result<Self, DescriptorError> {
        let name = name.into();
        validate_identifier("capability name", &name)?;
        Ok(Capability {
            name,
            guard: None,
            registry_number: None,
            typedefs: Vec::new(),
            constants: Vec::new(),
            entry_points: Vec::new(),
            fallback_groups: Vec::new(),
        })
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Result<Self, DescriptorError> {
        let guard = guard.into();
        validate_identifier("predefined guard", &guard)?;
        self.guard = Some(guard);
        Ok(self)
    }

    pub fn with_registry_number(mut self, number: u32) -> Self {
        self.registry_number = Some(number);
        self
    }

    pub fn with_typedef(mut self, alias: TypeAlias) -> Self {
        self.typedefs.push(alias);
        self
    }

    pub fn with_constant(mut self, constant: Constant) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn with_entry_point(mut self, entry: EntryPoint) -> Self {
        self.entry_points.push(entry);
        self
    }

    /// Add a requires-this-one group.
    pub fn requires(mut self, name: impl Into<String>) -> Result<Self, DescriptorError> {
        let name = name.into();
        validate_identifier("additional extension", &name)?;
        self.fallback_groups.push(FallbackGroup::Requires(name));
        Ok(self)
    }

    /// Add a requires-any-one-of group.
    pub fn requires_any_of<I, S>(mut self, names: I) -> Result<Self, DescriptorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(DescriptorError::EmptyGroup {
                capability: self.name.clone(),
            });
        }
        for name in &names {
            validate_identifier("additional extension", name)?;
        }
        self.fallback_groups.push(FallbackGroup::AnyOf(names));
        Ok(self)
    }

    /// True when every entry point has at least one substitute mapping.
    ///
    /// Vacuously true for a capability without entry points.
    pub fn is_fully_covered(&self) -> bool {
        self.entry_points.iter().all(EntryPoint::has_fallback)
    }

    /// True when the capability has any way to be assembled without native
    /// support.
    pub fn has_backup(&self) -> bool {
        !self.fallback_groups.is_empty() || self.entry_points.iter().any(EntryPoint::has_fallback)
    }

    /// Names of every capability listed in the additional groups, in order.
    pub fn additional_names(&self) -> impl Iterator<Item = &str> {
        self.fallback_groups
            .iter()
            .flat_map(|g| g.members().iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> EntryPoint {
        EntryPoint::new("void", name).unwrap()
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("x", "GL_ARB_multitexture").is_ok());
        assert!(validate_identifier("x", "_private1").is_ok());
        assert_eq!(
            validate_identifier("x", ""),
            Err(DescriptorError::EmptyField { kind: "x" })
        );
        assert!(matches!(
            validate_identifier("x", "1abc"),
            Err(DescriptorError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            validate_identifier("x", "GL-EXT"),
            Err(DescriptorError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(Capability::new("").is_err());
        assert!(EntryPoint::new("", "glFoo").is_err());
        assert!(EntryPoint::new("void", "").is_err());
        assert!(Parameter::new("GLenum", "").is_err());
        assert!(Constant::new("GL_X", " ").is_err());
        assert!(SubstituteMapping::new("", "glFoo").is_err());
    }

    #[test]
    fn test_empty_any_of_rejected() {
        let cap = Capability::new("GL_EXT_a").unwrap();
        let err = cap.requires_any_of(Vec::<String>::new()).unwrap_err();
        assert_eq!(
            err,
            DescriptorError::EmptyGroup {
                capability: "GL_EXT_a".to_string()
            }
        );
    }

    #[test]
    fn test_prototype_strings() {
        let ep = EntryPoint::new("void", "glBlendColor")
            .unwrap()
            .with_param(Parameter::new("GLfloat", "red").unwrap())
            .with_param(Parameter::new("GLfloat", "green").unwrap());
        assert_eq!(ep.params_decl(), "GLfloat red, GLfloat green");
        assert_eq!(ep.arg_names(), "red, green");
        assert!(ep.returns_void());

        let bare = EntryPoint::new("GLenum", "glGetError").unwrap();
        assert_eq!(bare.params_decl(), "void");
        assert_eq!(bare.arg_names(), "");
        assert!(!bare.returns_void());
    }

    #[test]
    fn test_fallback_signature_order() {
        let ep = entry("glFooEXT")
            .with_mapping(SubstituteMapping::new("GL_VERSION_2_0", "glFoo").unwrap())
            .with_mapping(SubstituteMapping::new("GL_ARB_foo", "glFooARB").unwrap());
        assert_eq!(ep.fallback_signature(), vec!["GL_VERSION_2_0", "GL_ARB_foo"]);
    }

    #[test]
    fn test_coverage_and_backup() {
        let covered = Capability::new("GL_EXT_a")
            .unwrap()
            .with_entry_point(
                entry("glA").with_mapping(SubstituteMapping::new("GL_B", "glB").unwrap()),
            );
        assert!(covered.is_fully_covered());
        assert!(covered.has_backup());

        let partial = covered.clone().with_entry_point(entry("glC"));
        assert!(!partial.is_fully_covered());
        assert!(partial.has_backup());

        let bare = Capability::new("GL_EXT_b").unwrap().with_entry_point(entry("glD"));
        assert!(!bare.has_backup());

        let groups_only = Capability::new("GL_EXT_c").unwrap().requires("GL_EXT_d").unwrap();
        assert!(groups_only.is_fully_covered());
        assert!(groups_only.has_backup());
    }

    #[test]
    fn test_additional_names_flatten_groups() {
        let cap = Capability::new("GL_EXT_a")
            .unwrap()
            .requires("GL_X")
            .unwrap()
            .requires_any_of(["GL_Y", "GL_Z"])
            .unwrap();
        assert_eq!(
            cap.additional_names().collect::<Vec<_>>(),
            vec!["GL_X", "GL_Y", "GL_Z"]
        );
    }

    #[test]
    fn test_linkage_parse() {
        assert_eq!("static".parse::<Linkage>().unwrap(), Linkage::Static);
        assert_eq!("dynamic".parse::<Linkage>().unwrap(), Linkage::Dynamic);
        assert!("weak".parse::<Linkage>().is_err());
    }
}
