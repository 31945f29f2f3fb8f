//! Core data structures: capabilities, descriptors and families.

pub mod capability;
pub mod descriptor;
pub mod errors;
pub mod family;

pub use capability::{
    Capability, Constant, EntryPoint, FallbackGroup, Linkage, Parameter, SubstituteMapping,
    TypeAlias,
};
pub use descriptor::{load_capability, parse_capability, DescriptorFile};
pub use errors::{DescriptorError, DescriptorSyntaxError};
pub use family::{classify_stem, natural_cmp, DescriptorKind, EntryPointRegistry, Family};
