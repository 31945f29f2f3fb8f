//! High-level operations.
//!
//! This module contains the implementation of extloader commands.

pub mod discover;
pub mod explain;
pub mod generate;

pub use discover::{discover, load_family, DescriptorSource, DiscoverError, FamilySources, LoadedFamily};
pub use explain::{explain, format_explanation, ExplainOptions, Explanation, UnknownCapability};
pub use generate::{generate, ArtifactReport, ChangeStatus, GenerateOptions, GenerationReport};
