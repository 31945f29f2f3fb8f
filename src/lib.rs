//! extloader - Extension loader generator for graphics APIs
//!
//! This crate compiles declarative capability descriptors (core versions and
//! extensions) into C loader code that resolves entry points at runtime,
//! falling back to substitute symbols from other capabilities and promoting
//! an extension to supported when its substitutes are complete. The same
//! resolution plan also drives an in-process runtime.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod runtime;
pub mod util;

/// Test utilities and mocks for extloader unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides descriptor fixtures plus a recording support
/// oracle and symbol lookup.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{Capability, DescriptorError, EntryPoint, Family};
pub use crate::resolver::{CapabilityPlan, FamilyPlan, Promotion};
pub use crate::runtime::{FamilyRuntime, SupportOracle, SymbolLookup};
pub use crate::util::config::Config;
