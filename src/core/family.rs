//! Capability families.
//!
//! A family is every capability that shares a naming prefix (`GL`, `WGL`,
//! `GLX`, ...). It is the unit one header/implementation pair is generated
//! for.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::core::capability::{Capability, EntryPoint};
use crate::core::errors::DescriptorError;

/// Marker that distinguishes core-version descriptors from extensions.
const VERSION_MARKER: &str = "_VERSION_";

/// Whether a descriptor describes a core version or an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Core,
    Extension,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorKind::Core => write!(f, "core"),
            DescriptorKind::Extension => write!(f, "extension"),
        }
    }
}

/// Split a descriptor stem into its family prefix and kind.
///
/// `GL_ARB_multitexture` is an extension of family `GL`,
/// `WGL_VERSION_1_0` is the core of family `WGL`. A stem without `_` is its
/// own prefix.
pub fn classify_stem(stem: &str) -> (&str, DescriptorKind) {
    let prefix = stem.split('_').next().unwrap_or(stem);
    let kind = if stem.contains(VERSION_MARKER) {
        DescriptorKind::Core
    } else {
        DescriptorKind::Extension
    };
    (prefix, kind)
}

/// Compare two names treating runs of digits as numbers.
///
/// Keeps `GL_VERSION_1_2` ahead of `GL_VERSION_1_10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lhs = take_number(&mut a);
                let rhs = take_number(&mut b);
                // Compare by magnitude, then by the raw text so "01" != "1".
                let by_value = lhs
                    .trim_start_matches('0')
                    .len()
                    .cmp(&rhs.trim_start_matches('0').len())
                    .then_with(|| lhs.trim_start_matches('0').cmp(rhs.trim_start_matches('0')))
                    .then_with(|| lhs.cmp(&rhs));
                if by_value != Ordering::Equal {
                    return by_value;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

/// An ordered set of capabilities generated together.
#[derive(Debug, Clone)]
pub struct Family {
    prefix: String,
    capabilities: Vec<Capability>,
}

impl Family {
    /// Create a family from capabilities in declaration order.
    ///
    /// Capability names must be unique within the family.
    pub fn new(
        prefix: impl Into<String>,
        capabilities: Vec<Capability>,
    ) -> Result<Self, DescriptorError> {
        let prefix = prefix.into();
        let mut seen = HashSet::new();
        for cap in &capabilities {
            if !seen.insert(cap.name.as_str()) {
                return Err(DescriptorError::DuplicateCapability {
                    family: prefix.clone(),
                    name: cap.name.clone(),
                });
            }
        }
        Ok(Family {
            prefix,
            capabilities,
        })
    }

    /// Merge core and extension capabilities: core first.
    pub fn from_parts(
        prefix: impl Into<String>,
        core: Vec<Capability>,
        extensions: Vec<Capability>,
    ) -> Result<Self, DescriptorError> {
        let mut capabilities = core;
        capabilities.extend(extensions);
        Family::new(prefix, capabilities)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn capability(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Build the family-wide entry-point registry.
    pub fn entry_points(&self) -> EntryPointRegistry<'_> {
        EntryPointRegistry::build(&self.capabilities)
    }
}

/// A declared entry point and the capability that declared it first.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredEntryPoint<'a> {
    pub owner: &'a str,
    pub entry: &'a EntryPoint,
}

/// Family-wide entry points keyed by name, in declaration order.
///
/// The first capability to declare a name owns it; later declarations of the
/// same name are skipped when slots and stand-ins are emitted.
#[derive(Debug, Clone, Default)]
pub struct EntryPointRegistry<'a> {
    declared: Vec<DeclaredEntryPoint<'a>>,
    index: HashMap<&'a str, usize>,
}

impl<'a> EntryPointRegistry<'a> {
    pub fn build(capabilities: &'a [Capability]) -> Self {
        let mut registry = EntryPointRegistry::default();
        for cap in capabilities {
            for entry in &cap.entry_points {
                registry.declare(&cap.name, entry);
            }
        }
        registry
    }

    /// Record a declaration. Returns false if the name was already defined.
    pub fn declare(&mut self, owner: &'a str, entry: &'a EntryPoint) -> bool {
        if self.index.contains_key(entry.name.as_str()) {
            tracing::debug!(
                "entry point `{}` from `{}` already defined, skipping",
                entry.name,
                owner
            );
            return false;
        }
        self.index.insert(&entry.name, self.declared.len());
        self.declared.push(DeclaredEntryPoint { owner, entry });
        true
    }

    /// Capability that owns the slot for `name`.
    pub fn owner(&self, name: &str) -> Option<&'a str> {
        self.index.get(name).map(|&i| self.declared[i].owner)
    }

    /// True when `owner` is the capability that defines `entry`'s slot.
    pub fn is_defined_by(&self, owner: &str, entry: &EntryPoint) -> bool {
        self.owner(&entry.name) == Some(owner)
    }

    /// Entry points owned by `owner`, in declaration order.
    pub fn owned_by<'s>(&'s self, owner: &'s str) -> impl Iterator<Item = &'a EntryPoint> + 's {
        self.declared
            .iter()
            .filter(move |d| d.owner == owner)
            .map(|d| d.entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeclaredEntryPoint<'a>> {
        self.declared.iter()
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}
