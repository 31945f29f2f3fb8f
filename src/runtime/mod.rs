//! In-process realization of the lazy-binding contract.
//!
//! A [`FamilyRuntime`] owns the support flags and entry-point slots of one
//! family. It starts `Uninitialized`; the first support query, slot read or
//! explicit [`FamilyRuntime::initialize`] runs the family resolver exactly
//! once and leaves the runtime `Ready`. Concurrent first users block until
//! the resolver finished; nobody observes a half-bound family.
//!
//! Names are turned into [`SlotId`]s once, up front. Reading a slot after
//! that is an index into a vector.
//!
//! Calling through an unbound slot (no native symbol, no substitute) is the
//! caller's error: check [`FamilyRuntime::is_supported`] first.
//!
//! A static-linkage slot is fixed the first time it is resolved, either by a
//! direct read or by the resolver, and never changes afterwards.
//!
//! Capability guards are compile-time conditions of the emitted C code. The
//! runtime has no preprocessor to consult and treats every guard as
//! satisfied.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

use crate::core::capability::Linkage;
use crate::resolver::{CapabilityPlan, FamilyPlan, Promotion};

/// Address of a resolved function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolAddress(NonZeroUsize);

impl SymbolAddress {
    /// Wrap a raw address; `None` for null.
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(SymbolAddress)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for SymbolAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Tests whether the host exposes a capability natively.
pub trait SupportOracle: Send + Sync {
    fn is_supported(&self, capability: &str) -> bool;
}

impl<F> SupportOracle for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_supported(&self, capability: &str) -> bool {
        self(capability)
    }
}

/// Retrieves the address of a symbol by name.
pub trait SymbolLookup: Send + Sync {
    fn lookup(&self, symbol: &str) -> Option<SymbolAddress>;
}

impl<F> SymbolLookup for F
where
    F: Fn(&str) -> Option<SymbolAddress> + Send + Sync,
{
    fn lookup(&self, symbol: &str) -> Option<SymbolAddress> {
        self(symbol)
    }
}

/// Lifecycle of a family runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Index of an entry-point slot within its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

/// Where a slot's address came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingSource {
    Native,
    Substitute { capability: String },
}

/// The content of a bound slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    /// Symbol that was looked up.
    pub symbol: String,
    pub source: BindingSource,
    /// `None` when the lookup service had no such symbol.
    pub address: Option<SymbolAddress>,
}

/// Family state after the resolver ran. Read-only from then on.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedFamily {
    support: Vec<bool>,
    slots: Vec<Option<Binding>>,
    promoted: Vec<String>,
}

impl ResolvedFamily {
    /// Capabilities that became supported through fallback, in order.
    pub fn promoted(&self) -> &[String] {
        &self.promoted
    }

    pub fn supported_count(&self) -> usize {
        self.support.iter().filter(|s| **s).count()
    }
}

/// Runtime support flags and entry-point slots for one family.
pub struct FamilyRuntime {
    plan: FamilyPlan,
    capability_index: HashMap<String, usize>,
    slot_index: HashMap<String, SlotId>,
    slot_names: Vec<String>,
    slot_linkage: Vec<Linkage>,
    static_slots: Vec<OnceLock<Binding>>,
    oracle: Box<dyn SupportOracle>,
    lookup: Box<dyn SymbolLookup>,
    started: AtomicBool,
    resolved: OnceLock<ResolvedFamily>,
}

impl fmt::Debug for FamilyRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FamilyRuntime")
            .field("prefix", &self.plan.prefix)
            .field("state", &self.state())
            .finish()
    }
}

impl FamilyRuntime {
    pub fn new(
        plan: FamilyPlan,
        oracle: impl SupportOracle + 'static,
        lookup: impl SymbolLookup + 'static,
    ) -> Self {
        let capability_index = plan
            .capabilities
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        let slot_names: Vec<String> = plan.slot_names().into_iter().map(String::from).collect();
        let slot_index: HashMap<String, SlotId> = slot_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), SlotId(i)))
            .collect();

        // Linkage is the owning (first) declaration's.
        let mut slot_linkage = vec![Linkage::Dynamic; slot_names.len()];
        let mut assigned = HashSet::new();
        for entry in plan.capabilities.iter().flat_map(|c| &c.entry_points) {
            if let Some(SlotId(i)) = slot_index.get(&entry.name) {
                if assigned.insert(*i) {
                    slot_linkage[*i] = entry.linkage;
                }
            }
        }

        let static_slots = slot_names.iter().map(|_| OnceLock::new()).collect();

        FamilyRuntime {
            plan,
            capability_index,
            slot_index,
            slot_names,
            slot_linkage,
            static_slots,
            oracle: Box::new(oracle),
            lookup: Box::new(lookup),
            started: AtomicBool::new(false),
            resolved: OnceLock::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.plan.prefix
    }

    pub fn state(&self) -> InitState {
        if self.resolved.get().is_some() {
            InitState::Ready
        } else if self.started.load(Ordering::Acquire) {
            InitState::Initializing
        } else {
            InitState::Uninitialized
        }
    }

    /// Run the family resolver if it has not run yet.
    ///
    /// Safe to call any number of times from any thread; the resolver runs
    /// once per runtime. The support oracle and lookup service must not call
    /// back into this runtime.
    pub fn initialize(&self) -> &ResolvedFamily {
        self.resolved.get_or_init(|| {
            self.started.store(true, Ordering::Release);
            let resolved = self.resolve();
            tracing::debug!(
                "{}: resolved {} capabilities, {} supported, {} promoted",
                self.plan.prefix,
                self.plan.capabilities.len(),
                resolved.supported_count(),
                resolved.promoted.len()
            );
            resolved
        })
    }

    /// Support query for a capability of this family.
    ///
    /// Unknown names report `false`.
    pub fn is_supported(&self, capability: &str) -> bool {
        match self.capability_index.get(capability) {
            Some(&i) => self.initialize().support[i],
            None => {
                tracing::debug!("{}: unknown capability `{}`", self.plan.prefix, capability);
                false
            }
        }
    }

    /// Resolve an entry-point name to its slot. Does not initialize.
    pub fn slot(&self, entry_point: &str) -> Option<SlotId> {
        self.slot_index.get(entry_point).copied()
    }

    /// Read a slot, running the resolver first if needed.
    pub fn binding(&self, slot: SlotId) -> Option<&Binding> {
        self.initialize().slots.get(slot.0)?.as_ref()
    }

    /// Address to call through `slot`, or `None` if it stayed unbound.
    ///
    /// Static-linkage slots never run the resolver: unless the resolver
    /// already fixed them, they are looked up directly by their own name.
    pub fn address(&self, slot: SlotId) -> Option<SymbolAddress> {
        if self.is_static(slot.0) {
            let own = &self.slot_names[slot.0];
            return self.fix_static(slot.0, own, BindingSource::Native).address;
        }
        self.binding(slot).and_then(|b| b.address)
    }

    /// Convenience: look up the slot by name and read its address.
    pub fn address_of(&self, entry_point: &str) -> Option<SymbolAddress> {
        self.address(self.slot(entry_point)?)
    }

    fn is_static(&self, i: usize) -> bool {
        self.slot_linkage.get(i) == Some(&Linkage::Static)
    }

    /// Resolve a static slot once; later calls return the first result.
    fn fix_static(&self, i: usize, symbol: &str, source: BindingSource) -> &Binding {
        self.static_slots[i].get_or_init(|| Binding {
            symbol: symbol.to_string(),
            source,
            address: self.lookup.lookup(symbol),
        })
    }

    fn resolve(&self) -> ResolvedFamily {
        let mut resolved = ResolvedFamily {
            support: vec![false; self.plan.capabilities.len()],
            slots: vec![None; self.slot_index.len()],
            promoted: Vec::new(),
        };
        let mut promoted: HashSet<String> = HashSet::new();

        for (i, cap) in self.plan.capabilities.iter().enumerate() {
            if self.test(&promoted, &cap.name) {
                resolved.support[i] = true;
                self.bind_native(cap, &mut resolved.slots);
                continue;
            }

            if !cap.has_backup() {
                continue;
            }

            for plan in &cap.plans {
                let Some(position) = plan.signature.iter().position(|s| self.test(&promoted, s))
                else {
                    continue;
                };
                let source = &plan.signature[position];
                for (entry, substitute) in plan.bindings_at(position) {
                    self.bind(&mut resolved.slots, entry, substitute, BindingSource::Substitute {
                        capability: source.clone(),
                    });
                }
                if cap.promotion == Promotion::InBranch {
                    resolved.support[i] = true;
                    self.promote(cap, &mut promoted, &mut resolved.promoted);
                }
            }

            if matches!(cap.promotion, Promotion::Aggregate { .. })
                && cap.promotion.holds(&cap.plans, |name| self.test(&promoted, name))
            {
                resolved.support[i] = true;
                self.promote(cap, &mut promoted, &mut resolved.promoted);
            }
        }

        resolved
    }

    fn test(&self, promoted: &HashSet<String>, name: &str) -> bool {
        promoted.contains(name) || self.oracle.is_supported(name)
    }

    fn promote(&self, cap: &CapabilityPlan, promoted: &mut HashSet<String>, order: &mut Vec<String>) {
        if promoted.insert(cap.name.clone()) {
            tracing::debug!("{}: promoted through fallback", cap.name);
            order.push(cap.name.clone());
        }
    }

    fn bind_native(&self, cap: &CapabilityPlan, slots: &mut [Option<Binding>]) {
        let names = cap
            .entry_points
            .iter()
            .map(|e| e.name.as_str())
            .chain(cap.additional_entry_points.iter().map(String::as_str));
        for name in names {
            self.bind(slots, name, name, BindingSource::Native);
        }
    }

    fn bind(&self, slots: &mut [Option<Binding>], entry: &str, symbol: &str, source: BindingSource) {
        let Some(SlotId(i)) = self.slot_index.get(entry).copied() else {
            return;
        };
        if self.is_static(i) {
            slots[i] = Some(self.fix_static(i, symbol, source).clone());
            return;
        }
        slots[i] = Some(Binding {
            symbol: symbol.to_string(),
            source,
            address: self.lookup.lookup(symbol),
        });
    }
}
