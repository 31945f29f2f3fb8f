//! Test utilities and mocks for unit tests.
//!
//! The runtime talks to the host through two services: the support oracle
//! and the symbol lookup. The recording mocks here answer from a fixed set
//! and remember every question, so tests can assert both answers and call
//! counts.

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::runtime::{SupportOracle, SymbolAddress, SymbolLookup};

pub use fixtures::*;

/// Support oracle answering from a fixed set of capability names.
///
/// Clones share the call log.
#[derive(Debug, Clone, Default)]
pub struct RecordingOracle {
    supported: Arc<HashSet<String>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingOracle {
    pub fn new(supported: &[&str]) -> Self {
        RecordingOracle {
            supported: Arc::new(supported.iter().map(|s| s.to_string()).collect()),
            calls: Arc::default(),
        }
    }

    /// Every query so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, capability: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c == capability)
            .count()
    }
}

impl SupportOracle for RecordingOracle {
    fn is_supported(&self, capability: &str) -> bool {
        self.calls.lock().unwrap().push(capability.to_string());
        self.supported.contains(capability)
    }
}

/// Symbol lookup handing out stable fake addresses.
///
/// Every symbol resolves unless listed as missing. The same symbol always
/// gets the same address.
#[derive(Debug, Clone, Default)]
pub struct RecordingLookup {
    missing: Arc<HashSet<String>>,
    addresses: Arc<Mutex<HashMap<String, usize>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingLookup {
    pub fn new() -> Self {
        RecordingLookup::default()
    }

    /// Lookup for which `missing` symbols do not exist.
    pub fn without(missing: &[&str]) -> Self {
        RecordingLookup {
            missing: Arc::new(missing.iter().map(|s| s.to_string()).collect()),
            ..RecordingLookup::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SymbolLookup for RecordingLookup {
    fn lookup(&self, symbol: &str) -> Option<SymbolAddress> {
        self.calls.lock().unwrap().push(symbol.to_string());
        if self.missing.contains(symbol) {
            return None;
        }
        let mut addresses = self.addresses.lock().unwrap();
        let next = (addresses.len() + 1) * 0x10;
        let raw = *addresses.entry(symbol.to_string()).or_insert(next);
        SymbolAddress::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_records_queries() {
        let oracle = RecordingOracle::new(&["GL_B"]);
        assert!(oracle.is_supported("GL_B"));
        assert!(!oracle.is_supported("GL_C"));
        assert_eq!(oracle.calls(), vec!["GL_B", "GL_C"]);
        assert_eq!(oracle.clone().call_count(), 2);
    }

    #[test]
    fn test_lookup_addresses_are_stable() {
        let lookup = RecordingLookup::without(&["glMissing"]);
        let a = lookup.lookup("glA");
        assert!(a.is_some());
        assert_eq!(lookup.lookup("glA"), a);
        assert_ne!(lookup.lookup("glB"), a);
        assert!(lookup.lookup("glMissing").is_none());
        assert_eq!(lookup.call_count(), 4);
    }
}
