//! Candidate catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, Result};

/// Stores hypervisor properties: resource capacity, operator priority and feature flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypervisorCandidate {
    pub name: String,
    pub vcpu_capacity: u32,
    pub ram_capacity: u64,
    /// Lower value means more preferred.
    pub priority: i32,
    /// Hardware offload capability (e.g. SR-IOV).
    pub supports_feature: bool,
    /// Informational label, not used in constraints.
    pub location: Option<String>,
}

impl HypervisorCandidate {
    /// Creates candidate without feature support and location.
    pub fn new(name: &str, vcpu_capacity: u32, ram_capacity: u64, priority: i32) -> Self {
        Self {
            name: name.to_string(),
            vcpu_capacity,
            ram_capacity,
            priority,
            supports_feature: false,
            location: None,
        }
    }

    pub fn with_feature(mut self, supports_feature: bool) -> Self {
        self.supports_feature = supports_feature;
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }
}

/// Read-only set of candidates evaluated by one decision.
///
/// Candidates are kept ordered by name, so every iteration over the catalog visits them in the same
/// deterministic order. Callers that share a catalog with a mutating inventory should clone it before
/// starting a decision.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    candidates: BTreeMap<String, HypervisorCandidate>,
}

impl Catalog {
    /// Creates empty catalog.
    pub fn new() -> Self {
        Self {
            candidates: BTreeMap::new(),
        }
    }

    /// Adds candidate to catalog.
    pub fn add_candidate(&mut self, candidate: HypervisorCandidate) -> Result<()> {
        if candidate.name.is_empty() {
            return Err(PlacementError::InvalidCatalog("candidate name is empty".to_string()));
        }
        if candidate.vcpu_capacity == 0 || candidate.ram_capacity == 0 {
            return Err(PlacementError::InvalidCatalog(format!(
                "candidate {} must have positive vcpu and ram capacity",
                candidate.name
            )));
        }
        if self.candidates.contains_key(&candidate.name) {
            return Err(PlacementError::InvalidCatalog(format!(
                "duplicate candidate {}",
                candidate.name
            )));
        }
        self.candidates.insert(candidate.name.clone(), candidate);
        Ok(())
    }

    /// Builds catalog from a list of candidates.
    pub fn from_candidates(candidates: impl IntoIterator<Item = HypervisorCandidate>) -> Result<Self> {
        let mut catalog = Self::new();
        for candidate in candidates {
            catalog.add_candidate(candidate)?;
        }
        Ok(catalog)
    }

    /// Returns candidate with the specified name.
    pub fn get(&self, name: &str) -> Option<&HypervisorCandidate> {
        self.candidates.get(name)
    }

    /// Returns names of all candidates in id order.
    pub fn get_candidate_names(&self) -> Vec<String> {
        self.candidates.keys().cloned().collect()
    }

    /// Returns the number of candidates.
    pub fn get_candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Iterates over candidates in id order.
    pub fn iter(&self) -> impl Iterator<Item = &HypervisorCandidate> {
        self.candidates.values()
    }
}
