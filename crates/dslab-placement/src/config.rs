//! Placement configuration.

pub mod options;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, HypervisorCandidate};
use crate::error::{PlacementError, Result};
use crate::objective::ObjectiveWeights;
use crate::request::{FeatureRequirement, PlacementRequest, SelectionCountPolicy};
use crate::selector::{Selector, DEFAULT_MAX_SOLVER_THREADS};
use crate::solver::solver_resolver;

/// Holds raw config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawPlacementConfig {
    pub solver: Option<String>,
    pub solver_timeout: Option<f64>,
    pub max_solver_threads: Option<usize>,
    pub weights: Option<RawWeightsConfig>,
    pub candidates: Option<Vec<CandidateConfig>>,
    pub requests: Option<Vec<RequestConfig>>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawWeightsConfig {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub bonus_per_selection: Option<f64>,
}

/// Holds configuration of a single hypervisor or a set of identical hypervisors.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CandidateConfig {
    /// Candidate name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// Candidate name prefix.
    /// Full name is produced by appending instance number to the prefix.
    /// Should be set if count > 1.
    pub name_prefix: Option<String>,
    /// vCPU capacity.
    pub vcpus: u32,
    /// RAM capacity.
    pub ram: u64,
    /// Operator priority, lower is more preferred.
    pub priority: i32,
    /// Hardware offload support, false if absent.
    pub supports_feature: Option<bool>,
    /// Informational location label.
    pub location: Option<String>,
    /// Number of such candidates.
    pub count: Option<u32>,
}

/// Holds configuration of a single placement request.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct RequestConfig {
    pub required_vcpu: u32,
    pub required_ram: u64,
    /// Required feature support, absent means "don't care".
    pub required_feature: Option<bool>,
    /// Cardinality policy, e.g. `AtLeast[count=2]`.
    pub policy: String,
    pub allow_empty: Option<bool>,
}

impl RequestConfig {
    pub fn to_request(&self) -> Result<PlacementRequest> {
        Ok(PlacementRequest::new(
            self.required_vcpu,
            self.required_ram,
            SelectionCountPolicy::from_str(&self.policy)?,
        )
        .with_feature(FeatureRequirement::from_flag(self.required_feature))
        .with_allow_empty(self.allow_empty.unwrap_or(false)))
    }
}

/// Represents placement configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PlacementConfig {
    /// Solver backend, e.g. `Microlp[tolerance=1e-6]`.
    pub solver: String,
    /// Solve timeout in seconds, no timeout if absent.
    pub solver_timeout: Option<f64>,
    /// Limit of live solver threads when `solver_timeout` is set.
    pub max_solver_threads: usize,
    pub weights: ObjectiveWeights,
    pub candidates: Vec<CandidateConfig>,
    pub requests: Vec<RequestConfig>,
}

impl PlacementConfig {
    /// Creates config with default values, no candidates and no requests.
    pub fn new() -> Self {
        Self {
            solver: "Microlp".to_string(),
            solver_timeout: None,
            max_solver_threads: DEFAULT_MAX_SOLVER_THREADS,
            weights: ObjectiveWeights::default(),
            candidates: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Creates config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self> {
        let content = std::fs::read_to_string(file_name)
            .map_err(|e| PlacementError::Config(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_yaml(&content).map_err(|e| match e {
            PlacementError::Config(msg) => PlacementError::Config(format!("{}: {}", file_name, msg)),
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawPlacementConfig =
            serde_yaml::from_str(content).map_err(|e| PlacementError::Config(format!("can't parse YAML: {}", e)))?;
        let default = Self::new();
        let weights = match raw.weights {
            Some(w) => ObjectiveWeights {
                alpha: w.alpha.unwrap_or(default.weights.alpha),
                beta: w.beta.unwrap_or(default.weights.beta),
                bonus_per_selection: w.bonus_per_selection.unwrap_or(default.weights.bonus_per_selection),
            },
            None => default.weights,
        };
        Ok(Self {
            solver: raw.solver.unwrap_or(default.solver),
            solver_timeout: raw.solver_timeout,
            max_solver_threads: raw.max_solver_threads.unwrap_or(default.max_solver_threads),
            weights,
            candidates: raw.candidates.unwrap_or_default(),
            requests: raw.requests.unwrap_or_default(),
        })
    }

    /// Returns total candidates count.
    pub fn number_of_candidates(&self) -> u32 {
        self.candidates.iter().map(|c| c.count.unwrap_or(1)).sum()
    }

    /// Expands candidate configs into a catalog.
    pub fn build_catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::new();
        for config in &self.candidates {
            let count = config.count.unwrap_or(1);
            for i in 0..count {
                let name = if count == 1 && config.name.is_some() {
                    config.name.clone().unwrap_or_default()
                } else {
                    let prefix = config.name_prefix.as_ref().ok_or_else(|| {
                        PlacementError::Config("name_prefix must be set for candidates with count > 1".to_string())
                    })?;
                    format!("{}{}", prefix, i + 1)
                };
                let mut candidate = HypervisorCandidate::new(&name, config.vcpus, config.ram, config.priority)
                    .with_feature(config.supports_feature.unwrap_or(false));
                if let Some(location) = &config.location {
                    candidate = candidate.with_location(location);
                }
                catalog.add_candidate(candidate)?;
            }
        }
        Ok(catalog)
    }

    pub fn build_requests(&self) -> Result<Vec<PlacementRequest>> {
        self.requests.iter().map(|r| r.to_request()).collect()
    }

    /// Creates selector with the configured solver and timeout.
    pub fn build_selector(&self) -> Result<Selector> {
        let solver = solver_resolver(&self.solver)?;
        let mut selector = Selector::new(Arc::from(solver)).with_max_solver_threads(self.max_solver_threads);
        if let Some(timeout) = self.solver_timeout {
            if !timeout.is_finite() || timeout <= 0. {
                return Err(PlacementError::Config(format!(
                    "solver_timeout must be positive, got {}",
                    timeout
                )));
            }
            selector = selector.with_timeout(Duration::from_secs_f64(timeout));
        }
        Ok(selector)
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self::new()
    }
}
