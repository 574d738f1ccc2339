//! Structural feasibility of candidates.

use crate::catalog::HypervisorCandidate;
use crate::request::PlacementRequest;

/// Hard feasibility dimensions checked for every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeasibilityDimension {
    Vcpu,
    Ram,
    Feature,
}

impl FeasibilityDimension {
    pub const ALL: [FeasibilityDimension; 3] = [
        FeasibilityDimension::Vcpu,
        FeasibilityDimension::Ram,
        FeasibilityDimension::Feature,
    ];
}

/// Result of checking a candidate against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeasibilityVerdict {
    NotEnoughVcpu,
    NotEnoughRam,
    FeatureMismatch,
    Success,
}

/// Checks a single hard dimension.
pub fn passes(dimension: FeasibilityDimension, candidate: &HypervisorCandidate, request: &PlacementRequest) -> bool {
    match dimension {
        FeasibilityDimension::Vcpu => candidate.vcpu_capacity >= request.required_vcpu,
        FeasibilityDimension::Ram => candidate.ram_capacity >= request.required_ram,
        FeasibilityDimension::Feature => request.required_feature.matches(candidate.supports_feature),
    }
}

/// Returns the first failing dimension of the candidate or `Success`.
pub fn check(candidate: &HypervisorCandidate, request: &PlacementRequest) -> FeasibilityVerdict {
    if !passes(FeasibilityDimension::Vcpu, candidate, request) {
        return FeasibilityVerdict::NotEnoughVcpu;
    }
    if !passes(FeasibilityDimension::Ram, candidate, request) {
        return FeasibilityVerdict::NotEnoughRam;
    }
    if !passes(FeasibilityDimension::Feature, candidate, request) {
        return FeasibilityVerdict::FeatureMismatch;
    }
    FeasibilityVerdict::Success
}

pub fn is_structurally_feasible(candidate: &HypervisorCandidate, request: &PlacementRequest) -> bool {
    check(candidate, request) == FeasibilityVerdict::Success
}
