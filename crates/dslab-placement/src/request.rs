//! Placement request and cardinality policy.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::config::options::ConfigValue;
use crate::error::{PlacementError, Result};

/// Requirement on the hardware offload feature of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureRequirement {
    /// Feature support does not matter.
    Any,
    /// Candidate must support the feature.
    Present,
    /// Candidate must not support the feature.
    Absent,
}

impl FeatureRequirement {
    /// Maps optional flag from config to requirement, `None` meaning "don't care".
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => FeatureRequirement::Any,
            Some(true) => FeatureRequirement::Present,
            Some(false) => FeatureRequirement::Absent,
        }
    }

    pub fn matches(&self, supports_feature: bool) -> bool {
        match self {
            FeatureRequirement::Any => true,
            FeatureRequirement::Present => supports_feature,
            FeatureRequirement::Absent => !supports_feature,
        }
    }
}

/// Rule constraining how many candidates may or must be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionCountPolicy {
    AtLeast(u32),
    AtMost(u32),
    Exactly(u32),
}

impl SelectionCountPolicy {
    /// Parses policy from config string like `AtLeast[count=2]`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        let value = ConfigValue::parse(s);
        let count = value.required_option::<u32>("count")?;
        match value.name.as_str() {
            "AtLeast" => Ok(SelectionCountPolicy::AtLeast(count)),
            "AtMost" => Ok(SelectionCountPolicy::AtMost(count)),
            "Exactly" => Ok(SelectionCountPolicy::Exactly(count)),
            _ => Err(PlacementError::Config(format!("can't resolve selection policy: {}", s))),
        }
    }

    pub fn lower_bound(&self) -> u32 {
        match self {
            SelectionCountPolicy::AtLeast(k) | SelectionCountPolicy::Exactly(k) => *k,
            SelectionCountPolicy::AtMost(_) => 0,
        }
    }

    pub fn upper_bound(&self) -> Option<u32> {
        match self {
            SelectionCountPolicy::AtLeast(_) => None,
            SelectionCountPolicy::AtMost(k) | SelectionCountPolicy::Exactly(k) => Some(*k),
        }
    }

    pub fn is_satisfied_by(&self, selected: usize) -> bool {
        let selected = selected as u64;
        match self {
            SelectionCountPolicy::AtLeast(k) => selected >= *k as u64,
            SelectionCountPolicy::AtMost(k) => selected <= *k as u64,
            SelectionCountPolicy::Exactly(k) => selected == *k as u64,
        }
    }
}

impl Display for SelectionCountPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionCountPolicy::AtLeast(k) => write!(f, "AtLeast[count={}]", k),
            SelectionCountPolicy::AtMost(k) => write!(f, "AtMost[count={}]", k),
            SelectionCountPolicy::Exactly(k) => write!(f, "Exactly[count={}]", k),
        }
    }
}

/// Demand being placed by one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub required_vcpu: u32,
    pub required_ram: u64,
    pub required_feature: FeatureRequirement,
    pub selection_count_policy: SelectionCountPolicy,
    /// Whether an empty selection is an acceptable answer when the policy allows zero candidates.
    pub allow_empty: bool,
}

impl PlacementRequest {
    /// Creates request which does not care about feature support and needs at least one host.
    pub fn new(required_vcpu: u32, required_ram: u64, selection_count_policy: SelectionCountPolicy) -> Self {
        Self {
            required_vcpu,
            required_ram,
            required_feature: FeatureRequirement::Any,
            selection_count_policy,
            allow_empty: false,
        }
    }

    pub fn with_feature(mut self, required_feature: FeatureRequirement) -> Self {
        self.required_feature = required_feature;
        self
    }

    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    /// Rejects requests whose policy admits only the empty selection while empty selections are forbidden.
    pub fn validate(&self) -> Result<()> {
        if !self.allow_empty && self.selection_count_policy.upper_bound() == Some(0) {
            return Err(PlacementError::InvalidRequest(format!(
                "policy {} admits only an empty selection",
                self.selection_count_policy
            )));
        }
        Ok(())
    }

    /// Returns true if the policy alone would accept an empty selection but the request forbids it.
    pub fn needs_non_empty_constraint(&self) -> bool {
        !self.allow_empty && self.selection_count_policy.lower_bound() == 0
    }

    /// Checks the size of a selected set against the policy and the non-empty rule.
    pub fn accepts_selection_count(&self, selected: usize) -> bool {
        if self.needs_non_empty_constraint() && selected == 0 {
            return false;
        }
        self.selection_count_policy.is_satisfied_by(selected)
    }
}
