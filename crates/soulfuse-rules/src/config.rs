//! Serializable rule table configuration.
//!
//! This is the on-disk shape of a rule table. It is only a description: names
//! are unresolved and weights unchecked until the config is compiled into a
//! [`RuleTable`](crate::RuleTable).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default tolerance for a distribution's weight sum.
pub const DEFAULT_WEIGHT_TOLERANCE: f64 = 1e-9;

fn default_tolerance() -> f64 {
    DEFAULT_WEIGHT_TOLERANCE
}

fn default_left_weight() -> f64 {
    0.5
}

/// A complete rule table document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Allowed deviation of each distribution's weight sum from 1.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Slots in entity order.
    pub slots: Vec<SlotConfig>,
    /// Explicit rules. These override anything a slot policy generates.
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_WEIGHT_TOLERANCE,
            slots: Vec::new(),
            rules: Vec::new(),
        }
    }
}

/// One slot and the policy that fills its rule entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub name: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub policy: SlotPolicy,
}

/// How rule entries not listed explicitly are produced for a slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotPolicy {
    /// Every ordered parent pair must appear in `rules`.
    #[default]
    Explicit,
    /// The child inherits the left parent's value with probability
    /// `left_weight` and the right parent's otherwise.
    Inherit {
        #[serde(default = "default_left_weight")]
        left_weight: f64,
    },
}

impl SlotPolicy {
    /// Even inheritance from both parents.
    pub fn inherit_even() -> Self {
        Self::Inherit { left_weight: 0.5 }
    }
}

/// One explicit `(slot, left, right) -> {value: weight}` rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub slot: String,
    pub left: String,
    pub right: String,
    pub outcomes: BTreeMap<String, f64>,
}
