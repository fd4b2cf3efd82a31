use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

/// Default allowed deviation of a distribution's total mass from 1.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Configuration for the fusion enumerator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumeratorConfig {
    /// Branches whose partial probability falls below this are dropped before
    /// the remaining slots are expanded. `0.0` disables pruning.
    pub prune_epsilon: f64,
    /// Allowed deviation of kept plus pruned mass from 1.
    pub tolerance: f64,
    /// Rescale kept probabilities so they sum to exactly 1 (up to rounding).
    pub renormalize: bool,
}

impl Default for EnumeratorConfig {
    fn default() -> Self {
        Self {
            prune_epsilon: 0.0,
            tolerance: DEFAULT_TOLERANCE,
            renormalize: true,
        }
    }
}

impl EnumeratorConfig {
    /// Default configuration with branch pruning below `epsilon`.
    pub fn pruned(epsilon: f64) -> Self {
        Self {
            prune_epsilon: epsilon,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.prune_epsilon.is_finite() || !(0.0..1.0).contains(&self.prune_epsilon) {
            return Err(FusionError::InvalidConfig(format!(
                "prune_epsilon must be in [0, 1), got {}",
                self.prune_epsilon
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(FusionError::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}
