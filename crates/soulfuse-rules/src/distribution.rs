//! Child value distribution for one parent pair on one slot.

use serde::Serialize;

use soulfuse_types::ValueId;

/// Weighted child values for a single `(slot, left, right)` rule.
///
/// # Invariants
///
/// - Every weight is in `(0, 1]`; zero-weight outcomes are dropped on build.
/// - Each value appears at most once.
/// - Outcomes are ordered by [`ValueId`].
/// - Weights sum to 1. The loader checks each rule against the table's
///   tolerance, then rescales it with [`SlotDistribution::normalized`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlotDistribution {
    outcomes: Vec<(ValueId, f64)>,
}

impl SlotDistribution {
    /// A distribution that always yields `value`.
    pub fn certain(value: ValueId) -> Self {
        Self {
            outcomes: vec![(value, 1.0)],
        }
    }

    /// The child takes `left` with probability `left_weight`, `right` otherwise.
    ///
    /// Collapses to a certain outcome when both parents agree or one side
    /// carries all of the weight.
    pub fn inherit(left: ValueId, right: ValueId, left_weight: f64) -> Self {
        if left == right || left_weight >= 1.0 {
            return Self::certain(left);
        }
        if left_weight <= 0.0 {
            return Self::certain(right);
        }
        Self::from_weights([(left, left_weight), (right, 1.0 - left_weight)])
    }

    /// Build from raw weights: sums repeated values, drops zeros, sorts by value.
    ///
    /// Range and sum checks are the caller's job. [`RuleTable`](crate::RuleTable)
    /// performs them at load; other [`FusionRules`](crate::FusionRules)
    /// implementations must uphold the sum-to-one contract themselves.
    pub fn from_weights(weights: impl IntoIterator<Item = (ValueId, f64)>) -> Self {
        let mut outcomes: Vec<(ValueId, f64)> = Vec::new();
        for (value, weight) in weights {
            match outcomes.iter_mut().find(|(v, _)| *v == value) {
                Some((_, w)) => *w += weight,
                None => outcomes.push((value, weight)),
            }
        }
        outcomes.retain(|(_, w)| *w > 0.0);
        outcomes.sort_by_key(|(v, _)| *v);
        Self { outcomes }
    }

    /// Rescale the weights so they sum to 1.
    ///
    /// An empty or zero-mass distribution is returned unchanged.
    pub fn normalized(mut self) -> Self {
        let total = self.total();
        if total > 0.0 {
            for (_, weight) in &mut self.outcomes {
                *weight /= total;
            }
        }
        self
    }

    /// Outcomes in value order.
    pub fn outcomes(&self) -> &[(ValueId, f64)] {
        &self.outcomes
    }

    pub fn iter(&self) -> impl Iterator<Item = (ValueId, f64)> + '_ {
        self.outcomes.iter().copied()
    }

    /// Number of outcomes with nonzero weight.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// The single value this distribution always yields, if it does not branch.
    pub fn certain_value(&self) -> Option<ValueId> {
        match self.outcomes.as_slice() {
            [(value, _)] => Some(*value),
            _ => None,
        }
    }

    /// Weight of `value`, zero if absent.
    pub fn weight(&self, value: ValueId) -> f64 {
        self.outcomes
            .iter()
            .find(|(v, _)| *v == value)
            .map_or(0.0, |(_, w)| *w)
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.outcomes.iter().map(|(_, w)| w).sum()
    }
}
