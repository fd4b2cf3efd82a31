use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use soulfuse_fusion::{FusionDistribution, FusionResult};
use soulfuse_types::{SlotId, ValueId};

use crate::error::{Result, SelectionError};

/// Running probability sum over a user-chosen subset of fusion outcomes.
///
/// The sum is always recomputed from scratch over the selected positions in
/// ascending order. Any given set of positions therefore maps to exactly one
/// floating-point total, no matter how it was reached.
#[derive(Clone, Debug, Default)]
pub struct SelectionAggregator {
    distribution: Arc<FusionDistribution>,
    selected: BTreeSet<usize>,
    cumulative: f64,
}

impl SelectionAggregator {
    /// Start an empty selection over `distribution`.
    pub fn new(distribution: impl Into<Arc<FusionDistribution>>) -> Self {
        Self {
            distribution: distribution.into(),
            selected: BTreeSet::new(),
            cumulative: 0.0,
        }
    }

    /// Swap in a new distribution. The selection is cleared.
    pub fn replace(&mut self, distribution: impl Into<Arc<FusionDistribution>>) {
        self.distribution = distribution.into();
        self.reset();
    }

    /// Flip the selection state of `index` and return the new cumulative probability.
    ///
    /// An out-of-range index is rejected and leaves the selection unchanged.
    pub fn toggle(&mut self, index: usize) -> Result<f64> {
        self.check(index)?;
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
        Ok(self.recompute())
    }

    /// Deselect everything.
    pub fn reset(&mut self) {
        self.selected.clear();
        self.cumulative = 0.0;
        debug!(results = self.distribution.len(), "selection reset");
    }

    /// Sum of the probabilities at the selected positions.
    pub fn cumulative_probability(&self) -> f64 {
        self.cumulative
    }

    /// Cumulative probability as a percentage with four decimals, e.g. `"37.5000%"`.
    pub fn formatted(&self) -> String {
        format!("{:.4}%", (self.cumulative * 100.0).abs())
    }

    /// Select every outcome.
    pub fn select_all(&mut self) -> f64 {
        self.selected.extend(0..self.distribution.len());
        self.recompute()
    }

    /// Add every outcome matching `predicate` to the selection.
    ///
    /// Already selected outcomes stay selected.
    pub fn select_where(&mut self, mut predicate: impl FnMut(&FusionResult) -> bool) -> f64 {
        let matching: Vec<usize> = self
            .distribution
            .iter()
            .enumerate()
            .filter(|(_, result)| predicate(result))
            .map(|(index, _)| index)
            .collect();
        self.selected.extend(matching);
        self.recompute()
    }

    /// Add every outcome whose `slot` holds `value`.
    pub fn select_matching(&mut self, slot: SlotId, value: ValueId) -> f64 {
        self.select_where(|result| result.entity.value(slot) == Some(value))
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Selected positions in ascending order.
    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    /// Number of selected positions.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// The distribution selections refer to.
    pub fn distribution(&self) -> &Arc<FusionDistribution> {
        &self.distribution
    }

    fn check(&self, index: usize) -> Result<()> {
        let len = self.distribution.len();
        if index >= len {
            return Err(SelectionError::InvalidSelectionIndex { index, len });
        }
        Ok(())
    }

    fn recompute(&mut self) -> f64 {
        self.cumulative = self
            .selected
            .iter()
            .filter_map(|&i| self.distribution.get(i))
            .map(|r| r.probability)
            .sum();
        self.cumulative
    }
}
