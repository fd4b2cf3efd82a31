//! The ordered outcome list of one fusion query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use soulfuse_types::{Entity, SlotId, ValueId};

/// One possible fused soul and the probability of getting it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub entity: Entity,
    pub probability: f64,
}

/// All distinct outcomes of one fusion, most likely first.
///
/// Distributions are transient: they are owned by the query that produced
/// them and replaced wholesale when the inputs change.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionDistribution {
    results: Vec<FusionResult>,
    pruned_mass: f64,
}

impl FusionDistribution {
    /// The distribution of a fusion with a parent missing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(results: Vec<FusionResult>, pruned_mass: f64) -> Self {
        Self {
            results,
            pruned_mass,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FusionResult> {
        self.results.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FusionResult> {
        self.results.iter()
    }

    pub fn results(&self) -> &[FusionResult] {
        &self.results
    }

    /// Sum of all listed probabilities.
    pub fn total_probability(&self) -> f64 {
        self.results.iter().map(|r| r.probability).sum()
    }

    /// Mass dropped by branch pruning before any renormalization.
    pub fn pruned_mass(&self) -> f64 {
        self.pruned_mass
    }

    /// Position of an entity in the list.
    pub fn position(&self, entity: &Entity) -> Option<usize> {
        self.results.iter().position(|r| &r.entity == entity)
    }

    /// Probability of an entity, zero if it cannot result.
    pub fn probability_of(&self, entity: &Entity) -> f64 {
        self.results
            .iter()
            .find(|r| &r.entity == entity)
            .map_or(0.0, |r| r.probability)
    }

    /// Per-value probability of the child's value on one slot.
    ///
    /// Values that never occur are omitted. Pairs are ordered by value.
    pub fn marginal(&self, slot: SlotId) -> Vec<(ValueId, f64)> {
        let mut totals: BTreeMap<ValueId, f64> = BTreeMap::new();
        for result in &self.results {
            if let Some(value) = result.entity.value(slot) {
                *totals.entry(value).or_insert(0.0) += result.probability;
            }
        }
        totals.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a FusionDistribution {
    type Item = &'a FusionResult;
    type IntoIter = std::slice::Iter<'a, FusionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(values: &[u32]) -> Entity {
        Entity::new(values.iter().copied().map(ValueId::new).collect())
    }

    fn sample() -> FusionDistribution {
        FusionDistribution::from_parts(
            vec![
                FusionResult { entity: entity(&[0, 1]), probability: 0.5 },
                FusionResult { entity: entity(&[1, 1]), probability: 0.3 },
                FusionResult { entity: entity(&[0, 0]), probability: 0.2 },
            ],
            0.0,
        )
    }

    #[test]
    fn empty_distribution() {
        let d = FusionDistribution::empty();
        assert!(d.is_empty());
        assert_eq!(d.total_probability(), 0.0);
        assert_eq!(d.pruned_mass(), 0.0);
    }

    #[test]
    fn lookup_by_entity() {
        let d = sample();
        assert_eq!(d.position(&entity(&[1, 1])), Some(1));
        assert_eq!(d.probability_of(&entity(&[0, 0])), 0.2);
        assert_eq!(d.probability_of(&entity(&[1, 0])), 0.0);
        assert_eq!(d.position(&entity(&[1, 0])), None);
    }

    #[test]
    fn marginal_sums_over_other_slots() {
        let d = sample();
        let first = d.marginal(SlotId::new(0));
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].0, ValueId::new(0));
        assert!((first[0].1 - 0.7).abs() < 1e-12);
        assert_eq!(first[1], (ValueId::new(1), 0.3));

        let second = d.marginal(SlotId::new(1));
        assert_eq!(second[0], (ValueId::new(0), 0.2));
        assert!((second[1].1 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn iterates_in_order() {
        let d = sample();
        let probs: Vec<f64> = d.iter().map(|r| r.probability).collect();
        assert_eq!(probs, vec![0.5, 0.3, 0.2]);
        assert_eq!((&d).into_iter().count(), 3);
    }
}
