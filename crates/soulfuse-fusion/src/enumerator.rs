//! Joint outcome enumeration over independent slots.
//!
//! The enumerator expands a set of partial souls one slot at a time, in schema
//! order. It starts from a single empty partial with probability 1. For every
//! slot, each partial is extended by every outcome of that slot's
//! distribution and the probabilities multiply. Slots whose distribution is
//! certain extend every partial in place without branching.
//!
//! After the last slot, complete souls are merged by value equality and sorted
//! by descending probability. The sort is stable, so ties keep the order in
//! which the expansion first produced them.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, warn};

use soulfuse_rules::FusionRules;
use soulfuse_types::{Entity, ValueId};

use crate::config::EnumeratorConfig;
use crate::distribution::{FusionDistribution, FusionResult};
use crate::error::{FusionError, Parent, Result};

/// A soul assigned up to some slot, with the probability of that prefix.
struct Partial {
    values: Vec<ValueId>,
    probability: f64,
}

/// Computes fusion distributions against a shared rule set.
///
/// The enumerator borrows its rules and holds no other state, so one rule
/// table can back any number of enumerators, on any number of threads.
pub struct FusionEnumerator<'r, R: FusionRules + ?Sized> {
    rules: &'r R,
    config: EnumeratorConfig,
}

impl<'r, R: FusionRules + ?Sized> FusionEnumerator<'r, R> {
    /// Create an enumerator with the default configuration.
    pub fn new(rules: &'r R) -> Self {
        Self {
            rules,
            config: EnumeratorConfig::default(),
        }
    }

    /// Create an enumerator with a validated configuration.
    pub fn with_config(rules: &'r R, config: EnumeratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { rules, config })
    }

    pub fn rules(&self) -> &'r R {
        self.rules
    }

    pub fn config(&self) -> &EnumeratorConfig {
        &self.config
    }

    /// Fuse two complete parents.
    pub fn fuse(&self, left: &Entity, right: &Entity) -> Result<FusionDistribution> {
        self.enumerate(Some(left), Some(right))
    }

    /// Compute the distribution of every soul `left` and `right` can fuse into.
    ///
    /// If either parent is unset the result is an empty distribution. This is
    /// the state before both parents have been chosen, not an error.
    ///
    /// # Errors
    ///
    /// - [`FusionError::SlotCountMismatch`] if a parent does not cover the schema.
    /// - [`FusionError::InvalidParent`] if a parent value is outside its slot's domain.
    /// - [`FusionError::Config`] if the rules do not cover a parent pair.
    /// - [`FusionError::NumericalDrift`] if the total mass strays from 1 by
    ///   more than the tolerance, which indicates defective rules.
    pub fn enumerate(
        &self,
        left: Option<&Entity>,
        right: Option<&Entity>,
    ) -> Result<FusionDistribution> {
        let (Some(left), Some(right)) = (left, right) else {
            return Ok(FusionDistribution::empty());
        };

        let schema = self.rules.schema();
        for (parent, entity) in [(Parent::Left, left), (Parent::Right, right)] {
            if entity.len() != schema.len() {
                return Err(FusionError::SlotCountMismatch {
                    parent,
                    expected: schema.len(),
                    actual: entity.len(),
                });
            }
            schema
                .validate(entity)
                .map_err(|source| FusionError::InvalidParent { parent, source })?;
        }

        let epsilon = self.config.prune_epsilon;
        let mut partials = vec![Partial {
            values: Vec::with_capacity(schema.len()),
            probability: 1.0,
        }];
        let mut pruned_mass = 0.0;

        for ((slot, attribute), (&l, &r)) in schema
            .iter()
            .zip(left.values().iter().zip(right.values()))
        {
            let distribution = self.rules.distribution(slot, l, r)?;

            if let Some(value) = distribution.certain_value() {
                for partial in &mut partials {
                    partial.values.push(value);
                }
                continue;
            }

            let mut next = Vec::with_capacity(partials.len() * distribution.len());
            let mut pruned = 0usize;
            for partial in &partials {
                for (value, weight) in distribution.iter() {
                    let probability = partial.probability * weight;
                    if probability < epsilon {
                        pruned_mass += probability;
                        pruned += 1;
                        continue;
                    }
                    let mut values = Vec::with_capacity(schema.len());
                    values.extend_from_slice(&partial.values);
                    values.push(value);
                    next.push(Partial {
                        values,
                        probability,
                    });
                }
            }
            if pruned > 0 {
                warn!(
                    slot = %attribute.name,
                    left = attribute.value_name(l).unwrap_or("?"),
                    right = attribute.value_name(r).unwrap_or("?"),
                    pruned,
                    epsilon,
                    "pruned unlikely branches"
                );
            }
            partials = next;
        }

        let branches = partials.len();
        let mut results = merge_outcomes(
            partials
                .into_iter()
                .map(|p| (Entity::new(p.values), p.probability)),
        );
        results.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        let kept: f64 = results.iter().map(|r| r.probability).sum();
        let total = kept + pruned_mass;
        if (total - 1.0).abs() > self.config.tolerance {
            warn!(total, tolerance = self.config.tolerance, "fusion probability mass drifted");
            return Err(FusionError::NumericalDrift {
                total,
                tolerance: self.config.tolerance,
            });
        }
        if self.config.renormalize && kept > 0.0 {
            for result in &mut results {
                result.probability /= kept;
            }
        }

        debug!(
            branches,
            results = results.len(),
            pruned_mass,
            "enumerated fusion distribution"
        );

        Ok(FusionDistribution::from_parts(results, pruned_mass))
    }
}

/// Group outcomes by entity, summing probabilities.
///
/// Distinct expansion paths can land on the same soul. Each soul appears
/// once in the output, at the position where it was first seen.
pub(crate) fn merge_outcomes(
    outcomes: impl IntoIterator<Item = (Entity, f64)>,
) -> Vec<FusionResult> {
    let mut index: HashMap<Entity, usize> = HashMap::new();
    let mut results: Vec<FusionResult> = Vec::new();

    for (entity, probability) in outcomes {
        match index.entry(entity) {
            Entry::Occupied(slot) => results[*slot.get()].probability += probability,
            Entry::Vacant(slot) => {
                results.push(FusionResult {
                    entity: slot.key().clone(),
                    probability,
                });
                slot.insert(results.len() - 1);
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use soulfuse_rules::{ConfigResult, RuleTable, RuleTableBuilder, SlotDistribution};
    use soulfuse_types::{AttributeSlot, SlotId, SlotSchema, TypeError};

    /// Slot A over {x, y}, slot B over {p, q}.
    fn two_slot_table() -> RuleTable {
        RuleTableBuilder::new()
            .inherit_slot("A", ["x", "y"], 0.5)
            .inherit_slot("B", ["p", "q"], 0.5)
            .rule("A", "x", "x", [("x", 1.0)])
            .rule("B", "p", "q", [("p", 0.5), ("q", 0.5)])
            .build()
            .unwrap()
    }

    fn parse(table: &RuleTable, text: &str) -> Entity {
        Entity::parse(table.schema(), text).unwrap()
    }

    #[test]
    fn two_slot_example() {
        let table = two_slot_table();
        let left = parse(&table, "A=x,B=p");
        let right = parse(&table, "A=x,B=q");

        let dist = FusionEnumerator::new(&table).fuse(&left, &right).unwrap();
        assert_eq!(dist.len(), 2);
        assert_eq!(dist.results()[0].entity, left);
        assert_eq!(dist.results()[0].probability, 0.5);
        assert_eq!(dist.results()[1].entity, right);
        assert_eq!(dist.results()[1].probability, 0.5);
        assert_eq!(dist.total_probability(), 1.0);
    }

    #[test]
    fn unset_parent_yields_empty_distribution() {
        let table = two_slot_table();
        let soul = parse(&table, "A=x,B=p");
        let enumerator = FusionEnumerator::new(&table);

        assert!(enumerator.enumerate(None, Some(&soul)).unwrap().is_empty());
        assert!(enumerator.enumerate(Some(&soul), None).unwrap().is_empty());
        assert!(enumerator.enumerate(None, None).unwrap().is_empty());
    }

    #[test]
    fn identical_parents_with_certain_rules_yield_one_result() {
        let table = two_slot_table();
        let soul = parse(&table, "A=y,B=q");
        let dist = FusionEnumerator::new(&table).fuse(&soul, &soul).unwrap();
        assert_eq!(dist.len(), 1);
        assert_eq!(dist.results()[0].entity, soul);
        assert_eq!(dist.results()[0].probability, 1.0);
    }

    #[test]
    fn results_sorted_by_descending_probability() {
        let table = RuleTableBuilder::new()
            .inherit_slot("A", ["x", "y"], 0.8)
            .inherit_slot("B", ["p", "q"], 0.3)
            .build()
            .unwrap();
        let left = parse(&table, "A=x,B=p");
        let right = parse(&table, "A=y,B=q");
        let dist = FusionEnumerator::new(&table).fuse(&left, &right).unwrap();

        assert_eq!(dist.len(), 4);
        let probs: Vec<f64> = dist.iter().map(|r| r.probability).collect();
        assert!(probs.windows(2).all(|w| w[0] >= w[1]), "{probs:?}");
        assert_eq!(dist.results()[0].entity, parse(&table, "A=x,B=q"));
        assert!((dist.results()[0].probability - 0.56).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_expansion_order() {
        let table = RuleTableBuilder::new()
            .inherit_slot("A", ["x", "y"], 0.5)
            .inherit_slot("B", ["p", "q"], 0.5)
            .build()
            .unwrap();
        let left = parse(&table, "A=y,B=q");
        let right = parse(&table, "A=x,B=p");
        let dist = FusionEnumerator::new(&table).fuse(&left, &right).unwrap();

        // Outcomes branch in domain order: x before y, p before q.
        let order: Vec<String> = dist
            .iter()
            .map(|r| r.entity.display(table.schema()).to_string())
            .collect();
        assert_eq!(order, vec!["A=x, B=p", "A=x, B=q", "A=y, B=p", "A=y, B=q"]);
    }

    #[test]
    fn parent_order_is_not_collapsed() {
        let table = RuleTableBuilder::new()
            .inherit_slot("A", ["x", "y"], 0.75)
            .inherit_slot("B", ["p", "q"], 0.5)
            .build()
            .unwrap();
        let left = parse(&table, "A=x,B=p");
        let right = parse(&table, "A=y,B=p");
        let enumerator = FusionEnumerator::new(&table);

        let forward = enumerator.fuse(&left, &right).unwrap();
        let backward = enumerator.fuse(&right, &left).unwrap();
        assert_ne!(forward, backward);
        assert_eq!(forward.probability_of(&left), 0.75);
        assert_eq!(backward.probability_of(&left), 0.25);
    }

    #[test]
    fn merge_sums_duplicate_entities() {
        let a = Entity::new(vec![ValueId::new(0), ValueId::new(0)]);
        let b = Entity::new(vec![ValueId::new(1), ValueId::new(0)]);
        let merged = merge_outcomes([
            (a.clone(), 0.25),
            (b.clone(), 0.5),
            (a.clone(), 0.25),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], FusionResult { entity: a, probability: 0.5 });
        assert_eq!(merged[1], FusionResult { entity: b, probability: 0.5 });
    }

    #[test]
    fn pruning_drops_unlikely_branches() {
        let table = RuleTableBuilder::new()
            .inherit_slot("A", ["x", "y"], 0.9)
            .inherit_slot("B", ["p", "q"], 0.5)
            .build()
            .unwrap();
        let left = parse(&table, "A=x,B=p");
        let right = parse(&table, "A=y,B=p");
        let enumerator =
            FusionEnumerator::with_config(&table, EnumeratorConfig::pruned(0.2)).unwrap();

        let dist = enumerator.fuse(&left, &right).unwrap();
        assert_eq!(dist.len(), 1);
        assert_eq!(dist.results()[0].entity, left);
        assert_eq!(dist.results()[0].probability, 1.0);
        assert!((dist.pruned_mass() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn loose_load_tolerance_still_fuses_cleanly() {
        let table = RuleTableBuilder::new()
            .tolerance(0.05)
            .inherit_slot("A", ["x", "y"], 0.5)
            .rule("A", "x", "y", [("x", 0.5), ("y", 0.48)])
            .rule("A", "y", "x", [("x", 0.97)])
            .build()
            .unwrap();
        let x = parse(&table, "A=x");
        let y = parse(&table, "A=y");
        let enumerator = FusionEnumerator::new(&table);

        let dist = enumerator.fuse(&x, &y).unwrap();
        assert_eq!(dist.len(), 2);
        assert!((dist.total_probability() - 1.0).abs() < 1e-12);
        assert!((dist.probability_of(&x) - 0.5 / 0.98).abs() < 1e-12);

        let dist = enumerator.fuse(&y, &x).unwrap();
        assert_eq!(dist.len(), 1);
        assert_eq!(dist.results()[0].entity, x);
        assert_eq!(table.distribution(SlotId::new(0), ValueId::new(1), ValueId::new(0)).unwrap().total(), 1.0);
    }

    #[test]
    fn pruning_everything_leaves_empty_distribution() {
        let table = RuleTableBuilder::new()
            .inherit_slot("A", ["x", "y"], 0.5)
            .build()
            .unwrap();
        let enumerator =
            FusionEnumerator::with_config(&table, EnumeratorConfig::pruned(0.9)).unwrap();
        let dist = enumerator
            .fuse(&parse(&table, "A=x"), &parse(&table, "A=y"))
            .unwrap();
        assert!(dist.is_empty());
        assert!((dist.pruned_mass() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pruning_without_renormalize_keeps_raw_mass() {
        let table = RuleTableBuilder::new()
            .inherit_slot("A", ["x", "y"], 0.9)
            .build()
            .unwrap();
        let left = parse(&table, "A=x");
        let right = parse(&table, "A=y");
        let config = EnumeratorConfig {
            prune_epsilon: 0.2,
            renormalize: false,
            ..Default::default()
        };
        let dist = FusionEnumerator::with_config(&table, config)
            .unwrap()
            .fuse(&left, &right)
            .unwrap();
        assert_eq!(dist.total_probability(), 0.9);
    }

    #[test]
    fn invalid_config_rejected() {
        let table = two_slot_table();
        let result = FusionEnumerator::with_config(&table, EnumeratorConfig::pruned(-1.0));
        assert!(matches!(result, Err(FusionError::InvalidConfig(_))));
    }

    #[test]
    fn slot_count_mismatch_rejected() {
        let table = two_slot_table();
        let short = Entity::new(vec![ValueId::new(0)]);
        let full = parse(&table, "A=x,B=p");
        let err = FusionEnumerator::new(&table).fuse(&full, &short).unwrap_err();
        assert!(matches!(
            err,
            FusionError::SlotCountMismatch { parent: Parent::Right, expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn out_of_domain_value_is_a_parent_error() {
        let table = two_slot_table();
        let bogus = Entity::new(vec![ValueId::new(0), ValueId::new(9)]);
        let full = parse(&table, "A=x,B=p");
        let enumerator = FusionEnumerator::new(&table);

        let err = enumerator.fuse(&full, &bogus).unwrap_err();
        match err {
            FusionError::InvalidParent { parent, source } => {
                assert_eq!(parent, Parent::Right);
                assert!(matches!(source, TypeError::UnknownValue { ref slot, .. } if slot == "B"));
            }
            other => panic!("expected InvalidParent, got {other:?}"),
        }

        let err = enumerator.fuse(&bogus, &full).unwrap_err();
        assert!(matches!(err, FusionError::InvalidParent { parent: Parent::Left, .. }));
    }

    /// Rules that hand out a distribution summing to 0.9.
    struct LeakyRules {
        schema: SlotSchema,
        leaky: SlotDistribution,
    }

    impl FusionRules for LeakyRules {
        fn schema(&self) -> &SlotSchema {
            &self.schema
        }

        fn distribution(&self, _: SlotId, _: ValueId, _: ValueId) -> ConfigResult<&SlotDistribution> {
            Ok(&self.leaky)
        }
    }

    #[test]
    fn drift_is_reported_not_renormalized() {
        let rules = LeakyRules {
            schema: SlotSchema::new(vec![AttributeSlot::new("A", ["x", "y"])]).unwrap(),
            leaky: SlotDistribution::from_weights([(ValueId::new(0), 0.5), (ValueId::new(1), 0.4)]),
        };
        let soul = Entity::new(vec![ValueId::new(0)]);
        let err = FusionEnumerator::new(&rules).fuse(&soul, &soul).unwrap_err();
        match err {
            FusionError::NumericalDrift { total, tolerance } => {
                assert!((total - 0.9).abs() < 1e-12);
                assert_eq!(tolerance, 1e-6);
            }
            other => panic!("expected NumericalDrift, got {other:?}"),
        }
    }

    #[test]
    fn works_through_trait_object() {
        let table = two_slot_table();
        let rules: &dyn FusionRules = &table;
        let left = parse(&table, "A=x,B=p");
        let right = parse(&table, "A=x,B=q");
        let dist = FusionEnumerator::new(rules).fuse(&left, &right).unwrap();
        assert_eq!(dist.len(), 2);
    }

    /// Random inherit-policy tables: 1..=4 slots, domains of 1..=3 values.
    fn table_strategy() -> impl Strategy<Value = RuleTable> {
        prop::collection::vec((1usize..=3, 0.0f64..=1.0), 1..=4).prop_map(|slots| {
            let mut builder = RuleTableBuilder::new();
            for (i, (width, left_weight)) in slots.into_iter().enumerate() {
                let values: Vec<String> = (0..width).map(|v| format!("v{v}")).collect();
                builder = builder.inherit_slot(&format!("s{i}"), values, left_weight);
            }
            builder.build().unwrap()
        })
    }

    proptest! {
        #[test]
        fn distribution_is_normalized_and_deduplicated(
            table in table_strategy(),
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let left = Entity::random(table.schema(), &mut rng);
            let right = Entity::random(table.schema(), &mut rng);

            let dist = FusionEnumerator::new(&table).fuse(&left, &right).unwrap();
            prop_assert!((dist.total_probability() - 1.0).abs() < 1e-6);

            let mut seen = std::collections::HashSet::new();
            for result in &dist {
                prop_assert!(seen.insert(result.entity.clone()));
                prop_assert!(result.probability > 0.0 && result.probability <= 1.0 + 1e-12);
            }
        }

        #[test]
        fn enumeration_is_deterministic(
            table in table_strategy(),
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let left = Entity::random(table.schema(), &mut rng);
            let right = Entity::random(table.schema(), &mut rng);

            let enumerator = FusionEnumerator::new(&table);
            let first = enumerator.fuse(&left, &right).unwrap();
            let second = enumerator.fuse(&left, &right).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn marginals_match_slot_rules(
            table in table_strategy(),
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let left = Entity::random(table.schema(), &mut rng);
            let right = Entity::random(table.schema(), &mut rng);
            let dist = FusionEnumerator::new(&table).fuse(&left, &right).unwrap();

            for (slot, _) in table.schema().iter() {
                let l = left.value(slot).unwrap();
                let r = right.value(slot).unwrap();
                let rule = table.distribution(slot, l, r).unwrap();
                for (value, probability) in dist.marginal(slot) {
                    prop_assert!((probability - rule.weight(value)).abs() < 1e-9);
                }
            }
        }
    }
}
