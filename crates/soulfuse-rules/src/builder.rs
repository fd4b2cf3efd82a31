use crate::config::{RuleConfig, RuleEntry, SlotConfig, SlotPolicy};
use crate::error::ConfigResult;
use crate::table::RuleTable;

/// Programmatic construction of a [`RuleTable`].
///
/// The builder assembles a [`RuleConfig`] and compiles it through
/// [`RuleTable::from_config`], so tables built in code pass the same
/// validation as tables loaded from disk.
///
/// ```
/// use soulfuse_rules::RuleTableBuilder;
///
/// let table = RuleTableBuilder::new()
///     .slot("a", ["x", "y"])
///     .rule("a", "x", "x", [("x", 1.0)])
///     .rule("a", "x", "y", [("x", 0.5), ("y", 0.5)])
///     .rule("a", "y", "x", [("y", 1.0)])
///     .rule("a", "y", "y", [("y", 1.0)])
///     .build()
///     .unwrap();
/// assert_eq!(table.schema().len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RuleTableBuilder {
    config: RuleConfig,
}

impl RuleTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the weight-sum tolerance.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Add a slot whose every parent pair must be given with [`rule`](Self::rule).
    pub fn slot(self, name: &str, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.slot_with_policy(name, values, SlotPolicy::Explicit)
    }

    /// Add a slot whose unlisted pairs inherit from the parents.
    pub fn inherit_slot(
        self,
        name: &str,
        values: impl IntoIterator<Item = impl Into<String>>,
        left_weight: f64,
    ) -> Self {
        self.slot_with_policy(name, values, SlotPolicy::Inherit { left_weight })
    }

    pub fn slot_with_policy(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = impl Into<String>>,
        policy: SlotPolicy,
    ) -> Self {
        self.config.slots.push(SlotConfig {
            name: name.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            policy,
        });
        self
    }

    /// Add an explicit rule for the ordered pair `(left, right)`.
    ///
    /// Repeated outcome names are summed.
    pub fn rule<'a>(
        mut self,
        slot: &str,
        left: &str,
        right: &str,
        outcomes: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Self {
        let mut entry = RuleEntry {
            slot: slot.to_string(),
            left: left.to_string(),
            right: right.to_string(),
            outcomes: Default::default(),
        };
        for (value, weight) in outcomes {
            *entry.outcomes.entry(value.to_string()).or_insert(0.0) += weight;
        }
        self.config.rules.push(entry);
        self
    }

    /// The configuration assembled so far.
    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Validate and compile.
    pub fn build(self) -> ConfigResult<RuleTable> {
        RuleTable::from_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::traits::FusionRules;

    #[test]
    fn builds_inherit_table() {
        let table = RuleTableBuilder::new()
            .inherit_slot("eyes", ["round", "sleepy"], 0.5)
            .build()
            .unwrap();
        let schema = table.schema();
        let (slot, round) = schema.resolve("eyes", "round").unwrap();
        let (_, sleepy) = schema.resolve("eyes", "sleepy").unwrap();
        let d = table.distribution(slot, round, sleepy).unwrap();
        assert_eq!(d.weight(round), 0.5);
        assert_eq!(d.weight(sleepy), 0.5);
    }

    #[test]
    fn builder_reports_missing_rule() {
        let err = RuleTableBuilder::new()
            .slot("eyes", ["round", "sleepy"])
            .rule("eyes", "round", "round", [("round", 1.0)])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRule { .. }));
    }

    #[test]
    fn repeated_outcomes_are_summed() {
        let builder = RuleTableBuilder::new()
            .inherit_slot("eyes", ["round", "sleepy"], 0.5)
            .rule("eyes", "round", "sleepy", [("round", 0.25), ("round", 0.25), ("sleepy", 0.5)]);
        assert_eq!(builder.config().rules[0].outcomes["round"], 0.5);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn tolerance_is_applied() {
        let table = RuleTableBuilder::new()
            .tolerance(0.05)
            .inherit_slot("eyes", ["round", "sleepy"], 0.5)
            .rule("eyes", "round", "sleepy", [("round", 0.5), ("sleepy", 0.48)])
            .build()
            .unwrap();
        assert_eq!(table.tolerance(), 0.05);

        let schema = table.schema();
        let (slot, round) = schema.resolve("eyes", "round").unwrap();
        let (_, sleepy) = schema.resolve("eyes", "sleepy").unwrap();
        let d = table.distribution(slot, round, sleepy).unwrap();
        assert!((d.total() - 1.0).abs() < 1e-12);

        let err = RuleTableBuilder::new()
            .tolerance(-1.0)
            .inherit_slot("eyes", ["round"], 0.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTolerance(_)));
    }
}
