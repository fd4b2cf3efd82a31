//! The compiled rule table.
//!
//! [`RuleTable`] is the validated form of a [`RuleConfig`]. Each slot's rules
//! are stored densely, one [`SlotDistribution`] per ordered parent pair, so a
//! lookup is a single index computation.
//!
//! # Invariants
//!
//! - Every slot has exactly `n * n` entries, where `n` is its domain size.
//! - Every entry passed range and sum validation when the table was built.
//! - Every entry's weights sum to 1. Explicit rules within tolerance are
//!   rescaled at load, so lookups never see the slack.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use soulfuse_types::{AttributeSlot, SlotId, SlotSchema, ValueId};

use crate::config::{RuleConfig, RuleEntry, SlotPolicy};
use crate::distribution::SlotDistribution;
use crate::error::{ConfigError, ConfigResult};
use crate::traits::FusionRules;

/// All ordered parent pairs of one slot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlotRule {
    width: usize,
    policy: SlotPolicy,
    explicit_rules: usize,
    entries: Vec<SlotDistribution>,
}

impl SlotRule {
    /// Distribution for an ordered parent pair, `None` if out of domain.
    pub fn distribution(&self, left: ValueId, right: ValueId) -> Option<&SlotDistribution> {
        if left.index() >= self.width || right.index() >= self.width {
            return None;
        }
        self.entries.get(left.index() * self.width + right.index())
    }

    /// The policy that filled entries not given explicitly.
    pub fn policy(&self) -> SlotPolicy {
        self.policy
    }

    /// Number of entries that came from explicit rules.
    pub fn explicit_rules(&self) -> usize {
        self.explicit_rules
    }

    /// Number of ordered parent pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if swapping the parents never changes the distribution.
    pub fn is_symmetric(&self) -> bool {
        (0..self.width).all(|l| {
            (l + 1..self.width).all(|r| {
                self.entries[l * self.width + r] == self.entries[r * self.width + l]
            })
        })
    }
}

/// A validated, complete set of fusion rules over one slot schema.
#[derive(Clone, Debug)]
pub struct RuleTable {
    schema: SlotSchema,
    slots: Vec<SlotRule>,
    tolerance: f64,
}

impl RuleTable {
    /// Load and compile a TOML rule table from disk.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading rule table");
        Self::from_toml_str(&text)
    }

    /// Parse and compile a TOML rule table.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: RuleConfig = toml::from_str(text)?;
        Self::from_config(config)
    }

    /// Validate a configuration and compile it into a dense table.
    ///
    /// Fails on the first defect: unknown names, duplicate rules, invalid
    /// weights, weight sums off by more than the tolerance, or a parent pair
    /// left uncovered under [`SlotPolicy::Explicit`].
    pub fn from_config(config: RuleConfig) -> ConfigResult<Self> {
        let tolerance = config.tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }
        if config.slots.is_empty() {
            return Err(ConfigError::EmptySchema);
        }

        let schema = SlotSchema::new(
            config
                .slots
                .iter()
                .map(|s| AttributeSlot::new(s.name.clone(), s.values.iter().cloned()))
                .collect(),
        )?;

        for slot in &config.slots {
            if let SlotPolicy::Inherit { left_weight } = slot.policy {
                if !(0.0..=1.0).contains(&left_weight) {
                    return Err(ConfigError::InvalidLeftWeight {
                        slot: slot.name.clone(),
                        weight: left_weight,
                    });
                }
            }
        }

        // Explicit rules first; policies only fill what is left.
        let mut staged: Vec<Vec<Option<SlotDistribution>>> = schema
            .iter()
            .map(|(_, slot)| vec![None; slot.len() * slot.len()])
            .collect();
        let mut explicit = vec![0usize; schema.len()];

        for rule in &config.rules {
            let (slot_id, domain) = schema.require_slot(&rule.slot)?;
            let left = domain.require_value(&rule.left)?;
            let right = domain.require_value(&rule.right)?;
            let distribution = compile_entry(domain, rule, tolerance)?;

            let cell = &mut staged[slot_id.index()][left.index() * domain.len() + right.index()];
            if cell.is_some() {
                return Err(ConfigError::DuplicateRule {
                    slot: domain.name.clone(),
                    left: rule.left.clone(),
                    right: rule.right.clone(),
                });
            }
            *cell = Some(distribution);
            explicit[slot_id.index()] += 1;
        }

        let mut slots = Vec::with_capacity(schema.len());
        for ((slot_id, domain), cells) in schema.iter().zip(staged) {
            let policy = config.slots[slot_id.index()].policy;
            let width = domain.len();
            let mut entries = Vec::with_capacity(cells.len());
            for (index, cell) in cells.into_iter().enumerate() {
                let left = ValueId::new((index / width) as u32);
                let right = ValueId::new((index % width) as u32);
                let entry = match (cell, policy) {
                    (Some(distribution), _) => distribution,
                    (None, SlotPolicy::Inherit { left_weight }) => {
                        SlotDistribution::inherit(left, right, left_weight)
                    }
                    (None, SlotPolicy::Explicit) => {
                        return Err(missing_rule(&schema, slot_id, left, right));
                    }
                };
                entries.push(entry);
            }
            slots.push(SlotRule {
                width,
                policy,
                explicit_rules: explicit[slot_id.index()],
                entries,
            });
        }

        debug!(
            slots = schema.len(),
            explicit_rules = config.rules.len(),
            entity_space = %schema.entity_space(),
            "compiled rule table"
        );

        Ok(Self {
            schema,
            slots,
            tolerance,
        })
    }

    pub fn schema(&self) -> &SlotSchema {
        &self.schema
    }

    /// Rules for one slot.
    pub fn slot_rule(&self, slot: SlotId) -> Option<&SlotRule> {
        self.slots.get(slot.index())
    }

    /// Slot rules in schema order.
    pub fn slot_rules(&self) -> impl Iterator<Item = (SlotId, &AttributeSlot, &SlotRule)> {
        self.schema
            .iter()
            .zip(&self.slots)
            .map(|((id, slot), rule)| (id, slot, rule))
    }

    /// The weight-sum tolerance the table was validated with.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl FusionRules for RuleTable {
    fn schema(&self) -> &SlotSchema {
        &self.schema
    }

    fn distribution(
        &self,
        slot: SlotId,
        left: ValueId,
        right: ValueId,
    ) -> ConfigResult<&SlotDistribution> {
        self.slots
            .get(slot.index())
            .and_then(|rule| rule.distribution(left, right))
            .ok_or_else(|| missing_rule(&self.schema, slot, left, right))
    }
}

/// Range-check and sum-check one explicit rule, then rescale it to sum to 1.
fn compile_entry(
    slot: &AttributeSlot,
    rule: &RuleEntry,
    tolerance: f64,
) -> ConfigResult<SlotDistribution> {
    let mut weights = Vec::with_capacity(rule.outcomes.len());
    for (name, &weight) in &rule.outcomes {
        let value = slot.require_value(name)?;
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(ConfigError::InvalidWeight {
                slot: slot.name.clone(),
                left: rule.left.clone(),
                right: rule.right.clone(),
                value: name.clone(),
                weight,
            });
        }
        if weight == 0.0 {
            warn!(
                slot = %slot.name,
                left = %rule.left,
                right = %rule.right,
                value = %name,
                "dropping zero-weight outcome"
            );
            continue;
        }
        weights.push((value, weight));
    }

    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 || (total - 1.0).abs() > tolerance {
        return Err(ConfigError::WeightSum {
            slot: slot.name.clone(),
            left: rule.left.clone(),
            right: rule.right.clone(),
            total,
            tolerance,
        });
    }

    Ok(SlotDistribution::from_weights(weights).normalized())
}

fn missing_rule(schema: &SlotSchema, slot: SlotId, left: ValueId, right: ValueId) -> ConfigError {
    let domain = schema.slot(slot);
    let name = |value: ValueId| {
        domain
            .and_then(|d| d.value_name(value))
            .map_or_else(|| value.to_string(), str::to_string)
    };
    ConfigError::MissingRule {
        slot: domain.map_or_else(|| slot.to_string(), |d| d.name.clone()),
        left: name(left),
        right: name(right),
    }
}
