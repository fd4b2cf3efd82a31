//! Attribute slots and the schema that orders them.
//!
//! The schema is configuration: it fixes the slot order and each slot's value
//! domain. Slots and values are addressed positionally by [`SlotId`] and
//! [`ValueId`], so entities stay cheap to hash and compare.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{Result, TypeError};

/// Position of a slot within a [`SlotSchema`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(usize);

impl SlotId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Position of a value within one slot's domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(u32);

impl ValueId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value#{}", self.0)
    }
}

/// One independent dimension of a soul, with its finite value domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSlot {
    pub name: String,
    pub values: Vec<String>,
}

impl AttributeSlot {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of values in the domain.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by name.
    pub fn value_id(&self, name: &str) -> Option<ValueId> {
        self.values
            .iter()
            .position(|v| v == name)
            .map(|i| ValueId::new(i as u32))
    }

    /// Resolve a value id back to its name.
    pub fn value_name(&self, id: ValueId) -> Option<&str> {
        self.values.get(id.index()).map(String::as_str)
    }

    /// All value ids in domain order.
    pub fn value_ids(&self) -> impl Iterator<Item = ValueId> + '_ {
        (0..self.values.len()).map(|i| ValueId::new(i as u32))
    }

    /// Look up a value by name, failing with [`TypeError::UnknownValue`].
    pub fn require_value(&self, name: &str) -> Result<ValueId> {
        self.value_id(name).ok_or_else(|| TypeError::UnknownValue {
            slot: self.name.clone(),
            value: name.to_string(),
        })
    }
}

/// The complete, ordered set of attribute slots shared by all entities.
///
/// # Invariants
///
/// - Slot names are unique.
/// - Every slot has a non-empty domain with unique value names.
/// - Every name can be written in `slot=value,...` form: non-empty, no `,`
///   or `=`, no surrounding whitespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlotSchema {
    slots: Vec<AttributeSlot>,
}

impl SlotSchema {
    /// Build a schema, validating names and their uniqueness.
    pub fn new(slots: Vec<AttributeSlot>) -> Result<Self> {
        let mut names = HashSet::new();
        for slot in &slots {
            validate_name(&slot.name)?;
            if !names.insert(slot.name.as_str()) {
                return Err(TypeError::DuplicateSlot(slot.name.clone()));
            }
            if slot.values.is_empty() {
                return Err(TypeError::EmptyDomain(slot.name.clone()));
            }
            let mut seen = HashSet::new();
            for value in &slot.values {
                validate_name(value)?;
                if !seen.insert(value.as_str()) {
                    return Err(TypeError::DuplicateValue {
                        slot: slot.name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        Ok(Self { slots })
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, id: SlotId) -> Option<&AttributeSlot> {
        self.slots.get(id.index())
    }

    pub fn slot_id(&self, name: &str) -> Option<SlotId> {
        self.slots.iter().position(|s| s.name == name).map(SlotId::new)
    }

    /// Iterate slots in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &AttributeSlot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| (SlotId::new(i), s))
    }

    /// Look up a slot by name, failing with [`TypeError::UnknownSlot`].
    pub fn require_slot(&self, name: &str) -> Result<(SlotId, &AttributeSlot)> {
        self.iter()
            .find(|(_, s)| s.name == name)
            .ok_or_else(|| TypeError::UnknownSlot(name.to_string()))
    }

    /// Resolve a `(slot, value)` name pair to positional ids.
    pub fn resolve(&self, slot: &str, value: &str) -> Result<(SlotId, ValueId)> {
        let (slot_id, domain) = self.require_slot(slot)?;
        Ok((slot_id, domain.require_value(value)?))
    }

    /// Check that an entity has one in-range value per slot.
    pub fn validate(&self, entity: &Entity) -> Result<()> {
        if entity.len() != self.slots.len() {
            return Err(TypeError::SlotCountMismatch {
                expected: self.slots.len(),
                actual: entity.len(),
            });
        }
        for (slot, value) in self.slots.iter().zip(entity.values()) {
            if value.index() >= slot.len() {
                return Err(TypeError::UnknownValue {
                    slot: slot.name.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Total number of distinct entities this schema can express.
    ///
    /// Saturates at `u128::MAX` for absurdly large schemas.
    pub fn entity_space(&self) -> u128 {
        self.slots
            .iter()
            .fold(1u128, |acc, s| acc.saturating_mul(s.len() as u128))
    }
}

impl<'de> Deserialize<'de> for SlotSchema {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let slots = Vec::<AttributeSlot>::deserialize(deserializer)?;
        SlotSchema::new(slots).map_err(serde::de::Error::custom)
    }
}

/// Characters reserved by the `slot=value,...` assignment syntax.
const RESERVED_CHARS: &[char] = &[',', '='];

/// Check that a slot or value name survives a round trip through
/// [`Entity::parse`].
fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: String| TypeError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty".into()));
    }
    if let Some(ch) = name.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(invalid(format!("contains reserved character: {ch:?}")));
    }
    if name.trim() != name {
        return Err(invalid("must not start or end with whitespace".into()));
    }
    Ok(())
}
