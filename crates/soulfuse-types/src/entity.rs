//! The soul entity: one value per attribute slot.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};
use crate::schema::{SlotId, SlotSchema, ValueId};

/// A complete assignment of one value to every slot of a schema.
///
/// Entities are immutable value objects. Two entities are equal iff their
/// value tuples are equal, which makes them usable directly as grouping keys
/// when merging fusion outcomes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    values: Vec<ValueId>,
}

impl Entity {
    /// Create an entity from raw value ids in schema slot order.
    ///
    /// No schema check is performed; use [`SlotSchema::validate`] or
    /// [`Entity::parse`] for untrusted input.
    pub fn new(values: Vec<ValueId>) -> Self {
        Self { values }
    }

    /// Parse `slot=value,slot=value,...` against a schema.
    ///
    /// Every slot must be assigned exactly once. Whitespace around names is
    /// ignored and the assignments may appear in any order.
    ///
    /// # Examples
    ///
    /// ```
    /// use soulfuse_types::{AttributeSlot, Entity, SlotSchema};
    ///
    /// let schema = SlotSchema::new(vec![
    ///     AttributeSlot::new("background", ["none", "purple"]),
    ///     AttributeSlot::new("eyes", ["round", "sleepy"]),
    /// ]).unwrap();
    ///
    /// let soul = Entity::parse(&schema, "eyes=sleepy, background=purple").unwrap();
    /// assert_eq!(soul.display(&schema).to_string(), "background=purple, eyes=sleepy");
    /// assert!(Entity::parse(&schema, "eyes=sleepy").is_err());
    /// ```
    pub fn parse(schema: &SlotSchema, input: &str) -> Result<Self> {
        let pairs = input
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.split_once('=')
                    .map(|(slot, value)| (slot.trim(), value.trim()))
                    .filter(|(slot, value)| !slot.is_empty() && !value.is_empty())
                    .ok_or_else(|| TypeError::MalformedAssignment(part.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_pairs(schema, pairs)
    }

    /// Build an entity from `(slot name, value name)` pairs.
    pub fn from_pairs<'a>(
        schema: &SlotSchema,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let mut values: Vec<Option<ValueId>> = vec![None; schema.len()];
        for (slot, value) in pairs {
            let (slot_id, value_id) = schema.resolve(slot, value)?;
            let entry = &mut values[slot_id.index()];
            if entry.is_some() {
                return Err(TypeError::DuplicateSlot(slot.to_string()));
            }
            *entry = Some(value_id);
        }

        let values = values
            .into_iter()
            .zip(schema.iter())
            .map(|(value, (_, slot))| value.ok_or_else(|| TypeError::MissingSlot(slot.name.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }

    /// Draw a uniformly random entity from the schema's value domains.
    pub fn random<R: Rng>(schema: &SlotSchema, rng: &mut R) -> Self {
        let values = schema
            .iter()
            .map(|(_, slot)| ValueId::new(rng.gen_range(0..slot.len()) as u32))
            .collect();
        Self { values }
    }

    /// Value assigned to a slot.
    pub fn value(&self, slot: SlotId) -> Option<ValueId> {
        self.values.get(slot.index()).copied()
    }

    /// The raw value tuple in schema slot order.
    pub fn values(&self) -> &[ValueId] {
        &self.values
    }

    /// Number of slot values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(slot name, value name)` pairs in schema order.
    ///
    /// Values outside the schema render as `"?"`.
    pub fn named<'s>(&self, schema: &'s SlotSchema) -> Vec<(&'s str, &'s str)> {
        schema
            .iter()
            .zip(&self.values)
            .map(|((_, slot), value)| (slot.name.as_str(), slot.value_name(*value).unwrap_or("?")))
            .collect()
    }

    /// Render through a schema as `slot=value, slot=value`.
    pub fn display<'a>(&'a self, schema: &'a SlotSchema) -> EntityDisplay<'a> {
        EntityDisplay {
            entity: self,
            schema,
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<usize> = self.values.iter().map(|v| v.index()).collect();
        write!(f, "Entity({ids:?})")
    }
}

/// Schema-aware [`Display`](fmt::Display) adapter for an [`Entity`].
pub struct EntityDisplay<'a> {
    entity: &'a Entity,
    schema: &'a SlotSchema,
}

impl fmt::Display for EntityDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (slot, value)) in self.entity.named(self.schema).into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{slot}={value}")?;
        }
        Ok(())
    }
}
