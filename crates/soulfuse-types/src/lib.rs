//! Foundation types for SoulFuse.
//!
//! A soul is a composite entity built from a fixed, ordered set of independent
//! attribute slots (background, body, eyes, ...). This crate defines the slot
//! schema shared by every soul and the immutable [`Entity`] value type used as
//! both fusion input and fusion output. Every other SoulFuse crate depends on
//! `soulfuse-types`.
//!
//! # Key Types
//!
//! - [`SlotSchema`]: Ordered set of [`AttributeSlot`]s with their value domains
//! - [`SlotId`] / [`ValueId`]: Positional identifiers into the schema
//! - [`Entity`]: One value per slot, compared structurally
//! - [`EntityDisplay`]: Human-readable `slot=value` rendering through a schema

pub mod entity;
pub mod error;
pub mod schema;

pub use entity::{Entity, EntityDisplay};
pub use error::{Result, TypeError};
pub use schema::{AttributeSlot, SlotId, SlotSchema, ValueId};
