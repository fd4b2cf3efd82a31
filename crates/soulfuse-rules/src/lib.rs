//! Per-slot fusion rules for SoulFuse.
//!
//! A fusion rule maps the pair of parent values on one slot to a discrete
//! distribution over the child's value for that slot. Rules are domain
//! knowledge: they are loaded once from configuration, validated completely
//! at load time, and then shared read-only by every fusion query.
//!
//! # Key Types
//!
//! - [`FusionRules`] -- the lookup contract consumed by the enumerator
//! - [`RuleTable`] -- validated, dense rule table built from a [`RuleConfig`]
//! - [`SlotRule`] -- all parent pairs of one slot
//! - [`SlotDistribution`] -- child value weights for one parent pair
//! - [`RuleTableBuilder`] -- programmatic construction with the same validation
//!
//! # Design Rules
//!
//! 1. The parent pair is ordered: `(left, right)` and `(right, left)` are
//!    distinct entries and may carry different distributions.
//! 2. A table that loads successfully is total over its schema. A missing
//!    pair or a weight sum off by more than the tolerance fails the load.
//! 3. Outcomes are stored in domain order so enumeration never depends on the
//!    key order of the source document.

pub mod builder;
pub mod config;
pub mod distribution;
pub mod error;
pub mod table;
pub mod traits;

pub use builder::RuleTableBuilder;
pub use config::{RuleConfig, RuleEntry, SlotConfig, SlotPolicy, DEFAULT_WEIGHT_TOLERANCE};
pub use distribution::SlotDistribution;
pub use error::{ConfigError, ConfigResult};
pub use table::{RuleTable, SlotRule};
pub use traits::FusionRules;
