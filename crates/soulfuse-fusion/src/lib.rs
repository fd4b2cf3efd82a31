//! Fusion probability engine for SoulFuse.
//!
//! Given two parent souls, [`FusionEnumerator`] produces the complete
//! distribution over every soul their fusion can yield. Slots fuse
//! independently, so the joint distribution is the product of the per-slot
//! [`SlotDistribution`](soulfuse_rules::SlotDistribution)s. It is expanded one
//! slot at a time, then identical outcomes are merged and the list is sorted
//! by descending probability.
//!
//! # Key Types
//!
//! - [`FusionEnumerator`] -- runs one fusion query against a rule table
//! - [`EnumeratorConfig`] -- pruning threshold, drift tolerance, renormalization
//! - [`FusionDistribution`] / [`FusionResult`] -- the ordered, deduplicated outcomes
//!
//! # Invariants
//!
//! - Probabilities of a returned distribution sum to 1 within the configured
//!   tolerance.
//! - No two results hold equal entities.
//! - Identical inputs always produce identical output, order included.
//! - The left and right parents are never swapped.

pub mod config;
pub mod distribution;
pub mod enumerator;
pub mod error;

pub use config::{EnumeratorConfig, DEFAULT_TOLERANCE};
pub use distribution::{FusionDistribution, FusionResult};
pub use enumerator::FusionEnumerator;
pub use error::{FusionError, Parent, Result};
