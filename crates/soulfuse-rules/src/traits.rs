use soulfuse_types::{SlotId, SlotSchema, ValueId};

use crate::distribution::SlotDistribution;
use crate::error::ConfigResult;

/// Read-only lookup of per-slot fusion rules.
///
/// All implementations must satisfy these invariants:
/// - Lookups are pure: the same `(slot, left, right)` always returns the same
///   distribution.
/// - The parent order is significant and must never be normalized away.
/// - Every returned distribution sums to 1 within the implementation's
///   tolerance.
/// - A missing rule is reported as [`ConfigError::MissingRule`], never
///   replaced by a default.
///
/// Implementations are immutable after construction and may be shared across
/// threads without locking.
///
/// [`ConfigError::MissingRule`]: crate::ConfigError::MissingRule
pub trait FusionRules: Send + Sync {
    /// The slot schema these rules are defined over.
    fn schema(&self) -> &SlotSchema;

    /// Child value distribution for parents `left` and `right` on `slot`.
    fn distribution(
        &self,
        slot: SlotId,
        left: ValueId,
        right: ValueId,
    ) -> ConfigResult<&SlotDistribution>;
}
