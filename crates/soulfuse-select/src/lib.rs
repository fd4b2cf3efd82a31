//! Selection aggregation for SoulFuse.
//!
//! After a fusion is previewed, the user picks a subset of the outcomes and
//! asks for the chance of landing in that subset. [`SelectionAggregator`]
//! holds the current [`FusionDistribution`](soulfuse_fusion::FusionDistribution),
//! the set of selected positions, and their running probability sum.
//!
//! Selections refer to positions in one specific distribution. Replacing the
//! distribution always clears them.

pub mod aggregator;
pub mod error;

pub use aggregator::SelectionAggregator;
pub use error::{Result, SelectionError};
