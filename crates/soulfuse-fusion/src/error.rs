use std::fmt;

use soulfuse_rules::ConfigError;
use soulfuse_types::TypeError;

/// Which side of a fusion an input came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parent {
    Left,
    Right,
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// Errors that can occur while enumerating a fusion.
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// A rule lookup failed. The rule table does not cover the input.
    #[error("rule configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Total probability mass drifted from 1 by more than the tolerance.
    ///
    /// This points at a defective rule set, never at the query.
    #[error("probability mass {total} deviates from 1 by more than {tolerance}")]
    NumericalDrift { total: f64, tolerance: f64 },

    /// An input entity does not have one value per schema slot.
    #[error("{parent} entity has {actual} slot values, schema has {expected} slots")]
    SlotCountMismatch {
        parent: Parent,
        expected: usize,
        actual: usize,
    },

    /// An input entity holds a value outside its slot's domain.
    #[error("invalid {parent} parent: {source}")]
    InvalidParent {
        parent: Parent,
        #[source]
        source: TypeError,
    },

    /// The enumerator configuration is invalid.
    #[error("invalid enumerator configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for fusion results.
pub type Result<T> = std::result::Result<T, FusionError>;
