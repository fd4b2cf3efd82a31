//! Error types for rule configuration.

use std::path::PathBuf;

use soulfuse_types::TypeError;

/// A rule table is invalid or a lookup fell outside it.
///
/// Every variant is fatal: a table that fails to load must never serve
/// queries.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No distribution configured for an ordered parent pair.
    #[error("missing rule for slot '{slot}': ({left}, {right})")]
    MissingRule {
        slot: String,
        left: String,
        right: String,
    },

    /// A distribution's weights do not sum to 1.
    #[error("weights for slot '{slot}' ({left}, {right}) sum to {total}, expected 1 within {tolerance}")]
    WeightSum {
        slot: String,
        left: String,
        right: String,
        total: f64,
        tolerance: f64,
    },

    /// A single weight is negative, above 1, or not finite.
    #[error("invalid weight {weight} for '{value}' in slot '{slot}' ({left}, {right})")]
    InvalidWeight {
        slot: String,
        left: String,
        right: String,
        value: String,
        weight: f64,
    },

    /// An inherit policy's left weight lies outside `[0, 1]`.
    #[error("invalid left_weight {weight} for slot '{slot}'")]
    InvalidLeftWeight { slot: String, weight: f64 },

    /// The weight-sum tolerance is not a finite, non-negative number.
    #[error("invalid tolerance: {0}")]
    InvalidTolerance(f64),

    /// The same ordered parent pair is configured twice.
    #[error("duplicate rule for slot '{slot}': ({left}, {right})")]
    DuplicateRule {
        slot: String,
        left: String,
        right: String,
    },

    /// The configuration declares no slots.
    #[error("rule table declares no slots")]
    EmptySchema,

    /// Slot or value names failed schema validation.
    #[error("schema error: {0}")]
    Type(#[from] TypeError),

    /// The TOML document could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for rule configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
