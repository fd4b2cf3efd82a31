use thiserror::Error;

/// Errors produced when building schemas or resolving entities against them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown slot: {0}")]
    UnknownSlot(String),

    #[error("unknown value '{value}' for slot '{slot}'")]
    UnknownValue { slot: String, value: String },

    #[error("no value assigned to slot '{0}'")]
    MissingSlot(String),

    #[error("slot '{0}' is declared more than once")]
    DuplicateSlot(String),

    #[error("value '{value}' appears more than once in slot '{slot}'")]
    DuplicateValue { slot: String, value: String },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("slot '{0}' has an empty value domain")]
    EmptyDomain(String),

    #[error("malformed assignment '{0}': expected slot=value")]
    MalformedAssignment(String),

    #[error("entity has {actual} slot values, schema has {expected} slots")]
    SlotCountMismatch { expected: usize, actual: usize },
}

/// Convenience alias for type-level results.
pub type Result<T> = std::result::Result<T, TypeError>;
