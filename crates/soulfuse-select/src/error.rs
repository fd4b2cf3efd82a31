use thiserror::Error;

/// Errors produced by selection operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// A toggle named a position outside the current distribution.
    #[error("selection index {index} out of range for distribution of {len} results")]
    InvalidSelectionIndex { index: usize, len: usize },
}

/// Convenience alias for selection results.
pub type Result<T> = std::result::Result<T, SelectionError>;
