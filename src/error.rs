//! Error types for recipe matching.
//!
//! Every structural problem is detected at the `fit`/`transform` boundary,
//! before any matrix work begins. Disjoint vocabularies are not an error:
//! see [`crate::TransformWarning::EmptyAlignment`].

use thiserror::Error;

/// Errors raised while building matrices, fitting a catalog or transforming
/// observations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// A list of names (or rows) does not match the matrix it describes.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The catalog vocabulary names the same column twice.
    #[error("invalid catalog: column name '{name}' appears more than once")]
    InvalidCatalog { name: String },

    /// The observation vocabulary names the same column twice.
    #[error("invalid observations: column name '{name}' appears more than once")]
    InvalidObservations { name: String },

    /// `smin` is zero or larger than the number of common columns.
    #[error("invalid threshold {smin}: must be between 1 and {max}")]
    InvalidThreshold { smin: usize, max: usize },

    /// A support bar of zero would keep columns no observation uses.
    #[error("invalid min_support {min_support}: must be at least 1")]
    InvalidMinSupport { min_support: usize },

    /// A row references a column outside the matrix.
    #[error("row {row} references column {col}, but the matrix has {cols} columns")]
    ColumnOutOfBounds { row: usize, col: usize, cols: usize },

    /// Compressed-sparse-row input is inconsistent.
    #[error("malformed CSR input: {0}")]
    MalformedCsr(String),

    /// Threshold and greedy cover matching were both requested.
    #[error("smin and greedy cover are mutually exclusive")]
    ConflictingModes,

    /// The engine's private worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = MatchError::InvalidCatalog {
            name: "color".to_string(),
        };
        assert!(err.to_string().contains("'color'"));

        let err = MatchError::ShapeMismatch {
            what: "catalog column names",
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch for catalog column names: expected 3, got 2"
        );

        let err = MatchError::InvalidMinSupport { min_support: 0 };
        assert_eq!(err.to_string(), "invalid min_support 0: must be at least 1");
    }
}
