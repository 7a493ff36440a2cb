//! Fitted recipe catalog.
//!
//! A catalog is a Boolean matrix whose rows are recipes (conjunctions of
//! elementary columns) together with the names of those columns. It is built
//! once by [`RecipeCatalog::fit`] and then only read, so a single catalog can
//! serve any number of concurrent transforms.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{MatchError, Result};
use crate::sparse::SparseBoolMatrix;

/// An immutable set of recipes over a named column vocabulary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipeCatalog {
    matrix: SparseBoolMatrix,
    column_names: Vec<String>,
}

impl RecipeCatalog {
    /// Fit a catalog from a recipe matrix and its column names.
    ///
    /// Fails with [`MatchError::ShapeMismatch`] if the number of names differs
    /// from the matrix width, and with [`MatchError::InvalidCatalog`] if a name
    /// is repeated (alignment by name would be ambiguous).
    pub fn fit<S: AsRef<str>>(mapping: SparseBoolMatrix, column_names: &[S]) -> Result<Self> {
        if column_names.len() != mapping.cols() {
            return Err(MatchError::ShapeMismatch {
                what: "catalog column names",
                expected: mapping.cols(),
                actual: column_names.len(),
            });
        }

        let mut seen = HashSet::with_capacity(column_names.len());
        for name in column_names {
            if !seen.insert(name.as_ref()) {
                return Err(MatchError::InvalidCatalog {
                    name: name.as_ref().to_string(),
                });
            }
        }

        debug!(
            recipes = mapping.rows(),
            columns = mapping.cols(),
            "fitted recipe catalog"
        );

        Ok(Self {
            column_names: column_names.iter().map(|n| n.as_ref().to_string()).collect(),
            matrix: mapping,
        })
    }

    /// The recipe matrix (one row per recipe).
    pub fn matrix(&self) -> &SparseBoolMatrix {
        &self.matrix
    }

    /// Elementary column names, in matrix column order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of recipes
    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.rows() == 0
    }

    /// Required column indices of one recipe.
    pub fn recipe(&self, row: usize) -> &[usize] {
        self.matrix.row(row)
    }

    /// Display name of a recipe over the full catalog vocabulary.
    pub fn recipe_name(&self, row: usize) -> String {
        join_names(&self.column_names, self.recipe(row))
    }
}

/// Underscore-join the names at the given (sorted) positions.
pub(crate) fn join_names(names: &[String], positions: &[usize]) -> String {
    positions
        .iter()
        .map(|&p| names[p].as_str())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> SparseBoolMatrix {
        SparseBoolMatrix::from_rows(3, vec![vec![0, 1], vec![2]]).unwrap()
    }

    #[test]
    fn test_fit() {
        let catalog = RecipeCatalog::fit(mapping(), &["a", "b", "c"]).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.column_names(), &["a", "b", "c"]);
        assert_eq!(catalog.recipe(0), &[0, 1]);
        assert_eq!(catalog.recipe_name(0), "a_b");
        assert_eq!(catalog.recipe_name(1), "c");
    }

    #[test]
    fn test_fit_shape_mismatch() {
        let err = RecipeCatalog::fit(mapping(), &["a", "b"]).unwrap_err();
        assert_eq!(
            err,
            MatchError::ShapeMismatch {
                what: "catalog column names",
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_fit_duplicate_names() {
        let err = RecipeCatalog::fit(mapping(), &["a", "b", "a"]).unwrap_err();
        assert_eq!(
            err,
            MatchError::InvalidCatalog {
                name: "a".to_string()
            }
        );
    }
}
