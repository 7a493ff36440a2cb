//! Recipe matcher: compound Boolean features over named columns
//!
//! A *recipe* is a conjunction of elementary Boolean columns. Given a catalog
//! of recipes and a matrix of observations whose columns are named
//! independently, the matcher decides for every observation which recipes
//! hold and returns a new sparse Boolean matrix with one column per recipe.
//!
//! # Pipeline
//!
//! - **sparse**: row-compressed Boolean matrices (the exchange shape)
//! - **catalog**: the fitted, immutable recipe catalog
//! - **align**: name-based reconciliation of catalog and observation columns
//! - **reduce**: disqualify, restrict, deduplicate and name recipes
//! - **engine**: coverage computation (exact, threshold, greedy cover)
//! - **transform**: the end-to-end call tying the stages together
//!
//! ```
//! use recipe_matcher::{fit, transform, SparseBoolMatrix};
//!
//! let mapping = SparseBoolMatrix::from_rows(3, vec![vec![0, 1]]).unwrap();
//! let catalog = fit(mapping, &["a", "b", "c"]).unwrap();
//!
//! let obs = SparseBoolMatrix::from_rows(4, vec![vec![0, 1, 3], vec![0, 3]]).unwrap();
//! let (result, names) = transform(&catalog, &obs, &["a", "b", "c", "d"], None).unwrap();
//!
//! assert_eq!(names, vec!["a_b"]);
//! assert!(result.contains(0, 0));
//! assert!(!result.contains(1, 0));
//! ```

pub mod align;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod reduce;
pub mod sparse;
mod transform;

pub use align::{align, Alignment};
pub use catalog::RecipeCatalog;
pub use engine::{EngineConfig, MatchEngine, MatchMode};
pub use error::{MatchError, Result};
pub use reduce::{reduce, ReducedRecipes, ReductionStats};
pub use sparse::{RawMatrix, SparseBoolMatrix};
pub use transform::{transform_with, TransformOptions, TransformWarning, Transformed};

/// Fit a recipe catalog from a mapping matrix and its column names.
pub fn fit<S: AsRef<str>>(mapping: SparseBoolMatrix, column_names: &[S]) -> Result<RecipeCatalog> {
    RecipeCatalog::fit(mapping, column_names)
}

/// Map `input_obs` onto the recipes of `catalog`.
///
/// Returns the `observations × recipes` result and the name of each output
/// column. `smin` selects threshold matching.
pub fn transform<S: AsRef<str>>(
    catalog: &RecipeCatalog,
    input_obs: &SparseBoolMatrix,
    column_names: &[S],
    smin: Option<usize>,
) -> Result<(SparseBoolMatrix, Vec<String>)> {
    catalog
        .transform(input_obs, column_names, smin)
        .map(Transformed::into_parts)
}
