//! Recipe reduction.
//!
//! Rewrites catalog recipes in terms of the common columns of an
//! [`Alignment`]:
//!
//! 1. **disqualify** recipes that require a column absent from the
//!    observations (they can never hold, and must not degrade into a weaker
//!    recipe over the columns that remain);
//! 2. **restrict** the rest to common positions;
//! 3. **drop** recipes left with no requirement (they would match everything);
//! 4. **deduplicate** identical requirement sets, keeping the first catalog row;
//! 5. **name** each survivor by joining its common column names with `_`.
//!
//! Disqualification is checked against the original catalog row, before the
//! restricted row is ever used.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::align::Alignment;
use crate::catalog::{join_names, RecipeCatalog};
use crate::sparse::SparseBoolMatrix;

/// Counters describing what reduction removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReductionStats {
    /// Recipes requiring an unobserved column
    pub disqualified: usize,
    /// Recipes with an empty requirement set
    pub empty: usize,
    /// Recipes identical to an earlier survivor
    pub duplicates: usize,
}

/// Recipes expressed over the common-column universe.
#[derive(Clone, Debug, PartialEq)]
pub struct ReducedRecipes {
    /// One row per surviving recipe; columns are common positions.
    pub matrix: SparseBoolMatrix,
    /// Output name of each surviving recipe.
    pub output_names: Vec<String>,
    /// Catalog row each surviving recipe was taken from.
    pub source_rows: Vec<usize>,
    pub stats: ReductionStats,
}

impl ReducedRecipes {
    /// Number of surviving recipes
    pub fn len(&self) -> usize {
        self.output_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output_names.is_empty()
    }
}

/// Reduce `catalog` against `alignment`.
///
/// Total for any alignment computed from the catalog's own column names.
pub fn reduce(catalog: &RecipeCatalog, alignment: &Alignment) -> ReducedRecipes {
    let projection = alignment.catalog_projection();
    let mut stats = ReductionStats::default();
    let mut survivors: IndexMap<Vec<usize>, usize> = IndexMap::new();

    for (row, recipe) in catalog.matrix().iter_rows().enumerate() {
        if is_disqualified(recipe, alignment) {
            stats.disqualified += 1;
            continue;
        }

        let restricted = restrict(recipe, &projection);
        if restricted.is_empty() {
            stats.empty += 1;
            continue;
        }

        match survivors.entry(restricted) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(_) => stats.duplicates += 1,
        }
    }

    let output_names = survivors
        .keys()
        .map(|required| join_names(&alignment.common_names, required))
        .collect();
    let source_rows = survivors.values().copied().collect();
    let matrix =
        SparseBoolMatrix::from_normalized_rows(alignment.len(), survivors.into_keys().collect());

    ReducedRecipes {
        matrix,
        output_names,
        source_rows,
        stats,
    }
}

/// A recipe is disqualified if any of its catalog columns went unobserved.
fn is_disqualified(recipe: &[usize], alignment: &Alignment) -> bool {
    recipe.iter().any(|&c| alignment.is_unmatched(c))
}

/// Re-express a catalog row in common positions, sorted.
fn restrict(recipe: &[usize], projection: &[Option<usize>]) -> Vec<usize> {
    let mut restricted: Vec<usize> = recipe.iter().filter_map(|&c| projection[c]).collect();
    restricted.sort_unstable();
    restricted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align;

    fn catalog(cols: &[&str], rows: Vec<Vec<usize>>) -> RecipeCatalog {
        let m = SparseBoolMatrix::from_rows(cols.len(), rows).unwrap();
        RecipeCatalog::fit(m, cols).unwrap()
    }

    #[test]
    fn test_disqualifies_before_restricting() {
        let cat = catalog(&["a", "b"], vec![vec![0, 1]]);
        let reduced = reduce(&cat, &align(cat.column_names(), &["a"]));
        assert!(reduced.is_empty());
        assert_eq!(reduced.stats.disqualified, 1);
        assert_eq!(reduced.matrix.shape(), (0, 1));
    }

    #[test]
    fn test_drops_empty_and_duplicates() {
        let cat = catalog(
            &["a", "b", "c"],
            vec![vec![], vec![1, 0], vec![0, 1], vec![2], vec![0, 1]],
        );
        let reduced = reduce(&cat, &align(cat.column_names(), &["c", "b", "a"]));
        assert_eq!(reduced.output_names, vec!["a_b", "c"]);
        assert_eq!(reduced.source_rows, vec![1, 3]);
        assert_eq!(
            reduced.stats,
            ReductionStats {
                disqualified: 0,
                empty: 1,
                duplicates: 2
            }
        );
    }

    #[test]
    fn test_names_follow_common_order() {
        // Common order follows the catalog, whatever the observation order.
        let cat = catalog(&["shape", "color", "weight", "size"], vec![vec![3, 1]]);
        let reduced = reduce(&cat, &align(cat.column_names(), &["size", "color", "shape"]));
        assert_eq!(reduced.output_names, vec!["color_size"]);
        assert_eq!(reduced.matrix.row(0), &[1, 2]);
    }
}
