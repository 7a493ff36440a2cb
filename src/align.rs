//! Name-based reconciliation of two column vocabularies.
//!
//! The catalog and the observations index their columns independently. An
//! [`Alignment`] identifies columns by name: the common names get a shared
//! position, and catalog columns with no observed counterpart are recorded so
//! that recipes needing them can be disqualified.

use std::collections::{HashMap, HashSet};

use roaring::RoaringTreemap;

/// Column correspondence between a catalog and one observation matrix.
///
/// Computed fresh for every transform and never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
    /// Names present on both sides, in catalog order.
    pub common_names: Vec<String>,
    /// For each common position, the observation column carrying that name.
    pub obs_col_of: Vec<usize>,
    /// For each common position, the catalog column carrying that name.
    pub catalog_col_of: Vec<usize>,
    /// Catalog columns whose name never occurs in the observations.
    pub unmatched_catalog_cols: RoaringTreemap,
    catalog_cols: usize,
    obs_cols: usize,
}

/// Align a catalog vocabulary with an observation vocabulary.
///
/// `common_names` follows the order of first appearance in `catalog_names`.
/// When a name repeats on either side, its first occurrence wins.
pub fn align<C: AsRef<str>, O: AsRef<str>>(catalog_names: &[C], obs_names: &[O]) -> Alignment {
    let mut obs_index: HashMap<&str, usize> = HashMap::with_capacity(obs_names.len());
    for (i, name) in obs_names.iter().enumerate() {
        obs_index.entry(name.as_ref()).or_insert(i);
    }

    let mut common_names = Vec::new();
    let mut obs_col_of = Vec::new();
    let mut catalog_col_of = Vec::new();
    let mut unmatched_catalog_cols = RoaringTreemap::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (c, name) in catalog_names.iter().enumerate() {
        let name = name.as_ref();
        match obs_index.get(name) {
            Some(&o) => {
                if seen.insert(name) {
                    common_names.push(name.to_string());
                    obs_col_of.push(o);
                    catalog_col_of.push(c);
                }
            }
            None => {
                unmatched_catalog_cols.insert(c as u64);
            }
        }
    }

    Alignment {
        common_names,
        obs_col_of,
        catalog_col_of,
        unmatched_catalog_cols,
        catalog_cols: catalog_names.len(),
        obs_cols: obs_names.len(),
    }
}

impl Alignment {
    /// Number of common columns
    pub fn len(&self) -> usize {
        self.common_names.len()
    }

    /// True when the two vocabularies are disjoint.
    pub fn is_empty(&self) -> bool {
        self.common_names.is_empty()
    }

    /// Whether a catalog column has no observed counterpart.
    pub fn is_unmatched(&self, catalog_col: usize) -> bool {
        self.unmatched_catalog_cols.contains(catalog_col as u64)
    }

    /// Catalog column → common position (or `None` if dropped).
    pub fn catalog_projection(&self) -> Vec<Option<usize>> {
        projection(self.catalog_cols, &self.catalog_col_of)
    }

    /// Observation column → common position (or `None` if dropped).
    pub fn observation_projection(&self) -> Vec<Option<usize>> {
        projection(self.obs_cols, &self.obs_col_of)
    }
}

fn projection(width: usize, col_of: &[usize]) -> Vec<Option<usize>> {
    let mut map = vec![None; width];
    for (common, &col) in col_of.iter().enumerate() {
        map[col] = Some(common);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_orders_by_catalog() {
        let a = align(&["a", "b", "c", "d"], &["d", "x", "b", "a"]);
        assert_eq!(a.common_names, vec!["a", "b", "d"]);
        assert_eq!(a.catalog_col_of, vec![0, 1, 3]);
        assert_eq!(a.obs_col_of, vec![3, 2, 0]);
        assert_eq!(a.unmatched_catalog_cols.iter().collect::<Vec<_>>(), vec![2]);
        assert!(a.is_unmatched(2));
        assert!(!a.is_unmatched(0));
    }

    #[test]
    fn test_projections() {
        let a = align(&["a", "b", "c"], &["c", "z", "a"]);
        assert_eq!(a.catalog_projection(), vec![Some(0), None, Some(1)]);
        assert_eq!(a.observation_projection(), vec![Some(1), None, Some(0)]);
    }

    #[test]
    fn test_disjoint_vocabularies() {
        let a = align(&["a", "b"], &["x"]);
        assert!(a.is_empty());
        assert_eq!(a.unmatched_catalog_cols.len(), 2);
        assert_eq!(a.observation_projection(), vec![None]);
    }
}
