//! Sparse Boolean matrix (row-compressed).
//!
//! Each row stores the sorted, duplicate-free list of column indices that are
//! `true`. This is the only storage format the matcher relies on; CSR and
//! dense inputs are converted at the boundary.

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

/// A sparse Boolean matrix stored row by row.
///
/// Invariant: every row is strictly increasing and all indices are `< cols`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix", into = "RawMatrix")]
pub struct SparseBoolMatrix {
    cols: usize,
    row_indices: Vec<Vec<usize>>,
}

/// Unvalidated exchange shape `{ rows, cols, row_indices }`.
///
/// This is what crosses serialization boundaries; converting it into a
/// [`SparseBoolMatrix`] sorts each row and checks bounds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMatrix {
    pub rows: usize,
    pub cols: usize,
    pub row_indices: Vec<Vec<usize>>,
}

impl SparseBoolMatrix {
    /// Create an all-false matrix.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            row_indices: vec![Vec::new(); rows],
        }
    }

    /// Build a matrix from per-row column indices.
    ///
    /// Rows may be given in any order and may repeat an index; they are
    /// sorted and deduplicated. Fails if an index is `>= cols`.
    pub fn from_rows<I, R>(cols: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = usize>,
    {
        let mut row_indices = Vec::new();
        for (row, indices) in rows.into_iter().enumerate() {
            let mut indices: Vec<usize> = indices.into_iter().collect();
            if let Some(&col) = indices.iter().find(|&&c| c >= cols) {
                return Err(MatchError::ColumnOutOfBounds { row, col, cols });
            }
            indices.sort_unstable();
            indices.dedup();
            row_indices.push(indices);
        }
        Ok(Self { cols, row_indices })
    }

    /// Build a matrix from rows already known to be sorted, unique and in bounds.
    pub(crate) fn from_normalized_rows(cols: usize, row_indices: Vec<Vec<usize>>) -> Self {
        debug_assert!(row_indices
            .iter()
            .all(|r| r.windows(2).all(|w| w[0] < w[1]) && r.iter().all(|&c| c < cols)));
        Self { cols, row_indices }
    }

    /// Build a `dense.len() × cols` matrix from a row-major Boolean grid.
    ///
    /// Every row must have exactly `cols` entries.
    pub fn from_dense(cols: usize, dense: &[Vec<bool>]) -> Result<Self> {
        let mut row_indices = Vec::with_capacity(dense.len());
        for row in dense {
            if row.len() != cols {
                return Err(MatchError::ShapeMismatch {
                    what: "dense row width",
                    expected: cols,
                    actual: row.len(),
                });
            }
            row_indices.push(
                row.iter()
                    .enumerate()
                    .filter_map(|(c, &v)| v.then_some(c))
                    .collect(),
            );
        }
        Ok(Self { cols, row_indices })
    }

    /// Build a matrix from a compressed-sparse-row triple.
    ///
    /// `indptr` has `rows + 1` non-decreasing entries starting at 0 and
    /// ending at `indices.len()`; row `i` owns `indices[indptr[i]..indptr[i + 1]]`.
    pub fn from_csr(rows: usize, cols: usize, indptr: &[usize], indices: &[usize]) -> Result<Self> {
        if indptr.len() != rows + 1 {
            return Err(MatchError::MalformedCsr(format!(
                "indptr has {} entries, expected {}",
                indptr.len(),
                rows + 1
            )));
        }
        if indptr[0] != 0 || indptr[rows] != indices.len() {
            return Err(MatchError::MalformedCsr(format!(
                "indptr must span 0..{}, got {}..{}",
                indices.len(),
                indptr[0],
                indptr[rows]
            )));
        }
        if let Some(i) = indptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(MatchError::MalformedCsr(format!(
                "indptr decreases at row {i}"
            )));
        }
        Self::from_rows(
            cols,
            indptr
                .windows(2)
                .map(|w| indices[w[0]..w[1]].iter().copied()),
        )
    }

    /// Export as a compressed-sparse-row pair `(indptr, indices)`.
    pub fn to_csr(&self) -> (Vec<usize>, Vec<usize>) {
        let mut indptr = Vec::with_capacity(self.rows() + 1);
        let mut indices = Vec::with_capacity(self.nnz());
        indptr.push(0);
        for row in &self.row_indices {
            indices.extend_from_slice(row);
            indptr.push(indices.len());
        }
        (indptr, indices)
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.row_indices.len()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols)
    }

    /// Sorted column indices of one row.
    pub fn row(&self, row: usize) -> &[usize] {
        &self.row_indices[row]
    }

    /// Iterate over rows as sorted index slices.
    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[usize]> + '_ {
        self.row_indices.iter().map(Vec::as_slice)
    }

    /// Number of true entries
    pub fn nnz(&self) -> usize {
        self.row_indices.iter().map(Vec::len).sum()
    }

    /// True if no entry is set (regardless of shape).
    pub fn is_all_false(&self) -> bool {
        self.row_indices.iter().all(Vec::is_empty)
    }

    /// Check a single entry.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.row_indices
            .get(row)
            .is_some_and(|r| r.binary_search(&col).is_ok())
    }

    /// Re-express every row in another column universe.
    ///
    /// `col_map[c]` is the new index of old column `c`, or `None` to drop it.
    /// Rows are re-sorted since the map need not be monotone.
    pub fn project(&self, col_map: &[Option<usize>], new_cols: usize) -> Self {
        debug_assert_eq!(col_map.len(), self.cols);
        let row_indices = self
            .row_indices
            .iter()
            .map(|row| {
                let mut projected: Vec<usize> =
                    row.iter().filter_map(|&c| col_map[c]).collect();
                projected.sort_unstable();
                projected
            })
            .collect();
        Self::from_normalized_rows(new_cols, row_indices)
    }

    /// Number of true entries in each column.
    pub fn column_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.cols];
        for row in &self.row_indices {
            for &c in row {
                counts[c] += 1;
            }
        }
        counts
    }

    /// Keep only the columns where `keep[c]` holds, renumbering the survivors
    /// in their original order.
    pub fn retain_columns(&self, keep: &[bool]) -> Self {
        debug_assert_eq!(keep.len(), self.cols);
        let mut next = 0;
        let col_map: Vec<Option<usize>> = keep
            .iter()
            .map(|&k| {
                k.then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
        self.project(&col_map, next)
    }
}

impl TryFrom<RawMatrix> for SparseBoolMatrix {
    type Error = MatchError;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        if raw.rows != raw.row_indices.len() {
            return Err(MatchError::ShapeMismatch {
                what: "row count",
                expected: raw.rows,
                actual: raw.row_indices.len(),
            });
        }
        Self::from_rows(raw.cols, raw.row_indices)
    }
}

impl From<SparseBoolMatrix> for RawMatrix {
    fn from(m: SparseBoolMatrix) -> Self {
        Self {
            rows: m.rows(),
            cols: m.cols,
            row_indices: m.row_indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_normalizes() {
        let m = SparseBoolMatrix::from_rows(4, vec![vec![3, 1, 3], vec![], vec![0]]).unwrap();
        assert_eq!(m.shape(), (3, 4));
        assert_eq!(m.row(0), &[1, 3]);
        assert!(m.row(1).is_empty());
        assert_eq!(m.nnz(), 3);
        assert!(m.contains(0, 3));
        assert!(!m.contains(0, 2));
        assert!(!m.contains(7, 0));
    }

    #[test]
    fn test_from_rows_out_of_bounds() {
        let err = SparseBoolMatrix::from_rows(2, vec![vec![0], vec![2]]).unwrap_err();
        assert_eq!(
            err,
            MatchError::ColumnOutOfBounds {
                row: 1,
                col: 2,
                cols: 2
            }
        );
    }

    #[test]
    fn test_csr_import_export() {
        let m = SparseBoolMatrix::from_csr(3, 5, &[0, 2, 2, 3], &[4, 1, 0]).unwrap();
        assert_eq!(m.row(0), &[1, 4]);
        assert_eq!(m.row(2), &[0]);
        assert_eq!(m.to_csr(), (vec![0, 2, 2, 3], vec![1, 4, 0]));

        assert!(matches!(
            SparseBoolMatrix::from_csr(2, 5, &[0, 1], &[0]),
            Err(MatchError::MalformedCsr(_))
        ));
        assert!(matches!(
            SparseBoolMatrix::from_csr(2, 5, &[0, 2, 1], &[0, 1]),
            Err(MatchError::MalformedCsr(_))
        ));
    }

    #[test]
    fn test_from_dense() {
        let m =
            SparseBoolMatrix::from_dense(3, &[vec![true, false, true], vec![false, false, false]])
                .unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.row(0), &[0, 2]);

        // No rows still keeps the declared width.
        let empty = SparseBoolMatrix::from_dense(4, &[]).unwrap();
        assert_eq!(empty.shape(), (0, 4));

        let ragged = SparseBoolMatrix::from_dense(1, &[vec![true], vec![true, false]]);
        assert!(matches!(ragged, Err(MatchError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_project_resorts() {
        let m = SparseBoolMatrix::from_rows(3, vec![vec![0, 1, 2]]).unwrap();
        // Reverse columns 0 and 2, drop column 1
        let p = m.project(&[Some(1), None, Some(0)], 2);
        assert_eq!(p.shape(), (1, 2));
        assert_eq!(p.row(0), &[0, 1]);
    }

    #[test]
    fn test_retain_columns() {
        let m = SparseBoolMatrix::from_rows(4, vec![vec![0, 3], vec![1, 2, 3]]).unwrap();
        assert_eq!(m.column_counts(), vec![1, 1, 1, 2]);
        let r = m.retain_columns(&[false, true, false, true]);
        assert_eq!(r.shape(), (2, 2));
        assert_eq!(r.row(0), &[1]);
        assert_eq!(r.row(1), &[0, 1]);
    }
}
