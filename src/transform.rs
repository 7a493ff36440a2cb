//! End-to-end transform: align, reduce, project, match.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::align::align;
use crate::catalog::RecipeCatalog;
use crate::engine::{MatchEngine, MatchMode};
use crate::error::{MatchError, Result};
use crate::reduce::{reduce, ReductionStats};
use crate::sparse::SparseBoolMatrix;

/// Per-call matching options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Minimum number of a recipe's columns that must be present.
    /// `None` means every column must be present.
    pub smin: Option<usize>,
    /// Attribute each observed column to at most one recipe.
    pub greedy_cover: bool,
    /// Drop output recipes matched by fewer observations than this. Under
    /// greedy cover, observations that used a dropped recipe are covered
    /// again by the remaining ones.
    pub min_support: Option<usize>,
}

impl TransformOptions {
    pub fn with_smin(mut self, smin: usize) -> Self {
        self.smin = Some(smin);
        self
    }

    pub fn with_greedy_cover(mut self) -> Self {
        self.greedy_cover = true;
        self
    }

    pub fn with_min_support(mut self, min_support: usize) -> Self {
        self.min_support = Some(min_support);
        self
    }

    /// The matching mode these options select.
    pub fn mode(&self) -> Result<MatchMode> {
        match (self.smin, self.greedy_cover) {
            (Some(_), true) => Err(MatchError::ConflictingModes),
            (Some(smin), false) => Ok(MatchMode::Threshold(smin)),
            (None, true) => Ok(MatchMode::GreedyCover),
            (None, false) => Ok(MatchMode::Exact),
        }
    }
}

/// Non-fatal conditions met during a transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformWarning {
    /// Catalog and observations share no column name; the result has no columns.
    EmptyAlignment,
}

impl fmt::Display for TransformWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformWarning::EmptyAlignment => {
                write!(f, "catalog and observations share no column names")
            }
        }
    }
}

/// Result of a transform.
#[derive(Clone, Debug, PartialEq)]
pub struct Transformed {
    /// `observations × output recipes`
    pub matrix: SparseBoolMatrix,
    /// Name of each output column.
    pub output_names: Vec<String>,
    /// Catalog row behind each output column.
    pub source_rows: Vec<usize>,
    /// What reduction removed from the catalog.
    pub stats: ReductionStats,
    pub warnings: Vec<TransformWarning>,
}

impl Transformed {
    pub fn into_parts(self) -> (SparseBoolMatrix, Vec<String>) {
        (self.matrix, self.output_names)
    }
}

impl RecipeCatalog {
    /// Transform observations with a default engine.
    ///
    /// `smin = None` selects exact matching, `Some(k)` threshold matching.
    pub fn transform<S: AsRef<str>>(
        &self,
        observations: &SparseBoolMatrix,
        column_names: &[S],
        smin: Option<usize>,
    ) -> Result<Transformed> {
        let options = TransformOptions {
            smin,
            ..TransformOptions::default()
        };
        transform_with(&MatchEngine::default(), self, observations, column_names, &options)
    }
}

/// Map observations onto the recipes of `catalog`.
///
/// All structural checks happen before any matrix work: the observation
/// names must match the observation width and be unique, and the options
/// must select a valid mode for the aligned universe.
#[instrument(skip_all, fields(observations = observations.rows(), recipes = catalog.len()))]
pub fn transform_with<S: AsRef<str>>(
    engine: &MatchEngine,
    catalog: &RecipeCatalog,
    observations: &SparseBoolMatrix,
    column_names: &[S],
    options: &TransformOptions,
) -> Result<Transformed> {
    if column_names.len() != observations.cols() {
        return Err(MatchError::ShapeMismatch {
            what: "observation column names",
            expected: observations.cols(),
            actual: column_names.len(),
        });
    }
    let mut seen = HashSet::with_capacity(column_names.len());
    for name in column_names {
        if !seen.insert(name.as_ref()) {
            return Err(MatchError::InvalidObservations {
                name: name.as_ref().to_string(),
            });
        }
    }

    let mode = options.mode()?;
    if options.min_support == Some(0) {
        return Err(MatchError::InvalidMinSupport { min_support: 0 });
    }

    let alignment = align(catalog.column_names(), column_names);
    mode.validate(alignment.len())?;

    let mut warnings = Vec::new();
    if alignment.is_empty() {
        warn!("catalog and observations share no column names");
        warnings.push(TransformWarning::EmptyAlignment);
    }

    let reduced = reduce(catalog, &alignment);
    debug!(
        common = alignment.len(),
        kept = reduced.len(),
        disqualified = reduced.stats.disqualified,
        empty = reduced.stats.empty,
        duplicates = reduced.stats.duplicates,
        "reduced catalog"
    );

    let obs_restricted =
        observations.project(&alignment.observation_projection(), alignment.len());
    let matrix = match (mode, options.min_support) {
        (MatchMode::GreedyCover, Some(min_support)) => {
            engine.cover_with_support(&obs_restricted, &reduced.matrix, min_support)?
        }
        _ => engine.match_rows(&obs_restricted, &reduced.matrix, mode)?,
    };

    let mut output_names = reduced.output_names;
    let mut source_rows = reduced.source_rows;
    let matrix = match options.min_support {
        Some(min_support) => {
            let keep: Vec<bool> = matrix
                .column_counts()
                .into_iter()
                .map(|n| n >= min_support)
                .collect();
            output_names = select(output_names, &keep);
            source_rows = select(source_rows, &keep);
            debug!(
                min_support,
                dropped = keep.iter().filter(|k| !**k).count(),
                "pruned unsupported recipes"
            );
            matrix.retain_columns(&keep)
        }
        None => matrix,
    };

    Ok(Transformed {
        matrix,
        output_names,
        source_rows,
        stats: reduced.stats,
        warnings,
    })
}

fn select<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, &k)| k.then_some(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        assert_eq!(TransformOptions::default().mode(), Ok(MatchMode::Exact));
        assert_eq!(
            TransformOptions::default().with_smin(2).mode(),
            Ok(MatchMode::Threshold(2))
        );
        assert_eq!(
            TransformOptions::default().with_greedy_cover().mode(),
            Ok(MatchMode::GreedyCover)
        );
        assert_eq!(
            TransformOptions::default()
                .with_smin(2)
                .with_greedy_cover()
                .mode(),
            Err(MatchError::ConflictingModes)
        );
    }

    #[test]
    fn test_min_support_prunes_columns() {
        let mapping = SparseBoolMatrix::from_rows(3, vec![vec![0], vec![1], vec![2]]).unwrap();
        let catalog = RecipeCatalog::fit(mapping, &["a", "b", "c"]).unwrap();
        let obs = SparseBoolMatrix::from_rows(3, vec![vec![0, 1], vec![0], vec![0, 2]]).unwrap();

        let options = TransformOptions::default().with_min_support(2);
        let out = transform_with(
            &MatchEngine::default(),
            &catalog,
            &obs,
            &["a", "b", "c"],
            &options,
        )
        .unwrap();

        assert_eq!(out.output_names, vec!["a"]);
        assert_eq!(out.source_rows, vec![0]);
        assert_eq!(out.matrix.shape(), (3, 1));
        assert_eq!(out.matrix.column_counts(), vec![3]);
    }
}
