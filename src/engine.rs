//! Coverage computation between observations and recipes.
//!
//! For every observation row `i` and recipe `j` the engine counts
//! `|required(j) ∩ present(i)|` and compares it against the mode:
//!
//! - [`MatchMode::Exact`]: count equals `|required(j)|` (subset test);
//! - [`MatchMode::Threshold`]: count is at least `smin`;
//! - [`MatchMode::GreedyCover`]: exact matches, then kept greedily in recipe
//!   order so that no observed column is attributed to two recipes.
//!
//! Counting goes through an inverted index (column → recipes requiring it), so
//! a row only touches recipes sharing at least one column with it. Rows are
//! independent and are split across rayon workers once there are enough of
//! them.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::error::{MatchError, Result};
use crate::sparse::SparseBoolMatrix;

/// How a recipe is judged against one observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    /// Every required column is present.
    Exact,
    /// At least `smin` required columns are present.
    Threshold(usize),
    /// Exact matches, greedily restricted to pairwise-disjoint recipes.
    GreedyCover,
}

impl MatchMode {
    /// Check the mode against a column universe of `universe` columns.
    ///
    /// `smin` must be at least 1, and at most `universe` unless the universe
    /// is empty (in which case there is nothing to match anyway).
    pub fn validate(self, universe: usize) -> Result<()> {
        match self {
            MatchMode::Threshold(smin) if smin == 0 || (universe > 0 && smin > universe) => {
                Err(MatchError::InvalidThreshold {
                    smin,
                    max: universe,
                })
            }
            _ => Ok(()),
        }
    }

    fn accepts(self, count: usize, required: usize) -> bool {
        match self {
            MatchMode::Exact | MatchMode::GreedyCover => count == required,
            MatchMode::Threshold(smin) => count >= smin,
        }
    }
}

/// Engine tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of a private worker pool; `None` shares rayon's global pool.
    pub num_threads: Option<usize>,
    /// Inputs with fewer observation rows are matched on the calling thread.
    pub parallel_min_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            parallel_min_rows: 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    pub fn with_parallel_min_rows(mut self, rows: usize) -> Self {
        self.parallel_min_rows = rows;
        self
    }
}

/// A reusable matcher.
///
/// Construct it once, share it by reference across transforms, and drop it
/// to release its worker pool (if it owns one). Holds no per-call state.
#[derive(Debug)]
pub struct MatchEngine {
    config: EngineConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            pool: None,
        }
    }
}

impl MatchEngine {
    /// Create an engine, starting a private worker pool if one is configured.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let pool = match config.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("recipe-match-{i}"))
                    .build()
                    .map_err(|e| MatchError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subset matching: `result[i, j]` iff recipe `j` ⊆ observation `i`.
    pub fn match_exact(
        &self,
        obs: &SparseBoolMatrix,
        recipes: &SparseBoolMatrix,
    ) -> Result<SparseBoolMatrix> {
        self.match_rows(obs, recipes, MatchMode::Exact)
    }

    /// Support matching: `result[i, j]` iff at least `smin` columns of
    /// recipe `j` are present in observation `i`.
    pub fn match_threshold(
        &self,
        obs: &SparseBoolMatrix,
        recipes: &SparseBoolMatrix,
        smin: usize,
    ) -> Result<SparseBoolMatrix> {
        self.match_rows(obs, recipes, MatchMode::Threshold(smin))
    }

    /// Greedy disjoint cover of each observation by recipes, in recipe order.
    pub fn cover(
        &self,
        obs: &SparseBoolMatrix,
        recipes: &SparseBoolMatrix,
    ) -> Result<SparseBoolMatrix> {
        self.match_rows(obs, recipes, MatchMode::GreedyCover)
    }

    /// Match every observation row against every recipe under `mode`.
    ///
    /// `obs` and `recipes` must share the same column universe. The result
    /// has one row per observation and one column per recipe.
    pub fn match_rows(
        &self,
        obs: &SparseBoolMatrix,
        recipes: &SparseBoolMatrix,
        mode: MatchMode,
    ) -> Result<SparseBoolMatrix> {
        check_universes(obs, recipes)?;
        mode.validate(recipes.cols())?;

        info!(
            observations = obs.rows(),
            recipes = recipes.rows(),
            ?mode,
            "matching observations onto recipes"
        );

        let index = RecipeIndex::new(recipes);
        let rows = self.map_rows(obs.rows(), recipes, |i, scratch| match mode {
            MatchMode::GreedyCover => index.cover(obs.row(i), scratch),
            _ => index.count_matches(obs.row(i), mode, scratch),
        });

        Ok(SparseBoolMatrix::from_normalized_rows(recipes.rows(), rows))
    }

    /// Greedy cover in which every recipe used keeps at least `min_support`
    /// observations.
    ///
    /// The first recipe (in recipe order) used by between 1 and
    /// `min_support - 1` observations is retired, and only the observations
    /// it covered are covered again with the recipes still active. This
    /// repeats until no active recipe is under-supported. Columns of retired
    /// recipes are left empty, and recipes no observation uses are kept as
    /// empty columns.
    pub fn cover_with_support(
        &self,
        obs: &SparseBoolMatrix,
        recipes: &SparseBoolMatrix,
        min_support: usize,
    ) -> Result<SparseBoolMatrix> {
        check_universes(obs, recipes)?;
        if min_support == 0 {
            return Err(MatchError::InvalidMinSupport { min_support });
        }

        info!(
            observations = obs.rows(),
            recipes = recipes.rows(),
            min_support,
            "covering observations while maintaining support"
        );

        let mut index = RecipeIndex::new(recipes);
        let mut rows = self.map_rows(obs.rows(), recipes, |i, scratch| {
            index.cover(obs.row(i), scratch)
        });
        let mut support = vec![0usize; recipes.rows()];
        for row in &rows {
            for &j in row {
                support[j] += 1;
            }
        }

        while let Some(weak) = (0..recipes.rows())
            .find(|&j| !index.retired[j] && (1..min_support).contains(&support[j]))
        {
            index.retired[weak] = true;
            let affected: Vec<usize> = (0..obs.rows())
                .filter(|&i| rows[i].binary_search(&weak).is_ok())
                .collect();
            debug!(
                recipe = weak,
                support = support[weak],
                affected = affected.len(),
                "retiring under-supported recipe"
            );

            let recovered = self.map_rows(affected.len(), recipes, |k, scratch| {
                index.cover(obs.row(affected[k]), scratch)
            });
            for (&i, row) in affected.iter().zip(recovered) {
                for &j in &rows[i] {
                    support[j] -= 1;
                }
                for &j in &row {
                    support[j] += 1;
                }
                rows[i] = row;
            }
        }

        Ok(SparseBoolMatrix::from_normalized_rows(recipes.rows(), rows))
    }

    /// Run `f` for row positions `0..len`, in parallel once `len` reaches
    /// the configured threshold. Results are in position order.
    fn map_rows<F>(&self, len: usize, recipes: &SparseBoolMatrix, f: F) -> Vec<Vec<usize>>
    where
        F: Fn(usize, &mut Scratch) -> Vec<usize> + Sync,
    {
        if len < self.config.parallel_min_rows {
            let mut scratch = Scratch::new(recipes);
            return (0..len).map(|i| f(i, &mut scratch)).collect();
        }

        let run = || -> Vec<Vec<usize>> {
            (0..len)
                .into_par_iter()
                .map_init(|| Scratch::new(recipes), |scratch, i| f(i, scratch))
                .collect()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

fn check_universes(obs: &SparseBoolMatrix, recipes: &SparseBoolMatrix) -> Result<()> {
    if obs.cols() != recipes.cols() {
        return Err(MatchError::ShapeMismatch {
            what: "observation and recipe universes",
            expected: recipes.cols(),
            actual: obs.cols(),
        });
    }
    Ok(())
}

// ============================================================================
// KERNEL
// ============================================================================

/// Inverted view of a recipe matrix.
struct RecipeIndex<'a> {
    recipes: &'a SparseBoolMatrix,
    /// Column → recipes requiring it (increasing).
    postings: Vec<Vec<usize>>,
    /// Recipes with no requirement: subsets of every observation.
    unconditional: Vec<usize>,
    /// Recipes excluded from covers.
    retired: Vec<bool>,
}

/// Per-worker buffers, reset after every row.
struct Scratch {
    counts: Vec<usize>,
    touched: Vec<usize>,
    remaining: Vec<bool>,
}

impl Scratch {
    fn new(recipes: &SparseBoolMatrix) -> Self {
        Self {
            counts: vec![0; recipes.rows()],
            touched: Vec::new(),
            remaining: vec![false; recipes.cols()],
        }
    }
}

impl<'a> RecipeIndex<'a> {
    fn new(recipes: &'a SparseBoolMatrix) -> Self {
        let mut postings = vec![Vec::new(); recipes.cols()];
        let mut unconditional = Vec::new();
        for (j, required) in recipes.iter_rows().enumerate() {
            if required.is_empty() {
                unconditional.push(j);
            }
            for &c in required {
                postings[c].push(j);
            }
        }
        Self {
            recipes,
            postings,
            unconditional,
            retired: vec![false; recipes.rows()],
        }
    }

    /// Recipes accepted by `mode` for one observation, sorted.
    fn count_matches(&self, present: &[usize], mode: MatchMode, scratch: &mut Scratch) -> Vec<usize> {
        for &c in present {
            for &j in &self.postings[c] {
                if scratch.counts[j] == 0 {
                    scratch.touched.push(j);
                }
                scratch.counts[j] += 1;
            }
        }

        let mut matched = Vec::new();
        for j in scratch.touched.drain(..) {
            let count = std::mem::take(&mut scratch.counts[j]);
            if mode.accepts(count, self.recipes.row(j).len()) {
                matched.push(j);
            }
        }
        if mode == MatchMode::Exact {
            matched.extend_from_slice(&self.unconditional);
        }
        matched.sort_unstable();
        matched
    }

    /// Exact matches filtered so that each observed column is used once.
    fn cover(&self, present: &[usize], scratch: &mut Scratch) -> Vec<usize> {
        let candidates = self.count_matches(present, MatchMode::GreedyCover, scratch);

        for &c in present {
            scratch.remaining[c] = true;
        }
        let mut chosen = Vec::new();
        for j in candidates {
            if self.retired[j] {
                continue;
            }
            let required = self.recipes.row(j);
            if required.iter().all(|&c| scratch.remaining[c]) {
                for &c in required {
                    scratch.remaining[c] = false;
                }
                trace!(recipe = j, ?required, "cover takes recipe");
                chosen.push(j);
            }
        }
        for &c in present {
            scratch.remaining[c] = false;
        }
        chosen
    }
}
