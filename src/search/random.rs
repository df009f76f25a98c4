//! Randomized hyperparameter search with cross-validation

use crate::error::{PipelineError, Result};
use crate::metrics::r2_score;
use crate::model::Regressor;
use crate::search::space::{SearchSpace, TrialParams};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for [`RandomSearch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of sampled parameter configurations
    pub n_iter: usize,
    /// Cross-validation folds per trial
    pub cv_folds: usize,
    /// Shuffle samples before folding
    pub shuffle: bool,
    /// Random seed for sampling and shuffling
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iter: 10,
            cv_folds: 3,
            shuffle: false,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Result of a single trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub trial_id: usize,
    pub params: TrialParams,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// All trials of one search, with the best one tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub trials: Vec<TrialOutcome>,
    best_idx: Option<usize>,
}

impl SearchOutcome {
    fn new() -> Self {
        Self {
            trials: Vec::new(),
            best_idx: None,
        }
    }

    /// Record a trial; the first strictly-best mean score wins.
    fn push(&mut self, trial: TrialOutcome) {
        let is_better = match self.best_idx {
            None => true,
            Some(best) => trial.mean_score > self.trials[best].mean_score,
        };
        if is_better {
            self.best_idx = Some(self.trials.len());
        }
        self.trials.push(trial);
    }

    pub fn best_trial(&self) -> Option<&TrialOutcome> {
        self.best_idx.map(|idx| &self.trials[idx])
    }

    pub fn best_params(&self) -> Option<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_trial().map(|t| t.mean_score)
    }
}

/// Build `n_splits` train/validation index pairs over `n_samples` rows.
///
/// Remainder rows are distributed over the leading folds, so fold sizes
/// differ by at most one.
fn k_fold_indices(
    n_samples: usize,
    n_splits: usize,
    shuffle: bool,
    seed: Option<u64>,
) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if n_splits < 2 {
        return Err(PipelineError::ValidationError(
            "cv_folds must be at least 2".to_string(),
        ));
    }
    if n_samples < n_splits {
        return Err(PipelineError::ValidationError(format!(
            "n_samples ({n_samples}) must be >= cv_folds ({n_splits})"
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    if shuffle {
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        indices.shuffle(&mut rng);
    }

    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;

    let mut splits = Vec::with_capacity(n_splits);
    let mut start = 0;
    for fold in 0..n_splits {
        let fold_size = if fold < remainder { base + 1 } else { base };
        let val: Vec<usize> = indices[start..start + fold_size].to_vec();
        let train: Vec<usize> = indices[..start]
            .iter()
            .chain(indices[start + fold_size..].iter())
            .copied()
            .collect();
        splits.push((train, val));
        start += fold_size;
    }
    Ok(splits)
}

/// Randomized hyperparameter search.
///
/// Each trial samples one configuration from the search space, applies it to
/// a clone of the model, and cross-validates with R² scoring. Model errors
/// during a trial abort the whole search.
pub struct RandomSearch {
    config: SearchConfig,
}

impl RandomSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        model: &dyn Regressor,
        space: &SearchSpace,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<SearchOutcome> {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let folds = k_fold_indices(
            x.nrows(),
            self.config.cv_folds,
            self.config.shuffle,
            self.config.seed,
        )?;

        let mut rng = match self.config.seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut outcome = SearchOutcome::new();

        for trial_id in 0..self.config.n_iter {
            let params = space.sample(&mut rng)?;

            let mut fold_scores = Vec::with_capacity(folds.len());
            for (train_idx, val_idx) in &folds {
                let mut candidate = model.boxed_clone();
                candidate.apply_params(&params)?;

                let x_train = x.select(Axis(0), train_idx);
                let y_train = y.select(Axis(0), train_idx);
                let x_val = x.select(Axis(0), val_idx);
                let y_val = y.select(Axis(0), val_idx);

                candidate.fit(&x_train, &y_train)?;
                let y_pred = candidate.predict(&x_val)?;
                fold_scores.push(r2_score(&y_val, &y_pred)?);
            }

            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(trial_id, mean_score, ?params, "trial finished");

            outcome.push(TrialOutcome {
                trial_id,
                params,
                fold_scores,
                mean_score,
            });
        }

        Ok(outcome)
    }
}
