//! K-nearest neighbors regression
//!
//! Brute-force neighbor search; prediction is parallelized over query rows.

use crate::error::{PipelineError, Result};
use crate::model::Regressor;
use crate::search::TrialParams;
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Distance metric for neighbor search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Distance {
    #[default]
    Euclidean,
    Manhattan,
}

impl Distance {
    fn compute(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            Distance::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            Distance::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// Neighbor weighting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weighting {
    /// All neighbors count equally
    #[default]
    Uniform,
    /// Closer neighbors count more (inverse distance)
    InverseDistance,
}

/// K-nearest neighbors regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnRegressor {
    pub n_neighbors: usize,
    pub metric: Distance,
    pub weights: Weighting,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KnnRegressor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KnnRegressor {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            metric: Distance::default(),
            weights: Weighting::default(),
            x_train: None,
            y_train: None,
        }
    }

    pub fn with_metric(mut self, metric: Distance) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_weights(mut self, weights: Weighting) -> Self {
        self.weights = weights;
        self
    }

    fn predict_row(&self, row: ArrayView1<f64>, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let mut neighbors: Vec<(f64, f64)> = x
            .rows()
            .into_iter()
            .zip(y.iter())
            .map(|(train_row, &target)| (self.metric.compute(row, train_row), target))
            .collect();

        neighbors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let k = self.n_neighbors.min(neighbors.len());

        match self.weights {
            Weighting::Uniform => {
                neighbors[..k].iter().map(|(_, t)| t).sum::<f64>() / k as f64
            }
            Weighting::InverseDistance => {
                let mut weighted = 0.0;
                let mut total = 0.0;
                for (dist, target) in &neighbors[..k] {
                    let w = 1.0 / (dist + 1e-12);
                    weighted += w * target;
                    total += w;
                }
                weighted / total
            }
        }
    }
}

impl Regressor for KnnRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(PipelineError::ValidationError(
                "cannot fit on empty training set".to_string(),
            ));
        }
        if self.n_neighbors == 0 {
            return Err(PipelineError::ValidationError(
                "n_neighbors must be at least 1".to_string(),
            ));
        }

        self.x_train = Some(x.to_owned());
        self.y_train = Some(y.to_owned());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self.x_train.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(PipelineError::ModelNotFitted)?;

        if x.ncols() != x_train.ncols() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.predict_row(x.row(i), x_train, y_train))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn apply_params(&mut self, params: &TrialParams) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "n_neighbors" => {
                    let k = value.as_i64().ok_or_else(|| {
                        PipelineError::ValidationError("'n_neighbors' must be an integer".to_string())
                    })?;
                    if k < 1 {
                        return Err(PipelineError::ValidationError(
                            "'n_neighbors' must be at least 1".to_string(),
                        ));
                    }
                    self.n_neighbors = k as usize;
                }
                "weights" => {
                    self.weights = match value.as_str() {
                        Some("uniform") => Weighting::Uniform,
                        Some("distance") => Weighting::InverseDistance,
                        _ => {
                            return Err(PipelineError::ValidationError(
                                "'weights' must be 'uniform' or 'distance'".to_string(),
                            ))
                        }
                    };
                }
                "metric" => {
                    self.metric = match value.as_str() {
                        Some("euclidean") => Distance::Euclidean,
                        Some("manhattan") => Distance::Manhattan,
                        _ => {
                            return Err(PipelineError::ValidationError(
                                "'metric' must be 'euclidean' or 'manhattan'".to_string(),
                            ))
                        }
                    };
                }
                other => {
                    return Err(PipelineError::ValidationError(format!(
                        "unknown parameter '{other}' for KnnRegressor"
                    )))
                }
            }
        }
        Ok(())
    }

    fn boxed_clone(&self) -> Box<dyn Regressor> {
        Box::new(self.clone())
    }
}
