//! Regression models
//!
//! Models implement [`Regressor`] so registries of `Box<dyn Regressor>` can
//! be cloned, retuned and refit during hyperparameter search.

mod linear;
mod knn;

pub use knn::{Distance, KnnRegressor, Weighting};
pub use linear::LinearRegression;

use crate::error::Result;
use crate::search::TrialParams;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// A registry of named models, external lifecycle.
pub type ModelRegistry = BTreeMap<String, Box<dyn Regressor>>;

/// Trait for regression models.
pub trait Regressor: Send + Sync {
    /// Fit the model to training data.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict targets for new data.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Apply sampled hyperparameters. Unknown parameter names are
    /// validation errors.
    fn apply_params(&mut self, params: &TrialParams) -> Result<()>;

    /// Clone into a boxed trait object (fresh fit state is not required;
    /// `fit` fully overwrites it).
    fn boxed_clone(&self) -> Box<dyn Regressor>;
}

impl Clone for Box<dyn Regressor> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}
