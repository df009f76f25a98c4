//! Training-pipeline utilities
//!
//! A small library supporting an ML training pipeline:
//!
//! - [`config`] - YAML configuration loading and directory setup
//! - [`artifacts`] - JSON and binary artifact persistence
//! - [`metrics`] - regression scoring (R², MSE, RMSE, MAE)
//! - [`model`] - regression models behind the [`model::Regressor`] trait
//! - [`search`] - randomized hyperparameter search with cross-validation
//! - [`evaluate`] - per-model search, refit and held-out scoring
//!
//! All operations are synchronous and fail fast: errors propagate to the
//! caller unchanged, there is no retry or recovery layer.

pub mod error;

pub mod artifacts;
pub mod config;
pub mod evaluate;
pub mod metrics;
pub mod model;
pub mod search;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{PipelineError, Result};

    pub use crate::artifacts::{file_size, load_bin, load_json, load_json_value, save_bin, save_json};
    pub use crate::config::{create_directories, read_yaml, ConfigMap};
    pub use crate::evaluate::{evaluate_models, EvaluationReport, SpaceRegistry};
    pub use crate::metrics::{mae, mse, r2_score, rmse, RegressionMetrics};
    pub use crate::model::{
        Distance, KnnRegressor, LinearRegression, ModelRegistry, Regressor, Weighting,
    };
    pub use crate::search::{
        ParamDistribution, ParamValue, RandomSearch, SearchConfig, SearchOutcome, SearchSpace,
        TrialOutcome, TrialParams,
    };
}
