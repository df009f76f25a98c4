//! Model evaluation via randomized hyperparameter search
//!
//! For each registered model: search its parameter space with cross-validated
//! R² scoring, refit the model with the best configuration found, and score
//! it on the held-out test set. The returned report maps model name to test
//! R². Any model or lookup failure aborts the evaluation.

use crate::error::{PipelineError, Result};
use crate::metrics::r2_score;
use crate::model::ModelRegistry;
use crate::search::{RandomSearch, SearchConfig, SearchSpace};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use tracing::info;

/// Mapping from model name to its hyperparameter search space.
pub type SpaceRegistry = BTreeMap<String, SearchSpace>;

/// Report mapping model name to held-out R² score.
pub type EvaluationReport = BTreeMap<String, f64>;

fn check_pair(name: &str, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} rows = {} labels", name, x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    Ok(())
}

/// Tune, refit and score every model in the registry.
///
/// Models missing a search space fail at lookup time with a validation
/// error; registry keys are otherwise unconstrained.
pub fn evaluate_models(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    models: &mut ModelRegistry,
    spaces: &SpaceRegistry,
    config: &SearchConfig,
) -> Result<EvaluationReport> {
    check_pair("x_train", x_train, y_train)?;
    check_pair("x_test", x_test, y_test)?;
    if x_train.ncols() != x_test.ncols() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} features", x_train.ncols()),
            actual: format!("{} features", x_test.ncols()),
        });
    }

    let mut report = EvaluationReport::new();

    for (name, model) in models.iter_mut() {
        let space = spaces.get(name).ok_or_else(|| {
            PipelineError::ValidationError(format!("no search space defined for model '{name}'"))
        })?;

        let search = RandomSearch::new(config.clone());
        let outcome = search.run(model.as_ref(), space, x_train, y_train)?;

        if let Some(best) = outcome.best_params() {
            info!(
                model = %name,
                cv_score = outcome.best_score().unwrap_or(f64::NAN),
                params = ?best,
                "search finished"
            );
            model.apply_params(best)?;
        }

        model.fit(x_train, y_train)?;
        let y_pred = model.predict(x_test)?;
        let score = r2_score(y_test, &y_pred)?;

        info!(model = %name, r2 = score, "held-out evaluation");
        report.insert(name.clone(), score);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KnnRegressor, LinearRegression, Regressor};
    use ndarray::Array;

    fn dataset() -> (Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>) {
        // y = 2*x0 - x1 + 0.5, train on 30 rows, test on 10
        let make = |offset: usize, n: usize| {
            let x = Array::from_shape_fn((n, 2), |(i, j)| {
                let v = (offset + i) as f64;
                if j == 0 {
                    v
                } else {
                    (v * 0.7).sin()
                }
            });
            let y = Array::from_shape_fn(n, |i| {
                let v = (offset + i) as f64;
                2.0 * v - (v * 0.7).sin() + 0.5
            });
            (x, y)
        };
        let (x_train, y_train) = make(0, 30);
        let (x_test, y_test) = make(30, 10);
        (x_train, y_train, x_test, y_test)
    }

    fn registries() -> (ModelRegistry, SpaceRegistry) {
        let mut models = ModelRegistry::new();
        models.insert(
            "linear".to_string(),
            Box::new(LinearRegression::new()) as Box<dyn Regressor>,
        );
        models.insert(
            "knn".to_string(),
            Box::new(KnnRegressor::new(5)) as Box<dyn Regressor>,
        );

        let mut spaces = SpaceRegistry::new();
        spaces.insert(
            "linear".to_string(),
            SearchSpace::new().log_uniform("alpha", 1e-6, 1.0),
        );
        spaces.insert(
            "knn".to_string(),
            SearchSpace::new()
                .int_range("n_neighbors", 1, 7)
                .choice("weights", &["uniform", "distance"]),
        );
        (models, spaces)
    }

    #[test]
    fn test_evaluates_every_model() {
        let (x_train, y_train, x_test, y_test) = dataset();
        let (mut models, spaces) = registries();
        let config = SearchConfig::new().with_n_iter(6).with_seed(42);

        let report =
            evaluate_models(&x_train, &y_train, &x_test, &y_test, &mut models, &spaces, &config)
                .unwrap();

        assert_eq!(report.len(), 2);
        // The linear model matches the generating process almost exactly
        assert!(report["linear"] > 0.99, "linear r2 = {}", report["linear"]);
        assert!(report.contains_key("knn"));
    }

    #[test]
    fn test_missing_space_fails_at_lookup() {
        let (x_train, y_train, x_test, y_test) = dataset();
        let (mut models, mut spaces) = registries();
        spaces.remove("knn");
        let config = SearchConfig::new().with_n_iter(2).with_seed(0);

        let err =
            evaluate_models(&x_train, &y_train, &x_test, &y_test, &mut models, &spaces, &config)
                .unwrap_err();
        assert!(err.to_string().contains("knn"));
    }

    #[test]
    fn test_shape_mismatch_rejected_up_front() {
        let (x_train, y_train, x_test, _) = dataset();
        let (mut models, spaces) = registries();
        let bad_y_test = Array1::<f64>::zeros(3);
        let config = SearchConfig::default();

        let result = evaluate_models(
            &x_train, &y_train, &x_test, &bad_y_test, &mut models, &spaces, &config,
        );
        assert!(matches!(result, Err(PipelineError::ShapeError { .. })));
    }

    #[test]
    fn test_best_params_are_applied_to_registry_model() {
        let (x_train, y_train, x_test, y_test) = dataset();

        let mut models = ModelRegistry::new();
        models.insert(
            "linear".to_string(),
            Box::new(LinearRegression::new().with_alpha(1e9)) as Box<dyn Regressor>,
        );
        let mut spaces = SpaceRegistry::new();
        // Every sampled alpha is tiny, so tuning must overwrite the absurd default
        spaces.insert(
            "linear".to_string(),
            SearchSpace::new().log_uniform("alpha", 1e-9, 1e-6),
        );

        let config = SearchConfig::new().with_n_iter(4).with_seed(3);
        let report =
            evaluate_models(&x_train, &y_train, &x_test, &y_test, &mut models, &spaces, &config)
                .unwrap();

        assert!(report["linear"] > 0.99, "tuned r2 = {}", report["linear"]);
    }
}
