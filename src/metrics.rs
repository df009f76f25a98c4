//! Regression scoring

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.is_empty() {
        return Err(PipelineError::ValidationError(
            "cannot score empty arrays".to_string(),
        ));
    }
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("y_pred length = {}", y_true.len()),
            actual: format!("y_pred length = {}", y_pred.len()),
        });
    }
    Ok(())
}

/// Mean squared error.
pub fn mse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let n = y_true.len() as f64;
    let sum = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>();
    Ok(sum / n)
}

/// Root mean squared error.
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(mse(y_true, y_pred)?.sqrt())
}

/// Mean absolute error.
pub fn mae(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let n = y_true.len() as f64;
    let sum = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>();
    Ok(sum / n)
}

/// Coefficient of determination (R²).
///
/// A constant target (zero total variance) scores 0.0.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let n = y_true.len() as f64;
    let y_mean = y_true.sum() / n;

    let ss_res = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>();
    let ss_tot = y_true.iter().map(|t| (t - y_mean) * (t - y_mean)).sum::<f64>();

    if ss_tot > 0.0 {
        Ok(1.0 - ss_res / ss_tot)
    } else {
        Ok(0.0)
    }
}

/// Summary of regression metrics on a prediction set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute all metrics in one pass over the pair of arrays.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        let mse = mse(y_true, y_pred)?;
        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae: mae(y_true, y_pred)?,
            r2: r2_score(y_true, y_pred)?,
            n_samples: y_true.len(),
        })
    }
}
