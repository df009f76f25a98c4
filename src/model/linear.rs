//! Linear regression via normal equations

use crate::error::{PipelineError, Result};
use crate::model::Regressor;
use crate::search::TrialParams;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve the symmetric positive-definite system `Ax = b` by Cholesky
/// decomposition. On a non-PD diagonal the system is retried once with a
/// small ridge added; `None` means both attempts failed.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let jitter = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;

    'attempt: for extra in [0.0, jitter] {
        let mut l = Array2::<f64>::zeros((n, n));

        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;
                for k in 0..j {
                    sum += l[[i, k]] * l[[j, k]];
                }
                if i == j {
                    let diag = a[[i, i]] + extra - sum;
                    if diag <= 0.0 {
                        continue 'attempt;
                    }
                    l[[i, j]] = diag.sqrt();
                } else {
                    l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
                }
            }
        }

        // Forward then backward substitution
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += l[[i, j]] * y[j];
            }
            y[i] = (b[i] - sum) / l[[i, i]];
        }

        let mut x = Array1::<f64>::zeros(n);
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += l[[j, i]] * x[j];
            }
            x[i] = (y[i] - sum) / l[[i, i]];
        }

        return Some(x);
    }

    None
}

/// Gauss-Jordan inverse, fallback for systems Cholesky cannot handle.
fn gauss_jordan_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut pivot_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[pivot_row, col]].abs() {
                pivot_row = row;
            }
        }
        if pivot_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }
        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Some(inv)
}

/// Ordinary least squares, or ridge regression when `alpha > 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// L2 regularization strength
    pub alpha: f64,
    /// Whether to fit an intercept term
    pub fit_intercept: bool,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            alpha: 0.0,
            fit_intercept: true,
            coefficients: None,
            intercept: 0.0,
        }
    }

    /// Set regularization strength (ridge regression).
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Enable/disable the intercept term.
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Fitted coefficients, if the model has been fit.
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    /// Fitted intercept.
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {n_samples}"),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::ValidationError(
                "cannot fit on empty training set".to_string(),
            ));
        }

        // Center data so the intercept falls out of the normal equations
        let (x_work, y_work, x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| PipelineError::ComputationError("empty feature matrix".to_string()))?;
            let y_mean = y.sum() / n_samples as f64;
            let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
            let y_centered = y - y_mean;
            (x_centered, y_centered, Some(x_mean), y_mean)
        } else {
            (x.to_owned(), y.to_owned(), None, 0.0)
        };

        // (X^T X + alpha I) w = X^T y
        let mut xtx = x_work.t().dot(&x_work);
        if self.alpha > 0.0 {
            for i in 0..n_features {
                xtx[[i, i]] += self.alpha;
            }
        }
        let xty = x_work.t().dot(&y_work);

        let coefficients = match cholesky_solve(&xtx, &xty) {
            Some(w) => w,
            None => match gauss_jordan_inverse(&xtx) {
                Some(inv) => inv.dot(&xty),
                None => {
                    return Err(PipelineError::ComputationError(
                        "normal equations are singular".to_string(),
                    ))
                }
            },
        };

        self.intercept = match x_mean {
            Some(x_mean) => y_mean - coefficients.dot(&x_mean),
            None => 0.0,
        };
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(PipelineError::ModelNotFitted)?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn apply_params(&mut self, params: &TrialParams) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "alpha" => {
                    self.alpha = value.as_f64().ok_or_else(|| {
                        PipelineError::ValidationError("'alpha' must be numeric".to_string())
                    })?;
                }
                "fit_intercept" => {
                    self.fit_intercept = value.as_bool().ok_or_else(|| {
                        PipelineError::ValidationError(
                            "'fit_intercept' must be a boolean".to_string(),
                        )
                    })?;
                }
                other => {
                    return Err(PipelineError::ValidationError(format!(
                        "unknown parameter '{other}' for LinearRegression"
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
