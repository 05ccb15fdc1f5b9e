//! Ridge regression (L2-regularized least squares), closed form.
//!
//! Solves `(XᵀX + αI) w = Xᵀy` by Gaussian elimination with partial
//! pivoting. With `fit_intercept` the data is centered first and the
//! intercept recovered from the means, so the penalty never touches it.

use tracing::debug;

use super::{bool_param, check_training_shapes, f64_param, Estimator, ModelError};
use crate::config::ParamValue;

#[derive(Debug, Clone)]
pub struct RidgeRegression {
    alpha: f64,
    fit_intercept: bool,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fit_intercept: true,
            coefficients: None,
            intercept: 0.0,
        }
    }
}

impl RidgeRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitted coefficients, one per feature. `None` before `fit`.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

/// Solve `A x = b` in place by Gaussian elimination with partial pivoting.
/// Returns `None` when the system is singular to working precision.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        // Pivot on the largest remaining entry in this column
        let mut pivot = col;
        for row in col + 1..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for col in (0..n).rev() {
        let mut sum = b[col];
        for k in col + 1..n {
            sum -= a[col][k] * x[k];
        }
        x[col] = sum / a[col][col];
    }
    Some(x)
}

impl Estimator for RidgeRegression {
    fn name(&self) -> &'static str {
        "RidgeRegression"
    }

    fn settable_params(&self) -> &'static [&'static str] {
        &["alpha", "fit_intercept"]
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "alpha" => {
                let alpha = f64_param(name, value)?;
                if alpha < 0.0 || !alpha.is_finite() {
                    return Err(ModelError::InvalidParam {
                        name: name.to_string(),
                        message: format!("must be a finite non-negative number, got {alpha}"),
                    });
                }
                self.alpha = alpha;
            }
            "fit_intercept" => self.fit_intercept = bool_param(name, value)?,
            _ => {
                return Err(ModelError::UnknownParam {
                    model: self.name(),
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn fit(&mut self, features: &[Vec<f64>], target: &[f64]) -> Result<(), ModelError> {
        let width = check_training_shapes(features, target)?;
        let n = features.len();

        let (col_means, y_mean) = if self.fit_intercept {
            let mut means = vec![0.0; width];
            for row in features {
                for (m, v) in means.iter_mut().zip(row) {
                    *m += v;
                }
            }
            for m in &mut means {
                *m /= n as f64;
            }
            (means, target.iter().sum::<f64>() / n as f64)
        } else {
            (vec![0.0; width], 0.0)
        };

        // Gram matrix of the (centered) features plus the ridge diagonal
        let mut gram = vec![vec![0.0; width]; width];
        let mut xty = vec![0.0; width];
        for (row, &y) in features.iter().zip(target) {
            let yc = y - y_mean;
            for i in 0..width {
                let xi = row[i] - col_means[i];
                xty[i] += xi * yc;
                for j in i..width {
                    gram[i][j] += xi * (row[j] - col_means[j]);
                }
            }
        }
        for i in 0..width {
            for j in 0..i {
                gram[i][j] = gram[j][i];
            }
            gram[i][i] += self.alpha;
        }

        let coefficients = solve(gram, xty).ok_or_else(|| {
            ModelError::Numerical(format!(
                "normal equations are singular (alpha = {}); features may be collinear",
                self.alpha
            ))
        })?;

        self.intercept = if self.fit_intercept {
            y_mean
                - coefficients
                    .iter()
                    .zip(&col_means)
                    .map(|(c, m)| c * m)
                    .sum::<f64>()
        } else {
            0.0
        };
        debug!(model = self.name(), alpha = self.alpha, n_features = width, "fitted");
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let coefficients = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        features
            .iter()
            .map(|row| {
                if row.len() != coefficients.len() {
                    return Err(ModelError::ShapeMismatch(format!(
                        "expected {} features, got {}",
                        coefficients.len(),
                        row.len()
                    )));
                }
                Ok(self.intercept
                    + row.iter().zip(coefficients).map(|(x, c)| x * c).sum::<f64>())
            })
            .collect()
    }

    fn fresh(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            alpha: self.alpha,
            fit_intercept: self.fit_intercept,
            coefficients: None,
            intercept: 0.0,
        })
    }
}
