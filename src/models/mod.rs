//! Built-in estimator families served by the model registry.
//!
//! Each estimator exposes its hyperparameters through a validated setter
//! (`set_param`) against a declared allow-list, so config-driven property
//! assignment can never poke an unknown field. Every successful assignment
//! is logged for auditability.
//!
//! Families:
//! - `RidgeRegression`: L2-regularized least squares, closed form
//! - `KNeighborsRegressor`: k-nearest-neighbor averaging
//! - `DecisionTreeRegressor`: variance-reduction splitting

pub mod linear;
pub mod neighbors;
pub mod tree;

pub use linear::RidgeRegression;
pub use neighbors::KNeighborsRegressor;
pub use tree::DecisionTreeRegressor;

use thiserror::Error;

use crate::config::ParamValue;

/// Estimator-level failures: bad hyperparameters, bad shapes, numerical
/// breakdown during fitting.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown hyperparameter '{name}' for {model}")]
    UnknownParam { model: &'static str, name: String },

    #[error("invalid value for hyperparameter '{name}': {message}")]
    InvalidParam { name: String, message: String },

    #[error("model has not been fitted")]
    NotFitted,

    #[error("dataset shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// A trainable model with config-settable hyperparameters.
///
/// `Send + Sync` so prototypes can be shared across the parallel
/// combination-scoring path and candidates can move between worker threads.
pub trait Estimator: Send + Sync + std::fmt::Debug {
    /// Class name as registered, e.g. `"RidgeRegression"`.
    fn name(&self) -> &'static str;

    /// Allow-list of settable hyperparameter names.
    fn settable_params(&self) -> &'static [&'static str];

    /// Set one hyperparameter. Unknown names and out-of-range values are
    /// rejected; nothing else on the estimator is reachable this way.
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError>;

    /// Fit on a feature matrix (row-major) and target column.
    fn fit(&mut self, features: &[Vec<f64>], target: &[f64]) -> Result<(), ModelError>;

    /// Predict targets for a feature matrix. Fails before `fit`.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;

    /// Unfitted copy carrying the same hyperparameters. Search procedures
    /// use this to train one sub-model per parameter combination.
    fn fresh(&self) -> Box<dyn Estimator>;
}

// ============================================================================
// Shared Checks & Coercions
// ============================================================================

/// Validate a training pair: non-empty, equal lengths, rectangular rows.
/// Returns the feature width.
pub(crate) fn check_training_shapes(
    features: &[Vec<f64>],
    target: &[f64],
) -> Result<usize, ModelError> {
    if features.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    if features.len() != target.len() {
        return Err(ModelError::ShapeMismatch(format!(
            "{} feature rows vs {} targets",
            features.len(),
            target.len()
        )));
    }
    let width = features[0].len();
    if width == 0 {
        return Err(ModelError::ShapeMismatch("feature rows are empty".to_string()));
    }
    if let Some(bad) = features.iter().find(|row| row.len() != width) {
        return Err(ModelError::ShapeMismatch(format!(
            "ragged feature matrix: expected width {width}, found {}",
            bad.len()
        )));
    }
    Ok(width)
}

pub(crate) fn f64_param(name: &str, value: &ParamValue) -> Result<f64, ModelError> {
    value.as_f64().ok_or_else(|| ModelError::InvalidParam {
        name: name.to_string(),
        message: format!("expected a number, got {value}"),
    })
}

pub(crate) fn usize_param(name: &str, value: &ParamValue, min: usize) -> Result<usize, ModelError> {
    let i = value.as_i64().ok_or_else(|| ModelError::InvalidParam {
        name: name.to_string(),
        message: format!("expected an integer, got {value}"),
    })?;
    if i < min as i64 {
        return Err(ModelError::InvalidParam {
            name: name.to_string(),
            message: format!("must be at least {min}, got {i}"),
        });
    }
    Ok(i as usize)
}

pub(crate) fn bool_param(name: &str, value: &ParamValue) -> Result<bool, ModelError> {
    value.as_bool().ok_or_else(|| ModelError::InvalidParam {
        name: name.to_string(),
        message: format!("expected a boolean, got {value}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_matrix_rejected() {
        let features = vec![vec![1.0, 2.0], vec![3.0]];
        let target = vec![1.0, 2.0];
        assert!(matches!(
            check_training_shapes(&features, &target),
            Err(ModelError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn length_mismatch_rejected() {
        let features = vec![vec![1.0], vec![2.0]];
        let target = vec![1.0];
        assert!(matches!(
            check_training_shapes(&features, &target),
            Err(ModelError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn valid_shapes_return_width() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let target = vec![1.0, 2.0];
        assert_eq!(check_training_shapes(&features, &target).unwrap(), 2);
    }

    #[test]
    fn usize_param_enforces_minimum() {
        assert!(usize_param("n", &ParamValue::Int(0), 1).is_err());
        assert_eq!(usize_param("n", &ParamValue::Int(3), 1).unwrap(), 3);
        assert!(usize_param("n", &ParamValue::Str("x".into()), 1).is_err());
    }
}
