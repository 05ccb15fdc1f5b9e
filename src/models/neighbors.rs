//! k-nearest-neighbor regression.
//!
//! Brute-force Euclidean neighbors, uniform or inverse-distance weighting.
//! Fine for the batch training sizes this crate targets; no index
//! structure.

use super::{check_training_shapes, usize_param, Estimator, ModelError};
use crate::config::ParamValue;

/// Neighbor weighting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeightScheme {
    Uniform,
    Distance,
}

#[derive(Debug, Clone)]
pub struct KNeighborsRegressor {
    n_neighbors: usize,
    weights: WeightScheme,
    train_features: Vec<Vec<f64>>,
    train_target: Vec<f64>,
}

impl Default for KNeighborsRegressor {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            weights: WeightScheme::Uniform,
            train_features: Vec::new(),
            train_target: Vec::new(),
        }
    }
}

impl KNeighborsRegressor {
    pub fn new() -> Self {
        Self::default()
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl Estimator for KNeighborsRegressor {
    fn name(&self) -> &'static str {
        "KNeighborsRegressor"
    }

    fn settable_params(&self) -> &'static [&'static str] {
        &["n_neighbors", "weights"]
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "n_neighbors" => self.n_neighbors = usize_param(name, value, 1)?,
            "weights" => {
                self.weights = match value.as_str() {
                    Some("uniform") => WeightScheme::Uniform,
                    Some("distance") => WeightScheme::Distance,
                    _ => {
                        return Err(ModelError::InvalidParam {
                            name: name.to_string(),
                            message: format!("expected \"uniform\" or \"distance\", got {value}"),
                        })
                    }
                };
            }
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
        check_training_shapes(features, target)?;
        if features.len() < self.n_neighbors {
            return Err(ModelError::ShapeMismatch(format!(
                "n_neighbors = {} but only {} training samples",
                self.n_neighbors,
                features.len()
            )));
        }
        self.train_features = features.to_vec();
        self.train_target = target.to_vec();
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        if self.train_features.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let width = self.train_features[0].len();

        features
            .iter()
            .map(|row| {
                if row.len() != width {
                    return Err(ModelError::ShapeMismatch(format!(
                        "expected {width} features, got {}",
                        row.len()
                    )));
                }

                let mut neighbors: Vec<(f64, f64)> = self
                    .train_features
                    .iter()
                    .zip(&self.train_target)
                    .map(|(train_row, &y)| (squared_distance(row, train_row), y))
                    .collect();
                neighbors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                neighbors.truncate(self.n_neighbors);

                Ok(match self.weights {
                    WeightScheme::Uniform => {
                        neighbors.iter().map(|(_, y)| y).sum::<f64>() / neighbors.len() as f64
                    }
                    WeightScheme::Distance => {
                        // Exact matches dominate: average them directly
                        let exact: Vec<f64> = neighbors
                            .iter()
                            .filter(|(d, _)| *d == 0.0)
                            .map(|(_, y)| *y)
                            .collect();
                        if !exact.is_empty() {
                            exact.iter().sum::<f64>() / exact.len() as f64
                        } else {
                            let mut weight_sum = 0.0;
                            let mut weighted = 0.0;
                            for (d, y) in &neighbors {
                                let w = 1.0 / d.sqrt();
                                weight_sum += w;
                                weighted += w * y;
                            }
                            weighted / weight_sum
                        }
                    }
                })
            })
            .collect()
    }

    fn fresh(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            n_neighbors: self.n_neighbors,
            weights: self.weights,
            train_features: Vec::new(),
            train_target: Vec::new(),
        })
    }
}
