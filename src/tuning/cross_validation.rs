//! k-fold cross-validation and the R² score.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use statrs::statistics::Statistics;
use tracing::debug;

use crate::models::{Estimator, ModelError};

/// Coefficient of determination. 1.0 is a perfect fit; 0.0 is no better
/// than predicting the mean; negative is worse than the mean.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();

    if ss_tot < f64::EPSILON {
        // Constant target: perfect only if residuals vanish too
        return if ss_res < f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Shuffled k-fold index splitter.
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    n_splits: usize,
    seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Produce `(train, test)` index pairs. The first `n % k` folds get one
    /// extra sample so every index appears in exactly one test fold.
    pub fn split(&self, n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            let test: Vec<usize> = indices[start..start + size].to_vec();
            let train: Vec<usize> = indices[..start]
                .iter()
                .chain(&indices[start + size..])
                .copied()
                .collect();
            folds.push((train, test));
            start += size;
        }
        folds
    }
}

fn gather(features: &[Vec<f64>], target: &[f64], indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let x = indices.iter().map(|&i| features[i].clone()).collect();
    let y = indices.iter().map(|&i| target[i]).collect();
    (x, y)
}

/// Mean R² across folds for an already-configured estimator prototype.
/// A fresh sub-model is trained per fold; the prototype is never fitted.
pub fn cross_val_score(
    prototype: &dyn Estimator,
    features: &[Vec<f64>],
    target: &[f64],
    folds: &KFold,
) -> Result<f64, ModelError> {
    if features.len() < folds.n_splits() {
        return Err(ModelError::ShapeMismatch(format!(
            "{} samples cannot be split into {} folds",
            features.len(),
            folds.n_splits()
        )));
    }

    let mut scores = Vec::with_capacity(folds.n_splits());
    for (train_idx, test_idx) in folds.split(features.len()) {
        let (train_x, train_y) = gather(features, target, &train_idx);
        let (test_x, test_y) = gather(features, target, &test_idx);

        let mut model = prototype.fresh();
        model.fit(&train_x, &train_y)?;
        let predictions = model.predict(&test_x)?;
        scores.push(r2_score(&test_y, &predictions));
    }

    let mean = scores.iter().mean();
    debug!(
        model = prototype.name(),
        folds = scores.len(),
        mean,
        std_dev = scores.iter().std_dev(),
        "cross-validation finished"
    );
    Ok(mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamValue;
    use crate::models::RidgeRegression;

    #[test]
    fn r2_perfect_fit_is_one() {
        let y = [1.0, 2.0, 3.0];
        assert!((r2_score(&y, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn r2_mean_prediction_is_zero() {
        let actual = [1.0, 2.0, 3.0];
        let predicted = [2.0, 2.0, 2.0];
        assert!(r2_score(&actual, &predicted).abs() < 1e-12);
    }

    #[test]
    fn r2_worse_than_mean_is_negative() {
        let actual = [1.0, 2.0, 3.0];
        let predicted = [3.0, 3.0, 0.0];
        assert!(r2_score(&actual, &predicted) < 0.0);
    }

    #[test]
    fn folds_partition_all_indices() {
        let folds = KFold::new(4, 42).split(10);
        assert_eq!(folds.len(), 4);

        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, test)| test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), 10);
            assert!(train.iter().all(|i| !test.contains(i)));
        }
    }

    #[test]
    fn same_seed_same_folds() {
        assert_eq!(KFold::new(3, 7).split(9), KFold::new(3, 7).split(9));
    }

    #[test]
    fn cross_val_scores_linear_data_highly() {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![f64::from(i)]).collect();
        let target: Vec<f64> = (0..30).map(|i| 3.0 * f64::from(i) - 4.0).collect();

        let mut prototype = RidgeRegression::new();
        prototype.set_param("alpha", &ParamValue::Float(1e-6)).unwrap();

        let score = cross_val_score(&prototype, &features, &target, &KFold::new(5, 42)).unwrap();
        assert!(score > 0.99, "expected near-perfect score, got {score}");
    }

    #[test]
    fn more_folds_than_samples_rejected() {
        let features = vec![vec![1.0], vec![2.0]];
        let target = vec![1.0, 2.0];
        let prototype = RidgeRegression::new();
        assert!(cross_val_score(&prototype, &features, &target, &KFold::new(5, 42)).is_err());
    }
}
