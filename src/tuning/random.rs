//! Randomized search: seeded uniform draws from the grid.
//!
//! Useful when the cartesian product is too large to enumerate; `n_iter`
//! combinations are sampled with replacement, so the same point may be
//! scored twice. Scoring and selection are shared with grid search.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tracing::info;

use super::cross_validation::KFold;
use super::grid::enumerate_combinations;
use super::{run_over_combinations, Combination, SearchBest, SearchExecutionError, SearchProcedure};
use crate::config::{ParamGrid, SearchSettings};
use crate::models::Estimator;

/// Seeded random sampling over a parameter grid.
pub struct RandomizedSearchCv {
    estimator: Box<dyn Estimator>,
    grid: ParamGrid,
    settings: SearchSettings,
}

impl RandomizedSearchCv {
    /// Bind the procedure to a candidate's estimator and search space.
    pub fn new(estimator: Box<dyn Estimator>, grid: ParamGrid, settings: SearchSettings) -> Self {
        Self {
            estimator,
            grid,
            settings,
        }
    }

    fn sample_combinations(&self) -> Vec<Combination> {
        // When the draw budget covers the whole space, fall back to an
        // exhaustive enumeration instead of wasting draws on duplicates.
        if self.settings.n_iter >= self.grid.n_combinations() {
            return enumerate_combinations(&self.grid);
        }

        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        (0..self.settings.n_iter)
            .map(|_| {
                self.grid
                    .iter()
                    .map(|(name, values)| {
                        let pick = rng.gen_range(0..values.len());
                        (name.to_string(), values[pick].clone())
                    })
                    .collect()
            })
            .collect()
    }
}

impl SearchProcedure for RandomizedSearchCv {
    fn name(&self) -> &'static str {
        "RandomizedSearchCv"
    }

    fn run(
        &mut self,
        features: &[Vec<f64>],
        target: &[f64],
    ) -> Result<SearchBest, SearchExecutionError> {
        if self.grid.is_empty() {
            return Err(SearchExecutionError::EmptySpace);
        }
        let combinations = self.sample_combinations();
        info!(
            model = self.estimator.name(),
            draws = combinations.len(),
            folds = self.settings.folds,
            seed = self.settings.seed,
            "randomized search started"
        );
        let folds = KFold::new(self.settings.folds, self.settings.seed);
        let best = run_over_combinations(
            self.estimator.as_ref(),
            &combinations,
            folds,
            features,
            target,
        )?;
        info!(
            model = self.estimator.name(),
            score = best.score,
            "randomized search finished"
        );
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamValue;
    use crate::models::RidgeRegression;

    fn line(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let features: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let target: Vec<f64> = (0..n).map(|i| 2.0 * i as f64 + 1.0).collect();
        (features, target)
    }

    fn alpha_grid() -> ParamGrid {
        let mut grid = ParamGrid::new();
        grid.insert(
            "alpha",
            vec![
                ParamValue::Float(1e-6),
                ParamValue::Float(1.0),
                ParamValue::Float(100.0),
            ],
        );
        grid
    }

    #[test]
    fn same_seed_is_reproducible() {
        let (features, target) = line(30);
        let settings = SearchSettings {
            folds: 3,
            n_iter: 2,
            seed: 99,
        };

        let run = |settings| {
            let mut search =
                RandomizedSearchCv::new(Box::new(RidgeRegression::new()), alpha_grid(), settings);
            search.run(&features, &target).unwrap()
        };
        let first = run(settings);
        let second = run(settings);
        assert_eq!(first.params, second.params);
        assert_eq!(first.score, second.score);
    }

    #[test]
    fn draws_are_capped_at_the_space_size() {
        let settings = SearchSettings {
            folds: 3,
            n_iter: 500,
            seed: 1,
        };
        let search =
            RandomizedSearchCv::new(Box::new(RidgeRegression::new()), alpha_grid(), settings);
        assert_eq!(search.sample_combinations().len(), 3);
    }

    #[test]
    fn exhaustive_sampling_finds_the_good_alpha() {
        let (features, target) = line(30);
        let settings = SearchSettings {
            folds: 3,
            n_iter: 50,
            seed: 7,
        };
        let mut search =
            RandomizedSearchCv::new(Box::new(RidgeRegression::new()), alpha_grid(), settings);
        let best = search.run(&features, &target).unwrap();
        // With draws capped at the full space, every alpha gets scored
        assert_eq!(best.params["alpha"], ParamValue::Float(1e-6));
    }
}
