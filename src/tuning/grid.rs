//! Exhaustive grid search with k-fold cross-validated scoring.

use tracing::info;

use super::cross_validation::KFold;
use super::{run_over_combinations, Combination, SearchBest, SearchExecutionError, SearchProcedure};
use crate::config::{ParamGrid, SearchSettings};
use crate::models::Estimator;

/// Enumerate the full cartesian product of the grid, first entry varying
/// slowest. Document order of the grid keeps this deterministic.
pub(crate) fn enumerate_combinations(grid: &ParamGrid) -> Vec<Combination> {
    let mut combinations: Vec<Combination> = vec![Vec::new()];
    for (name, values) in grid.iter() {
        let mut next = Vec::with_capacity(combinations.len() * values.len());
        for combination in &combinations {
            for value in values {
                let mut extended = combination.clone();
                extended.push((name.to_string(), value.clone()));
                next.push(extended);
            }
        }
        combinations = next;
    }
    combinations
}

/// Exhaustive search over the cartesian product of a parameter grid.
pub struct GridSearchCv {
    estimator: Box<dyn Estimator>,
    grid: ParamGrid,
    settings: SearchSettings,
}

impl GridSearchCv {
    /// Bind the procedure to a candidate's estimator and search space.
    pub fn new(estimator: Box<dyn Estimator>, grid: ParamGrid, settings: SearchSettings) -> Self {
        Self {
            estimator,
            grid,
            settings,
        }
    }
}

impl SearchProcedure for GridSearchCv {
    fn name(&self) -> &'static str {
        "GridSearchCv"
    }

    fn run(
        &mut self,
        features: &[Vec<f64>],
        target: &[f64],
    ) -> Result<SearchBest, SearchExecutionError> {
        if self.grid.is_empty() {
            return Err(SearchExecutionError::EmptySpace);
        }
        let combinations = enumerate_combinations(&self.grid);
        info!(
            model = self.estimator.name(),
            combinations = combinations.len(),
            folds = self.settings.folds,
            "grid search started"
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
            "grid search finished"
        );
        Ok(best)
    }
}
