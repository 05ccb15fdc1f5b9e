//! Hyperparameter search procedures.
//!
//! A `SearchProcedure` is built bound to one candidate's estimator and
//! search space, runs against a training set, and reports the best fitted
//! sub-model with its winning parameter combination and cross-validated
//! score.
//!
//! Combination scoring is embarrassingly parallel, so both procedures fan
//! combinations out over rayon. Tie-breaking is strict-improvement-only,
//! which keeps the parallel path deterministic: on equal scores the
//! lowest-index combination wins.

pub mod cross_validation;
pub mod grid;
pub mod random;

pub use grid::GridSearchCv;
pub use random::RandomizedSearchCv;

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ParamValue;
use crate::models::{Estimator, ModelError};
use cross_validation::KFold;

/// The underlying search procedure raised: malformed search space,
/// incompatible data shapes, numerical failure, or (in pooled execution)
/// a timeout or lost worker.
#[derive(Debug, Error)]
pub enum SearchExecutionError {
    #[error("hyperparameter search failed: {0}")]
    Model(#[from] ModelError),

    #[error("search space is empty")]
    EmptySpace,

    #[error("no parameter combination produced a finite score")]
    NoFiniteScore,

    #[error("candidate search timed out after {0:?}")]
    Timeout(Duration),

    #[error("search worker terminated unexpectedly")]
    WorkerLost,
}

/// Winner of one candidate's search.
#[derive(Debug)]
pub struct SearchBest {
    /// Sub-model refitted on the full training set with the winning
    /// combination.
    pub model: Box<dyn Estimator>,
    /// The winning combination.
    pub params: BTreeMap<String, ParamValue>,
    /// Mean cross-validated R² of the winning combination.
    pub score: f64,
}

/// One hyperparameter search, bound to an estimator and its search space.
pub trait SearchProcedure: Send {
    fn name(&self) -> &'static str;

    /// Execute the search against the training set.
    fn run(&mut self, features: &[Vec<f64>], target: &[f64])
        -> Result<SearchBest, SearchExecutionError>;
}

/// One point in the search space, in grid-entry order.
pub(crate) type Combination = Vec<(String, ParamValue)>;

pub(crate) fn apply_combination(
    model: &mut dyn Estimator,
    combination: &Combination,
) -> Result<(), ModelError> {
    for (name, value) in combination {
        debug!(model = model.name(), %name, %value, "applying search parameter");
        model.set_param(name, value)?;
    }
    Ok(())
}

/// Shared scoring core: evaluate every combination in parallel, pick the
/// best finite score (first wins ties), refit it on the full training set.
pub(crate) fn run_over_combinations(
    prototype: &dyn Estimator,
    combinations: &[Combination],
    folds: KFold,
    features: &[Vec<f64>],
    target: &[f64],
) -> Result<SearchBest, SearchExecutionError> {
    if combinations.is_empty() {
        return Err(SearchExecutionError::EmptySpace);
    }

    let outcomes: Vec<Result<f64, ModelError>> = combinations
        .par_iter()
        .map(|combination| {
            let mut model = prototype.fresh();
            apply_combination(model.as_mut(), combination)?;
            cross_validation::cross_val_score(model.as_ref(), features, target, &folds)
        })
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (idx, outcome) in outcomes.into_iter().enumerate() {
        let score = outcome?;
        if !score.is_finite() {
            debug!(combination = idx, "non-finite score, skipping");
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }
    let (best_idx, best_score) = best.ok_or(SearchExecutionError::NoFiniteScore)?;

    let winner = &combinations[best_idx];
    let mut model = prototype.fresh();
    apply_combination(model.as_mut(), winner)?;
    model.fit(features, target)?;

    Ok(SearchBest {
        model,
        params: winner.iter().cloned().collect(),
        score: best_score,
    })
}
