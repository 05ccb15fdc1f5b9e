//! Best-model selection over a sequence of search results.

use thiserror::Error;
use tracing::info;

use super::{BestModel, SearchResult};

/// No candidate's score cleared the acceptance floor.
#[derive(Debug, Error)]
#[error("none of the {evaluated} evaluated model(s) cleared the acceptance floor {floor}")]
pub struct NoAcceptableModelError {
    /// The floor the caller supplied.
    pub floor: f64,
    /// How many results were considered.
    pub evaluated: usize,
}

/// Pick the single result whose score strictly exceeds `floor`, raising the
/// floor as better candidates are found.
///
/// Every result is evaluated before deciding; only if the final best is
/// absent does this fail. The comparison is strict, so among equal scores
/// the first in input order wins — a later equal score never replaces it.
pub fn select_best(
    results: Vec<SearchResult>,
    floor: f64,
) -> Result<BestModel, NoAcceptableModelError> {
    let evaluated = results.len();
    let initial_floor = floor;

    let mut floor = floor;
    let mut best: Option<SearchResult> = None;
    for result in results {
        if result.best_score > floor {
            info!(
                serial = %result.serial,
                score = result.best_score,
                "acceptable model found"
            );
            floor = result.best_score;
            best = Some(result);
        }
    }

    match best {
        Some(result) => {
            info!(serial = %result.serial, score = result.best_score, "best model selected");
            Ok(BestModel::from(result))
        }
        None => Err(NoAcceptableModelError {
            floor: initial_floor,
            evaluated,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RidgeRegression;
    use std::collections::BTreeMap;

    fn result(serial: &str, score: f64) -> SearchResult {
        SearchResult {
            serial: serial.to_string(),
            model: Box::new(RidgeRegression::new()),
            best_model: Box::new(RidgeRegression::new()),
            best_params: BTreeMap::new(),
            best_score: score,
        }
    }

    #[test]
    fn picks_highest_score_above_floor() {
        // Scenario A: scores [0.55, 0.72], floor 0.6 -> second wins
        let best = select_best(vec![result("1", 0.55), result("2", 0.72)], 0.6).unwrap();
        assert_eq!(best.serial, "2");
        assert_eq!(best.best_score, 0.72);
    }

    #[test]
    fn fails_when_nothing_clears_the_floor() {
        // Scenario B: same scores, floor 0.8
        let err = select_best(vec![result("1", 0.55), result("2", 0.72)], 0.8).unwrap_err();
        assert_eq!(err.floor, 0.8);
        assert_eq!(err.evaluated, 2);
    }

    #[test]
    fn later_low_score_does_not_abort_the_scan() {
        // The best sits first; everything after is worse but must still be
        // walked without failing.
        let best = select_best(
            vec![result("1", 0.9), result("2", 0.3), result("3", 0.1)],
            0.5,
        )
        .unwrap();
        assert_eq!(best.serial, "1");
    }

    #[test]
    fn first_of_equal_scores_wins() {
        let best = select_best(
            vec![result("1", 0.7), result("2", 0.7), result("3", 0.7)],
            0.5,
        )
        .unwrap();
        assert_eq!(best.serial, "1");
    }

    #[test]
    fn score_equal_to_floor_is_not_acceptable() {
        let err = select_best(vec![result("1", 0.6)], 0.6).unwrap_err();
        assert_eq!(err.floor, 0.6);
    }

    #[test]
    fn empty_results_fail_with_floor() {
        let err = select_best(Vec::new(), 0.4).unwrap_err();
        assert_eq!(err.floor, 0.4);
        assert_eq!(err.evaluated, 0);
    }
}
