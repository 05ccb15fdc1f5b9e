//! End-to-end model selection tests
//!
//! Drive the full pipeline (config parse, candidate initialization,
//! per-candidate search, selection) over synthetic training data, in
//! sequential and pooled execution modes.

use std::path::Path;
use std::time::Duration;

use modelfoundry::{
    CandidateOutcome, Estimator, ExecutionOptions, ModelError, ModelFactory, ModelRegistry,
    ParamValue, SearchExecutionError, SearchRegistry, SelectionConfig, SelectionError,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Noiseless y = 3x - 2 with a second, irrelevant feature.
fn linear_training_data() -> (Vec<Vec<f64>>, Vec<f64>) {
    let features: Vec<Vec<f64>> = (0..40)
        .map(|i| vec![f64::from(i), f64::from(i % 4)])
        .collect();
    let target: Vec<f64> = (0..40).map(|i| 3.0 * f64::from(i) - 2.0).collect();
    (features, target)
}

fn parse(doc: &str) -> SelectionConfig {
    SelectionConfig::from_toml_str(doc, Path::new("inline.toml")).unwrap()
}

const RIDGE_VS_TREE: &str = r#"
[search]
module = "tuning"
class = "GridSearchCv"

[search.params]
folds = 4

[model_selection.module_0]
module = "models.linear"
class = "RidgeRegression"

[model_selection.module_0.search_param_grid]
alpha = [0.000001, 1.0, 100.0]

[model_selection.module_1]
module = "models.tree"
class = "DecisionTreeRegressor"

[model_selection.module_1.search_param_grid]
max_depth = [2, 4]
min_samples_split = [2, 4]
"#;

// ============================================================================
// Sequential Pipeline
// ============================================================================

#[test]
fn ridge_wins_on_linear_data() {
    let (features, target) = linear_training_data();
    let factory = ModelFactory::new(parse(RIDGE_VS_TREE));

    let best = factory
        .best_model(&features, &target, 0.6, ExecutionOptions::sequential())
        .unwrap();

    assert_eq!(best.serial, "module_0");
    assert_eq!(best.best_model.name(), "RidgeRegression");
    assert_eq!(best.best_params["alpha"], ParamValue::Float(0.000_001));
    assert!(best.best_score > 0.99, "score was {}", best.best_score);

    // The winner is usable as-is
    let predictions = best.best_model.predict(&[vec![100.0, 0.0]]).unwrap();
    assert!((predictions[0] - 298.0).abs() < 1.0);
}

#[test]
fn impossible_floor_reports_no_acceptable_model() {
    let (features, target) = linear_training_data();
    let factory = ModelFactory::new(parse(RIDGE_VS_TREE));

    let err = factory
        .best_model(&features, &target, 2.0, ExecutionOptions::sequential())
        .unwrap_err();

    match err {
        SelectionError::NoAcceptableModel(inner) => {
            assert_eq!(inner.floor, 2.0);
            assert_eq!(inner.evaluated, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failing_candidate_does_not_stop_the_others() {
    // module_0's grid names a hyperparameter ridge does not have, so its
    // search fails; module_1 must still win.
    let doc = r#"
[search]
module = "tuning"
class = "GridSearchCv"
[search.params]
folds = 4

[model_selection.module_0]
module = "models.linear"
class = "RidgeRegression"
[model_selection.module_0.search_param_grid]
n_estimators = [10, 20]

[model_selection.module_1]
module = "models.linear"
class = "RidgeRegression"
[model_selection.module_1.search_param_grid]
alpha = [0.000001]
"#;
    let (features, target) = linear_training_data();
    let factory = ModelFactory::new(parse(doc));

    let best = factory
        .best_model(&features, &target, 0.6, ExecutionOptions::sequential())
        .unwrap();
    assert_eq!(best.serial, "module_1");
}

#[test]
fn search_all_reports_per_candidate_outcomes_in_order() {
    let (features, target) = linear_training_data();
    let factory = ModelFactory::new(parse(RIDGE_VS_TREE));
    let candidates = factory.initialize_all().unwrap();

    let outcomes = factory
        .search_all(candidates, &features, &target, ExecutionOptions::sequential())
        .unwrap();

    let serials: Vec<_> = outcomes.iter().map(|o| o.serial.as_str()).collect();
    assert_eq!(serials, ["module_0", "module_1"]);
    assert!(outcomes.iter().all(|o| o.outcome.is_ok()));
}

// ============================================================================
// Pooled Execution
// ============================================================================

fn scores(outcomes: &[CandidateOutcome]) -> Vec<f64> {
    outcomes
        .iter()
        .map(|o| o.outcome.as_ref().map(|r| r.best_score).unwrap_or(f64::NAN))
        .collect()
}

#[test]
fn pooled_execution_matches_sequential_results() {
    let (features, target) = linear_training_data();
    let factory = ModelFactory::new(parse(RIDGE_VS_TREE));

    let sequential = factory
        .search_all(
            factory.initialize_all().unwrap(),
            &features,
            &target,
            ExecutionOptions::sequential(),
        )
        .unwrap();
    let pooled = factory
        .search_all(
            factory.initialize_all().unwrap(),
            &features,
            &target,
            ExecutionOptions::sequential().with_workers(4),
        )
        .unwrap();

    let sequential_serials: Vec<_> = sequential.iter().map(|o| o.serial.clone()).collect();
    let pooled_serials: Vec<_> = pooled.iter().map(|o| o.serial.clone()).collect();
    assert_eq!(sequential_serials, pooled_serials);
    assert_eq!(scores(&sequential), scores(&pooled));
}

// ============================================================================
// Timeouts
// ============================================================================

/// Estimator that sleeps through every fit, for timeout tests.
#[derive(Debug, Clone)]
struct SleepyRegressor {
    delay: Duration,
    mean: f64,
}

impl SleepyRegressor {
    fn new() -> Self {
        Self {
            delay: Duration::from_millis(250),
            mean: 0.0,
        }
    }
}

impl Estimator for SleepyRegressor {
    fn name(&self) -> &'static str {
        "SleepyRegressor"
    }

    fn settable_params(&self) -> &'static [&'static str] {
        &["delay_ms"]
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "delay_ms" => {
                let ms = value.as_i64().unwrap_or(250);
                self.delay = Duration::from_millis(ms as u64);
                Ok(())
            }
            _ => Err(ModelError::UnknownParam {
                model: self.name(),
                name: name.to_string(),
            }),
        }
    }

    fn fit(&mut self, _features: &[Vec<f64>], target: &[f64]) -> Result<(), ModelError> {
        std::thread::sleep(self.delay);
        self.mean = target.iter().sum::<f64>() / target.len() as f64;
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        Ok(vec![self.mean; features.len()])
    }

    fn fresh(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            delay: self.delay,
            mean: 0.0,
        })
    }
}

#[test]
fn timed_out_candidate_is_recorded_while_others_succeed() {
    let doc = r#"
[search]
module = "tuning"
class = "GridSearchCv"
[search.params]
folds = 2

[model_selection.slow]
module = "models.testing"
class = "SleepyRegressor"
[model_selection.slow.search_param_grid]
delay_ms = [400]

[model_selection.fast]
module = "models.linear"
class = "RidgeRegression"
[model_selection.fast.search_param_grid]
alpha = [0.000001]
"#;
    let mut models = ModelRegistry::with_builtins();
    models.register("models.testing", "SleepyRegressor", || {
        Box::new(SleepyRegressor::new())
    });
    let factory =
        ModelFactory::with_registries(parse(doc), models, SearchRegistry::with_builtins());

    let (features, target) = linear_training_data();
    let candidates = factory.initialize_all().unwrap();
    let options = ExecutionOptions::sequential()
        .with_workers(2)
        .with_timeout(Duration::from_millis(100));

    let outcomes = factory
        .search_all(candidates, &features, &target, options)
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].serial, "slow");
    assert!(matches!(
        outcomes[0].outcome,
        Err(SearchExecutionError::Timeout(_))
    ));
    assert!(outcomes[1].outcome.is_ok(), "fast candidate should finish");
}

#[test]
fn generous_timeout_lets_everything_finish() {
    let (features, target) = linear_training_data();
    let factory = ModelFactory::new(parse(RIDGE_VS_TREE));
    let options = ExecutionOptions::sequential()
        .with_workers(2)
        .with_timeout(Duration::from_secs(60));

    let outcomes = factory
        .search_all(
            factory.initialize_all().unwrap(),
            &features,
            &target,
            options,
        )
        .unwrap();
    assert!(outcomes.iter().all(|o| o.outcome.is_ok()));
}

// ============================================================================
// Randomized Search End-to-End
// ============================================================================

#[test]
fn randomized_search_procedure_also_selects() {
    let doc = r#"
[search]
module = "tuning"
class = "RandomizedSearchCv"
[search.params]
folds = 4
n_iter = 12
seed = 3

[model_selection.module_0]
module = "models.linear"
class = "RidgeRegression"
[model_selection.module_0.search_param_grid]
alpha = [0.000001, 0.001, 1.0, 100.0]
"#;
    let (features, target) = linear_training_data();
    let factory = ModelFactory::new(parse(doc));

    let best = factory
        .best_model(&features, &target, 0.6, ExecutionOptions::sequential())
        .unwrap();
    // n_iter covers the space, so the best alpha is always found
    assert_eq!(best.best_params["alpha"], ParamValue::Float(0.000_001));
}
