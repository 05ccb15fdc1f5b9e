//! Model Factory
//!
//! The core of the crate: reads the parsed model-selection config,
//! constructs one candidate per entry through the registry, runs the
//! configured search procedure per candidate, and reduces the results to
//! the single best model above an acceptance floor.
//!
//! ## Flow
//!
//! ```ignore
//! let factory = ModelFactory::from_path(Path::new("model.toml"))?;
//! let best = factory.best_model(&features, &target, 0.6, ExecutionOptions::sequential())?;
//! println!("{} scored {:.3}", best.serial, best.best_score);
//! ```
//!
//! Every stage is also callable on its own (`initialize_all`, `search`,
//! `search_all`, `select_best`) so an orchestration layer can drive the
//! steps, retry individual candidates, or inspect intermediate records.

pub mod executor;
pub mod selector;

pub use executor::ExecutionOptions;
pub use selector::{select_best, NoAcceptableModelError};

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::config::{
    validation::suggest_correction, ConfigError, ParamGrid, ParamValue, SelectionConfig,
};
use crate::models::{Estimator, ModelError};
use crate::registry::{ModelRegistry, ResolutionError, SearchFactory, SearchRegistry};
use crate::tuning::SearchExecutionError;

// ============================================================================
// Records
// ============================================================================

/// A constructed candidate with its search space, ready for search.
#[derive(Debug)]
pub struct InitializedModel {
    /// The candidate's config identifier.
    pub serial: String,
    /// The live estimator, static properties applied. Owned exclusively
    /// until handed to the search executor.
    pub model: Box<dyn Estimator>,
    pub grid: ParamGrid,
    /// `module.class` as written in the config.
    pub display_name: String,
}

/// Outcome of one candidate's hyperparameter search.
#[derive(Debug)]
pub struct SearchResult {
    pub serial: String,
    /// The original unfitted instance the search started from.
    pub model: Box<dyn Estimator>,
    /// The best-scoring sub-model, refitted on the full training set.
    pub best_model: Box<dyn Estimator>,
    pub best_params: BTreeMap<String, ParamValue>,
    pub best_score: f64,
}

/// Per-candidate report from batch execution: either a result or the
/// error that candidate failed with, never silently absorbed.
#[derive(Debug)]
pub struct CandidateOutcome {
    pub serial: String,
    pub display_name: String,
    pub outcome: Result<SearchResult, SearchExecutionError>,
}

/// The selector's winner.
#[derive(Debug)]
pub struct BestModel {
    pub serial: String,
    pub model: Box<dyn Estimator>,
    pub best_model: Box<dyn Estimator>,
    pub best_params: BTreeMap<String, ParamValue>,
    pub best_score: f64,
}

impl From<SearchResult> for BestModel {
    fn from(result: SearchResult) -> Self {
        Self {
            serial: result.serial,
            model: result.model,
            best_model: result.best_model,
            best_params: result.best_params,
            best_score: result.best_score,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Any failure on the factory's paths, preserving the underlying taxonomy.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Search(#[from] SearchExecutionError),

    #[error(transparent)]
    NoAcceptableModel(#[from] NoAcceptableModelError),
}

// ============================================================================
// Factory
// ============================================================================

/// Owns the parsed selection config and the type registries.
pub struct ModelFactory {
    config: SelectionConfig,
    models: ModelRegistry,
    procedures: SearchRegistry,
}

impl ModelFactory {
    /// Factory over the built-in registries.
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            models: ModelRegistry::with_builtins(),
            procedures: SearchRegistry::with_builtins(),
        }
    }

    /// Load the config document and build a factory over the built-ins.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new(SelectionConfig::load_from_file(path)?))
    }

    /// Factory over caller-supplied registries (custom estimators or
    /// search procedures).
    pub fn with_registries(
        config: SelectionConfig,
        models: ModelRegistry,
        procedures: SearchRegistry,
    ) -> Self {
        Self {
            config,
            models,
            procedures,
        }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Apply a property mapping onto an estimator, one validated setter
    /// call per pair, each assignment logged. Unknown names become
    /// `ConfigError::UnknownProperty` with a suggestion from the
    /// estimator's allow-list.
    pub fn apply_properties(
        model: &mut dyn Estimator,
        properties: &[(String, ParamValue)],
    ) -> Result<(), ConfigError> {
        for (name, value) in properties {
            let allowed = model.settable_params();
            info!(
                model = model.name(),
                property = %name,
                value = %value,
                "setting model property"
            );
            model.set_param(name, value).map_err(|err| match err {
                ModelError::UnknownParam {
                    model: model_name,
                    name: property,
                } => {
                    let suggestion = suggest_correction(&property, allowed);
                    ConfigError::UnknownProperty {
                        model: model_name.to_string(),
                        name: property,
                        suggestion,
                    }
                }
                other => ConfigError::InvalidValue {
                    context: model.name().to_string(),
                    key: name.clone(),
                    message: other.to_string(),
                },
            })?;
        }
        Ok(())
    }

    /// Construct every configured candidate, in config order.
    ///
    /// Returns the full accumulated sequence; a failure on any candidate
    /// propagates instead of being masked.
    pub fn initialize_all(&self) -> Result<Vec<InitializedModel>, SelectionError> {
        let mut initialized = Vec::with_capacity(self.config.candidates.len());
        for spec in &self.config.candidates {
            let mut model = self.models.construct(&spec.module, &spec.class)?;
            Self::apply_properties(model.as_mut(), &spec.params)?;
            info!(
                serial = %spec.id,
                model = %spec.display_name(),
                grid_combinations = spec.grid.n_combinations(),
                "candidate initialized"
            );
            initialized.push(InitializedModel {
                serial: spec.id.clone(),
                model,
                grid: spec.grid.clone(),
                display_name: spec.display_name(),
            });
        }
        Ok(initialized)
    }

    /// Look up an initialized candidate by its serial.
    pub fn find_initialized_model<'a>(
        candidates: &'a [InitializedModel],
        serial: &str,
    ) -> Option<&'a InitializedModel> {
        candidates.iter().find(|c| c.serial == serial)
    }

    fn search_factory(&self) -> Result<SearchFactory, ResolutionError> {
        self.procedures
            .resolve(&self.config.search.module, &self.config.search.class)
    }

    /// Run the configured search procedure for one candidate, consuming it
    /// (the fitted sub-model takes over ownership downstream).
    pub fn search(
        &self,
        candidate: InitializedModel,
        features: &[Vec<f64>],
        target: &[f64],
    ) -> Result<SearchResult, SelectionError> {
        let factory = self.search_factory()?;
        Ok(executor::run_candidate(
            factory,
            self.config.search.settings,
            candidate,
            features,
            target,
        )?)
    }

    /// Run every candidate, reporting one outcome each in original order.
    /// Individual failures do not stop the remaining candidates.
    pub fn search_all(
        &self,
        candidates: Vec<InitializedModel>,
        features: &[Vec<f64>],
        target: &[f64],
        options: ExecutionOptions,
    ) -> Result<Vec<CandidateOutcome>, SelectionError> {
        let factory = self.search_factory()?;
        Ok(executor::search_all(
            factory,
            self.config.search.settings,
            candidates,
            features,
            target,
            options,
        ))
    }

    /// The whole pipeline: initialize, search everything, select the best
    /// result above `floor`. Per-candidate failures are logged and the
    /// remaining candidates still compete.
    pub fn best_model(
        &self,
        features: &[Vec<f64>],
        target: &[f64],
        floor: f64,
        options: ExecutionOptions,
    ) -> Result<BestModel, SelectionError> {
        let span = info_span!("model_selection", floor, candidates = self.config.candidates.len());
        let _guard = span.enter();

        let candidates = self.initialize_all()?;
        let outcomes = self.search_all(candidates, features, target, options)?;

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome.outcome {
                Ok(result) => results.push(result),
                Err(err) => warn!(
                    serial = %outcome.serial,
                    model = %outcome.display_name,
                    error = %err,
                    "candidate search failed"
                ),
            }
        }

        Ok(select_best(results, floor)?)
    }
}
