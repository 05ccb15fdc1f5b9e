//! ModelFoundry: Configuration-Driven Model Selection
//!
//! Given a declarative description of candidate model types and their
//! hyperparameter search spaces, construct each candidate, run a search
//! procedure per candidate against a training set, and select the single
//! best model above an acceptance floor.
//!
//! ## Architecture
//!
//! - **Config**: TOML model-selection document → ordered candidate specs
//! - **Registry**: explicit (module, class) → factory tables, no dynamic loading
//! - **Models**: built-in estimator families with validated hyperparameter setters
//! - **Tuning**: grid and randomized search with k-fold cross-validated scoring
//! - **Factory**: candidate initialization, pooled search execution, selection
//! - **Schema**: structural validation of ingested tabular files

pub mod config;
pub mod factory;
pub mod models;
pub mod registry;
pub mod schema;
pub mod tuning;

// Re-export configuration types
pub use config::{
    CandidateSpec, ConfigError, ParamGrid, ParamValue, SearchSettings, SearchSpec,
    SelectionConfig,
};

// Re-export the factory surface
pub use factory::{
    select_best, BestModel, CandidateOutcome, ExecutionOptions, InitializedModel, ModelFactory,
    NoAcceptableModelError, SearchResult, SelectionError,
};

// Re-export registries
pub use registry::{ModelRegistry, ResolutionError, SearchRegistry};

// Re-export estimators and search procedures
pub use models::{
    DecisionTreeRegressor, Estimator, KNeighborsRegressor, ModelError, RidgeRegression,
};
pub use tuning::{GridSearchCv, RandomizedSearchCv, SearchExecutionError, SearchProcedure};

// Re-export schema validation
pub use schema::{SchemaDoc, SchemaError, SchemaMismatchError, SchemaValidator, Table};
