//! Explicit (module, class) → factory registries.
//!
//! The config document names types by string reference pairs, e.g.
//! `module = "models.linear"`, `class = "RidgeRegression"`. Rather than
//! any dynamic loading, both registries are plain tables populated at
//! startup; `with_builtins` installs everything this crate ships, and
//! callers may register their own factories on top.
//!
//! Factories are bare `fn` pointers so resolved entries are `Copy` and can
//! move into worker threads without shared-state ceremony.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::validation::suggest_correction;
use crate::config::{ParamGrid, SearchSettings};
use crate::models::{
    DecisionTreeRegressor, Estimator, KNeighborsRegressor, RidgeRegression,
};
use crate::tuning::{GridSearchCv, RandomizedSearchCv, SearchProcedure};

/// Module/class lookup failure.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("unknown module '{module}'")]
    UnknownModule { module: String },

    #[error("module '{module}' has no class '{class}'{}", .suggestion.as_deref().map(|s| format!(" — did you mean '{s}'?")).unwrap_or_default())]
    UnknownClass {
        module: String,
        class: String,
        suggestion: Option<String>,
    },
}

fn lookup<'a, F>(
    modules: &'a BTreeMap<String, BTreeMap<String, F>>,
    module: &str,
    class: &str,
) -> Result<&'a F, ResolutionError> {
    let classes = modules
        .get(module)
        .ok_or_else(|| ResolutionError::UnknownModule {
            module: module.to_string(),
        })?;
    classes.get(class).ok_or_else(|| {
        let known: Vec<&str> = classes.keys().map(String::as_str).collect();
        ResolutionError::UnknownClass {
            module: module.to_string(),
            class: class.to_string(),
            suggestion: suggest_correction(class, &known),
        }
    })
}

// ============================================================================
// Model Registry
// ============================================================================

/// Zero-argument estimator constructor.
pub type EstimatorFactory = fn() -> Box<dyn Estimator>;

/// Registry of constructible estimator types.
pub struct ModelRegistry {
    modules: BTreeMap<String, BTreeMap<String, EstimatorFactory>>,
}

impl ModelRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Registry pre-populated with the built-in estimator families.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("models.linear", "RidgeRegression", || {
            Box::new(RidgeRegression::new())
        });
        registry.register("models.neighbors", "KNeighborsRegressor", || {
            Box::new(KNeighborsRegressor::new())
        });
        registry.register("models.tree", "DecisionTreeRegressor", || {
            Box::new(DecisionTreeRegressor::new())
        });
        registry
    }

    /// Install a factory, replacing any previous registration.
    pub fn register(&mut self, module: &str, class: &str, factory: EstimatorFactory) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(class.to_string(), factory);
    }

    /// Resolve a reference pair to its factory.
    pub fn resolve(&self, module: &str, class: &str) -> Result<EstimatorFactory, ResolutionError> {
        lookup(&self.modules, module, class).copied()
    }

    /// Resolve and invoke the zero-argument constructor.
    pub fn construct(&self, module: &str, class: &str) -> Result<Box<dyn Estimator>, ResolutionError> {
        Ok(self.resolve(module, class)?())
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Search-Procedure Registry
// ============================================================================

/// Constructor binding a procedure to an estimator and its search space.
pub type SearchFactory =
    fn(Box<dyn Estimator>, ParamGrid, SearchSettings) -> Box<dyn SearchProcedure>;

/// Registry of constructible search procedures.
pub struct SearchRegistry {
    modules: BTreeMap<String, BTreeMap<String, SearchFactory>>,
}

impl SearchRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Registry pre-populated with the built-in procedures.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("tuning", "GridSearchCv", |estimator, grid, settings| {
            Box::new(GridSearchCv::new(estimator, grid, settings))
        });
        registry.register("tuning", "RandomizedSearchCv", |estimator, grid, settings| {
            Box::new(RandomizedSearchCv::new(estimator, grid, settings))
        });
        registry
    }

    /// Install a factory, replacing any previous registration.
    pub fn register(&mut self, module: &str, class: &str, factory: SearchFactory) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(class.to_string(), factory);
    }

    /// Resolve a reference pair to its factory.
    pub fn resolve(&self, module: &str, class: &str) -> Result<SearchFactory, ResolutionError> {
        lookup(&self.modules, module, class).copied()
    }
}

impl Default for SearchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_models_resolve() {
        let registry = ModelRegistry::with_builtins();
        let model = registry.construct("models.linear", "RidgeRegression").unwrap();
        assert_eq!(model.name(), "RidgeRegression");
    }

    #[test]
    fn unknown_module_is_distinguished_from_unknown_class() {
        let registry = ModelRegistry::with_builtins();
        assert!(matches!(
            registry.resolve("models.boosting", "GradientBoosting"),
            Err(ResolutionError::UnknownModule { .. })
        ));
        assert!(matches!(
            registry.resolve("models.linear", "LassoRegression"),
            Err(ResolutionError::UnknownClass { .. })
        ));
    }

    #[test]
    fn near_miss_class_gets_a_suggestion() {
        let registry = ModelRegistry::with_builtins();
        let err = registry.resolve("models.linear", "RidgeRegresion").unwrap_err();
        match err {
            ResolutionError::UnknownClass { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("RidgeRegression"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn custom_registration_overrides_and_extends() {
        let mut registry = ModelRegistry::with_builtins();
        registry.register("models.custom", "Stub", || {
            Box::new(RidgeRegression::new())
        });
        assert!(registry.construct("models.custom", "Stub").is_ok());
    }

    #[test]
    fn builtin_search_procedures_resolve() {
        let registry = SearchRegistry::with_builtins();
        assert!(registry.resolve("tuning", "GridSearchCv").is_ok());
        assert!(registry.resolve("tuning", "RandomizedSearchCv").is_ok());
        assert!(registry.resolve("tuning", "BayesSearchCv").is_err());
    }
}
