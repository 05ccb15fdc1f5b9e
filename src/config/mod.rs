//! Model-Selection Configuration Module
//!
//! Loads the declarative model-selection document: which candidate models
//! to try, their static properties and hyperparameter search spaces, and
//! which search procedure to run them through.
//!
//! ## Usage
//!
//! ```ignore
//! let config = SelectionConfig::load_from_file(Path::new("model.toml"))?;
//! for candidate in &config.candidates {
//!     println!("{} -> {}", candidate.id, candidate.display_name());
//! }
//! ```

mod selection;
pub mod validation;

pub use selection::{
    CandidateSpec, ConfigError, ParamGrid, ParamValue, SearchSettings, SearchSpec,
    SelectionConfig,
};
pub use validation::ValidationWarning;
