//! Model-selection document loading.
//!
//! The document is TOML with two sections: a single `[search]` table naming
//! the search procedure (module + class, optional `[search.params]`
//! settings), and a `[model_selection]` table mapping arbitrary candidate
//! identifiers to `{module, class, optional params, search_param_grid}`.
//!
//! Candidate iteration order is the document order of the
//! `[model_selection.<id>]` tables, which is why the `toml` dependency is
//! built with `preserve_order`.
//!
//! Parsing is two-pass: a raw `toml::Value` walk emits unknown-key
//! warnings first, then the typed structures are extracted with explicit
//! errors for every missing or ill-typed key.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use super::validation;

// ============================================================================
// Errors
// ============================================================================

/// Malformed or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("missing required key '{key}' in {context}")]
    MissingKey { context: String, key: &'static str },

    #[error("'{key}' in {context} must be {expected}")]
    WrongType {
        context: String,
        key: String,
        expected: &'static str,
    },

    #[error("unsupported value for '{key}' in {context}: {found}")]
    UnsupportedValue {
        context: String,
        key: String,
        found: String,
    },

    #[error("invalid value for '{key}' in {context}: {message}")]
    InvalidValue {
        context: String,
        key: String,
        message: String,
    },

    #[error("search space for candidate '{candidate}' is empty")]
    EmptyGrid { candidate: String },

    #[error("empty value list for hyperparameter '{name}' of candidate '{candidate}'")]
    EmptyGridEntry { candidate: String, name: String },

    #[error("unknown property '{name}' for {model}{}", .suggestion.as_deref().map(|s| format!(" — did you mean '{s}'?")).unwrap_or_default())]
    UnknownProperty {
        model: String,
        name: String,
        suggestion: Option<String>,
    },
}

// ============================================================================
// Parameter Values & Grids
// ============================================================================

/// A scalar hyperparameter value as it appears in the config document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Convert a scalar TOML value. Tables, arrays and datetimes are not
    /// valid hyperparameter values.
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Boolean(b) => Some(Self::Bool(*b)),
            toml::Value::Integer(i) => Some(Self::Int(*i)),
            toml::Value::Float(f) => Some(Self::Float(*f)),
            toml::Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: integers widen to floats so `alpha = 1` works.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Ordered mapping of hyperparameter name → candidate values to try.
///
/// Entry order is document order, which keeps combination enumeration (and
/// therefore tie-breaking) deterministic.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    entries: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Used by tests and programmatic construction; the
    /// loader guarantees names are unique because TOML keys are.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<ParamValue>) {
        self.entries.push((name.into(), values));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParamValue])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Total number of combinations in the cartesian product.
    pub fn n_combinations(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, v)| v.len())
            .fold(1, usize::saturating_mul)
    }
}

// ============================================================================
// Typed Config Structures
// ============================================================================

/// Settings for the search procedure, from `[search.params]`.
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    /// Cross-validation fold count.
    pub folds: usize,
    /// Sample count for randomized search.
    pub n_iter: usize,
    /// Seed for fold shuffling and randomized sampling.
    pub seed: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            folds: 5,
            n_iter: 20,
            seed: 42,
        }
    }
}

/// The single global search-procedure reference.
#[derive(Debug, Clone)]
pub struct SearchSpec {
    pub module: String,
    pub class: String,
    pub settings: SearchSettings,
}

/// One configured candidate model awaiting hyperparameter search.
#[derive(Debug, Clone)]
pub struct CandidateSpec {
    /// Arbitrary identifier from the config (the "serial number").
    pub id: String,
    pub module: String,
    pub class: String,
    /// Static property assignments applied at construction, in document order.
    pub params: Vec<(String, ParamValue)>,
    /// Hyperparameter search space. Never empty.
    pub grid: ParamGrid,
}

impl CandidateSpec {
    /// Display name in `module.class` form.
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.module, self.class)
    }
}

/// Parsed model-selection document.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub search: SearchSpec,
    /// Candidates in document order.
    pub candidates: Vec<CandidateSpec>,
}

// ============================================================================
// Loading
// ============================================================================

fn require<'a>(
    table: &'a toml::Table,
    context: &str,
    key: &'static str,
) -> Result<&'a toml::Value, ConfigError> {
    table.get(key).ok_or_else(|| ConfigError::MissingKey {
        context: context.to_string(),
        key,
    })
}

fn require_str(table: &toml::Table, context: &str, key: &'static str) -> Result<String, ConfigError> {
    require(table, context, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::WrongType {
            context: context.to_string(),
            key: key.to_string(),
            expected: "a string",
        })
}

fn require_table<'a>(
    value: &'a toml::Value,
    context: &str,
    key: &str,
) -> Result<&'a toml::Table, ConfigError> {
    value.as_table().ok_or_else(|| ConfigError::WrongType {
        context: context.to_string(),
        key: key.to_string(),
        expected: "a table",
    })
}

fn scalar(value: &toml::Value, context: &str, key: &str) -> Result<ParamValue, ConfigError> {
    ParamValue::from_toml(value).ok_or_else(|| ConfigError::UnsupportedValue {
        context: context.to_string(),
        key: key.to_string(),
        found: value.type_str().to_string(),
    })
}

fn parse_settings(search_tbl: &toml::Table) -> Result<SearchSettings, ConfigError> {
    let mut settings = SearchSettings::default();
    let Some(params) = search_tbl.get("params") else {
        return Ok(settings);
    };
    let context = "search.params";
    let params = require_table(params, "search", "params")?;

    if let Some(v) = params.get("folds") {
        let folds = v.as_integer().ok_or_else(|| ConfigError::WrongType {
            context: context.to_string(),
            key: "folds".to_string(),
            expected: "an integer",
        })?;
        if folds < 2 {
            return Err(ConfigError::InvalidValue {
                context: context.to_string(),
                key: "folds".to_string(),
                message: format!("cross-validation needs at least 2 folds, got {folds}"),
            });
        }
        settings.folds = folds as usize;
    }
    if let Some(v) = params.get("n_iter") {
        let n_iter = v.as_integer().ok_or_else(|| ConfigError::WrongType {
            context: context.to_string(),
            key: "n_iter".to_string(),
            expected: "an integer",
        })?;
        if n_iter < 1 {
            return Err(ConfigError::InvalidValue {
                context: context.to_string(),
                key: "n_iter".to_string(),
                message: format!("n_iter must be positive, got {n_iter}"),
            });
        }
        settings.n_iter = n_iter as usize;
    }
    if let Some(v) = params.get("seed") {
        let seed = v.as_integer().ok_or_else(|| ConfigError::WrongType {
            context: context.to_string(),
            key: "seed".to_string(),
            expected: "an integer",
        })?;
        if seed < 0 {
            return Err(ConfigError::InvalidValue {
                context: context.to_string(),
                key: "seed".to_string(),
                message: format!("seed must be non-negative, got {seed}"),
            });
        }
        settings.seed = seed as u64;
    }
    Ok(settings)
}

fn parse_candidate(id: &str, value: &toml::Value) -> Result<CandidateSpec, ConfigError> {
    let context = format!("model_selection.{id}");
    let tbl = require_table(value, "model_selection", id)?;

    let module = require_str(tbl, &context, "module")?;
    let class = require_str(tbl, &context, "class")?;

    let mut params = Vec::new();
    if let Some(p) = tbl.get("params") {
        let p = require_table(p, &context, "params")?;
        for (name, v) in p {
            params.push((name.clone(), scalar(v, &context, name)?));
        }
    }

    let grid_value = require(tbl, &context, "search_param_grid")?;
    let grid_tbl = require_table(grid_value, &context, "search_param_grid")?;
    if grid_tbl.is_empty() {
        return Err(ConfigError::EmptyGrid {
            candidate: id.to_string(),
        });
    }

    let mut grid = ParamGrid::new();
    for (name, v) in grid_tbl {
        let values = v.as_array().ok_or_else(|| ConfigError::WrongType {
            context: format!("{context}.search_param_grid"),
            key: name.clone(),
            expected: "an array of values",
        })?;
        if values.is_empty() {
            return Err(ConfigError::EmptyGridEntry {
                candidate: id.to_string(),
                name: name.clone(),
            });
        }
        let values = values
            .iter()
            .map(|v| scalar(v, &format!("{context}.search_param_grid"), name))
            .collect::<Result<Vec<_>, _>>()?;
        grid.insert(name.clone(), values);
    }

    Ok(CandidateSpec {
        id: id.to_string(),
        module,
        class,
        params,
        grid,
    })
}

impl SelectionConfig {
    /// Load from a TOML file, logging unknown-key warnings.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// Parse from a TOML string. `origin` is used only for error context.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        for w in validation::validate_unknown_keys(contents) {
            warn!("{w}");
        }

        let value: toml::Value = contents.parse().map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            source: Box::new(e),
        })?;
        let root = value.as_table().ok_or_else(|| ConfigError::WrongType {
            context: "document".to_string(),
            key: "root".to_string(),
            expected: "a table",
        })?;

        let search_tbl = require_table(require(root, "config", "search")?, "config", "search")?;
        let search = SearchSpec {
            module: require_str(search_tbl, "search", "module")?,
            class: require_str(search_tbl, "search", "class")?,
            settings: parse_settings(search_tbl)?,
        };

        let ms_tbl = require_table(
            require(root, "config", "model_selection")?,
            "config",
            "model_selection",
        )?;
        if ms_tbl.is_empty() {
            warn!("model_selection section is empty — nothing to select from");
        }

        let candidates = ms_tbl
            .iter()
            .map(|(id, v)| parse_candidate(id, v))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { search, candidates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[search]
module = "tuning"
class = "GridSearchCv"

[search.params]
folds = 3
seed = 7

[model_selection.module_0]
module = "models.linear"
class = "RidgeRegression"

[model_selection.module_0.params]
fit_intercept = true

[model_selection.module_0.search_param_grid]
alpha = [0.1, 1.0, 10.0]

[model_selection.module_1]
module = "models.neighbors"
class = "KNeighborsRegressor"

[model_selection.module_1.search_param_grid]
n_neighbors = [3, 5, 7]
weights = ["uniform", "distance"]
"#;

    fn parse(s: &str) -> Result<SelectionConfig, ConfigError> {
        SelectionConfig::from_toml_str(s, Path::new("test.toml"))
    }

    #[test]
    fn parses_full_document() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.search.module, "tuning");
        assert_eq!(config.search.class, "GridSearchCv");
        assert_eq!(config.search.settings.folds, 3);
        assert_eq!(config.search.settings.seed, 7);
        // n_iter untouched by the document keeps its default
        assert_eq!(config.search.settings.n_iter, 20);

        assert_eq!(config.candidates.len(), 2);
        let first = &config.candidates[0];
        assert_eq!(first.id, "module_0");
        assert_eq!(first.display_name(), "models.linear.RidgeRegression");
        assert_eq!(
            first.params,
            vec![("fit_intercept".to_string(), ParamValue::Bool(true))]
        );
        assert_eq!(first.grid.len(), 1);
        assert_eq!(first.grid.n_combinations(), 3);

        let second = &config.candidates[1];
        assert!(second.params.is_empty());
        assert_eq!(second.grid.n_combinations(), 6);
    }

    #[test]
    fn candidate_order_is_document_order() {
        let doc = r#"
[search]
module = "tuning"
class = "GridSearchCv"

[model_selection.zz]
module = "models.linear"
class = "RidgeRegression"
[model_selection.zz.search_param_grid]
alpha = [1.0]

[model_selection.aa]
module = "models.linear"
class = "RidgeRegression"
[model_selection.aa.search_param_grid]
alpha = [1.0]

[model_selection.mm]
module = "models.linear"
class = "RidgeRegression"
[model_selection.mm.search_param_grid]
alpha = [1.0]
"#;
        let config = parse(doc).unwrap();
        let ids: Vec<_> = config.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["zz", "aa", "mm"]);
    }

    #[test]
    fn missing_class_is_config_error() {
        let doc = r#"
[search]
module = "tuning"
class = "GridSearchCv"

[model_selection.m0]
module = "models.linear"
[model_selection.m0.search_param_grid]
alpha = [1.0]
"#;
        let err = parse(doc).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: "class", .. }));
    }

    #[test]
    fn missing_grid_is_config_error() {
        let doc = r#"
[search]
module = "tuning"
class = "GridSearchCv"

[model_selection.m0]
module = "models.linear"
class = "RidgeRegression"
"#;
        let err = parse(doc).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKey {
                key: "search_param_grid",
                ..
            }
        ));
    }

    #[test]
    fn empty_grid_is_rejected() {
        let doc = r#"
[search]
module = "tuning"
class = "GridSearchCv"

[model_selection.m0]
module = "models.linear"
class = "RidgeRegression"
[model_selection.m0.search_param_grid]
"#;
        let err = parse(doc).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyGrid { .. }));
    }

    #[test]
    fn grid_entry_must_be_array() {
        let doc = r#"
[search]
module = "tuning"
class = "GridSearchCv"

[model_selection.m0]
module = "models.linear"
class = "RidgeRegression"
[model_selection.m0.search_param_grid]
alpha = 1.0
"#;
        let err = parse(doc).unwrap_err();
        assert!(matches!(err, ConfigError::WrongType { .. }));
    }

    #[test]
    fn params_must_be_a_mapping() {
        let doc = r#"
[search]
module = "tuning"
class = "GridSearchCv"

[model_selection.m0]
module = "models.linear"
class = "RidgeRegression"
params = "not-a-table"
[model_selection.m0.search_param_grid]
alpha = [1.0]
"#;
        let err = parse(doc).unwrap_err();
        assert!(matches!(err, ConfigError::WrongType { .. }));
    }

    #[test]
    fn too_few_folds_rejected() {
        let doc = r#"
[search]
module = "tuning"
class = "GridSearchCv"
[search.params]
folds = 1

[model_selection.m0]
module = "models.linear"
class = "RidgeRegression"
[model_selection.m0.search_param_grid]
alpha = [1.0]
"#;
        let err = parse(doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn param_value_numeric_widening() {
        assert_eq!(ParamValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(ParamValue::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(ParamValue::Str("x".into()).as_f64(), None);
        assert_eq!(ParamValue::Bool(true).as_bool(), Some(true));
    }
}
