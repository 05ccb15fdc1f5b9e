//! Ingested-Data Schema Validation
//!
//! Checks a tabular input file against a declarative schema document
//! before it is allowed to flow into training: expected file name, column
//! count, column names (as a multiset), and null patterns. Also provides
//! null normalization, producing a table with an explicit marker in every
//! missing cell.
//!
//! The schema document is TOML:
//!
//! ```toml
//! filename = "applications.csv"
//! number_of_columns = 3
//!
//! [columns]
//! case_id = "string"
//! wage = "float"
//! approved = "int"
//! ```
//!
//! Only the column names are used; the type strings are informational.

pub mod table;
mod validator;

pub use table::{Table, NULL_MARKER};
pub use validator::SchemaValidator;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Schema document or tabular file problems.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema parse error ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("tabular file {} has no header row", .path.display())]
    EmptyFile { path: PathBuf },

    #[error("column '{column}' not present in {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("no usable rows in {} after dropping missing or non-numeric cells", .path.display())]
    NoUsableRows { path: PathBuf },

    #[error(transparent)]
    Mismatch(#[from] SchemaMismatchError),
}

/// One or more of the structural checks failed.
#[derive(Debug, Error)]
#[error("schema validation failed for {}: {}", .path.display(), .failures.join("; "))]
pub struct SchemaMismatchError {
    pub path: PathBuf,
    /// Human-readable description of every failed check.
    pub failures: Vec<String>,
}

// ============================================================================
// Schema Document
// ============================================================================

/// Declarative description of an expected tabular file's shape and naming.
/// Loaded once per validation session; read-only.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDoc {
    /// Expected file name, matched exactly.
    pub filename: String,
    /// Expected column count.
    pub number_of_columns: usize,
    /// Expected column names mapped to informational type strings; only
    /// the names take part in validation. Document order is preserved.
    pub columns: toml::Table,
}

impl SchemaDoc {
    /// Load from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, SchemaError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| SchemaError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Expected column names, in document order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}
