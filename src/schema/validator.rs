//! The four structural checks against a loaded schema document.
//!
//! Every check loads the tabular file fresh from disk, which keeps the
//! checks independent and stateless. Fine for the batch/offline ingestion
//! this validator serves; not meant for repeated high-frequency calls.

use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::table::Table;
use super::{SchemaDoc, SchemaError, SchemaMismatchError};

/// Validates an ingested tabular file against its expected schema.
pub struct SchemaValidator {
    schema: SchemaDoc,
}

impl SchemaValidator {
    pub fn new(schema: SchemaDoc) -> Self {
        Self { schema }
    }

    /// Load the schema document and build a validator.
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        Ok(Self::new(SchemaDoc::load_from_file(path)?))
    }

    pub fn schema(&self) -> &SchemaDoc {
        &self.schema
    }

    /// Exact match against the expected file name.
    pub fn validate_filename(&self, file_name: &str) -> bool {
        self.schema.filename == file_name
    }

    /// Loaded column count equals the expected count.
    pub fn validate_column_count(&self, path: &Path) -> Result<bool, SchemaError> {
        let table = Table::load_csv(path)?;
        Ok(table.n_columns() == self.schema.number_of_columns)
    }

    /// Multiset equality of actual vs expected column names:
    /// order-independent, duplicate-sensitive.
    pub fn validate_column_names(&self, path: &Path) -> Result<bool, SchemaError> {
        let table = Table::load_csv(path)?;

        let mut actual: HashMap<&str, usize> = HashMap::new();
        for name in table.headers() {
            *actual.entry(name.as_str()).or_insert(0) += 1;
        }
        let mut expected: HashMap<&str, usize> = HashMap::new();
        for name in self.schema.column_names() {
            *expected.entry(name).or_insert(0) += 1;
        }
        Ok(actual == expected)
    }

    /// True if no column is 100% missing. All columns are inspected; a
    /// zero-row table counts every column as fully missing.
    pub fn has_no_fully_empty_columns(&self, path: &Path) -> Result<bool, SchemaError> {
        let table = Table::load_csv(path)?;
        for index in 0..table.n_columns() {
            let mut populated = false;
            for cell in table.column(index) {
                if !Table::is_missing(cell) {
                    populated = true;
                    break;
                }
            }
            if !populated {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Load the file and replace every missing cell with the explicit null
    /// marker, producing a new table for downstream consistency.
    pub fn normalize_nulls(&self, path: &Path) -> Result<Table, SchemaError> {
        let table = Table::load_csv(path)?;
        Ok(table.normalize_nulls())
    }

    /// Run all four checks, collecting every failure rather than stopping
    /// at the first.
    pub fn validate(&self, path: &Path) -> Result<(), SchemaError> {
        let mut failures = Vec::new();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self.validate_filename(&file_name) {
            failures.push(format!(
                "file name '{}' does not match expected '{}'",
                file_name, self.schema.filename
            ));
        }

        if !self.validate_column_count(path)? {
            failures.push(format!(
                "column count does not match expected {}",
                self.schema.number_of_columns
            ));
        }

        if !self.validate_column_names(path)? {
            failures.push("column names do not match the schema".to_string());
        }

        if !self.has_no_fully_empty_columns(path)? {
            failures.push("at least one column is entirely missing".to_string());
        }

        if failures.is_empty() {
            info!(path = %path.display(), "schema validation passed");
            Ok(())
        } else {
            Err(SchemaError::Mismatch(SchemaMismatchError {
                path: path.to_path_buf(),
                failures,
            }))
        }
    }
}
