//! In-memory tabular file.
//!
//! Loads a delimited file into headers plus string cells, quote-aware.
//! Rows shorter than the header are padded with empty (missing) cells so
//! the table is always rectangular; longer rows keep their width and are
//! reported by their own length.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

use super::SchemaError;

/// Marker written into cells by null normalization.
pub const NULL_MARKER: &str = "NULL";

/// Split a CSV line respecting quoted fields (commas inside quotes stay
/// put, doubled quotes unescape). Returns owned strings because quoted
/// fields need unquoting.
pub(crate) fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// A loaded tabular file: one header row plus string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build from parts. Rows are padded to the header width.
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        for row in &mut rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        Self { headers, rows }
    }

    /// Load a delimited file. Always reads fresh from disk.
    pub fn load_csv(path: &Path) -> Result<Self, SchemaError> {
        let file = File::open(path).map_err(|e| SchemaError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let reader = BufReader::new(file);

        let mut lines = reader.lines();
        let header_line = lines
            .next()
            .transpose()
            .map_err(|e| SchemaError::Io {
                path: path.to_path_buf(),
                source: e,
            })?
            .ok_or_else(|| SchemaError::EmptyFile {
                path: path.to_path_buf(),
            })?;
        let headers: Vec<String> = csv_split(header_line.trim_end_matches('\r'))
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for line in lines {
            let line = line.map_err(|e| SchemaError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            rows.push(csv_split(line));
        }

        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn n_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Iterate one column's cells.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| {
            row.get(index).map_or("", String::as_str)
        })
    }

    /// Whether a cell counts as missing: empty/whitespace, or one of the
    /// usual NA spellings. The `"NULL"` marker written by normalization is
    /// deliberately NOT missing, which makes normalization idempotent.
    pub fn is_missing(cell: &str) -> bool {
        let trimmed = cell.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("nan")
    }

    /// New table with every missing cell replaced by [`NULL_MARKER`].
    pub fn normalize_nulls(&self) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        if Self::is_missing(cell) {
                            NULL_MARKER.to_string()
                        } else {
                            cell.clone()
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Extract a numeric feature matrix and target column for training.
    ///
    /// Rows containing a missing or non-numeric cell are dropped with a
    /// warning; training input must be fully numeric.
    pub fn to_features_target(
        &self,
        target_column: &str,
        origin: &Path,
    ) -> Result<(Vec<Vec<f64>>, Vec<f64>), SchemaError> {
        let target_idx = self
            .headers
            .iter()
            .position(|h| h == target_column)
            .ok_or_else(|| SchemaError::MissingColumn {
                column: target_column.to_string(),
                path: origin.to_path_buf(),
            })?;

        let mut features = Vec::with_capacity(self.rows.len());
        let mut target = Vec::with_capacity(self.rows.len());
        let mut dropped = 0usize;

        'rows: for row in &self.rows {
            let mut feature_row = Vec::with_capacity(self.headers.len() - 1);
            let mut target_value = 0.0;
            for (idx, cell) in row.iter().enumerate().take(self.headers.len()) {
                if Self::is_missing(cell) {
                    dropped += 1;
                    continue 'rows;
                }
                let Ok(value) = cell.trim().parse::<f64>() else {
                    dropped += 1;
                    continue 'rows;
                };
                if idx == target_idx {
                    target_value = value;
                } else {
                    feature_row.push(value);
                }
            }
            features.push(feature_row);
            target.push(target_value);
        }

        if dropped > 0 {
            warn!(
                path = %origin.display(),
                dropped,
                kept = features.len(),
                "dropped rows with missing or non-numeric cells"
            );
        }
        if features.is_empty() {
            return Err(SchemaError::NoUsableRows {
                path: origin.to_path_buf(),
            });
        }
        Ok((features, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_plain_fields() {
        assert_eq!(csv_split("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn split_quoted_comma() {
        assert_eq!(
            csv_split(r#"one,"two, and a half",three"#),
            vec!["one", "two, and a half", "three"]
        );
    }

    #[test]
    fn split_escaped_quote() {
        assert_eq!(csv_split(r#""say ""hi""",x"#), vec![r#"say "hi""#, "x"]);
    }

    #[test]
    fn split_trailing_empty_field() {
        assert_eq!(csv_split("a,b,"), vec!["a", "b", ""]);
    }

    #[test]
    fn short_rows_are_padded_to_header_width() {
        let table = Table::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec!["1".into()]],
        );
        assert_eq!(table.rows()[0].len(), 3);
        assert!(Table::is_missing(&table.rows()[0][2]));
    }

    #[test]
    fn missing_cell_spellings() {
        assert!(Table::is_missing(""));
        assert!(Table::is_missing("   "));
        assert!(Table::is_missing("NA"));
        assert!(Table::is_missing("n/a"));
        assert!(Table::is_missing("NaN"));
        assert!(!Table::is_missing("0"));
        assert!(!Table::is_missing("NULL"));
    }

    #[test]
    fn normalize_nulls_is_idempotent() {
        let table = Table::new(
            vec!["a".into(), "b".into()],
            vec![
                vec!["1".into(), "".into()],
                vec!["na".into(), "2".into()],
            ],
        );
        let once = table.normalize_nulls();
        assert_eq!(once.rows()[0][1], NULL_MARKER);
        assert_eq!(once.rows()[1][0], NULL_MARKER);

        let twice = once.normalize_nulls();
        assert_eq!(once, twice);
    }

    #[test]
    fn numeric_extraction_drops_bad_rows() {
        let table = Table::new(
            vec!["x".into(), "y".into()],
            vec![
                vec!["1".into(), "10".into()],
                vec!["oops".into(), "20".into()],
                vec!["3".into(), "".into()],
                vec!["4".into(), "40".into()],
            ],
        );
        let (features, target) = table
            .to_features_target("y", Path::new("test.csv"))
            .unwrap();
        assert_eq!(features, vec![vec![1.0], vec![4.0]]);
        assert_eq!(target, vec![10.0, 40.0]);
    }

    #[test]
    fn unknown_target_column_errors() {
        let table = Table::new(vec!["x".into()], vec![vec!["1".into()]]);
        assert!(matches!(
            table.to_features_target("label", Path::new("test.csv")),
            Err(SchemaError::MissingColumn { .. })
        ));
    }
}
