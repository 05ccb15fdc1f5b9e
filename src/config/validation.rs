//! Config document validation: unknown-key detection with Levenshtein
//! "did you mean?" suggestions.
//!
//! Two-pass parse approach: the raw document is first parsed into a
//! `toml::Value` and its key tree compared against the known layout, then
//! normal typed parsing proceeds. Warnings never break a loadable config.
//! Candidate identifiers are arbitrary, so only the fixed levels of the
//! layout are checked.

use std::fmt;

/// A non-fatal config warning (typo, misplaced key).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " — did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Keys per Level
// ============================================================================

/// Top-level sections of the model-selection document.
const ROOT_KEYS: &[&str] = &["search", "model_selection"];

/// Keys allowed inside `[search]`.
const SEARCH_KEYS: &[&str] = &["module", "class", "params"];

/// Keys allowed inside `[search.params]`.
const SEARCH_PARAM_KEYS: &[&str] = &["folds", "n_iter", "seed"];

/// Keys allowed inside each `[model_selection.<id>]` candidate table.
/// The contents of `params` and `search_param_grid` are model-specific
/// hyperparameter names and are validated later against each estimator's
/// allow-list, not here.
const CANDIDATE_KEYS: &[&str] = &["module", "class", "params", "search_param_grid"];

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &[&str]) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((k, dist)),
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

fn check_level(
    table: &toml::Table,
    prefix: &str,
    known: &[&str],
    warnings: &mut Vec<ValidationWarning>,
) {
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            warnings.push(ValidationWarning {
                field: path.clone(),
                message: format!("Unknown config key '{path}'"),
                suggestion: suggest_correction(key, known),
            });
        }
    }
}

/// Parse a raw TOML string and return warnings for any unknown keys at the
/// fixed levels of the model-selection document layout.
///
/// Unknown keys warn but never fail the load. Parse errors are left for
/// the typed loader to report.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let Some(root) = value.as_table() else {
        return Vec::new();
    };

    let mut warnings = Vec::new();
    check_level(root, "", ROOT_KEYS, &mut warnings);

    if let Some(search) = root.get("search").and_then(toml::Value::as_table) {
        check_level(search, "search", SEARCH_KEYS, &mut warnings);
        if let Some(params) = search.get("params").and_then(toml::Value::as_table) {
            check_level(params, "search.params", SEARCH_PARAM_KEYS, &mut warnings);
        }
    }

    if let Some(ms) = root.get("model_selection").and_then(toml::Value::as_table) {
        for (id, candidate) in ms {
            if let Some(tbl) = candidate.as_table() {
                check_level(
                    tbl,
                    &format!("model_selection.{id}"),
                    CANDIDATE_KEYS,
                    &mut warnings,
                );
            }
        }
    }

    warnings
}
