//! Decision-tree regression with variance-reduction splits.
//!
//! Splits minimize total sum of squared errors, evaluated with prefix sums
//! over the per-feature sorted order. Thresholds sit at midpoints between
//! distinct consecutive values.

use super::{check_training_shapes, usize_param, Estimator, ModelError};
use crate::config::ParamValue;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    max_depth: usize,
    min_samples_split: usize,
    root: Option<Node>,
    n_features: usize,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self {
            max_depth: 5,
            min_samples_split: 2,
            root: None,
            n_features: 0,
        }
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth of the fitted tree (a lone leaf has depth 0). `None` before `fit`.
    pub fn depth(&self) -> Option<usize> {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map(walk)
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse: f64,
}

fn mean_of(indices: &[usize], target: &[f64]) -> f64 {
    indices.iter().map(|&i| target[i]).sum::<f64>() / indices.len() as f64
}

/// Scan every feature for the split with the lowest total SSE.
fn find_best_split(
    indices: &[usize],
    features: &[Vec<f64>],
    target: &[f64],
) -> Option<BestSplit> {
    let n = indices.len();
    let width = features[indices[0]].len();
    let mut best: Option<BestSplit> = None;

    for feature in 0..width {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            features[a][feature]
                .partial_cmp(&features[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total_sum: f64 = order.iter().map(|&i| target[i]).sum();
        let total_sq: f64 = order.iter().map(|&i| target[i] * target[i]).sum();

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for split_at in 1..n {
            let y = target[order[split_at - 1]];
            left_sum += y;
            left_sq += y * y;

            let lo = features[order[split_at - 1]][feature];
            let hi = features[order[split_at]][feature];
            if lo >= hi {
                continue; // no boundary between equal values
            }

            let left_n = split_at as f64;
            let right_n = (n - split_at) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if best.as_ref().map_or(true, |b| sse < b.sse) {
                best = Some(BestSplit {
                    feature,
                    threshold: (lo + hi) / 2.0,
                    sse,
                });
            }
        }
    }
    best
}

fn build(
    indices: Vec<usize>,
    features: &[Vec<f64>],
    target: &[f64],
    depth: usize,
    max_depth: usize,
    min_samples_split: usize,
) -> Node {
    let leaf = Node::Leaf {
        value: mean_of(&indices, target),
    };
    if depth >= max_depth || indices.len() < min_samples_split {
        return leaf;
    }
    let Some(split) = find_best_split(&indices, features, target) else {
        return leaf; // all feature values identical
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| features[i][split.feature] <= split.threshold);
    if left_idx.is_empty() || right_idx.is_empty() {
        return leaf;
    }

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(build(
            left_idx,
            features,
            target,
            depth + 1,
            max_depth,
            min_samples_split,
        )),
        right: Box::new(build(
            right_idx,
            features,
            target,
            depth + 1,
            max_depth,
            min_samples_split,
        )),
    }
}

impl Estimator for DecisionTreeRegressor {
    fn name(&self) -> &'static str {
        "DecisionTreeRegressor"
    }

    fn settable_params(&self) -> &'static [&'static str] {
        &["max_depth", "min_samples_split"]
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "max_depth" => self.max_depth = usize_param(name, value, 1)?,
            "min_samples_split" => self.min_samples_split = usize_param(name, value, 2)?,
            _ => {
                return Err(ModelError::UnknownParam {
                    model: self.name(),
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn fit(&mut self, features: &[Vec<f64>], target: &[f64]) -> Result<(), ModelError> {
        let width = check_training_shapes(features, target)?;
        let indices: Vec<usize> = (0..features.len()).collect();
        self.root = Some(build(
            indices,
            features,
            target,
            0,
            self.max_depth,
            self.min_samples_split,
        ));
        self.n_features = width;
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let root = self.root.as_ref().ok_or(ModelError::NotFitted)?;
        features
            .iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(ModelError::ShapeMismatch(format!(
                        "expected {} features, got {}",
                        self.n_features,
                        row.len()
                    )));
                }
                let mut node = root;
                loop {
                    match node {
                        Node::Leaf { value } => return Ok(*value),
                        Node::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            node = if row[*feature] <= *threshold { left } else { right };
                        }
                    }
                }
            })
            .collect()
    }

    fn fresh(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            root: None,
            n_features: 0,
        })
    }
}
