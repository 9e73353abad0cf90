//! Bagged CART regression forest.
//!
//! Each tree is grown on a bootstrap resample of the training rows and splits on
//! the (feature, threshold) pair with the largest reduction in squared error.
//! Every feature is considered at every split, so bootstrapping is the only
//! source of randomness.
//!
//! Tree `i` draws from its own RNG seeded with `seed + i`, which keeps the forest
//! identical regardless of how rayon schedules the trees.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{ForestParams, ModelFamily};
use crate::error::PipelineError;
use crate::models::Regressor;

/// Minimum SSE improvement for a split to be accepted.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A regression tree stored as a node arena; the root is node 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        params: &ForestParams,
        seed: u64,
    ) -> Result<Self, PipelineError> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return Err(PipelineError::training(
                ModelFamily::Ensemble,
                format!("{n} feature rows for {} targets", y.len()),
            ));
        }
        if params.n_trees == 0 {
            return Err(PipelineError::training(ModelFamily::Ensemble, "n_trees must be >= 1"));
        }

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::grow(x, y, &mut sample, params)
            })
            .collect();

        Ok(Self { trees })
    }
}

impl Regressor for RandomForest {
    fn family(&self) -> ModelFamily {
        ModelFamily::Ensemble
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Number of (sorted) samples going left.
    n_left: usize,
    gain: f64,
}

impl RegressionTree {
    /// Grow a tree over the rows listed in `sample` (duplicates allowed).
    pub fn grow(x: &[Vec<f64>], y: &[f64], sample: &mut [usize], params: &ForestParams) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        tree.grow_node(x, y, sample, 0, params);
        tree
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn grow_node(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        sample: &mut [usize],
        depth: usize,
        params: &ForestParams,
    ) -> usize {
        let id = self.nodes.len();
        let value = sample.iter().map(|&i| y[i]).sum::<f64>() / sample.len() as f64;
        self.nodes.push(TreeNode::Leaf { value });

        let depth_exhausted = params.max_depth.is_some_and(|d| depth >= d);
        if depth_exhausted || sample.len() < params.min_samples_split {
            return id;
        }

        let Some(split) = best_split(x, y, sample, params.min_samples_leaf) else {
            return id;
        };

        // Reorder the sample so the left child is a prefix.
        sample.sort_by(|&a, &b| x[a][split.feature].total_cmp(&x[b][split.feature]));
        let (left_rows, right_rows) = sample.split_at_mut(split.n_left);

        let left = self.grow_node(x, y, left_rows, depth + 1, params);
        let right = self.grow_node(x, y, right_rows, depth + 1, params);
        self.nodes[id] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

/// Exhaustive best split by SSE reduction.
///
/// Ties keep the first candidate found (lowest feature index, then lowest threshold).
fn best_split(x: &[Vec<f64>], y: &[f64], sample: &[usize], min_leaf: usize) -> Option<SplitCandidate> {
    let n = sample.len();
    let n_features = x[sample[0]].len();

    let total_sum: f64 = sample.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = sample.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;
    if parent_sse <= MIN_GAIN {
        return None;
    }

    let mut best: Option<SplitCandidate> = None;
    let mut order = sample.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..n - 1 {
            let yi = y[order[k]];
            left_sum += yi;
            left_sq += yi * yi;

            let n_left = k + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let v_here = x[order[k]][feature];
            let v_next = x[order[k + 1]][feature];
            if v_here == v_next {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            let gain = parent_sse - sse;

            if gain > MIN_GAIN && best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: 0.5 * (v_here + v_next),
                    n_left,
                    gain,
                });
            }
        }
    }

    best
}
