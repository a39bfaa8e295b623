//! CART regression trees used as weak learners by the booster
//!
//! Splits minimize the summed squared error of the two children. Leaves
//! predict the mean target of the samples that reached them.

use crate::models::NUM_FEATURES;
use serde::{Deserialize, Serialize};

/// Minimum squared-error reduction for a split to be kept
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// A node in a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        /// Samples with `feature <= threshold`
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        value: f64,
        n_samples: usize,
    },
}

impl TreeNode {
    /// Leaves have depth 0
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit a tree on the rows selected by `indices`.
    ///
    /// The squared-error reduction of every split is added to
    /// `importances[feature]`.
    pub fn fit(
        x: &[[f64; NUM_FEATURES]],
        y: &[f64],
        indices: Vec<usize>,
        params: TreeParams,
        importances: &mut [f64; NUM_FEATURES],
    ) -> Self {
        let root = build_node(x, y, indices, 0, &params, importances);
        Self { root }
    }

    pub fn predict(&self, row: &[f64; NUM_FEATURES]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }
}

fn build_node(
    x: &[[f64; NUM_FEATURES]],
    y: &[f64],
    indices: Vec<usize>,
    depth: usize,
    params: &TreeParams,
    importances: &mut [f64; NUM_FEATURES],
) -> TreeNode {
    let n_samples = indices.len();
    let leaf = TreeNode::Leaf {
        value: mean(indices.iter().map(|&i| y[i])),
        n_samples,
    };

    if n_samples < params.min_samples_split
        || depth >= params.max_depth
        || n_samples < 2 * params.min_samples_leaf
    {
        return leaf;
    }

    let Some(split) = find_best_split(x, y, &indices, params.min_samples_leaf) else {
        return leaf;
    };

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| x[i][split.feature] <= split.threshold);

    importances[split.feature] += split.gain;

    TreeNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(build_node(x, y, left_indices, depth + 1, params, importances)),
        right: Box::new(build_node(x, y, right_indices, depth + 1, params, importances)),
    }
}

/// Exhaustive search over every feature and every boundary between
/// distinct sorted values, using prefix sums of `y` and `y^2`.
fn find_best_split(
    x: &[[f64; NUM_FEATURES]],
    y: &[f64],
    indices: &[usize],
    min_samples_leaf: usize,
) -> Option<SplitCandidate> {
    let n = indices.len();
    if n < 2 {
        return None;
    }
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = sse(total_sum, total_sq, n);

    let mut best: Option<SplitCandidate> = None;
    let mut sorted = indices.to_vec();

    for feature in 0..NUM_FEATURES {
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for pos in 0..n - 1 {
            let yi = y[sorted[pos]];
            left_sum += yi;
            left_sq += yi * yi;

            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let here = x[sorted[pos]][feature];
            let next = x[sorted[pos + 1]][feature];
            if here >= next {
                continue;
            }

            let children = sse(left_sum, left_sq, n_left)
                + sse(total_sum - left_sum, total_sq - left_sq, n_right);
            let gain = parent_sse - children;
            if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                let mid = here + (next - here) / 2.0;
                best = Some(SplitCandidate {
                    feature,
                    threshold: if mid < next { mid } else { here },
                    gain,
                });
            }
        }
    }

    best
}

fn sse(sum: f64, sum_sq: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (sum_sq - sum * sum / n as f64).max(0.0)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
