//! CART regression tree
//!
//! Greedy variance-reduction splits on `feature <= threshold`, stored as a flat
//! node vector (root at index 0, children always at higher indices). Shared by
//! the random forest (bootstrap rows, all columns) and gradient boosting
//! (row subsample, per-tree column subsample).

use crate::error::{ModelError, ModelResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Minimum impurity decrease for a split to be kept
const MIN_GAIN: f64 = 1e-12;

/// Tree growth limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Columns considered at each node; `None` = every allowed column
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Total squared-error reduction per feature, unnormalized
    #[serde(default)]
    importances: Vec<f64>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Builder<'a, R> {
    x: &'a [R],
    y: &'a [f64],
    allowed: &'a [usize],
    params: &'a TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl<'a, R: AsRef<[f64]>> Builder<'a, R> {
    fn build(&mut self, idx: &mut [usize], depth: usize) -> usize {
        let n = idx.len();
        let (sum, sum_sq) = idx
            .iter()
            .fold((0.0, 0.0), |(s, q), &i| (s + self.y[i], q + self.y[i] * self.y[i]));
        let mean = sum / n as f64;
        let sse = sum_sq - sum * sum / n as f64;

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= self.params.max_depth
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf.max(1)
            || sse <= MIN_GAIN
        {
            return node_id;
        }

        let Some(split) = self.best_split(idx, sum) else {
            return node_id;
        };

        let x = self.x;
        let mid = partition(idx, |i| x[i].as_ref()[split.feature] <= split.threshold);
        if mid == 0 || mid == n {
            return node_id;
        }

        self.importances[split.feature] += split.gain;
        let (left_idx, right_idx) = idx.split_at_mut(mid);
        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        match self.params.max_features {
            Some(m) if m > 0 && m < self.allowed.len() => {
                self.allowed.choose_multiple(&mut *self.rng, m).copied().collect()
            }
            _ => self.allowed.to_vec(),
        }
    }

    fn best_split(&mut self, idx: &[usize], total: f64) -> Option<Split> {
        let n = idx.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent = total * total / n as f64;
        let mut best: Option<Split> = None;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in self.candidate_features() {
            column.clear();
            column.extend(idx.iter().map(|&i| (self.x[i].as_ref()[feature], self.y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += column[k].1;
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf {
                    continue;
                }
                if n_right < min_leaf {
                    break;
                }
                let (lo, hi) = (column[k].0, column[k + 1].0);
                if !(lo < hi) {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64 - parent;
                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if !(threshold < hi) {
                        threshold = lo;
                    }
                    best = Some(Split { feature, threshold, gain });
                }
            }
        }

        best
    }
}

/// In-place partition; returns the count of matching items
fn partition(idx: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for k in 0..idx.len() {
        if pred(idx[k]) {
            idx.swap(k, mid);
            mid += 1;
        }
    }
    mid
}

impl RegressionTree {
    /// Fit on the rows listed in `sample` (duplicates allowed), splitting only
    /// on columns in `allowed`
    pub fn fit<R: AsRef<[f64]>>(
        x: &[R],
        y: &[f64],
        sample: &[usize],
        allowed: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> ModelResult<Self> {
        if sample.is_empty() {
            return Err(ModelError::InsufficientData("tree fit on empty sample".to_string()));
        }
        let n_features = x.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if allowed.iter().any(|&f| f >= n_features) {
            return Err(ModelError::Config(format!(
                "tree feature index out of range (have {} features)",
                n_features
            )));
        }

        let mut builder = Builder {
            x,
            y,
            allowed,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        let mut idx = sample.to_vec();
        builder.build(&mut idx, 0);

        Ok(Self {
            nodes: builder.nodes,
            n_features,
            importances: builder.importances,
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    /// Structural check for deserialized trees: child indices point forward
    /// and in range, features are in range, values are finite
    pub fn validate(&self) -> ModelResult<()> {
        if self.nodes.is_empty() {
            return Err(ModelError::Artifact("tree has no nodes".to_string()));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(ModelError::Artifact(format!("leaf {} is not finite", id)));
                }
                Node::Leaf { .. } => {}
                Node::Split { feature, threshold, left, right } => {
                    let in_range = |c: usize| c > id && c < self.nodes.len();
                    if *feature >= self.n_features || !threshold.is_finite() || !in_range(*left) || !in_range(*right) {
                        return Err(ModelError::Artifact(format!("split node {} is malformed", id)));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn test_step_function_learned_exactly() {
        let x: Vec<[f64; 1]> = (0..20).map(|i| [i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 5.0 }).collect();
        let sample: Vec<usize> = (0..20).collect();
        let tree = RegressionTree::fit(&x, &y, &sample, &[0], &TreeParams::default(), &mut rng()).unwrap();

        assert_eq!(tree.predict(&[3.0]), 1.0);
        assert_eq!(tree.predict(&[15.0]), 5.0);
        assert_eq!(tree.predict(&[9.5]), 1.0);
        assert_eq!(tree.depth(), 1);
        assert!(tree.importances()[0] > 0.0);
    }

    #[test]
    fn test_depth_limit_respected() {
        let x: Vec<[f64; 2]> = (0..200).map(|i| [i as f64, (i * 7 % 13) as f64]).collect();
        let y: Vec<f64> = (0..200).map(|i| ((i * 31) % 17) as f64).collect();
        let sample: Vec<usize> = (0..200).collect();
        let params = TreeParams { max_depth: 3, ..Default::default() };
        let tree = RegressionTree::fit(&x, &y, &sample, &[0, 1], &params, &mut rng()).unwrap();
        assert!(tree.depth() <= 3);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: Vec<[f64; 1]> = (0..10).map(|i| [i as f64]).collect();
        let y = vec![42.0; 10];
        let sample: Vec<usize> = (0..10).collect();
        let tree = RegressionTree::fit(&x, &y, &sample, &[0], &TreeParams::default(), &mut rng()).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[100.0]), 42.0);
    }

    #[test]
    fn test_only_allowed_columns_are_split() {
        // Column 0 is informative, column 1 is noise; forbid column 0
        let x: Vec<[f64; 2]> = (0..40).map(|i| [i as f64, ((i * 13) % 7) as f64]).collect();
        let y: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let sample: Vec<usize> = (0..40).collect();
        let tree = RegressionTree::fit(&x, &y, &sample, &[1], &TreeParams::default(), &mut rng()).unwrap();
        assert_eq!(tree.importances()[0], 0.0);
    }

    #[test]
    fn test_min_samples_leaf_limits_splits() {
        let x: Vec<[f64; 1]> = (0..10).map(|i| [i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let sample: Vec<usize> = (0..10).collect();
        let params = TreeParams { min_samples_leaf: 5, ..Default::default() };
        let tree = RegressionTree::fit(&x, &y, &sample, &[0], &params, &mut rng()).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(&[0.0]), 2.0);
        assert_eq!(tree.predict(&[9.0]), 7.0);
    }

    #[test]
    fn test_empty_sample_is_error() {
        let x: Vec<[f64; 1]> = vec![[1.0]];
        let y = vec![1.0];
        assert!(RegressionTree::fit(&x, &y, &[], &[0], &TreeParams::default(), &mut rng()).is_err());
    }

    #[test]
    fn test_validate_rejects_backward_children() {
        let tree = RegressionTree {
            nodes: vec![Node::Split { feature: 0, threshold: 1.0, left: 0, right: 0 }],
            n_features: 1,
            importances: vec![0.0],
        };
        assert!(tree.validate().is_err());
    }
}
