//! Random forest fitting
//!
//! Bagged CART trees with Gini impurity. Each tree sees a bootstrap sample and
//! considers a random subset of features at every split. Leaves store the
//! class distribution of their samples, so the forest predicts by averaging
//! distributions ([`Aggregation::Average`]).

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::model::{Aggregation, DecisionTree, Node, TreeEnsemble};
use crate::utils::{CropAdvisorError, Result};

/// Forest hyperparameters
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features tried per split; `None` means `floor(sqrt(n_features))`
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

/// Weighted Gini impurity `n * gini` for a class histogram with `n` samples
fn weighted_gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
    n - sum_sq / n
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: usize,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &s in samples {
            counts[self.y[s]] += 1;
        }
        counts
    }

    fn leaf(counts: &[usize], n: usize) -> Node {
        Node::Leaf(counts.iter().map(|&c| c as f64 / n as f64).collect())
    }

    /// Best (feature, threshold) over a random feature subset. Keeps drawing
    /// features past `max_features` until a usable split turns up, so a node
    /// only becomes a leaf when every feature is constant on it.
    fn best_split(&self, samples: &[usize], rng: &mut ChaCha8Rng) -> Option<(usize, f64)> {
        let n_features = self.x[samples[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        let n = samples.len();
        let mut best: Option<(usize, f64, f64)> = None;
        let mut pairs: Vec<(f64, usize)> = Vec::with_capacity(n);

        for (tried, &feature) in features.iter().enumerate() {
            if tried >= self.max_features && best.is_some() {
                break;
            }

            pairs.clear();
            pairs.extend(samples.iter().map(|&s| (self.x[s][feature], self.y[s])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; self.n_classes];
            let mut right = vec![0usize; self.n_classes];
            for &(_, class) in &pairs {
                right[class] += 1;
            }

            for i in 0..n - 1 {
                let class = pairs[i].1;
                left[class] += 1;
                right[class] -= 1;

                let (here, next) = (pairs[i].0, pairs[i + 1].0);
                if here >= next {
                    continue;
                }

                let n_left = i + 1;
                let impurity =
                    weighted_gini(&left, n_left) + weighted_gini(&right, n - n_left);
                if best.map_or(true, |(_, _, b)| impurity < b) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some((feature, threshold, impurity));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    /// Grow the subtree for `samples`, returning its root node index
    fn build(&mut self, samples: &mut [usize], depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let idx = self.nodes.len();
        let n = samples.len();
        let counts = self.class_counts(samples);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.max_depth.map_or(false, |d| depth >= d);
        if pure || depth_reached || n < self.min_samples_split {
            self.nodes.push(Self::leaf(&counts, n));
            return idx;
        }

        let Some((feature, threshold)) = self.best_split(samples, rng) else {
            self.nodes.push(Self::leaf(&counts, n));
            return idx;
        };

        // Reserve the slot, fill it once both children exist
        self.nodes.push(Node::Leaf(Vec::new()));

        let mut mid = 0;
        for i in 0..n {
            if self.x[samples[i]][feature] <= threshold {
                samples.swap(i, mid);
                mid += 1;
            }
        }

        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let left = self.build(left_samples, depth + 1, rng);
        let right = self.build(right_samples, depth + 1, rng);

        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }
}

/// Fit a random forest on row-major features `x` and class indices `y`
pub fn fit_random_forest(
    x: &[Vec<f64>],
    y: &[usize],
    n_classes: usize,
    params: &ForestParams,
) -> Result<TreeEnsemble> {
    if x.is_empty() || x.len() != y.len() {
        return Err(CropAdvisorError::Training(format!(
            "need matching non-empty features and labels, got {} rows and {} labels",
            x.len(),
            y.len()
        )));
    }
    if params.n_trees == 0 {
        return Err(CropAdvisorError::Training("n_trees must be at least 1".into()));
    }
    let n_features = x[0].len();
    if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
        return Err(CropAdvisorError::Training("ragged or empty feature rows".into()));
    }
    if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
        return Err(CropAdvisorError::Training(format!(
            "label {} outside 0..{}",
            bad, n_classes
        )));
    }

    let max_features = params
        .max_features
        .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
        .clamp(1, n_features);

    let mut master = ChaCha8Rng::seed_from_u64(params.seed);
    let n = x.len();
    let mut trees = Vec::with_capacity(params.n_trees);

    for t in 0..params.n_trees {
        let mut rng = ChaCha8Rng::seed_from_u64(master.gen::<u64>());
        let mut samples: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            max_features,
            nodes: Vec::new(),
        };
        builder.build(&mut samples, 0, &mut rng);
        debug!("Tree {} grown with {} nodes", t + 1, builder.nodes.len());
        trees.push(DecisionTree {
            nodes: builder.nodes,
        });
    }

    Ok(TreeEnsemble {
        n_features,
        n_classes,
        aggregation: Aggregation::Average,
        base_score: None,
        trees,
    })
}
