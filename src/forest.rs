//! Random forest classifier: bootstrapped CART trees split on Gini impurity.
//!
//! Trees are stored as flat node arrays. Leaves keep the class distribution
//! of their training samples and the forest predicts the class with the
//! highest mean probability over all trees (ties go to the lower class).

use color_eyre::eyre::eyre;
use color_eyre::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Number of features considered when looking for the best split at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MaxFeatures {
    #[default]
    Sqrt,
    Log2,
    All,
}

impl MaxFeatures {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqrt" => Ok(Self::Sqrt),
            "log2" => Ok(Self::Log2),
            "all" | "none" => Ok(Self::All),
            other => Err(eyre!(
                "Invalid max_features: {}. Must be 'sqrt', 'log2' or 'all'",
                other
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Log2 => "log2",
            Self::All => "all",
        }
    }

    pub fn count(self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            Self::Sqrt => n.sqrt().floor() as usize,
            Self::Log2 => n.log2().floor() as usize,
            Self::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        proba: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    params: &'a ForestParams,
    rng: StdRng,
    nodes: Vec<Node>,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / t;
            p * p
        })
        .sum::<f64>()
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeBuilder<'_> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn leaf(&mut self, counts: &[usize], total: usize) -> usize {
        let proba = counts
            .iter()
            .map(|&c| c as f64 / total.max(1) as f64)
            .collect();
        self.nodes.push(Node::Leaf { proba });
        self.nodes.len() - 1
    }

    /// Best threshold on one feature, or None when every value is equal
    /// or no cut leaves `min_samples_leaf` rows on both sides.
    fn best_threshold(&self, feature: usize, indices: &[usize]) -> Option<(f64, f64)> {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

        let total = order.len();
        if total < 2 {
            return None;
        }
        let min_leaf = self.params.min_samples_leaf;
        let mut left = vec![0usize; self.n_classes];
        let mut right = self.class_counts(&order);
        let mut best: Option<(f64, f64)> = None;

        for pos in 0..total - 1 {
            let row = order[pos];
            left[self.y[row]] += 1;
            right[self.y[row]] -= 1;

            let n_left = pos + 1;
            let n_right = total - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let a = self.x[row][feature];
            let b = self.x[order[pos + 1]][feature];
            if a >= b {
                continue;
            }

            let impurity = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / total as f64;
            if best.map_or(true, |(_, i)| impurity < i) {
                let mut threshold = a / 2.0 + b / 2.0;
                if threshold >= b || !threshold.is_finite() {
                    threshold = a;
                }
                best = Some((threshold, impurity));
            }
        }

        best
    }

    fn find_split(&mut self, indices: &[usize]) -> Option<BestSplit> {
        let n_features = self.x[0].len();
        let k = self.params.max_features.count(n_features);
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<BestSplit> = None;
        for (visited, &feature) in features.iter().enumerate() {
            // Keep drawing features past `k` until one gives a valid cut.
            if visited >= k && best.is_some() {
                break;
            }
            if let Some((threshold, impurity)) = self.best_threshold(feature, indices) {
                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }

    fn build(&mut self, indices: &[usize], depth: usize) -> usize {
        let counts = self.class_counts(indices);
        let total = indices.len();
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);

        if pure || depth_reached || total < self.params.min_samples_split {
            return self.leaf(&counts, total);
        }

        let Some(split) = self.find_split(indices) else {
            return self.leaf(&counts, total);
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        // Reserve the slot so children come after their parent.
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { proba: Vec::new() });
        let left = self.build(&left_idx, depth + 1);
        let right = self.build(&right_idx, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

impl DecisionTree {
    fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        indices: &[usize],
        params: &ForestParams,
        seed: u64,
    ) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            params,
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
        };
        builder.build(indices, 0);
        Self {
            nodes: builder.nodes,
        }
    }

    fn predict_proba(&self, row: &[f64]) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
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

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
    n_features: usize,
}

impl RandomForest {
    /// Fit on rows `x` with class labels `y` in `0..n_classes`.
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, params: &ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(eyre!("Cannot train on an empty dataset"));
        }
        if x.len() != y.len() {
            return Err(eyre!(
                "Feature rows ({}) and labels ({}) differ in length",
                x.len(),
                y.len()
            ));
        }
        let n_features = x[0].len();
        if n_features == 0 {
            return Err(eyre!("Cannot train without feature columns"));
        }
        if x.iter().any(|row| row.len() != n_features) {
            return Err(eyre!("All feature rows must have {} values", n_features));
        }
        if let Some(bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(eyre!("Label {} is outside 0..{}", bad, n_classes));
        }
        if params.n_trees == 0 {
            return Err(eyre!("n_trees must be greater than 0"));
        }

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_trees)
            .map(|_| {
                let indices: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.random_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let tree_seed: u64 = rng.random();
                DecisionTree::fit(x, y, n_classes, &indices, params, tree_seed)
            })
            .collect();

        Ok(Self {
            trees,
            n_classes,
            n_features,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean class probabilities over all trees.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.predict_proba(row)) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }

    pub fn predict(&self, row: &[f64]) -> usize {
        let proba = self.predict_proba(row);
        let mut best = 0;
        for (class, &p) in proba.iter().enumerate() {
            if p > proba[best] {
                best = class;
            }
        }
        best
    }

    /// Fraction of rows whose prediction equals the label.
    pub fn score(&self, x: &[Vec<f64>], y: &[usize]) -> Result<f64> {
        if x.is_empty() || x.len() != y.len() {
            return Err(eyre!("score needs as many labels as rows, and at least one row"));
        }
        if x.iter().any(|row| row.len() != self.n_features) {
            return Err(eyre!("All rows must have {} values", self.n_features));
        }
        let correct = x
            .iter()
            .zip(y)
            .filter(|(row, label)| self.predict(row) == **label)
            .count();
        Ok(correct as f64 / x.len() as f64)
    }
}
