//! Seeded random-forest classifier.
//!
//! Bootstrapped CART trees grown to purity on Gini impurity, with a random
//! subset of `⌊√d⌋` candidate features per node. Feature importances are the
//! mean decrease in impurity, normalized per tree and across the forest.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForestError {
    #[error("no training samples")]
    Empty,
    #[error("{samples} samples but {labels} labels")]
    LengthMismatch { samples: usize, labels: usize },
    #[error("sample {row} has {found} features, expected {expected}")]
    Ragged {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("sample {row}, feature {feature} is not a finite number")]
    NonFinite { row: usize, feature: usize },
    #[error("forest needs at least one tree")]
    NoTrees,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub seed: u64,
    /// Nodes with fewer samples become leaves.
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            min_samples_split: 2,
            max_depth: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Forest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForest {
    /// Fit on row-major `samples` with class labels `0..n_classes`.
    pub fn fit(
        samples: &[Vec<f64>],
        labels: &[usize],
        config: &ForestConfig,
    ) -> Result<Self, ForestError> {
        if samples.is_empty() {
            return Err(ForestError::Empty);
        }
        if samples.len() != labels.len() {
            return Err(ForestError::LengthMismatch {
                samples: samples.len(),
                labels: labels.len(),
            });
        }
        if config.n_estimators == 0 {
            return Err(ForestError::NoTrees);
        }
        let n_features = samples[0].len();
        for (row, sample) in samples.iter().enumerate() {
            if sample.len() != n_features {
                return Err(ForestError::Ragged {
                    row,
                    found: sample.len(),
                    expected: n_features,
                });
            }
            if let Some(feature) = sample.iter().position(|v| !v.is_finite()) {
                return Err(ForestError::NonFinite { row, feature });
            }
        }

        let n_classes = labels.iter().copied().max().unwrap_or(0) + 1;
        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let n = samples.len();

        let mut master = Pcg64::seed_from_u64(config.seed);
        let trees = (0..config.n_estimators)
            .map(|_| {
                let mut rng = Pcg64::seed_from_u64(master.random());
                let mut bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                let mut builder = TreeBuilder {
                    samples,
                    labels,
                    n_classes,
                    max_features,
                    config,
                    rng,
                    nodes: Vec::new(),
                    importances: vec![0.0; n_features],
                };
                builder.grow(&mut bootstrap, 0);
                builder.finish()
            })
            .collect();

        Ok(Self {
            trees,
            n_features,
            n_classes,
        })
    }

    /// Mean decrease in impurity per feature, summing to 1 unless no tree
    /// ever split (e.g. a single-class label set), in which case all zeros.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, imp) in total.iter_mut().zip(&tree.importances) {
                *acc += imp;
            }
        }
        normalize(&mut total);
        total
    }

    /// Class probabilities averaged over the trees.
    pub fn predict_proba(&self, sample: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf_proba(sample)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    pub fn predict(&self, sample: &[f64]) -> usize {
        self.predict_proba(sample)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(class, _)| class)
    }
}

fn normalize(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

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
struct Tree {
    nodes: Vec<Node>,
    /// Normalized impurity decrease per feature.
    importances: Vec<f64>,
}

impl Tree {
    fn leaf_proba(&self, sample: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    /// Weighted child impurity; lower is better.
    child_impurity: f64,
}

struct TreeBuilder<'a> {
    samples: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    max_features: usize,
    config: &'a ForestConfig,
    rng: Pcg64,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl TreeBuilder<'_> {
    fn finish(mut self) -> Tree {
        normalize(&mut self.importances);
        Tree {
            nodes: self.nodes,
            importances: self.importances,
        }
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    /// Grow the subtree over `indices` and return its root node index.
    fn grow(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let n = indices.len();
        let counts = self.class_counts(indices);
        let impurity = gini(&counts, n);

        let at_limit = n < self.config.min_samples_split
            || impurity <= f64::EPSILON
            || self.config.max_depth.is_some_and(|d| depth >= d);

        let split = if at_limit {
            None
        } else {
            self.best_split(indices, &counts, impurity)
        };

        let Some(split) = split else {
            let proba = counts.iter().map(|&c| c as f64 / n as f64).collect();
            self.nodes.push(Node::Leaf { proba });
            return self.nodes.len() - 1;
        };

        let decrease = n as f64 * (impurity - split.child_impurity);
        self.importances[split.feature] += decrease;

        let (mut left, mut right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.samples[i][split.feature] <= split.threshold);

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { proba: Vec::new() });
        let left_idx = self.grow(&mut left, depth + 1);
        let right_idx = self.grow(&mut right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_idx,
            right: right_idx,
        };
        idx
    }

    /// Examine features in random order until `max_features` non-constant
    /// ones have been scanned and at least one valid split exists.
    fn best_split(&mut self, indices: &mut [usize], counts: &[usize], impurity: f64) -> Option<Split> {
        let n = indices.len();
        let mut features: Vec<usize> = (0..self.importances.len()).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<Split> = None;
        let mut visited = 0;
        for feature in features {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let samples = self.samples;
            indices.sort_by(|&a, &b| samples[a][feature].total_cmp(&samples[b][feature]));
            let first = samples[indices[0]][feature];
            let last = samples[indices[n - 1]][feature];
            if first == last {
                continue;
            }
            visited += 1;

            let mut left = vec![0usize; self.n_classes];
            for k in 1..n {
                left[self.labels[indices[k - 1]]] += 1;
                let lo = samples[indices[k - 1]][feature];
                let hi = samples[indices[k]][feature];
                if lo == hi {
                    continue;
                }
                let right: Vec<usize> = counts.iter().zip(&left).map(|(c, l)| c - l).collect();
                let (nl, nr) = (k, n - k);
                let child_impurity =
                    (nl as f64 * gini(&left, nl) + nr as f64 * gini(&right, nr)) / n as f64;

                if best.as_ref().map_or(true, |b| child_impurity < b.child_impurity) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        child_impurity,
                    });
                }
            }
        }

        best.filter(|b| b.child_impurity <= impurity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feature 0 decides the label; feature 1 is noise.
    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let signal = (i % 2) as f64;
            let noise = ((i * 7919) % 13) as f64;
            x.push(vec![signal, noise]);
            y.push(i % 2);
        }
        (x, y)
    }

    #[test]
    fn informative_feature_dominates() {
        let (x, y) = separable();
        let forest = RandomForest::fit(&x, &y, &ForestConfig::default()).unwrap();
        let imp = forest.feature_importances();
        assert_eq!(imp.len(), 2);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1], "importances = {imp:?}");
    }

    #[test]
    fn predicts_training_pattern() {
        let (x, y) = separable();
        let forest = RandomForest::fit(&x, &y, &ForestConfig::default()).unwrap();
        assert_eq!(forest.predict(&[1.0, 3.0]), 1);
        assert_eq!(forest.predict(&[0.0, 3.0]), 0);
        let proba = forest.predict_proba(&[1.0, 3.0]);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = separable();
        let config = ForestConfig {
            n_estimators: 10,
            ..ForestConfig::default()
        };
        let a = RandomForest::fit(&x, &y, &config).unwrap().feature_importances();
        let b = RandomForest::fit(&x, &y, &config).unwrap().feature_importances();
        assert_eq!(a, b);
    }

    #[test]
    fn single_class_has_zero_importance() {
        let x = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let y = vec![1, 1, 1];
        let forest = RandomForest::fit(&x, &y, &ForestConfig::default()).unwrap();
        assert_eq!(forest.feature_importances(), vec![0.0, 0.0]);
        assert_eq!(forest.predict(&[0.0, 0.0]), 1);
    }

    #[test]
    fn max_depth_limits_growth() {
        let (x, y) = separable();
        let config = ForestConfig {
            n_estimators: 1,
            max_depth: Some(0),
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(&x, &y, &config).unwrap();
        assert!(forest.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rejects_bad_input() {
        let config = ForestConfig::default();
        assert_eq!(RandomForest::fit(&[], &[], &config).unwrap_err(), ForestError::Empty);
        assert!(matches!(
            RandomForest::fit(&[vec![1.0]], &[0, 1], &config),
            Err(ForestError::LengthMismatch { .. })
        ));
        assert!(matches!(
            RandomForest::fit(&[vec![1.0], vec![1.0, 2.0]], &[0, 1], &config),
            Err(ForestError::Ragged { row: 1, .. })
        ));
        assert!(matches!(
            RandomForest::fit(&[vec![f64::NAN]], &[0], &config),
            Err(ForestError::NonFinite { row: 0, feature: 0 })
        ));
    }
}
