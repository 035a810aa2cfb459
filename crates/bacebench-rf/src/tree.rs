use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{LeafValue, Node, NodeIndex, TreeTask},
    split::{SplitCriterion, Targets, find_best_split},
};

/// Impurity below this is treated as pure.
const PURITY_EPS: f64 = 1e-12;

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini` (classification fits) |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
///
/// Regression fits always split on variance; the `criterion` field only
/// selects between Gini and entropy for classification.
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the classification split criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth (`None` = grow until pure).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the maximum number of features to consider at each split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a classification tree on zero-based class labels.
    ///
    /// `features[sample_idx][feature_idx]` — row-major layout.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | `features` is empty |
    /// | [`RfError::ZeroFeatures`] | rows have zero feature columns |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`RfError::TargetCountMismatch`] | `labels.len() != features.len()` |
    /// | [`RfError::NonFiniteValue`] | any feature is NaN or infinite |
    /// | [`RfError::CriterionTaskMismatch`] | criterion is `Variance` |
    /// | [`RfError::InvalidMaxFeatures`] | resolved max_features out of range |
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2 |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1 |
    #[instrument(skip(self, features, labels), fields(n_samples = features.len()))]
    pub fn fit_classifier(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<DecisionTree, RfError> {
        if !self.criterion.is_classification() {
            return Err(RfError::CriterionTaskMismatch {
                criterion: self.criterion.name(),
                task: "classification",
            });
        }
        self.validate(features, labels.len())?;
        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        let targets = Targets::Classes { labels, n_classes };
        self.fit_impl(
            features,
            &targets,
            TreeTask::Classification { n_classes },
            self.criterion,
        )
    }

    /// Train a regression tree on continuous targets.
    ///
    /// Splits on variance reduction regardless of the configured
    /// classification criterion.
    ///
    /// # Errors
    ///
    /// As [`fit_classifier`](Self::fit_classifier), plus
    /// [`RfError::NonFiniteTarget`] for NaN/infinite targets; never
    /// returns `CriterionTaskMismatch`.
    #[instrument(skip(self, features, values), fields(n_samples = features.len()))]
    pub fn fit_regressor(
        &self,
        features: &[Vec<f64>],
        values: &[f64],
    ) -> Result<DecisionTree, RfError> {
        self.validate(features, values.len())?;
        if let Some(sample_index) = values.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteTarget { sample_index });
        }
        let targets = Targets::Values { values };
        self.fit_impl(features, &targets, TreeTask::Regression, SplitCriterion::Variance)
    }

    /// Shared validation of features, target length, and config.
    fn validate(&self, features: &[Vec<f64>], n_targets: usize) -> Result<(), RfError> {
        if features.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        let n_features = features[0].len();
        if n_features == 0 {
            return Err(RfError::ZeroFeatures);
        }
        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(RfError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            for (feature_index, &val) in row.iter().enumerate() {
                if !val.is_finite() {
                    return Err(RfError::NonFiniteValue {
                        sample_index,
                        feature_index,
                    });
                }
            }
        }
        if n_targets != features.len() {
            return Err(RfError::TargetCountMismatch {
                expected: features.len(),
                got: n_targets,
            });
        }

        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(())
    }

    fn fit_impl(
        &self,
        features: &[Vec<f64>],
        targets: &Targets<'_>,
        task: TreeTask,
        criterion: SplitCriterion,
    ) -> Result<DecisionTree, RfError> {
        let n_samples = features.len();
        let n_features = features[0].len();
        let max_features = self.max_features.unwrap_or(n_features);

        debug!(n_samples, n_features, task = task.name(), "fitting decision tree");

        // Column-major layout for the split scanner.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let sample_indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut arena: Vec<Node> = Vec::new();

        build_tree(
            &col_features,
            targets,
            &sample_indices,
            criterion,
            self,
            0,
            &mut rng,
            &mut arena,
            max_features,
        );

        debug!(n_nodes = arena.len(), "decision tree built");

        Ok(DecisionTree {
            nodes: arena,
            n_features,
            task,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute what a leaf spanning `sample_indices` predicts.
fn leaf_value(targets: &Targets<'_>, sample_indices: &[usize]) -> LeafValue {
    match targets {
        Targets::Classes { labels, n_classes } => {
            let mut counts = vec![0usize; *n_classes];
            for &si in sample_indices {
                counts[labels[si]] += 1;
            }
            let total = sample_indices.len() as f64;
            let distribution: Vec<f64> = counts.iter().map(|&c| c as f64 / total).collect();
            let prediction = counts
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.cmp(b.1))
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            LeafValue::Class {
                prediction,
                distribution,
            }
        }
        Targets::Values { values } => {
            let sum: f64 = sample_indices.iter().map(|&si| values[si]).sum();
            LeafValue::Value {
                mean: sum / sample_indices.len() as f64,
            }
        }
    }
}

/// Recursively build the arena-based decision tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
#[allow(clippy::too_many_arguments)]
fn build_tree(
    col_features: &[Vec<f64>],
    targets: &Targets<'_>,
    sample_indices: &[usize],
    criterion: SplitCriterion,
    config: &DecisionTreeConfig,
    depth: usize,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<Node>,
    max_features: usize,
) -> NodeIndex {
    let n_samples = sample_indices.len();
    let impurity = targets.node_impurity(criterion, sample_indices);

    let make_leaf = |arena: &mut Vec<Node>| -> NodeIndex {
        let idx = arena.len();
        arena.push(Node::Leaf {
            value: leaf_value(targets, sample_indices),
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    };

    // Stopping conditions → leaf.
    let depth_exceeded = config.max_depth.is_some_and(|max_d| depth >= max_d);
    let too_few = n_samples < config.min_samples_split;
    let pure = impurity.value() < PURITY_EPS;

    if too_few || pure || depth_exceeded {
        return make_leaf(arena);
    }

    let split = match find_best_split(
        col_features,
        targets,
        sample_indices,
        criterion,
        max_features,
        config.min_samples_leaf,
        rng,
    ) {
        Some(s) => s,
        None => return make_leaf(arena),
    };

    // Arena pattern: reserve index, recurse, then overwrite with the split.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        value: leaf_value(targets, sample_indices),
        impurity,
        n_samples,
    });

    let left_idx = build_tree(
        col_features,
        targets,
        &split.left_indices,
        criterion,
        config,
        depth + 1,
        rng,
        arena,
        max_features,
    );
    let right_idx = build_tree(
        col_features,
        targets,
        &split.right_indices,
        criterion,
        config,
        depth + 1,
        rng,
        arena,
        max_features,
    );

    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: left_idx,
        right: right_idx,
        impurity,
        n_samples,
    };

    NodeIndex::new(node_idx)
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references for
/// cache-friendly traversal and trivial serialization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) task: TreeTask,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionFeatureMismatch`] | wrong feature count |
    /// | [`RfError::TaskMismatch`] | tree was trained for regression |
    pub fn predict_class(&self, sample: &[f64]) -> Result<usize, RfError> {
        match self.leaf_for(sample)? {
            LeafValue::Class { prediction, .. } => Ok(*prediction),
            LeafValue::Value { .. } => Err(self.task_mismatch("classification")),
        }
    }

    /// Return the class probability distribution for a single sample.
    ///
    /// # Errors
    ///
    /// As [`predict_class`](Self::predict_class).
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, RfError> {
        match self.leaf_for(sample)? {
            LeafValue::Class { distribution, .. } => Ok(distribution.clone()),
            LeafValue::Value { .. } => Err(self.task_mismatch("classification")),
        }
    }

    /// Predict the continuous target for a single sample.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionFeatureMismatch`] | wrong feature count |
    /// | [`RfError::TaskMismatch`] | tree was trained for classification |
    pub fn predict_value(&self, sample: &[f64]) -> Result<f64, RfError> {
        match self.leaf_for(sample)? {
            LeafValue::Value { mean } => Ok(*mean),
            LeafValue::Class { .. } => Err(self.task_mismatch("regression")),
        }
    }

    /// Return the task this tree was trained for.
    #[must_use]
    pub fn task(&self) -> TreeTask {
        self.task
    }

    /// Return the total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree (a lone root leaf has depth 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));
        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    fn task_mismatch(&self, requested: &'static str) -> RfError {
        RfError::TaskMismatch {
            trained: self.task.name(),
            requested,
        }
    }

    /// Traverse from the root and return the leaf's value.
    fn leaf_for(&self, sample: &[f64]) -> Result<&LeafValue, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return Ok(value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}
