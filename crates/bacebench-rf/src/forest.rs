//! Random forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::RfError;
use crate::node::TreeTask;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted random forest ensemble — classification or regression,
/// depending on how it was trained.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) task: TreeTask,
    pub(crate) feature_names: Vec<String>,
}

/// Training targets for a forest fit.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ForestTargets<'a> {
    Classes(&'a [usize]),
    Values(&'a [f64]),
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Generate a bootstrap sample.
fn bootstrap_sample(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the random forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    targets: ForestTargets<'_>,
    feature_names: &[String],
) -> Result<RandomForest, RfError> {
    // --- Validate inputs ---
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    let n_samples = features.len();
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
    let n_targets = match targets {
        ForestTargets::Classes(labels) => labels.len(),
        ForestTargets::Values(values) => values.len(),
    };
    if n_targets != n_samples {
        return Err(RfError::TargetCountMismatch {
            expected: n_samples,
            got: n_targets,
        });
    }
    let task = match targets {
        ForestTargets::Classes(labels) => {
            if !config.criterion.is_classification() {
                return Err(RfError::CriterionTaskMismatch {
                    criterion: config.criterion.name(),
                    task: "classification",
                });
            }
            let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
            TreeTask::Classification { n_classes }
        }
        ForestTargets::Values(values) => {
            if let Some(sample_index) = values.iter().position(|v| !v.is_finite()) {
                return Err(RfError::NonFiniteTarget { sample_index });
            }
            TreeTask::Regression
        }
    };

    // --- Validate config ---
    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;
    if config.bootstrap_fraction <= 0.0 || config.bootstrap_fraction > 1.0 {
        return Err(RfError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }

    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        task = task.name(),
        max_features = max_features_resolved,
        draw_count,
        "training random forest"
    );

    // Per-tree seeds from a master RNG keep the whole fit reproducible.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    // Capture config fields needed in the closure.
    let criterion = config.criterion;
    let max_depth = config.max_depth;
    let min_samples_split = config.min_samples_split;
    let min_samples_leaf = config.min_samples_leaf;

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let bootstrap_indices = bootstrap_sample(n_samples, draw_count, &mut rng);

            let boot_features: Vec<Vec<f64>> = bootstrap_indices
                .iter()
                .map(|&i| features[i].clone())
                .collect();

            let tree_config = DecisionTreeConfig::new()
                .with_criterion(criterion)
                .with_max_depth(max_depth)
                .with_min_samples_split(min_samples_split)
                .with_min_samples_leaf(min_samples_leaf)
                .with_max_features(Some(max_features_resolved))
                .with_seed(rng.r#gen());

            // All inputs are pre-validated — fit cannot fail on data errors.
            match targets {
                ForestTargets::Classes(labels) => {
                    let boot_labels: Vec<usize> =
                        bootstrap_indices.iter().map(|&i| labels[i]).collect();
                    tree_config
                        .fit_classifier(&boot_features, &boot_labels)
                        .expect("tree fit should not fail on pre-validated data")
                }
                ForestTargets::Values(values) => {
                    let boot_values: Vec<f64> =
                        bootstrap_indices.iter().map(|&i| values[i]).collect();
                    tree_config
                        .fit_regressor(&boot_features, &boot_values)
                        .expect("tree fit should not fail on pre-validated data")
                }
            }
        })
        .collect();

    debug!(n_trees_trained = trees.len(), "tree training complete");

    Ok(RandomForest {
        trees,
        n_features,
        task,
        feature_names: feature_names.to_vec(),
    })
}
