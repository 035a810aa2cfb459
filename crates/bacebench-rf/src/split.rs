use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²). Classification only.
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i)). Classification only.
    Entropy,
    /// Biased variance of the targets. Regression only.
    Variance,
}

impl SplitCriterion {
    /// Display name for error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SplitCriterion::Gini => "gini",
            SplitCriterion::Entropy => "entropy",
            SplitCriterion::Variance => "variance",
        }
    }

    /// Return `true` if this criterion scores class-count distributions.
    #[must_use]
    pub fn is_classification(self) -> bool {
        !matches!(self, SplitCriterion::Variance)
    }

    /// Compute classification impurity from class counts.
    ///
    /// Returns zero when `n_samples` is zero (pure node).
    #[must_use]
    pub fn class_impurity(self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_counts
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
            SplitCriterion::Variance => 0.0,
        };
        Impurity::new(value)
    }

    /// Compute regression impurity (biased variance) from running moments.
    #[must_use]
    pub fn variance_impurity(sum: f64, sumsq: f64, n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let mean = sum / n;
        // Clamp tiny negative values from catastrophic cancellation.
        Impurity::new((sumsq / n - mean * mean).max(0.0))
    }
}

/// Training targets, as seen by the split scanner.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Targets<'a> {
    /// Zero-based class labels.
    Classes {
        labels: &'a [usize],
        n_classes: usize,
    },
    /// Continuous regression targets.
    Values { values: &'a [f64] },
}

impl Targets<'_> {
    /// Impurity of the node spanning `sample_indices`.
    pub(crate) fn node_impurity(
        &self,
        criterion: SplitCriterion,
        sample_indices: &[usize],
    ) -> Impurity {
        let mut acc = Accum::empty(self);
        for &si in sample_indices {
            acc.add(self, si);
        }
        acc.impurity(criterion, sample_indices.len())
    }
}

/// Incremental accumulator for one side of a candidate split.
enum Accum {
    Counts(Vec<usize>),
    Moments { sum: f64, sumsq: f64 },
}

impl Accum {
    fn empty(targets: &Targets<'_>) -> Self {
        match targets {
            Targets::Classes { n_classes, .. } => Accum::Counts(vec![0; *n_classes]),
            Targets::Values { .. } => Accum::Moments { sum: 0.0, sumsq: 0.0 },
        }
    }

    fn add(&mut self, targets: &Targets<'_>, sample_index: usize) {
        match (self, targets) {
            (Accum::Counts(counts), Targets::Classes { labels, .. }) => {
                counts[labels[sample_index]] += 1;
            }
            (Accum::Moments { sum, sumsq }, Targets::Values { values }) => {
                let v = values[sample_index];
                *sum += v;
                *sumsq += v * v;
            }
            _ => unreachable!("accumulator built from the same targets"),
        }
    }

    fn remove(&mut self, targets: &Targets<'_>, sample_index: usize) {
        match (self, targets) {
            (Accum::Counts(counts), Targets::Classes { labels, .. }) => {
                counts[labels[sample_index]] -= 1;
            }
            (Accum::Moments { sum, sumsq }, Targets::Values { values }) => {
                let v = values[sample_index];
                *sum -= v;
                *sumsq -= v * v;
            }
            _ => unreachable!("accumulator built from the same targets"),
        }
    }

    fn impurity(&self, criterion: SplitCriterion, n_samples: usize) -> Impurity {
        match self {
            Accum::Counts(counts) => criterion.class_impurity(counts, n_samples),
            Accum::Moments { sum, sumsq } => {
                SplitCriterion::variance_impurity(*sum, *sumsq, n_samples)
            }
        }
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best split among a random subset of features.
///
/// For each of `max_features` randomly chosen features, sorts the
/// `(value, target)` pairs, scans left-to-right with incremental
/// accumulator updates (class counts or running moments), and tracks the
/// globally best split by weighted impurity decrease.
///
/// Returns `None` when no valid split exists (all values identical, or
/// every boundary violates `min_samples_leaf`).
///
/// # Column-major layout
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    targets: &Targets<'_>,
    sample_indices: &[usize],
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples == 0 || n_features == 0 {
        return None;
    }

    let mut parent = Accum::empty(targets);
    for &si in sample_indices {
        parent.add(targets, si);
    }
    let parent_impurity = parent.impurity(criterion, n_samples);

    // Partial Fisher-Yates: shuffle only the first `max_features` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }
    let selected_features = &feature_order[..take];

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in selected_features {
        let feat_col = &features[feat_idx];

        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        // Incremental scan: left grows from empty, right shrinks from full.
        let mut left = Accum::empty(targets);
        let mut right = Accum::empty(targets);
        for &si in sample_indices {
            right.add(targets, si);
        }

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            left.add(targets, si);
            right.remove(targets, si);

            let n_left = i + 1;
            let n_right = n_samples - n_left;

            // No valid boundary between identical values.
            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let left_impurity = left.impurity(criterion, n_left);
            let right_impurity = right.impurity(criterion, n_right);

            // Weighted impurity decrease.
            let decrease = (n_samples as f64) * parent_impurity.value()
                - (n_left as f64) * left_impurity.value()
                - (n_right as f64) * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                let threshold = (val_i + val_next) / 2.0;
                best = Some((FeatureIndex::new(feat_idx), threshold));
            }
        }
    }

    let (best_feature, threshold) = best?;

    let feat_col = &features[best_feature.index()];
    let mut left_indices = Vec::with_capacity(n_samples / 2);
    let mut right_indices = Vec::with_capacity(n_samples / 2);
    for &si in sample_indices {
        if feat_col[si] <= threshold {
            left_indices.push(si);
        } else {
            right_indices.push(si);
        }
    }

    Some(SplitResult {
        feature: best_feature,
        threshold,
        left_indices,
        right_indices,
    })
}
