//! Fit-once dataset transformers.
//!
//! A transformer is fit exactly once (on the training partition) and then
//! applied identically to every partition; it is never refit. Label
//! transforms can be undone on predictions so metrics are always computed
//! in the original label space.

use crate::DataError;
use crate::domain::Dataset;

/// A deterministic, fit-once dataset transformation.
///
/// Closed set: label z-score normalization and symmetric feature clipping.
#[derive(Debug, Clone)]
pub enum Transformer {
    /// Z-score normalization of label columns.
    Normalization(Normalization),
    /// Symmetric clamp of feature values.
    Clipping(Clipping),
}

impl Transformer {
    /// Apply the transformation, producing a new partition.
    ///
    /// Sample identity, order, and weights are unchanged.
    #[must_use]
    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        match self {
            Transformer::Normalization(t) => t.apply(dataset),
            Transformer::Clipping(t) => t.apply(dataset),
        }
    }

    /// Undo the label-side effect of this transformer on predictions for
    /// one task. Feature-only transformers leave `values` untouched.
    pub fn undo_predictions(&self, task: usize, values: &mut [f64]) {
        if let Transformer::Normalization(t) = self {
            t.undo(task, values);
        }
    }

    /// Return `true` if this transformer changes label values.
    #[must_use]
    pub fn transforms_labels(&self) -> bool {
        matches!(self, Transformer::Normalization(_))
    }
}

/// Per-task z-score normalization of labels.
///
/// Statistics are captured at fit time; constant label columns keep a
/// standard deviation of 1.0 so apply reduces to a pure shift.
#[derive(Debug, Clone)]
pub struct Normalization {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Normalization {
    /// Fit normalization statistics on a partition.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::EmptyFitPartition`] when the partition has
    /// zero samples.
    pub fn fit(dataset: &Dataset) -> Result<Self, DataError> {
        if dataset.is_empty() {
            return Err(DataError::EmptyFitPartition);
        }
        let n = dataset.len() as f64;
        let n_tasks = dataset.n_tasks();

        let mut means = vec![0.0; n_tasks];
        for row in dataset.labels() {
            for (t, &v) in row.iter().enumerate() {
                means[t] += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut stds = vec![0.0; n_tasks];
        for row in dataset.labels() {
            for (t, &v) in row.iter().enumerate() {
                stds[t] += (v - means[t]).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Ok(Self { means, stds })
    }

    /// Return the per-task means captured at fit time.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Return the per-task standard deviations captured at fit time.
    #[must_use]
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    fn apply(&self, dataset: &Dataset) -> Dataset {
        let labels = dataset
            .labels()
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(t, &v)| (v - self.means[t]) / self.stds[t])
                    .collect()
            })
            .collect();
        dataset.with_labels(labels)
    }

    fn undo(&self, task: usize, values: &mut [f64]) {
        let mean = self.means[task];
        let std = self.stds[task];
        for v in values {
            *v = *v * std + mean;
        }
    }
}

/// Symmetric clamp of feature values to `[-max_abs, max_abs]`.
#[derive(Debug, Clone)]
pub struct Clipping {
    max_abs: f64,
}

impl Clipping {
    /// Create a clipping transformer with the given bound.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidClipBound`] when `max_abs` is not a
    /// positive finite number.
    pub fn new(max_abs: f64) -> Result<Self, DataError> {
        if !max_abs.is_finite() || max_abs <= 0.0 {
            return Err(DataError::InvalidClipBound { max_abs });
        }
        Ok(Self { max_abs })
    }

    /// Return the clip bound.
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        self.max_abs
    }

    fn apply(&self, dataset: &Dataset) -> Dataset {
        let features = dataset
            .features()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&v| v.clamp(-self.max_abs, self.max_abs))
                    .collect()
            })
            .collect();
        dataset.with_features(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MoleculeId, TaskName};

    fn dataset(labels: Vec<f64>, features: Vec<Vec<f64>>) -> Dataset {
        let n = labels.len();
        Dataset::new(
            (0..n)
                .map(|i| MoleculeId::new(format!("M{i}")))
                .collect(),
            vec!["CCO".to_string(); n],
            vec![TaskName::new("pIC50")],
            (0..features[0].len()).map(|f| format!("f{f}")).collect(),
            features,
            labels.into_iter().map(|v| vec![v]).collect(),
            vec![1.0; n],
        )
        .unwrap()
    }

    #[test]
    fn normalization_centers_and_scales() {
        let ds = dataset(vec![2.0, 4.0, 6.0], vec![vec![0.0]; 3]);
        let norm = Normalization::fit(&ds).unwrap();
        assert!((norm.means()[0] - 4.0).abs() < 1e-12);

        let transformed = Transformer::Normalization(norm).apply(&ds);
        let labels = transformed.labels_for_task(0).unwrap();
        let mean: f64 = labels.iter().sum::<f64>() / labels.len() as f64;
        assert!(mean.abs() < 1e-12);
        let var: f64 = labels.iter().map(|v| v * v).sum::<f64>() / labels.len() as f64;
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalization_undo_round_trips() {
        let ds = dataset(vec![1.0, 5.0, 9.0, 2.5], vec![vec![0.0]; 4]);
        let norm = Normalization::fit(&ds).unwrap();
        let t = Transformer::Normalization(norm);

        let mut values = t.apply(&ds).labels_for_task(0).unwrap();
        t.undo_predictions(0, &mut values);
        for (restored, original) in values.iter().zip(ds.labels_for_task(0).unwrap()) {
            assert!((restored - original).abs() < 1e-12);
        }
    }

    #[test]
    fn normalization_constant_column_is_pure_shift() {
        let ds = dataset(vec![3.0, 3.0, 3.0], vec![vec![0.0]; 3]);
        let norm = Normalization::fit(&ds).unwrap();
        assert!((norm.stds()[0] - 1.0).abs() < f64::EPSILON);
        let labels = Transformer::Normalization(norm)
            .apply(&ds)
            .labels_for_task(0)
            .unwrap();
        assert!(labels.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn normalization_fit_on_other_partition_uses_train_stats() {
        let train = dataset(vec![0.0, 10.0], vec![vec![0.0]; 2]);
        let test = dataset(vec![100.0], vec![vec![0.0]]);
        let t = Transformer::Normalization(Normalization::fit(&train).unwrap());
        // (100 - 5) / 5 = 19 under train statistics.
        let labels = t.apply(&test).labels_for_task(0).unwrap();
        assert!((labels[0] - 19.0).abs() < 1e-12);
    }

    #[test]
    fn empty_fit_partition_error() {
        let ds = dataset(vec![1.0], vec![vec![0.0]]);
        let empty = ds.subset(&[]).unwrap();
        assert!(matches!(
            Normalization::fit(&empty),
            Err(DataError::EmptyFitPartition)
        ));
    }

    #[test]
    fn clipping_clamps_features_only() {
        let ds = dataset(vec![99.0], vec![vec![-7.0, 0.5, 7.0]]);
        let t = Transformer::Clipping(Clipping::new(3.0).unwrap());
        let clipped = t.apply(&ds);
        assert_eq!(clipped.features()[0], vec![-3.0, 0.5, 3.0]);
        // Labels untouched; undo is the identity.
        assert_eq!(clipped.labels_for_task(0).unwrap(), vec![99.0]);
        let mut preds = vec![42.0];
        t.undo_predictions(0, &mut preds);
        assert_eq!(preds, vec![42.0]);
        assert!(!t.transforms_labels());
    }

    #[test]
    fn invalid_clip_bound_rejected() {
        assert!(Clipping::new(0.0).is_err());
        assert!(Clipping::new(-1.0).is_err());
        assert!(Clipping::new(f64::NAN).is_err());
    }
}
