//! Prediction methods for the random forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::node::TreeTask;

/// Class probability distribution from a classification prediction.
#[derive(Debug, Clone)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the predicted class (argmax of probabilities).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        self.probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Return the probability of one class, or 0.0 when out of range.
    #[must_use]
    pub fn prob_of(&self, class: usize) -> f64 {
        self.probs.get(class).copied().unwrap_or(0.0)
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Predict the class label for a single sample.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionFeatureMismatch`] | wrong feature count |
    /// | [`RfError::TaskMismatch`] | forest was trained for regression |
    pub fn predict_class(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Return the averaged class probability distribution for a sample.
    ///
    /// # Errors
    ///
    /// As [`predict_class`](Self::predict_class).
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        let TreeTask::Classification { n_classes } = self.task else {
            return Err(RfError::TaskMismatch {
                trained: self.task.name(),
                requested: "classification",
            });
        };
        self.check_width(sample)?;

        let mut avg = vec![0.0f64; n_classes];
        for tree in &self.trees {
            let proba = tree.predict_proba(sample)?;
            for (i, p) in proba.iter().enumerate() {
                avg[i] += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution::new(avg))
    }

    /// Predict the continuous target for a single sample (tree-mean).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionFeatureMismatch`] | wrong feature count |
    /// | [`RfError::TaskMismatch`] | forest was trained for classification |
    pub fn predict_value(&self, sample: &[f64]) -> Result<f64, RfError> {
        if self.task != TreeTask::Regression {
            return Err(RfError::TaskMismatch {
                trained: self.task.name(),
                requested: "regression",
            });
        }
        self.check_width(sample)?;

        let sum: f64 = self
            .trees
            .iter()
            .map(|tree| tree.predict_value(sample))
            .sum::<Result<f64, RfError>>()?;
        Ok(sum / self.trees.len() as f64)
    }

    /// Predict class labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// As [`predict_class`](Self::predict_class), for any sample.
    pub fn predict_class_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_class(sample))
            .collect()
    }

    /// Return probability distributions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// As [`predict_proba`](Self::predict_proba), for any sample.
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Predict continuous targets for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// As [`predict_value`](Self::predict_value), for any sample.
    pub fn predict_value_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_value(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the task this forest was trained for.
    #[must_use]
    pub fn task(&self) -> TreeTask {
        self.task
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn check_width(&self, sample: &[f64]) -> Result<(), RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RandomForestConfig;

    fn classifier() -> RandomForest {
        let features = vec![
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![10.0],
            vec![11.0],
            vec![12.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        RandomForestConfig::new(10)
            .unwrap()
            .with_seed(42)
            .fit_classifier(&features, &labels, &["x".to_string()])
            .unwrap()
    }

    #[test]
    fn distribution_prob_of() {
        let dist = ClassDistribution::new(vec![0.25, 0.75]);
        assert_eq!(dist.predicted_class(), 1);
        assert!((dist.prob_of(1) - 0.75).abs() < f64::EPSILON);
        assert_eq!(dist.prob_of(5), 0.0);
    }

    #[test]
    fn classifier_rejects_value_prediction() {
        let forest = classifier();
        assert!(matches!(
            forest.predict_value(&[1.0]).unwrap_err(),
            RfError::TaskMismatch { .. }
        ));
    }

    #[test]
    fn regressor_rejects_proba() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let forest = RandomForestConfig::new(5)
            .unwrap()
            .fit_regressor(&features, &[1.0, 2.0, 3.0], &["x".to_string()])
            .unwrap();
        assert!(matches!(
            forest.predict_proba(&[1.0]).unwrap_err(),
            RfError::TaskMismatch { .. }
        ));
    }

    #[test]
    fn batch_feature_mismatch_propagates() {
        let forest = classifier();
        let err = forest.predict_class_batch(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, RfError::PredictionFeatureMismatch { .. }));
    }

    #[test]
    fn accessors() {
        let forest = classifier();
        assert_eq!(forest.n_features(), 1);
        assert_eq!(forest.n_trees(), 10);
        assert_eq!(forest.feature_names(), &["x".to_string()]);
    }
}
