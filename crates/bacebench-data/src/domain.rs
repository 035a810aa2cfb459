//! Domain types for the BACE dataset.

use std::fmt;
use std::str::FromStr;

use crate::DataError;

/// Prediction mode for the workflow.
///
/// Selects the label column, the estimator family, and the metric set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Binary activity prediction on the `Class` column.
    Classification,
    /// Potency prediction on the `pIC50` column.
    Regression,
}

impl Mode {
    /// Return the name of the label column this mode predicts.
    #[must_use]
    pub fn label_column(self) -> &'static str {
        match self {
            Mode::Classification => "Class",
            Mode::Regression => "pIC50",
        }
    }
}

impl FromStr for Mode {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classification" => Ok(Mode::Classification),
            "regression" => Ok(Mode::Regression),
            other => Err(DataError::InvalidMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Classification => f.write_str("classification"),
            Mode::Regression => f.write_str("regression"),
        }
    }
}

/// Named train/test ratio of the curated BACE split columns.
///
/// Each ratio corresponds to a per-sample assignment column in the input
/// CSV (`split_20_80` or `split_80_20`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRatio {
    /// 20% train / 80% held out.
    TwentyEighty,
    /// 80% train / 20% held out.
    EightyTwenty,
}

impl SplitRatio {
    /// Return the CSV column carrying this ratio's assignments.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            SplitRatio::TwentyEighty => "split_20_80",
            SplitRatio::EightyTwenty => "split_80_20",
        }
    }
}

impl FromStr for SplitRatio {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "20-80" => Ok(SplitRatio::TwentyEighty),
            "80-20" => Ok(SplitRatio::EightyTwenty),
            other => Err(DataError::InvalidSplitRatio {
                ratio: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SplitRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitRatio::TwentyEighty => f.write_str("20-80"),
            SplitRatio::EightyTwenty => f.write_str("80-20"),
        }
    }
}

/// A molecule identifier (the `CID` column).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoleculeId(String);

impl MoleculeId {
    /// Create a molecule ID.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        debug_assert!(!id.is_empty(), "molecule ID must not be empty");
        Self(id)
    }

    /// Return the molecule ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MoleculeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A prediction target (label column) within the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskName(String);

impl TaskName {
    /// Create a task name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Return the task name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-sample partition assignment from a curated split column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAssignment {
    Train,
    Valid,
    Test,
    /// Crystal-structure ligands, held out as a fourth partition.
    Crystal,
}

impl SplitAssignment {
    /// Parse an assignment label, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Some(SplitAssignment::Train),
            "valid" => Some(SplitAssignment::Valid),
            "test" => Some(SplitAssignment::Test),
            "crystal" => Some(SplitAssignment::Crystal),
            _ => None,
        }
    }
}

/// An immutable dataset partition.
///
/// Parallel-vector layout: `ids[i]`, `smiles[i]`, `features[i]`,
/// `labels[i]`, and `weights[i]` all describe sample `i`. `labels[i]` has
/// one entry per task in `tasks`.
#[derive(Debug, Clone)]
pub struct Dataset {
    ids: Vec<MoleculeId>,
    smiles: Vec<String>,
    tasks: Vec<TaskName>,
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
    labels: Vec<Vec<f64>>,
    weights: Vec<f64>,
}

impl Dataset {
    /// Assemble a dataset from parallel vectors.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::ParallelLengthMismatch`] | vectors have differing lengths |
    /// | [`DataError::FeatureCountMismatch`] | a feature row differs from `feature_names` |
    /// | [`DataError::TaskArityMismatch`] | a label row differs from `tasks` |
    pub fn new(
        ids: Vec<MoleculeId>,
        smiles: Vec<String>,
        tasks: Vec<TaskName>,
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
        labels: Vec<Vec<f64>>,
        weights: Vec<f64>,
    ) -> Result<Self, DataError> {
        let n = ids.len();
        for (field, len) in [
            ("smiles", smiles.len()),
            ("features", features.len()),
            ("labels", labels.len()),
            ("weights", weights.len()),
        ] {
            if len != n {
                return Err(DataError::ParallelLengthMismatch {
                    field,
                    expected: n,
                    got: len,
                });
            }
        }
        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != feature_names.len() {
                return Err(DataError::FeatureCountMismatch {
                    sample_index,
                    expected: feature_names.len(),
                    got: row.len(),
                });
            }
        }
        for (sample_index, row) in labels.iter().enumerate() {
            if row.len() != tasks.len() {
                return Err(DataError::TaskArityMismatch {
                    sample_index,
                    expected: tasks.len(),
                    got: row.len(),
                });
            }
        }
        Ok(Self {
            ids,
            smiles,
            tasks,
            feature_names,
            features,
            labels,
            weights,
        })
    }

    /// Return the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Return `true` if the partition has zero samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the number of tasks (label columns).
    #[must_use]
    pub fn n_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Return the molecule IDs.
    #[must_use]
    pub fn ids(&self) -> &[MoleculeId] {
        &self.ids
    }

    /// Return the SMILES strings.
    #[must_use]
    pub fn smiles(&self) -> &[String] {
        &self.smiles
    }

    /// Return the task names.
    #[must_use]
    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the label matrix: `labels()[sample][task]`.
    #[must_use]
    pub fn labels(&self) -> &[Vec<f64>] {
        &self.labels
    }

    /// Return the per-sample weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Extract the label column for one task.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::TaskIndexOutOfBounds`] when `task` is not a
    /// valid task index.
    pub fn labels_for_task(&self, task: usize) -> Result<Vec<f64>, DataError> {
        if task >= self.tasks.len() {
            return Err(DataError::TaskIndexOutOfBounds {
                index: task,
                n_tasks: self.tasks.len(),
            });
        }
        Ok(self.labels.iter().map(|row| row[task]).collect())
    }

    /// Select the samples at `indices`, in order, into a new partition.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::SampleIndexOutOfBounds`] when an index is past
    /// the end of the dataset.
    pub fn subset(&self, indices: &[usize]) -> Result<Dataset, DataError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(DataError::SampleIndexOutOfBounds {
                index: bad,
                len: self.len(),
            });
        }
        Ok(Dataset {
            ids: indices.iter().map(|&i| self.ids[i].clone()).collect(),
            smiles: indices.iter().map(|&i| self.smiles[i].clone()).collect(),
            tasks: self.tasks.clone(),
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
            weights: indices.iter().map(|&i| self.weights[i]).collect(),
        })
    }

    /// Replace the label matrix, keeping everything else.
    ///
    /// Used by transformers, which never change sample identity or order.
    pub(crate) fn with_labels(&self, labels: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(labels.len(), self.len());
        Dataset {
            labels,
            ..self.clone()
        }
    }

    /// Replace the feature matrix, keeping everything else.
    pub(crate) fn with_features(&self, features: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(features.len(), self.len());
        Dataset {
            features,
            ..self.clone()
        }
    }

    /// Replace the task list and label matrix, keeping sample identity.
    ///
    /// Used by the task splitter, which re-slices label columns.
    pub(crate) fn with_tasks(&self, tasks: Vec<TaskName>, labels: Vec<Vec<f64>>) -> Self {
        Dataset {
            tasks,
            labels,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dataset() -> Dataset {
        Dataset::new(
            vec![MoleculeId::new("M1"), MoleculeId::new("M2")],
            vec!["c1ccccc1".into(), "CCO".into()],
            vec![TaskName::new("Class")],
            vec!["f0".into(), "f1".into()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            vec![vec![1.0], vec![0.0]],
            vec![1.0, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn mode_from_str() {
        assert_eq!("classification".parse::<Mode>().unwrap(), Mode::Classification);
        assert_eq!("regression".parse::<Mode>().unwrap(), Mode::Regression);
    }

    #[test]
    fn invalid_mode_rejected() {
        let err = "bogus".parse::<Mode>().unwrap_err();
        assert!(matches!(err, DataError::InvalidMode { .. }));
    }

    #[test]
    fn mode_label_columns() {
        assert_eq!(Mode::Classification.label_column(), "Class");
        assert_eq!(Mode::Regression.label_column(), "pIC50");
    }

    #[test]
    fn split_ratio_round_trip() {
        let r: SplitRatio = "20-80".parse().unwrap();
        assert_eq!(r, SplitRatio::TwentyEighty);
        assert_eq!(r.to_string(), "20-80");
        assert_eq!(r.column(), "split_20_80");
    }

    #[test]
    fn invalid_split_ratio_rejected() {
        let err = "50-50".parse::<SplitRatio>().unwrap_err();
        assert!(matches!(err, DataError::InvalidSplitRatio { .. }));
    }

    #[test]
    fn assignment_parse_case_insensitive() {
        assert_eq!(SplitAssignment::parse("Train"), Some(SplitAssignment::Train));
        assert_eq!(SplitAssignment::parse("CRYSTAL"), Some(SplitAssignment::Crystal));
        assert_eq!(SplitAssignment::parse("holdout"), None);
    }

    #[test]
    fn dataset_lengths_validated() {
        let err = Dataset::new(
            vec![MoleculeId::new("M1")],
            vec![],
            vec![TaskName::new("Class")],
            vec![],
            vec![],
            vec![],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::ParallelLengthMismatch { field: "smiles", .. }));
    }

    #[test]
    fn dataset_feature_row_validated() {
        let err = Dataset::new(
            vec![MoleculeId::new("M1")],
            vec!["CCO".into()],
            vec![TaskName::new("Class")],
            vec!["f0".into(), "f1".into()],
            vec![vec![1.0]],
            vec![vec![0.0]],
            vec![1.0],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::FeatureCountMismatch { expected: 2, got: 1, .. }));
    }

    #[test]
    fn subset_selects_rows_in_order() {
        let ds = small_dataset();
        let sub = ds.subset(&[1]).unwrap();
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.ids()[0].as_str(), "M2");
        assert_eq!(sub.features()[0], vec![3.0, 4.0]);
        assert_eq!(sub.n_features(), 2);
    }

    #[test]
    fn subset_out_of_bounds() {
        let ds = small_dataset();
        let err = ds.subset(&[0, 7]).unwrap_err();
        assert!(matches!(err, DataError::SampleIndexOutOfBounds { index: 7, len: 2 }));
    }

    #[test]
    fn labels_for_task_extracts_column() {
        let ds = small_dataset();
        assert_eq!(ds.labels_for_task(0).unwrap(), vec![1.0, 0.0]);
        assert!(ds.labels_for_task(1).is_err());
    }
}
