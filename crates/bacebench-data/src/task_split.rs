//! Task-level splitting for multi-task datasets.

use crate::DataError;
use crate::domain::{Dataset, TaskName};

/// Splits a multi-task dataset into folds along the task axis.
///
/// Every fold keeps all samples but only a contiguous chunk of task
/// columns; the first `n_tasks % n_folds` folds get one extra task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSplitter {
    n_folds: usize,
}

impl TaskSplitter {
    /// Create a task splitter producing `n_folds` folds.
    #[must_use]
    pub fn new(n_folds: usize) -> Self {
        Self { n_folds }
    }

    /// Split the dataset's task columns into folds.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidFoldCount`] when `n_folds` is zero or
    /// exceeds the number of tasks.
    pub fn split(&self, dataset: &Dataset) -> Result<Vec<Dataset>, DataError> {
        let n_tasks = dataset.n_tasks();
        if self.n_folds == 0 || self.n_folds > n_tasks {
            return Err(DataError::InvalidFoldCount {
                n_folds: self.n_folds,
                n_tasks,
            });
        }

        let base = n_tasks / self.n_folds;
        let extra = n_tasks % self.n_folds;

        let mut folds = Vec::with_capacity(self.n_folds);
        let mut start = 0;
        for fold in 0..self.n_folds {
            let width = base + usize::from(fold < extra);
            let range = start..start + width;
            let tasks: Vec<TaskName> = dataset.tasks()[range.clone()].to_vec();
            let labels: Vec<Vec<f64>> = dataset
                .labels()
                .iter()
                .map(|row| row[range.clone()].to_vec())
                .collect();
            folds.push(dataset.with_tasks(tasks, labels));
            start += width;
        }
        Ok(folds)
    }
}

/// Merge task folds back into a single multi-task dataset.
///
/// Folds must describe the same samples in the same order; task columns
/// are concatenated in fold order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::EmptyFitPartition`] | `folds` is empty |
/// | [`DataError::FoldMergeMismatch`] | a fold's samples don't align with fold 0 |
pub fn merge_task_folds(folds: &[Dataset]) -> Result<Dataset, DataError> {
    let Some(first) = folds.first() else {
        return Err(DataError::EmptyFitPartition);
    };

    let mut tasks = first.tasks().to_vec();
    let mut labels: Vec<Vec<f64>> = first.labels().to_vec();

    for (fold_index, fold) in folds.iter().enumerate().skip(1) {
        if fold.len() != first.len() {
            return Err(DataError::FoldMergeMismatch {
                fold: fold_index,
                detail: format!("{} samples, expected {}", fold.len(), first.len()),
            });
        }
        if fold.ids() != first.ids() {
            return Err(DataError::FoldMergeMismatch {
                fold: fold_index,
                detail: "molecule IDs differ".to_string(),
            });
        }
        tasks.extend(fold.tasks().iter().cloned());
        for (row, fold_row) in labels.iter_mut().zip(fold.labels()) {
            row.extend_from_slice(fold_row);
        }
    }

    Ok(first.with_tasks(tasks, labels))
}
