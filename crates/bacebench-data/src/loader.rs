//! BACE dataset loader.
//!
//! Reads the raw table, selects the label column for the requested mode,
//! applies a splitting strategy, and constructs the fit-once transformer
//! list. Partition counts always sum to the full table size.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::DataError;
use crate::domain::{Dataset, Mode, SplitRatio, TaskName};
use crate::reader::BaceReader;
use crate::splits::{SpecifiedSplitter, SplitStrategy};
use crate::transform::{Clipping, Normalization, Transformer};

/// Feature clip bound applied to the precomputed descriptor columns.
const FEATURE_CLIP: f64 = 5.0;

/// Everything the workflow needs from one load: the task list, the four
/// partitions, and the transformer list fit on the training partition.
#[derive(Debug)]
pub struct LoadedBace {
    /// Prediction targets (a single task for each mode).
    pub tasks: Vec<TaskName>,
    /// Training partition.
    pub train: Dataset,
    /// Validation partition.
    pub valid: Dataset,
    /// Test partition.
    pub test: Dataset,
    /// Crystal-ligand partition (empty unless the strategy produces one).
    pub crystal: Dataset,
    /// Transformers fit once on the training partition, in apply order.
    pub transformers: Vec<Transformer>,
}

/// Loads BACE dataset partitions from a CSV file.
pub struct BaceLoader {
    path: PathBuf,
}

impl BaceLoader {
    /// Create a loader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Load partitions using one of the curated assignment columns.
    ///
    /// `transform = false` returns raw partitions; the transformer list is
    /// still fit and returned, leaving apply/undo to the evaluation layer.
    ///
    /// # Errors
    ///
    /// Propagates reader errors; returns [`DataError::MissingColumn`] when
    /// the CSV has no assignment column for `ratio`.
    #[instrument(skip(self), fields(path = %self.path.display(), %mode, %ratio))]
    pub fn load(
        &self,
        mode: Mode,
        transform: bool,
        ratio: SplitRatio,
    ) -> Result<LoadedBace, DataError> {
        let table = BaceReader::new(&self.path).read()?;
        let assignments = table.assignments(ratio.column()).ok_or_else(|| {
            DataError::MissingColumn {
                path: self.path.clone(),
                column: ratio.column().to_string(),
            }
        })?;
        let strategy = SplitStrategy::Specified(SpecifiedSplitter::new(assignments.to_vec()));
        let dataset = table.to_dataset(mode)?;
        partition(dataset, mode, transform, &strategy)
    }

    /// Load partitions using an arbitrary splitting strategy.
    ///
    /// # Errors
    ///
    /// Propagates reader and splitter errors.
    #[instrument(skip(self, strategy), fields(path = %self.path.display(), %mode))]
    pub fn load_with(
        &self,
        mode: Mode,
        transform: bool,
        strategy: &SplitStrategy,
    ) -> Result<LoadedBace, DataError> {
        let table = BaceReader::new(&self.path).read()?;
        let dataset = table.to_dataset(mode)?;
        partition(dataset, mode, transform, strategy)
    }
}

fn partition(
    dataset: Dataset,
    mode: Mode,
    transform: bool,
    strategy: &SplitStrategy,
) -> Result<LoadedBace, DataError> {
    let indices = strategy.split(&dataset)?;
    let train = dataset.subset(&indices.train)?;
    let valid = dataset.subset(&indices.valid)?;
    let test = dataset.subset(&indices.test)?;
    let crystal = dataset.subset(&indices.crystal)?;

    // Fit once, on train. Binary class labels stay raw; potency labels
    // are z-scored for regression.
    let mut transformers = vec![Transformer::Clipping(Clipping::new(FEATURE_CLIP)?)];
    if mode == Mode::Regression {
        transformers.push(Transformer::Normalization(Normalization::fit(&train)?));
    }

    let apply_all = |ds: &Dataset| -> Dataset {
        transformers
            .iter()
            .fold(ds.clone(), |acc, t| t.apply(&acc))
    };
    let (train, valid, test, crystal) = if transform {
        (
            apply_all(&train),
            apply_all(&valid),
            apply_all(&test),
            apply_all(&crystal),
        )
    } else {
        (train, valid, test, crystal)
    };

    info!(
        n_train = train.len(),
        n_valid = valid.len(),
        n_test = test.len(),
        n_crystal = crystal.len(),
        n_transformers = transformers.len(),
        "BACE partitions ready"
    );

    Ok(LoadedBace {
        tasks: train.tasks().to_vec(),
        train,
        valid,
        test,
        crystal,
        transformers,
    })
}
