//! Dataset splitting strategies.
//!
//! A closed set of named strategies, each producing index sets for the
//! train/valid/test (and, for curated assignments, crystal) partitions.
//! All strategies are deterministic: the same dataset always yields the
//! same partition indices.

use tracing::{debug, instrument};

use crate::DataError;
use crate::domain::{Dataset, SplitAssignment};
use crate::scaffold::scaffold_key;

/// Target partition fractions for fraction-driven strategies.
///
/// Fractions must be finite, non-negative, with `train > 0`, and sum to 1.
#[derive(Debug, Clone, Copy)]
pub struct SplitFractions {
    train: f64,
    valid: f64,
    test: f64,
}

impl SplitFractions {
    /// Create validated split fractions.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidFractions`] when any fraction is
    /// negative or non-finite, `train` is zero, or the sum is not 1.
    pub fn new(train: f64, valid: f64, test: f64) -> Result<Self, DataError> {
        let all_finite = train.is_finite() && valid.is_finite() && test.is_finite();
        let sum = train + valid + test;
        if !all_finite || train <= 0.0 || valid < 0.0 || test < 0.0 || (sum - 1.0).abs() > 1e-9 {
            return Err(DataError::InvalidFractions { train, valid, test });
        }
        Ok(Self { train, valid, test })
    }

    /// Return the train fraction.
    #[must_use]
    pub fn train(&self) -> f64 {
        self.train
    }

    /// Return the validation fraction.
    #[must_use]
    pub fn valid(&self) -> f64 {
        self.valid
    }

    /// Return the test fraction.
    #[must_use]
    pub fn test(&self) -> f64 {
        self.test
    }
}

/// Sample indices for each partition produced by a split.
///
/// The four vectors are disjoint and together cover every sample of the
/// input dataset. `crystal` is empty for all strategies except
/// [`SpecifiedSplitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Training partition indices.
    pub train: Vec<usize>,
    /// Validation partition indices.
    pub valid: Vec<usize>,
    /// Test partition indices.
    pub test: Vec<usize>,
    /// Crystal-ligand partition indices.
    pub crystal: Vec<usize>,
}

impl SplitIndices {
    /// Total number of samples across all partitions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.train.len() + self.valid.len() + self.test.len() + self.crystal.len()
    }
}

/// A dataset splitting strategy.
///
/// Closed tagged set, one variant per strategy.
#[derive(Debug, Clone)]
pub enum SplitStrategy {
    /// Group molecules by framework key, fill partitions greedily.
    Scaffold(ScaffoldSplitter),
    /// Sequential split by row position.
    Index(IndexSplitter),
    /// Caller-supplied validation and test index lists.
    Indice(IndiceSplitter),
    /// Curated per-sample assignments (the BACE split columns).
    Specified(SpecifiedSplitter),
}

impl SplitStrategy {
    /// Partition `dataset` into train/valid/test/crystal index sets.
    ///
    /// # Errors
    ///
    /// Propagates the active strategy's validation errors.
    #[instrument(skip_all, fields(n_samples = dataset.len()))]
    pub fn split(&self, dataset: &Dataset) -> Result<SplitIndices, DataError> {
        let indices = match self {
            SplitStrategy::Scaffold(s) => s.split(dataset),
            SplitStrategy::Index(s) => Ok(s.split(dataset)),
            SplitStrategy::Indice(s) => s.split(dataset),
            SplitStrategy::Specified(s) => s.split(dataset),
        }?;
        debug_assert_eq!(indices.total(), dataset.len());
        debug!(
            n_train = indices.train.len(),
            n_valid = indices.valid.len(),
            n_test = indices.test.len(),
            n_crystal = indices.crystal.len(),
            "dataset split"
        );
        Ok(indices)
    }
}

/// Scaffold-based splitter.
///
/// Molecules sharing a framework key always land in the same partition,
/// so held-out chemistry is genuinely unseen. Groups are sorted by
/// descending size (ties by first occurrence) and greedily assigned:
/// train until its quota is filled, then valid, then test.
#[derive(Debug, Clone)]
pub struct ScaffoldSplitter {
    fractions: SplitFractions,
}

impl ScaffoldSplitter {
    /// Create a scaffold splitter with the given target fractions.
    #[must_use]
    pub fn new(fractions: SplitFractions) -> Self {
        Self { fractions }
    }

    fn split(&self, dataset: &Dataset) -> Result<SplitIndices, DataError> {
        // Group sample indices by framework key, preserving first-seen order.
        let mut order: Vec<String> = Vec::new();
        let mut groups: std::collections::HashMap<String, Vec<usize>> =
            std::collections::HashMap::new();
        for (i, smiles) in dataset.smiles().iter().enumerate() {
            let key = scaffold_key(smiles);
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(i);
        }

        let mut sorted: Vec<Vec<usize>> = order
            .iter()
            .map(|key| groups[key].clone())
            .collect();
        sorted.sort_by_key(|g| std::cmp::Reverse(g.len()));

        let n = dataset.len() as f64;
        let train_cutoff = self.fractions.train() * n;
        let valid_cutoff = (self.fractions.train() + self.fractions.valid()) * n;

        let mut train = Vec::new();
        let mut valid = Vec::new();
        let mut test = Vec::new();
        for group in sorted {
            if (train.len() + group.len()) as f64 > train_cutoff {
                if (train.len() + valid.len() + group.len()) as f64 > valid_cutoff {
                    test.extend(group);
                } else {
                    valid.extend(group);
                }
            } else {
                train.extend(group);
            }
        }

        Ok(SplitIndices {
            train,
            valid,
            test,
            crystal: Vec::new(),
        })
    }
}

/// Sequential splitter: the first `train` fraction of rows, then the
/// `valid` fraction, then the remainder.
#[derive(Debug, Clone)]
pub struct IndexSplitter {
    fractions: SplitFractions,
}

impl IndexSplitter {
    /// Create an index splitter with the given target fractions.
    #[must_use]
    pub fn new(fractions: SplitFractions) -> Self {
        Self { fractions }
    }

    fn split(&self, dataset: &Dataset) -> SplitIndices {
        let n = dataset.len();
        let train_end = (self.fractions.train() * n as f64) as usize;
        let valid_end = ((self.fractions.train() + self.fractions.valid()) * n as f64) as usize;
        SplitIndices {
            train: (0..train_end).collect(),
            valid: (train_end..valid_end).collect(),
            test: (valid_end..n).collect(),
            crystal: Vec::new(),
        }
    }
}

/// Splitter over caller-supplied validation and test index lists; every
/// remaining sample goes to train.
#[derive(Debug, Clone)]
pub struct IndiceSplitter {
    valid_indices: Vec<usize>,
    test_indices: Vec<usize>,
}

impl IndiceSplitter {
    /// Create an indice splitter from explicit valid/test index lists.
    #[must_use]
    pub fn new(valid_indices: Vec<usize>, test_indices: Vec<usize>) -> Self {
        Self {
            valid_indices,
            test_indices,
        }
    }

    fn split(&self, dataset: &Dataset) -> Result<SplitIndices, DataError> {
        let n = dataset.len();
        let mut claimed = vec![false; n];
        for &i in self.valid_indices.iter().chain(&self.test_indices) {
            if i >= n {
                return Err(DataError::SampleIndexOutOfBounds { index: i, len: n });
            }
            if claimed[i] {
                return Err(DataError::OverlappingIndices { index: i });
            }
            claimed[i] = true;
        }
        let train = (0..n).filter(|&i| !claimed[i]).collect();
        Ok(SplitIndices {
            train,
            valid: self.valid_indices.clone(),
            test: self.test_indices.clone(),
            crystal: Vec::new(),
        })
    }
}

/// Splitter over curated per-sample assignments.
///
/// The only strategy that produces a crystal partition.
#[derive(Debug, Clone)]
pub struct SpecifiedSplitter {
    assignments: Vec<SplitAssignment>,
}

impl SpecifiedSplitter {
    /// Create a specified splitter from per-sample assignments.
    #[must_use]
    pub fn new(assignments: Vec<SplitAssignment>) -> Self {
        Self { assignments }
    }

    fn split(&self, dataset: &Dataset) -> Result<SplitIndices, DataError> {
        if self.assignments.len() != dataset.len() {
            return Err(DataError::AssignmentLengthMismatch {
                expected: dataset.len(),
                got: self.assignments.len(),
            });
        }
        let mut indices = SplitIndices {
            train: Vec::new(),
            valid: Vec::new(),
            test: Vec::new(),
            crystal: Vec::new(),
        };
        for (i, assignment) in self.assignments.iter().enumerate() {
            match assignment {
                SplitAssignment::Train => indices.train.push(i),
                SplitAssignment::Valid => indices.valid.push(i),
                SplitAssignment::Test => indices.test.push(i),
                SplitAssignment::Crystal => indices.crystal.push(i),
            }
        }
        Ok(indices)
    }
}
