//! Error types for bacebench-data.

use std::path::PathBuf;

/// Errors from dataset reading, splitting, transformation, and loading.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when a mode string is neither `classification` nor `regression`.
    #[error("invalid mode \"{mode}\" (expected classification or regression)")]
    InvalidMode {
        /// The unrecognized mode string.
        mode: String,
    },

    /// Returned when a split ratio string is neither `20-80` nor `80-20`.
    #[error("invalid split ratio \"{ratio}\" (expected 20-80 or 80-20)")]
    InvalidSplitRatio {
        /// The unrecognized ratio string.
        ratio: String,
    },

    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a required column is absent from the header.
    #[error("missing column \"{column}\" in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// Name of the missing column.
        column: String,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyTable {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a numeric cell is NaN, Inf, or unparseable.
    #[error("non-finite value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Name of the offending column.
        column: String,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when the same molecule ID appears more than once.
    #[error("duplicate molecule ID \"{id}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicateMoleculeId {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated molecule ID.
        id: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when a split-assignment cell is not Train/Valid/Test/Crystal.
    #[error("unknown assignment \"{value}\" in {path}: row {row_index}, column \"{column}\"")]
    UnknownAssignment {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Name of the assignment column.
        column: String,
        /// The unrecognized cell value.
        value: String,
    },

    /// Returned when parallel dataset vectors have differing lengths.
    #[error("dataset field \"{field}\" has length {got}, expected {expected}")]
    ParallelLengthMismatch {
        /// Name of the offending field.
        field: &'static str,
        /// Expected length (number of samples).
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Returned when a feature row differs in width from the feature names.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// Zero-based index of the offending sample.
        sample_index: usize,
        /// Expected number of features.
        expected: usize,
        /// Actual number of features.
        got: usize,
    },

    /// Returned when a label row differs in width from the task list.
    #[error("sample {sample_index} has {got} labels, expected {expected}")]
    TaskArityMismatch {
        /// Zero-based index of the offending sample.
        sample_index: usize,
        /// Expected number of labels (tasks).
        expected: usize,
        /// Actual number of labels.
        got: usize,
    },

    /// Returned when a sample index is past the end of a dataset.
    #[error("sample index {index} out of bounds for dataset of length {len}")]
    SampleIndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The dataset length.
        len: usize,
    },

    /// Returned when a task index is past the end of the task list.
    #[error("task index {index} out of bounds for {n_tasks} tasks")]
    TaskIndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The number of tasks.
        n_tasks: usize,
    },

    /// Returned when split fractions are not positive or exceed 1.0 in total.
    #[error("invalid split fractions train={train}, valid={valid}, test={test}")]
    InvalidFractions {
        /// Requested train fraction.
        train: f64,
        /// Requested validation fraction.
        valid: f64,
        /// Requested test fraction.
        test: f64,
    },

    /// Returned when explicit valid/test index lists overlap.
    #[error("sample index {index} appears in more than one partition")]
    OverlappingIndices {
        /// The index assigned twice.
        index: usize,
    },

    /// Returned when the assignment list length differs from the dataset.
    #[error("assignment list has length {got}, expected {expected}")]
    AssignmentLengthMismatch {
        /// Expected length (number of samples).
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Returned when n_folds is zero or exceeds the number of tasks.
    #[error("n_folds must be in [1, {n_tasks}], got {n_folds}")]
    InvalidFoldCount {
        /// The invalid fold count.
        n_folds: usize,
        /// The number of tasks available.
        n_tasks: usize,
    },

    /// Returned when task folds cannot be merged back into one dataset.
    #[error("task fold {fold} does not align with fold 0: {detail}")]
    FoldMergeMismatch {
        /// Zero-based index of the offending fold.
        fold: usize,
        /// What failed to align.
        detail: String,
    },

    /// Returned when a transformer is fit on an empty partition.
    #[error("cannot fit transformer on empty partition")]
    EmptyFitPartition,

    /// Returned when a clipping bound is not a positive finite number.
    #[error("clip bound must be positive and finite, got {max_abs}")]
    InvalidClipBound {
        /// The invalid bound.
        max_abs: f64,
    },
}
