//! Error types for bacebench-eval.

use std::path::PathBuf;

use bacebench_data::DataError;
use bacebench_rf::RfError;

/// Errors from metric evaluation, model building, and hyperparameter search.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Returned when a parameter grid has no axes.
    #[error("hyperparameter grid has no axes")]
    EmptyGrid,

    /// Returned when a grid axis has no candidate values.
    #[error("grid axis \"{name}\" has no candidate values")]
    EmptyGridAxis {
        /// Name of the offending axis.
        name: String,
    },

    /// Returned when the same axis name is declared twice.
    #[error("grid axis \"{name}\" declared twice")]
    DuplicateGridAxis {
        /// Name of the duplicated axis.
        name: String,
    },

    /// Returned when a parameter point lacks a required parameter.
    #[error("parameter point is missing \"{name}\"")]
    MissingParam {
        /// Name of the missing parameter.
        name: String,
    },

    /// Returned when a parameter value cannot be used for its parameter.
    #[error("invalid value \"{value}\" for parameter \"{name}\" (expected {expected})")]
    InvalidParamValue {
        /// Name of the parameter.
        name: String,
        /// Display form of the rejected value.
        value: String,
        /// What would have been accepted.
        expected: &'static str,
    },

    /// Returned when a partition required to have samples is empty.
    #[error("partition has zero samples")]
    EmptyPartition,

    /// Returned when the model directory cannot be created.
    #[error("cannot create model directory {path}")]
    ModelDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the per-sample predictions CSV cannot be written.
    #[error("cannot write predictions CSV {path}")]
    WritePredictions {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the summary statistics file cannot be written.
    #[error("cannot write stats file {path}")]
    WriteStats {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Forest training or prediction error.
    #[error(transparent)]
    Forest(#[from] RfError),

    /// Dataset error.
    #[error(transparent)]
    Data(#[from] DataError),
}
