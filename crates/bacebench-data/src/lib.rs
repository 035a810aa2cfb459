//! BACE dataset loading, splitting, and transformation.
//!
//! Provides the validated CSV reader, the closed set of splitting
//! strategies (scaffold, index, indice, specified, task-level), fit-once
//! transformers, and the loader that assembles the four workflow
//! partitions.

mod domain;
mod error;
mod loader;
mod reader;
mod scaffold;
mod splits;
mod task_split;
mod transform;

pub use domain::{Dataset, Mode, MoleculeId, SplitAssignment, SplitRatio, TaskName};
pub use error::DataError;
pub use loader::{BaceLoader, LoadedBace};
pub use reader::{BaceReader, BaceTable};
pub use scaffold::scaffold_key;
pub use splits::{
    IndexSplitter, IndiceSplitter, ScaffoldSplitter, SpecifiedSplitter, SplitFractions,
    SplitIndices, SplitStrategy,
};
pub use task_split::{TaskSplitter, merge_task_folds};
pub use transform::{Clipping, Normalization, Transformer};
