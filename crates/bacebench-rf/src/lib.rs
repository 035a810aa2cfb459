//! Random forests for molecular property prediction.
//!
//! Hand-rolled CART ensembles covering both tasks the workflow needs:
//! classification (Gini/entropy splits, averaged leaf distributions) and
//! regression (variance-reduction splits, averaged leaf means). Training
//! is parallel via rayon, fully deterministic under a fixed seed, and
//! models persist to disk through a versioned bincode envelope.

mod config;
mod error;
mod forest;
mod node;
mod predict;
mod serialize;
mod split;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use error::RfError;
pub use forest::RandomForest;
pub use node::{FeatureIndex, Impurity, LeafValue, Node, NodeIndex, TreeTask};
pub use predict::ClassDistribution;
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
