//! Data structures for beta-diversity analyses.

mod distance_matrix;
mod feature_table;
mod grouping;
mod metadata;
mod tree;

pub use distance_matrix::DistanceMatrix;
pub use feature_table::FeatureTable;
pub use grouping::Grouping;
pub use metadata::{CategoryColumn, Metadata, Variable, VariableType};
pub use tree::{Node, NodeId, PhyloTree};
