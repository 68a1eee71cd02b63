//! Analysis drivers: one public entry point per beta-diversity analysis.
//!
//! Each driver aligns its inputs, delegates the statistics to
//! [`crate::stats`] / [`crate::diversity`], writes tabular artifacts into a
//! caller-supplied output directory, and returns a serializable report for
//! the rendering layer.

mod bioenv;
mod group_significance;
mod mantel;
mod rarefaction;

pub use bioenv::{bioenv, BioenvReport};
pub use group_significance::{
    beta_group_significance, distance_boxplot_data, GroupBoxplotData, GroupSignificanceReport,
    PairwiseComparison, TestMethod,
};
pub use mantel::{mantel, MantelReport};
pub use rarefaction::{beta_rarefaction, BetaRarefactionReport};
