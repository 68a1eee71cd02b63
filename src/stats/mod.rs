//! Statistical routines backing the analysis drivers.

pub mod bioenv;
pub mod correction;
pub mod correlation;
pub mod mantel;
pub mod permutation;
pub mod rank;
pub(crate) mod rng;

pub use bioenv::{bioenv, BioenvResult, BioenvRow};
pub use correction::correct_bh;
pub use correlation::{correlate, pearson, spearman, CorrelationMatrix, CorrelationMethod};
pub use mantel::{mantel, pairwise_mantel, MantelResult, PairwiseMantelRow};
pub use permutation::{anosim, permanova, SignificanceResult};
