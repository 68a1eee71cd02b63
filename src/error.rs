//! Error types for the betadiv library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum BetaDivError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown {param} '{value}'. The available options are: {choices}")]
    InvalidOption {
        param: String,
        value: String,
        choices: String,
    },

    #[error(
        "A phylogenetic metric ({0}) was requested, but a phylogenetic tree \
         was not provided. Phylogeny must be provided when using a \
         phylogenetic diversity metric."
    )]
    MissingPhylogeny(String),

    #[error("The following ID(s) are not contained in both inputs: {0}")]
    IdMismatch(String),

    #[error("Missing column '{0}' in metadata")]
    MissingColumn(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BetaDivError {
    /// Build an [`BetaDivError::InvalidOption`] from a parameter name, the
    /// rejected value, and the list of accepted values.
    pub fn invalid_option(param: &str, value: &str, choices: &[&str]) -> Self {
        Self::InvalidOption {
            param: param.to_string(),
            value: value.to_string(),
            choices: choices.join(", "),
        }
    }

    /// Build an [`BetaDivError::IdMismatch`] listing every offending id in
    /// sorted order.
    pub fn id_mismatch<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        ids.sort();
        Self::IdMismatch(ids.join(", "))
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, BetaDivError>;
