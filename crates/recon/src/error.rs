use thiserror::Error;

use crate::model::Side;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML / JSON parse or deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (threshold out of range, bad tolerance, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Wire request JSON could not be decoded.
    #[error("request parse error: {0}")]
    RequestParse(String),
    /// Brute-force scoring would exceed the comparison cap.
    #[error(
        "{comparisons} pairwise comparisons exceed the limit of {limit}; \
         add a tolerance_numeric rule so candidates can be pre-filtered by amount"
    )]
    TooManyComparisons { comparisons: u128, limit: u64 },
    /// Combined row count exceeds the platform cap.
    #[error("{rows} rows exceed the limit of {limit}")]
    TooManyRows { rows: usize, limit: usize },
    /// Source CSV could not be read.
    #[error("source {side}: CSV error: {message}")]
    Csv { side: Side, message: String },
    /// A staged source could not be retrieved.
    #[error("cannot fetch staged source '{url}': {message}")]
    StagedFetch { url: String, message: String },
}

impl ReconError {
    /// True for the fatal sizing class: the run was rejected before any work.
    pub fn is_size_error(&self) -> bool {
        matches!(self, Self::TooManyComparisons { .. } | Self::TooManyRows { .. })
    }
}
