//! `matchbook-recon`: two-source transaction matching engine.
//!
//! Pure engine crate: receives normalized transactions and a rule set,
//! returns matched and unmatched transactions. No filesystem or network IO;
//! staged sources are resolved through a caller-supplied [`wire::StagedSource`].

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod group;
pub mod mapping;
pub mod matcher;
pub mod model;
pub mod parse;
pub mod prefilter;
pub mod scorer;
pub mod similarity;
pub mod source;
pub mod stats;
pub mod wire;

pub use config::{MatchType, MatchingConfig, MatchingRule, MatchingType};
pub use engine::{run, run_assignment};
pub use error::ReconError;
pub use model::{MatchKind, MatchResult, ReconciliationResult, Side, Transaction, TransactionId};
pub use stats::ReconStats;
