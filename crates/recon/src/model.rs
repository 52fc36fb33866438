use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::MatchingConfig;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Which of the two sources a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Identifier of a transaction, unique within one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single normalized row from either source.
///
/// `amount`, `date` and `reference` are extracted through the column mapping;
/// rule scoring always reads the untouched cells in `raw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub source: Side,
    pub amount: f64,
    /// `None` when the cell could not be parsed as a date.
    pub date: Option<NaiveDate>,
    pub reference: String,
    pub row_index: usize,
    pub raw: HashMap<String, String>,
}

impl Transaction {
    /// Trimmed raw cell, or `""` when the column is absent.
    pub fn cell(&self, column: &str) -> &str {
        self.raw.get(column).map(|v| v.trim()).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    OneToOne,
    /// One A transaction explained by several B transactions.
    OneToMany,
    /// Several A transactions explained by one B transaction.
    ManyToOne,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneToOne => write!(f, "one_to_one"),
            Self::OneToMany => write!(f, "one_to_many"),
            Self::ManyToOne => write!(f, "many_to_one"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub transactions_a: Vec<Transaction>,
    pub transactions_b: Vec<Transaction>,
    pub confidence: f64,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub matched: Vec<MatchResult>,
    pub unmatched_a: Vec<Transaction>,
    pub unmatched_b: Vec<Transaction>,
    pub config: MatchingConfig,
}

// ---------------------------------------------------------------------------
// Index-based assignment
// ---------------------------------------------------------------------------

/// One match expressed as positions into the input slices.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedMatch {
    pub a: Vec<usize>,
    pub b: Vec<usize>,
    pub confidence: f64,
    pub kind: MatchKind,
}

/// The engine's assignment over one run, before any transaction is cloned.
///
/// Every input position appears exactly once across `matched`,
/// `unmatched_a` and `unmatched_b`.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    pub matched: Vec<IndexedMatch>,
    pub unmatched_a: Vec<usize>,
    pub unmatched_b: Vec<usize>,
}

impl Assignment {
    /// Materialize full records from the input slices the assignment was computed over.
    pub fn resolve(
        &self,
        transactions_a: &[Transaction],
        transactions_b: &[Transaction],
        config: &MatchingConfig,
    ) -> ReconciliationResult {
        let matched = self
            .matched
            .iter()
            .map(|m| MatchResult {
                transactions_a: m.a.iter().map(|&i| transactions_a[i].clone()).collect(),
                transactions_b: m.b.iter().map(|&i| transactions_b[i].clone()).collect(),
                confidence: m.confidence,
                kind: m.kind,
            })
            .collect();

        ReconciliationResult {
            matched,
            unmatched_a: self.unmatched_a.iter().map(|&i| transactions_a[i].clone()).collect(),
            unmatched_b: self.unmatched_b.iter().map(|&i| transactions_b[i].clone()).collect(),
            config: config.clone(),
        }
    }
}
