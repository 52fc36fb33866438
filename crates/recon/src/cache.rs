use std::collections::{BTreeSet, HashMap};

use crate::config::{MatchType, MatchingConfig, PRECOMPUTE_PAIR_LIMIT};
use crate::model::Transaction;
use crate::similarity::{normalize_text, similarity_at_least};

/// How to read a missing table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Every pair was computed up front; a missing entry means similarity 0.
    Precomputed,
    /// Entries are filled on first use; a missing entry means "not computed yet".
    NotPrecomputed,
}

/// Similarity table for one `similar_text` rule, keyed by normalized A then B value.
#[derive(Debug)]
struct RuleTable {
    mode: CacheMode,
    threshold: f64,
    entries: HashMap<String, HashMap<String, f64>>,
}

impl RuleTable {
    fn lookup(&mut self, a: &str, b: &str) -> f64 {
        if let Some(&hit) = self.entries.get(a).and_then(|row| row.get(b)) {
            return hit;
        }
        match self.mode {
            CacheMode::Precomputed => 0.0,
            CacheMode::NotPrecomputed => {
                let value = similarity_at_least(a, b, self.threshold);
                self.entries
                    .entry(a.to_string())
                    .or_default()
                    .insert(b.to_string(), value);
                value
            }
        }
    }
}

/// Per-run memo of gated string similarity for every `similar_text` rule.
#[derive(Debug, Default)]
pub struct SimilarityCache {
    tables: HashMap<usize, RuleTable>,
}

impl SimilarityCache {
    /// Build tables for each `similar_text` rule of `config`.
    ///
    /// Small distinct-value products are filled eagerly; large ones are
    /// left to fill lazily during scoring.
    pub fn build(config: &MatchingConfig, a: &[Transaction], b: &[Transaction]) -> Self {
        let mut tables = HashMap::new();

        for (index, rule) in config.rules.iter().enumerate() {
            if rule.match_type != MatchType::SimilarText {
                continue;
            }
            let threshold = rule.similarity_threshold();
            let distinct_a = distinct_values(a, &rule.column_a);
            let distinct_b = distinct_values(b, &rule.column_b);

            let product = distinct_a.len().saturating_mul(distinct_b.len());
            let table = if product < PRECOMPUTE_PAIR_LIMIT {
                let mut entries: HashMap<String, HashMap<String, f64>> = HashMap::new();
                for va in &distinct_a {
                    for vb in &distinct_b {
                        let value = similarity_at_least(va, vb, threshold);
                        if value > 0.0 {
                            entries.entry(va.clone()).or_default().insert(vb.clone(), value);
                        }
                    }
                }
                log::debug!(
                    "similarity cache for rule '{}': precomputed {}x{} values, {} non-zero",
                    rule.id,
                    distinct_a.len(),
                    distinct_b.len(),
                    entries.values().map(HashMap::len).sum::<usize>(),
                );
                RuleTable { mode: CacheMode::Precomputed, threshold, entries }
            } else {
                log::debug!(
                    "similarity cache for rule '{}': {}x{} distinct values, computing lazily",
                    rule.id,
                    distinct_a.len(),
                    distinct_b.len(),
                );
                RuleTable { mode: CacheMode::NotPrecomputed, threshold, entries: HashMap::new() }
            };
            tables.insert(index, table);
        }

        Self { tables }
    }

    pub fn mode(&self, rule_index: usize) -> Option<CacheMode> {
        self.tables.get(&rule_index).map(|t| t.mode)
    }

    /// Gated similarity of two normalized values under rule `rule_index`.
    ///
    /// Rules without a table (cache built for another config) are computed directly.
    pub fn similarity(&mut self, rule_index: usize, threshold: f64, a: &str, b: &str) -> f64 {
        match self.tables.get_mut(&rule_index) {
            Some(table) => table.lookup(a, b),
            None => similarity_at_least(a, b, threshold),
        }
    }
}

fn distinct_values(transactions: &[Transaction], column: &str) -> BTreeSet<String> {
    transactions
        .iter()
        .map(|t| normalize_text(t.cell(column)))
        .filter(|v| !v.is_empty())
        .collect()
}
