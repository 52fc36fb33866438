use ordered_float::OrderedFloat;

use crate::cache::SimilarityCache;
use crate::config::{MatchingConfig, MAX_CROSS_PRODUCT};
use crate::error::ReconError;
use crate::model::{Assignment, IndexedMatch, MatchKind, Transaction};
use crate::prefilter::AmountIndex;
use crate::scorer::score_pair;

/// A scored pair above threshold, as positions into the input slices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub a: usize,
    pub b: usize,
    pub confidence: f64,
}

/// Reject brute-force runs whose cross product exceeds the comparison cap.
///
/// A `tolerance_numeric` rule lifts the cap because the amount index
/// bounds the comparisons actually made.
pub fn check_size(config: &MatchingConfig, len_a: usize, len_b: usize) -> Result<(), ReconError> {
    if config.numeric_rule().is_some() {
        return Ok(());
    }
    let comparisons = len_a as u128 * len_b as u128;
    if comparisons > u128::from(MAX_CROSS_PRODUCT) {
        return Err(ReconError::TooManyComparisons { comparisons, limit: MAX_CROSS_PRODUCT });
    }
    Ok(())
}

/// Score every admissible pair and keep those at or above the threshold.
///
/// Pairs scoring exactly 0 never qualify, even with a 0 threshold.
pub fn generate_candidates(
    config: &MatchingConfig,
    transactions_a: &[Transaction],
    transactions_b: &[Transaction],
    cache: &mut SimilarityCache,
) -> Vec<Candidate> {
    if config.rules.is_empty() {
        return Vec::new();
    }
    let threshold = config.min_confidence_threshold;
    let mut candidates = Vec::new();
    let mut scored: u64 = 0;

    let mut consider = |ai: usize, bi: usize| {
        scored += 1;
        let confidence = score_pair(config, &transactions_a[ai], &transactions_b[bi], cache);
        if confidence > 0.0 && confidence >= threshold {
            candidates.push(Candidate { a: ai, b: bi, confidence });
        }
    };

    match config.numeric_rule() {
        Some(rule) => {
            let index = AmountIndex::build(rule, transactions_b);
            for (ai, a) in transactions_a.iter().enumerate() {
                for &bi in index.candidates(index.key_for(a)) {
                    consider(ai, bi);
                }
            }
        }
        None => {
            for ai in 0..transactions_a.len() {
                for bi in 0..transactions_b.len() {
                    consider(ai, bi);
                }
            }
        }
    }

    log::debug!(
        "scored {scored} of {} possible pairs, {} at or above threshold {threshold}",
        transactions_a.len() as u128 * transactions_b.len() as u128,
        candidates.len(),
    );
    candidates
}

/// Order candidates best-first; ties go to the lower A row, then the lower B row.
pub fn sort_candidates(
    candidates: &mut [Candidate],
    transactions_a: &[Transaction],
    transactions_b: &[Transaction],
) {
    candidates.sort_by(|x, y| {
        OrderedFloat(y.confidence)
            .cmp(&OrderedFloat(x.confidence))
            .then_with(|| transactions_a[x.a].row_index.cmp(&transactions_a[y.a].row_index))
            .then_with(|| transactions_b[x.b].row_index.cmp(&transactions_b[y.b].row_index))
            .then_with(|| x.a.cmp(&y.a))
            .then_with(|| x.b.cmp(&y.b))
    });
}

/// Greedily claim sorted candidates whose endpoints are both still free.
pub fn assign_greedy(candidates: &[Candidate], len_a: usize, len_b: usize) -> Assignment {
    let mut used_a = vec![false; len_a];
    let mut used_b = vec![false; len_b];
    let mut matched = Vec::new();

    for c in candidates {
        if used_a[c.a] || used_b[c.b] {
            continue;
        }
        used_a[c.a] = true;
        used_b[c.b] = true;
        matched.push(IndexedMatch {
            a: vec![c.a],
            b: vec![c.b],
            confidence: c.confidence,
            kind: MatchKind::OneToOne,
        });
    }

    Assignment {
        matched,
        unmatched_a: (0..len_a).filter(|&i| !used_a[i]).collect(),
        unmatched_b: (0..len_b).filter(|&i| !used_b[i]).collect(),
    }
}

/// One-to-one pass over the full input.
pub fn match_one_to_one(
    config: &MatchingConfig,
    transactions_a: &[Transaction],
    transactions_b: &[Transaction],
) -> Result<Assignment, ReconError> {
    check_size(config, transactions_a.len(), transactions_b.len())?;

    let mut cache = SimilarityCache::build(config, transactions_a, transactions_b);
    let mut candidates = generate_candidates(config, transactions_a, transactions_b, &mut cache);
    sort_candidates(&mut candidates, transactions_a, transactions_b);

    let assignment = assign_greedy(&candidates, transactions_a.len(), transactions_b.len());
    log::debug!(
        "one-to-one: {} matched, {} A and {} B left over",
        assignment.matched.len(),
        assignment.unmatched_a.len(),
        assignment.unmatched_b.len(),
    );
    Ok(assignment)
}
