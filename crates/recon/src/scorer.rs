use crate::cache::SimilarityCache;
use crate::config::{MatchType, MatchingConfig, MatchingRule, DATE_DECAY, NUMERIC_DECAY};
use crate::model::Transaction;
use crate::parse::{amount_or_zero, parse_date};
use crate::similarity::normalize_text;

/// Score given when one value contains the other under an `exact` rule.
const CONTAINS_CREDIT: f64 = 0.8;

/// Score of one candidate pair under one rule, in [0, 1].
pub fn score_rule(
    rule: &MatchingRule,
    rule_index: usize,
    a: &Transaction,
    b: &Transaction,
    cache: &mut SimilarityCache,
) -> f64 {
    let val_a = a.cell(&rule.column_a);
    let val_b = b.cell(&rule.column_b);
    if val_a.is_empty() || val_b.is_empty() {
        return 0.0;
    }

    match rule.match_type {
        MatchType::Exact => score_exact(val_a, val_b),
        MatchType::ToleranceNumeric => {
            let num_a = amount_or_zero(val_a);
            let num_b = amount_or_zero(val_b);
            let tolerance = rule.amount_tolerance(num_a.max(num_b));
            decay_score((num_a - num_b).abs(), tolerance, NUMERIC_DECAY)
        }
        MatchType::ToleranceDate => match (parse_date(val_a), parse_date(val_b)) {
            (Some(da), Some(db)) => {
                let diff_days = (da - db).num_days().unsigned_abs() as f64;
                decay_score(diff_days, rule.tolerance(), DATE_DECAY)
            }
            _ => 0.0,
        },
        MatchType::SimilarText => {
            let threshold = rule.similarity_threshold();
            let similarity =
                cache.similarity(rule_index, threshold, &normalize_text(val_a), &normalize_text(val_b));
            if similarity >= threshold {
                similarity
            } else {
                0.0
            }
        }
        MatchType::Contains => {
            let la = val_a.to_lowercase();
            let lb = val_b.to_lowercase();
            if la.contains(&lb) || lb.contains(&la) {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Weighted mean of all rule scores. An empty rule set never qualifies.
pub fn score_pair(
    config: &MatchingConfig,
    a: &Transaction,
    b: &Transaction,
    cache: &mut SimilarityCache,
) -> f64 {
    let total_weight = config.total_weight();
    if config.rules.is_empty() || total_weight <= 0.0 {
        return 0.0;
    }

    let weighted: f64 = config
        .rules
        .iter()
        .enumerate()
        .map(|(index, rule)| score_rule(rule, index, a, b, cache) * rule.effective_weight())
        .sum();

    (weighted / total_weight).clamp(0.0, 1.0)
}

/// Case-insensitive equality, containment, then positional character overlap.
fn score_exact(val_a: &str, val_b: &str) -> f64 {
    let la = val_a.to_lowercase();
    let lb = val_b.to_lowercase();
    if la == lb {
        return 1.0;
    }
    if la.contains(&lb) || lb.contains(&la) {
        return CONTAINS_CREDIT;
    }

    let ca: Vec<char> = la.chars().collect();
    let cb: Vec<char> = lb.chars().collect();
    let same_position = ca.iter().zip(&cb).filter(|(x, y)| x == y).count();
    same_position as f64 / ca.len().max(cb.len()) as f64
}

/// 1 within tolerance, then linear decay reaching 0 at `decay` × tolerance.
fn decay_score(diff: f64, tolerance: f64, decay: f64) -> f64 {
    if diff <= tolerance {
        return 1.0;
    }
    if tolerance <= 0.0 {
        return 0.0;
    }
    (1.0 - diff / (tolerance * decay)).max(0.0)
}
