use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{Assignment, ReconciliationResult};

/// Summary counts for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconStats {
    pub total_a: usize,
    pub total_b: usize,
    /// Number of matches (a group counts once).
    pub matched_count: usize,
    pub unmatched_a_count: usize,
    pub unmatched_b_count: usize,
    /// Share of all input transactions that ended up inside a match, in [0, 1].
    pub match_rate: f64,
    pub processing_time_ms: u64,
}

impl ReconStats {
    pub fn from_result(result: &ReconciliationResult, elapsed: Duration) -> Self {
        let in_matches_a: usize = result.matched.iter().map(|m| m.transactions_a.len()).sum();
        let in_matches_b: usize = result.matched.iter().map(|m| m.transactions_b.len()).sum();
        Self::tally(
            in_matches_a + result.unmatched_a.len(),
            in_matches_b + result.unmatched_b.len(),
            result.matched.len(),
            result.unmatched_a.len(),
            result.unmatched_b.len(),
            elapsed,
        )
    }

    pub fn from_assignment(assignment: &Assignment, elapsed: Duration) -> Self {
        let in_matches_a: usize = assignment.matched.iter().map(|m| m.a.len()).sum();
        let in_matches_b: usize = assignment.matched.iter().map(|m| m.b.len()).sum();
        Self::tally(
            in_matches_a + assignment.unmatched_a.len(),
            in_matches_b + assignment.unmatched_b.len(),
            assignment.matched.len(),
            assignment.unmatched_a.len(),
            assignment.unmatched_b.len(),
            elapsed,
        )
    }

    fn tally(
        total_a: usize,
        total_b: usize,
        matched_count: usize,
        unmatched_a_count: usize,
        unmatched_b_count: usize,
        elapsed: Duration,
    ) -> Self {
        let total = total_a + total_b;
        let unmatched = unmatched_a_count + unmatched_b_count;
        let match_rate = if total == 0 {
            0.0
        } else {
            (total - unmatched) as f64 / total as f64
        };
        Self {
            total_a,
            total_b,
            matched_count,
            unmatched_a_count,
            unmatched_b_count,
            match_rate,
            processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
