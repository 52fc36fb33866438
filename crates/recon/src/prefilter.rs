use crate::config::{MatchingRule, NumericMode, PREFILTER_WIDENING};
use crate::model::Transaction;
use crate::parse::amount_or_zero;

/// B-side transactions sorted by a numeric rule's column, for range lookups.
///
/// Only B transactions whose value falls inside the widened window around an
/// A amount are scored against it; everything else cannot reach threshold
/// on the amount rule alone and is skipped.
#[derive(Debug)]
pub struct AmountIndex<'r> {
    rule: &'r MatchingRule,
    /// Positions into the B slice, ordered by value then position.
    order: Vec<usize>,
    /// `values[i]` is the parsed amount of `order[i]`.
    values: Vec<f64>,
}

impl<'r> AmountIndex<'r> {
    pub fn build(rule: &'r MatchingRule, transactions_b: &[Transaction]) -> Self {
        let mut keyed: Vec<(f64, usize)> = transactions_b
            .iter()
            .enumerate()
            .map(|(i, t)| (amount_or_zero(t.cell(&rule.column_b)), i))
            .collect();
        keyed.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

        let (values, order) = keyed.into_iter().unzip();
        Self { rule, order, values }
    }

    /// Parsed value of the rule's A column for `a`.
    pub fn key_for(&self, a: &Transaction) -> f64 {
        amount_or_zero(a.cell(&self.rule.column_a))
    }

    /// Half-width of the search window around `amount_a`.
    pub fn window(&self, amount_a: f64) -> f64 {
        let tolerance = self.rule.tolerance();
        match self.rule.tolerance_numeric_mode {
            NumericMode::Fixed => tolerance * PREFILTER_WIDENING,
            NumericMode::Percentage => amount_a.max(1.0) * tolerance * PREFILTER_WIDENING,
        }
    }

    /// B positions whose value lies in `[amount_a - window, amount_a + window]`.
    pub fn candidates(&self, amount_a: f64) -> &[usize] {
        let window = self.window(amount_a);
        let low = amount_a - window;
        let high = amount_a + window;
        let start = self.values.partition_point(|&v| v < low);
        let end = self.values.partition_point(|&v| v <= high);
        &self.order[start..end.max(start)]
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
