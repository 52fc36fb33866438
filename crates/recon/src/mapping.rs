use std::collections::HashMap;

use crate::config::{MatchType, MatchingConfig, MatchingRule};
use crate::model::{Side, Transaction, TransactionId};
use crate::parse::{amount_or_zero, parse_date};
use crate::source::ParsedSource;

/// Which column plays each normalized role for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub amount: Option<String>,
    pub date: Option<String>,
    pub reference: Option<String>,
}

impl ColumnMapping {
    /// Derive the mapping for `side` from the rule set.
    ///
    /// The first `tolerance_numeric` rule names the amount column, the first
    /// `tolerance_date` rule the date column and the first `exact` rule the
    /// reference column. A role with no such rule falls back to the header at
    /// its position: amount first, date second, reference third.
    pub fn derive(config: &MatchingConfig, side: Side, headers: &[String]) -> Self {
        let column = |rule: &MatchingRule| match side {
            Side::A => rule.column_a.clone(),
            Side::B => rule.column_b.clone(),
        };
        let role = |match_type: MatchType, position: usize| {
            config
                .first_of(match_type)
                .map(column)
                .or_else(|| headers.get(position).cloned())
        };

        Self {
            amount: role(MatchType::ToleranceNumeric, 0),
            date: role(MatchType::ToleranceDate, 1),
            reference: role(MatchType::Exact, 2),
        }
    }
}

/// Issues transaction ids for one run.
///
/// Ids are `<side>-<n>` with `n` counting from 1 across both sides, so two
/// generators never need to coordinate within a run.
#[derive(Debug, Default)]
pub struct IdGenerator {
    issued: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, side: Side) -> TransactionId {
        self.issued += 1;
        TransactionId(format!("{}-{}", side.to_string().to_lowercase(), self.issued))
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }
}

/// Turn raw rows into transactions.
///
/// Unparseable amounts become 0 and unparseable dates become `None`; raw
/// cells are kept untouched for rule scoring.
pub fn normalize_rows(
    side: Side,
    rows: &[HashMap<String, String>],
    mapping: &ColumnMapping,
    ids: &mut IdGenerator,
) -> Vec<Transaction> {
    let cell = |row: &HashMap<String, String>, column: &Option<String>| -> String {
        column
            .as_deref()
            .and_then(|c| row.get(c))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    rows.iter()
        .enumerate()
        .map(|(row_index, row)| Transaction {
            id: ids.next_id(side),
            source: side,
            amount: amount_or_zero(&cell(row, &mapping.amount)),
            date: parse_date(&cell(row, &mapping.date)),
            reference: cell(row, &mapping.reference),
            row_index,
            raw: row.clone(),
        })
        .collect()
}

/// Derive the mapping for `source` and normalize all of its rows.
///
/// `row_index` is the row's data-record position in `source`, so blank rows
/// the reader skipped leave gaps.
pub fn load_transactions(
    config: &MatchingConfig,
    side: Side,
    source: &ParsedSource,
    ids: &mut IdGenerator,
) -> Vec<Transaction> {
    let mapping = ColumnMapping::derive(config, side, &source.headers);
    log::debug!(
        "source {side} mapping: amount={:?} date={:?} reference={:?}",
        mapping.amount,
        mapping.date,
        mapping.reference
    );
    let mut transactions = normalize_rows(side, &source.rows, &mapping, ids);
    for (txn, &position) in transactions.iter_mut().zip(&source.positions) {
        txn.row_index = position;
    }
    transactions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NumericMode;
    use chrono::NaiveDate;

    fn rule(id: &str, a: &str, b: &str, match_type: MatchType) -> MatchingRule {
        MatchingRule {
            id: id.into(),
            column_a: a.into(),
            column_b: b.into(),
            match_type,
            weight: 1.0,
            tolerance_value: None,
            tolerance_numeric_mode: NumericMode::Fixed,
            similarity_threshold: None,
        }
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn roles_come_from_first_rule_of_each_type() {
        let config = MatchingConfig {
            rules: vec![
                rule("memo", "Memo", "Description", MatchType::SimilarText),
                rule("amt", "Amount", "Debit", MatchType::ToleranceNumeric),
                rule("amt2", "Fee", "Fee", MatchType::ToleranceNumeric),
                rule("when", "Posted", "Date", MatchType::ToleranceDate),
                rule("ref", "Check", "Ref", MatchType::Exact),
            ],
            ..MatchingConfig::default()
        };
        let h = headers(&["x", "y", "z"]);

        let a = ColumnMapping::derive(&config, Side::A, &h);
        assert_eq!(a.amount.as_deref(), Some("Amount"));
        assert_eq!(a.date.as_deref(), Some("Posted"));
        assert_eq!(a.reference.as_deref(), Some("Check"));

        let b = ColumnMapping::derive(&config, Side::B, &h);
        assert_eq!(b.amount.as_deref(), Some("Debit"));
        assert_eq!(b.date.as_deref(), Some("Date"));
        assert_eq!(b.reference.as_deref(), Some("Ref"));
    }

    #[test]
    fn positional_fallback() {
        let config = MatchingConfig {
            rules: vec![rule("when", "Posted", "Posted", MatchType::ToleranceDate)],
            ..MatchingConfig::default()
        };
        let m = ColumnMapping::derive(&config, Side::A, &headers(&["total", "day", "memo", "extra"]));
        assert_eq!(m.amount.as_deref(), Some("total"));
        assert_eq!(m.date.as_deref(), Some("Posted"));
        assert_eq!(m.reference.as_deref(), Some("memo"));

        let short = ColumnMapping::derive(&MatchingConfig::default(), Side::B, &headers(&["only"]));
        assert_eq!(short.amount.as_deref(), Some("only"));
        assert_eq!(short.date, None);
        assert_eq!(short.reference, None);
    }

    #[test]
    fn ids_are_unique_across_sides() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_id(Side::A).as_str(), "a-1");
        assert_eq!(ids.next_id(Side::B).as_str(), "b-2");
        assert_eq!(ids.next_id(Side::A).as_str(), "a-3");
        assert_eq!(ids.issued(), 3);
    }

    #[test]
    fn normalizes_cells_leniently() {
        let rows: Vec<HashMap<String, String>> = vec![
            [("amt", " $1,250.50 "), ("day", "01/15/2024"), ("ref", " INV-7 ")],
            [("amt", "n/a"), ("day", "someday"), ("ref", "")],
        ]
        .into_iter()
        .map(|r| r.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
        .collect();
        let mapping = ColumnMapping {
            amount: Some("amt".into()),
            date: Some("day".into()),
            reference: Some("ref".into()),
        };
        let txns = normalize_rows(Side::A, &rows, &mapping, &mut IdGenerator::new());

        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].amount, 1250.5);
        assert_eq!(txns[0].date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(txns[0].reference, "INV-7");
        assert_eq!(txns[0].raw["amt"], " $1,250.50 ");
        assert_eq!(txns[1].amount, 0.0);
        assert_eq!(txns[1].date, None);
        assert_eq!(txns[1].row_index, 1);
    }

    #[test]
    fn row_index_follows_source_positions() {
        let source = ParsedSource::from_csv(Side::B, "amount,ref\n10,x\n,\n20,y\n").unwrap();
        let txns = load_transactions(&MatchingConfig::default(), Side::B, &source, &mut IdGenerator::new());

        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].row_index, 0);
        assert_eq!(txns[1].row_index, 2);
        assert_eq!(txns[1].amount, 20.0);
    }
}
