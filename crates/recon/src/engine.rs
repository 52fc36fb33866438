use crate::config::{MatchingConfig, MatchingType};
use crate::error::ReconError;
use crate::group::match_groups;
use crate::matcher::match_one_to_one;
use crate::model::{Assignment, ReconciliationResult, Transaction};

/// Reconcile two transaction sets per config.
///
/// Deterministic for a given input order. Fails only on the sizing checks,
/// before any scoring happens.
pub fn run(
    transactions_a: &[Transaction],
    transactions_b: &[Transaction],
    config: &MatchingConfig,
) -> Result<ReconciliationResult, ReconError> {
    let assignment = run_assignment(transactions_a, transactions_b, config)?;
    Ok(assignment.resolve(transactions_a, transactions_b, config))
}

/// Same as [`run`], but returns positions into the inputs instead of cloned records.
pub fn run_assignment(
    transactions_a: &[Transaction],
    transactions_b: &[Transaction],
    config: &MatchingConfig,
) -> Result<Assignment, ReconError> {
    for warning in config.warnings() {
        log::warn!("{warning}");
    }

    let mut assignment = match_one_to_one(config, transactions_a, transactions_b)?;
    let one_to_one = assignment.matched.len();

    if config.matching_type == MatchingType::Group
        && !assignment.unmatched_a.is_empty()
        && !assignment.unmatched_b.is_empty()
    {
        let grouped = match_groups(
            config,
            transactions_a,
            transactions_b,
            &assignment.unmatched_a,
            &assignment.unmatched_b,
        );
        assignment.matched.extend(grouped.matched);
        assignment.unmatched_a = grouped.unmatched_a;
        assignment.unmatched_b = grouped.unmatched_b;
    }

    log::info!(
        "reconciled {} A x {} B: {} one-to-one, {} group, {} A and {} B unmatched",
        transactions_a.len(),
        transactions_b.len(),
        one_to_one,
        assignment.matched.len() - one_to_one,
        assignment.unmatched_a.len(),
        assignment.unmatched_b.len(),
    );
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchType, MatchingRule, NumericMode};
    use crate::model::{MatchKind, Side, TransactionId};

    fn txn(side: Side, i: usize, amount: f64, reference: &str) -> Transaction {
        Transaction {
            id: TransactionId(format!("{side}{i}")),
            source: side,
            amount,
            date: None,
            reference: reference.into(),
            row_index: i,
            raw: [
                ("amount".to_string(), amount.to_string()),
                ("ref".to_string(), reference.to_string()),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn amount_config(matching_type: MatchingType) -> MatchingConfig {
        MatchingConfig {
            rules: vec![MatchingRule {
                id: "amount".into(),
                column_a: "amount".into(),
                column_b: "amount".into(),
                match_type: MatchType::ToleranceNumeric,
                weight: 1.0,
                tolerance_value: Some(1.0),
                tolerance_numeric_mode: NumericMode::Fixed,
                similarity_threshold: None,
            }],
            min_confidence_threshold: 0.95,
            matching_type,
            ..MatchingConfig::default()
        }
    }

    #[test]
    fn one_to_one_then_groups() {
        let a = vec![txn(Side::A, 0, 50.0, "x"), txn(Side::A, 1, 300.0, "y")];
        let b = vec![
            txn(Side::B, 0, 100.0, ""),
            txn(Side::B, 1, 50.0, ""),
            txn(Side::B, 2, 100.0, ""),
            txn(Side::B, 3, 100.0, ""),
        ];
        let result = run(&a, &b, &amount_config(MatchingType::Group)).unwrap();

        assert_eq!(result.matched.len(), 2);
        assert_eq!(result.matched[0].kind, MatchKind::OneToOne);
        assert_eq!(result.matched[0].transactions_b[0].id.as_str(), "B1");
        assert_eq!(result.matched[1].kind, MatchKind::OneToMany);
        assert_eq!(result.matched[1].transactions_b.len(), 3);
        assert!(result.unmatched_a.is_empty());
        assert!(result.unmatched_b.is_empty());
    }

    #[test]
    fn one_to_one_mode_skips_groups() {
        let a = vec![txn(Side::A, 0, 300.0, "")];
        let b = vec![txn(Side::B, 0, 100.0, ""), txn(Side::B, 1, 200.0, "")];
        let result = run(&a, &b, &amount_config(MatchingType::OneToOne)).unwrap();
        assert!(result.matched.is_empty());
        assert_eq!(result.unmatched_a.len(), 1);
        assert_eq!(result.unmatched_b.len(), 2);
    }

    #[test]
    fn result_echoes_config() {
        let config = amount_config(MatchingType::OneToOne);
        let result = run(&[], &[], &config).unwrap();
        assert_eq!(result.config.min_confidence_threshold, 0.95);
        assert!(result.matched.is_empty());
    }

    #[test]
    fn assignment_and_result_agree() {
        let a = vec![txn(Side::A, 0, 10.0, ""), txn(Side::A, 1, 20.0, "")];
        let b = vec![txn(Side::B, 0, 20.0, ""), txn(Side::B, 1, 99.0, "")];
        let config = amount_config(MatchingType::Group);
        let assignment = run_assignment(&a, &b, &config).unwrap();
        let result = run(&a, &b, &config).unwrap();

        assert_eq!(assignment.matched.len(), result.matched.len());
        assert_eq!(assignment.matched[0].a, vec![1]);
        assert_eq!(assignment.matched[0].b, vec![0]);
        assert_eq!(assignment.unmatched_a, vec![0]);
        assert_eq!(assignment.unmatched_b, vec![1]);
    }
}
