//! Balance reconciliation for extracted passbook ledgers.
//!
//! The vision model reads ledger rows top to bottom; rows where neither
//! money moved (carry-forward lines, page headers the model mistook for
//! rows) are dropped, then each adjacent pair of known balances is checked
//! against the arithmetic `previous + deposit − withdrawal`.
//!
//! A mismatch is a warning, not an error: noisy scans must not kill the
//! pipeline, and a human reconciles leftovers through manual edits.

use crate::models::PassbookTransaction;

/// Allowed absolute difference between a printed balance and the computed
/// one. Absorbs rounding slack in interest lines.
const BALANCE_TOLERANCE: i64 = 1;

/// Result of running a raw extracted ledger through the engine.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    /// Rows that survived the non-economic filter, original order kept.
    pub transactions: Vec<PassbookTransaction>,
    /// False when at least one adjacent pair of known balances disagrees
    /// with the movement between them.
    pub balances_consistent: bool,
}

/// Filter then verify. The filtered rows are returned even when the
/// balances do not add up.
pub fn reconcile(raw: Vec<PassbookTransaction>) -> ReconciliationReport {
    let transactions = filter_transactions(raw);
    let balances_consistent = verify_balances(&transactions);
    ReconciliationReport {
        transactions,
        balances_consistent,
    }
}

/// Drop rows with no economic movement (withdrawal and deposit both zero).
pub fn filter_transactions(raw: Vec<PassbookTransaction>) -> Vec<PassbookTransaction> {
    raw.into_iter()
        .filter(|tx| !(tx.withdrawal == 0 && tx.deposit == 0))
        .collect()
}

/// Check every adjacent pair with two known balances.
///
/// Pairs where either balance is unknown are skipped, and sequences shorter
/// than two rows are trivially consistent.
pub fn verify_balances(transactions: &[PassbookTransaction]) -> bool {
    if transactions.len() < 2 {
        return true;
    }

    for i in 1..transactions.len() {
        let current = &transactions[i];
        let previous = &transactions[i - 1];

        let (Some(previous_balance), Some(current_balance)) = (previous.balance, current.balance)
        else {
            continue;
        };

        let expected = previous_balance + current.deposit as i64 - current.withdrawal as i64;
        if (current_balance - expected).abs() > BALANCE_TOLERANCE {
            tracing::warn!(
                row = i + 1,
                expected,
                actual = current_balance,
                "残高不一致"
            );
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(withdrawal: u64, deposit: u64, balance: Option<i64>) -> PassbookTransaction {
        PassbookTransaction {
            transaction_date: None,
            withdrawal,
            deposit,
            balance,
            description: String::new(),
        }
    }

    // ── filter_transactions ──

    #[test]
    fn filter_drops_rows_with_no_movement() {
        let rows = vec![tx(0, 0, Some(1000)), tx(0, 500, Some(1500)), tx(0, 0, None)];
        let filtered = filter_transactions(rows);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.iter().all(|t| t.withdrawal != 0 || t.deposit != 0));
    }

    #[test]
    fn filter_keeps_withdrawal_only_and_deposit_only_rows() {
        let rows = vec![tx(300, 0, Some(700)), tx(0, 200, Some(900))];
        assert_eq!(filter_transactions(rows).len(), 2);
    }

    // ── verify_balances ──

    #[test]
    fn empty_and_single_row_sequences_are_consistent() {
        assert!(verify_balances(&[]));
        assert!(verify_balances(&[tx(0, 500, Some(1500))]));
    }

    #[test]
    fn matching_deposit_chain_is_consistent() {
        let rows = vec![tx(0, 0, Some(1000)), tx(0, 500, Some(1500))];
        assert!(verify_balances(&rows));
    }

    #[test]
    fn mismatch_beyond_tolerance_is_flagged() {
        // expected 1000 + 100 = 1100, printed 1050
        let rows = vec![tx(0, 0, Some(1000)), tx(0, 100, Some(1050))];
        assert!(!verify_balances(&rows));
    }

    #[test]
    fn one_unit_slack_is_tolerated() {
        let rows = vec![tx(0, 0, Some(1000)), tx(0, 100, Some(1101)), tx(50, 0, Some(1051))];
        assert!(verify_balances(&rows));
    }

    #[test]
    fn unknown_balances_skip_the_pair() {
        let rows = vec![
            tx(0, 0, Some(1000)),
            tx(0, 999, None),
            tx(100, 0, Some(1)),
        ];
        // Both pairs involve an unknown balance, so nothing is verifiable.
        assert!(verify_balances(&rows));
    }

    #[test]
    fn withdrawal_chain_with_overdraft_is_consistent() {
        let rows = vec![tx(0, 0, Some(500)), tx(800, 0, Some(-300))];
        assert!(verify_balances(&rows));
    }

    // ── reconcile ──

    #[test]
    fn reconcile_filters_before_verifying() {
        // The middle row would fail verification (1000 -> 1500 with no
        // movement), but filtering removes it first.
        let rows = vec![
            tx(0, 200, Some(1000)),
            tx(0, 0, Some(1500)),
            tx(0, 500, Some(1500)),
        ];
        let report = reconcile(rows);
        assert_eq!(report.transactions.len(), 2);
        assert!(report.balances_consistent);
    }

    #[test]
    fn reconcile_returns_rows_even_when_inconsistent() {
        let rows = vec![tx(0, 200, Some(1000)), tx(0, 100, Some(1050))];
        let report = reconcile(rows);
        assert!(!report.balances_consistent);
        assert_eq!(report.transactions.len(), 2);
    }
}
