//! Cash-flow analytics over the synced ledger.
//!
//! Pure aggregation, like the scoring engine: the API layer fetches the
//! accounts and transactions and this module folds them into an overview.
//! This is where the ledger's sign convention is consumed — negative
//! amounts are income, positive amounts are spending.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::ledger::{BankAccount, Transaction};

/// How many transactions the overview echoes back for display.
const RECENT_LIMIT: usize = 10;

/// Income versus spending over the reporting window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CashFlow {
  pub total_income:   f64,
  pub total_expenses: f64,
  pub net_cash_flow:  f64,
  /// `(income - expenses) / income`, as a percentage; 0 when there is no
  /// income to save from.
  pub savings_rate:   f64,
}

/// Spending total for one primary category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpend {
  pub category: String,
  pub amount:   f64,
}

/// The financial-overview payload: balances across active accounts plus
/// cash flow and category spending for the reporting window.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
  pub total_balance:        f64,
  pub total_available:      f64,
  pub cash_flow:            CashFlow,
  /// Positive-amount (spending) totals grouped by primary category,
  /// alphabetical; transactions without one fall under "Uncategorized".
  pub spending_by_category: Vec<CategorySpend>,
  /// The newest transactions in the window, newest date first.
  pub recent_transactions:  Vec<Transaction>,
}

/// Fold accounts and transactions into an [`Overview`].
///
/// Only transactions dated on or after `since` participate. The sign
/// convention is inverted here: a negative amount is money in (income), a
/// positive amount is money out (an expense).
pub fn overview(
  accounts: &[BankAccount],
  transactions: &[Transaction],
  since: NaiveDate,
) -> Overview {
  let total_balance = accounts
    .iter()
    .filter_map(|a| a.current_balance)
    .sum::<f64>();
  let total_available = accounts
    .iter()
    .filter_map(|a| a.available_balance)
    .sum::<f64>();

  let mut total_income = 0.0;
  let mut total_expenses = 0.0;
  let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
  let mut window: Vec<&Transaction> = Vec::new();

  for tx in transactions.iter().filter(|t| t.date >= since) {
    if tx.amount < 0.0 {
      total_income += -tx.amount;
    } else if tx.amount > 0.0 {
      total_expenses += tx.amount;
      let category = tx
        .primary_category
        .clone()
        .unwrap_or_else(|| "Uncategorized".to_string());
      *by_category.entry(category).or_insert(0.0) += tx.amount;
    }
    window.push(tx);
  }

  let savings_rate = if total_income > 0.0 {
    (total_income - total_expenses) / total_income * 100.0
  } else {
    0.0
  };

  window.sort_by(|a, b| b.date.cmp(&a.date));
  let recent_transactions = window
    .into_iter()
    .take(RECENT_LIMIT)
    .cloned()
    .collect();

  Overview {
    total_balance,
    total_available,
    cash_flow: CashFlow {
      total_income,
      total_expenses,
      net_cash_flow: total_income - total_expenses,
      savings_rate,
    },
    spending_by_category: by_category
      .into_iter()
      .map(|(category, amount)| CategorySpend { category, amount })
      .collect(),
    recent_transactions,
  }
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, Utc};
  use uuid::Uuid;

  use super::*;

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  fn now() -> DateTime<Utc> {
    Utc::now()
  }

  fn account(current: Option<f64>, available: Option<f64>) -> BankAccount {
    BankAccount {
      account_id:          Uuid::new_v4(),
      user_id:             Uuid::new_v4(),
      provider_item_id:    "item-1".to_string(),
      provider_account_id: Uuid::new_v4().to_string(),
      access_token:        "tok".to_string(),
      institution_name:    None,
      account_name:        None,
      account_type:        None,
      account_subtype:     None,
      mask:                None,
      current_balance:     current,
      available_balance:   available,
      credit_limit:        None,
      is_active:           true,
      sync_cursor:         None,
      last_synced_at:      None,
      created_at:          now(),
      updated_at:          now(),
    }
  }

  fn tx(amount: f64, category: Option<&str>, on: &str) -> Transaction {
    Transaction {
      transaction_id:    Uuid::new_v4(),
      account_id:        Uuid::new_v4(),
      external_id:       Uuid::new_v4().to_string(),
      name:              "TX".to_string(),
      merchant_name:     None,
      amount,
      currency_code:     "USD".to_string(),
      category:          category.map(str::to_string),
      primary_category:  category.map(str::to_string),
      detailed_category: None,
      date:              date(on),
      pending:           false,
      payment_channel:   None,
      created_at:        now(),
      updated_at:        now(),
    }
  }

  #[test]
  fn negative_amounts_are_income_and_positive_are_expenses() {
    let txs = vec![
      tx(-2500.0, None, "2024-03-05"),
      tx(40.0, Some("Food and Drink"), "2024-03-06"),
      tx(60.0, Some("Travel"), "2024-03-07"),
    ];
    let view = overview(&[], &txs, date("2024-03-01"));

    assert_eq!(view.cash_flow.total_income, 2500.0);
    assert_eq!(view.cash_flow.total_expenses, 100.0);
    assert_eq!(view.cash_flow.net_cash_flow, 2400.0);
    assert_eq!(view.cash_flow.savings_rate, 96.0);
  }

  #[test]
  fn savings_rate_is_zero_without_income() {
    let txs = vec![tx(100.0, None, "2024-03-05")];
    let view = overview(&[], &txs, date("2024-03-01"));
    assert_eq!(view.cash_flow.savings_rate, 0.0);
    assert_eq!(view.cash_flow.net_cash_flow, -100.0);
  }

  #[test]
  fn spending_groups_by_category_and_skips_income() {
    let txs = vec![
      tx(40.0, Some("Food and Drink"), "2024-03-05"),
      tx(10.0, Some("Food and Drink"), "2024-03-06"),
      tx(75.0, None, "2024-03-06"),
      // Income must not appear as negative spending in its category.
      tx(-500.0, Some("Food and Drink"), "2024-03-07"),
    ];
    let view = overview(&[], &txs, date("2024-03-01"));

    assert_eq!(
      view.spending_by_category,
      vec![
        CategorySpend {
          category: "Food and Drink".to_string(),
          amount:   50.0,
        },
        CategorySpend { category: "Uncategorized".to_string(), amount: 75.0 },
      ]
    );
  }

  #[test]
  fn window_excludes_transactions_before_since() {
    let txs = vec![
      tx(100.0, None, "2024-01-15"),
      tx(30.0, None, "2024-03-05"),
    ];
    let view = overview(&[], &txs, date("2024-03-01"));
    assert_eq!(view.cash_flow.total_expenses, 30.0);
    assert_eq!(view.recent_transactions.len(), 1);
  }

  #[test]
  fn balances_sum_across_accounts_ignoring_missing() {
    let accounts = vec![
      account(Some(1200.0), Some(1100.0)),
      account(Some(-250.0), None),
      account(None, Some(40.0)),
    ];
    let view = overview(&accounts, &[], date("2024-03-01"));
    assert_eq!(view.total_balance, 950.0);
    assert_eq!(view.total_available, 1140.0);
  }

  #[test]
  fn recent_transactions_are_newest_first_and_capped() {
    let txs: Vec<Transaction> = (1..=12)
      .map(|day| tx(1.0, None, &format!("2024-03-{day:02}")))
      .collect();
    let view = overview(&[], &txs, date("2024-03-01"));

    assert_eq!(view.recent_transactions.len(), 10);
    assert_eq!(view.recent_transactions[0].date, date("2024-03-12"));
    assert_eq!(view.recent_transactions[9].date, date("2024-03-03"));
  }
}
