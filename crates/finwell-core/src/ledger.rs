//! Ledger entities: linked bank accounts and their transactions.
//!
//! Both are owned by a user via the account. Accounts are soft-deleted
//! (`is_active` flips to false, transactions are retained); transactions are
//! created, updated in place, and deleted by the reconciliation routine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::provider::{AccessGrant, ProviderAccount, TxRecord};

// ─── BankAccount ─────────────────────────────────────────────────────────────

/// A bank account linked through the aggregation provider.
#[derive(Debug, Clone, Serialize)]
pub struct BankAccount {
  pub account_id:          Uuid,
  pub user_id:             Uuid,
  /// Provider-assigned item id; shared by all accounts of one link.
  pub provider_item_id:    String,
  /// Provider-assigned account id; externally unique.
  pub provider_account_id: String,
  /// Durable access credential obtained at link time.
  #[serde(skip_serializing)]
  pub access_token:        String,
  pub institution_name:    Option<String>,
  pub account_name:        Option<String>,
  pub account_type:        Option<String>,
  pub account_subtype:     Option<String>,
  /// Last four digits of the account number.
  pub mask:                Option<String>,
  pub current_balance:     Option<f64>,
  pub available_balance:   Option<f64>,
  pub credit_limit:        Option<f64>,
  /// Soft-delete flag; removal retains the transaction history.
  pub is_active:           bool,
  /// Last cursor returned by a completed sync pass; `None` means the next
  /// incremental sync starts from full history.
  #[serde(skip_serializing)]
  pub sync_cursor:         Option<String>,
  pub last_synced_at:      Option<DateTime<Utc>>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

/// Input to [`crate::store::WellnessStore::upsert_linked_account`].
#[derive(Debug, Clone)]
pub struct NewBankAccount {
  pub user_id:             Uuid,
  pub provider_item_id:    String,
  pub provider_account_id: String,
  pub access_token:        String,
  pub institution_name:    Option<String>,
  pub account_name:        Option<String>,
  pub account_type:        Option<String>,
  pub account_subtype:     Option<String>,
  pub mask:                Option<String>,
  pub current_balance:     Option<f64>,
  pub available_balance:   Option<f64>,
  pub credit_limit:        Option<f64>,
}

impl NewBankAccount {
  /// Map a provider account record plus the link's access grant into an
  /// upsertable row.
  pub fn from_provider(
    user_id: Uuid,
    grant: &AccessGrant,
    account: &ProviderAccount,
    institution_name: Option<&str>,
  ) -> Self {
    Self {
      user_id,
      provider_item_id: grant.item_id.clone(),
      provider_account_id: account.account_id.clone(),
      access_token: grant.access_token.clone(),
      institution_name: institution_name.map(str::to_string),
      account_name: account.name.clone(),
      account_type: account.account_type.clone(),
      account_subtype: account.subtype.clone(),
      mask: account.mask.clone(),
      current_balance: account.current_balance,
      available_balance: account.available_balance,
      credit_limit: account.credit_limit,
    }
  }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

/// A ledger transaction mirrored from the aggregation provider.
///
/// Sign convention: positive amounts are money out (expenses), negative
/// amounts are inflows. Cash-flow consumers invert the sign to derive income
/// versus expense.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
  pub transaction_id:    Uuid,
  pub account_id:        Uuid,
  /// Provider transaction id — globally unique; the idempotency key for
  /// reconciliation.
  pub external_id:       String,
  pub name:              String,
  pub merchant_name:     Option<String>,
  pub amount:            f64,
  pub currency_code:     String,
  /// The provider's full category list, joined with `", "`.
  pub category:          Option<String>,
  pub primary_category:  Option<String>,
  pub detailed_category: Option<String>,
  pub date:              NaiveDate,
  pub pending:           bool,
  pub payment_channel:   Option<String>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

/// Input to [`crate::store::WellnessStore::insert_transaction`].
#[derive(Debug, Clone)]
pub struct NewTransaction {
  pub account_id:        Uuid,
  pub external_id:       String,
  pub name:              String,
  pub merchant_name:     Option<String>,
  pub amount:            f64,
  pub currency_code:     String,
  pub category:          Option<String>,
  pub primary_category:  Option<String>,
  pub detailed_category: Option<String>,
  pub date:              NaiveDate,
  pub pending:           bool,
  pub payment_channel:   Option<String>,
}

impl NewTransaction {
  /// Build an insertable row from a provider "added" record: the first two
  /// category entries become primary/detailed, the currency defaults to
  /// `"USD"`, and a missing pending flag defaults to false.
  pub fn from_record(account_id: Uuid, record: &TxRecord) -> Self {
    let category = if record.categories.is_empty() {
      None
    } else {
      Some(record.categories.join(", "))
    };

    Self {
      account_id,
      external_id: record.external_id.clone(),
      name: record.name.clone(),
      merchant_name: record.merchant_name.clone(),
      amount: record.amount,
      currency_code: record
        .currency_code
        .clone()
        .unwrap_or_else(|| "USD".to_string()),
      category,
      primary_category: record.categories.first().cloned(),
      detailed_category: record.categories.get(1).cloned(),
      date: record.date,
      pending: record.pending.unwrap_or(false),
      payment_channel: record.payment_channel.clone(),
    }
  }
}

/// The fields overwritten by a provider "modified" record.
///
/// Category and date are deliberately not re-derived on modify; this mirrors
/// the provider-observed behaviour even though it may be an upstream
/// oversight.
#[derive(Debug, Clone)]
pub struct TxUpdate {
  pub name:          String,
  pub merchant_name: Option<String>,
  pub amount:        f64,
  pub pending:       bool,
}

impl TxUpdate {
  pub fn from_record(record: &TxRecord) -> Self {
    Self {
      name:          record.name.clone(),
      merchant_name: record.merchant_name.clone(),
      amount:        record.amount,
      pending:       record.pending.unwrap_or(false),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(categories: &[&str]) -> TxRecord {
    TxRecord {
      external_id:     "tx-1".to_string(),
      name:            "COFFEE SHOP".to_string(),
      merchant_name:   Some("Coffee Shop".to_string()),
      amount:          4.5,
      currency_code:   None,
      categories:      categories.iter().map(|c| c.to_string()).collect(),
      date:            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
      pending:         None,
      payment_channel: Some("in store".to_string()),
    }
  }

  #[test]
  fn from_record_derives_categories_and_defaults() {
    let account_id = Uuid::new_v4();
    let tx = NewTransaction::from_record(
      account_id,
      &record(&["Food and Drink", "Coffee", "Espresso"]),
    );

    assert_eq!(tx.primary_category.as_deref(), Some("Food and Drink"));
    assert_eq!(tx.detailed_category.as_deref(), Some("Coffee"));
    assert_eq!(
      tx.category.as_deref(),
      Some("Food and Drink, Coffee, Espresso")
    );
    assert_eq!(tx.currency_code, "USD");
    assert!(!tx.pending);
  }

  #[test]
  fn from_record_tolerates_missing_categories() {
    let tx = NewTransaction::from_record(Uuid::new_v4(), &record(&[]));
    assert_eq!(tx.category, None);
    assert_eq!(tx.primary_category, None);
    assert_eq!(tx.detailed_category, None);

    let tx = NewTransaction::from_record(Uuid::new_v4(), &record(&["Travel"]));
    assert_eq!(tx.primary_category.as_deref(), Some("Travel"));
    assert_eq!(tx.detailed_category, None);
  }
}
