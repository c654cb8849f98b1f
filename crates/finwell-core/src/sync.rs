//! Transaction reconciliation against the aggregation provider's
//! cursor-based change feed, plus the one-shot account-linking operation
//! that shares its upsert idiom.
//!
//! The routine is generic over the provider and store traits so the paging
//! and application logic can be exercised against scripted fakes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  ledger::{BankAccount, NewBankAccount, NewTransaction, TxUpdate},
  provider::AggregationProvider,
  store::WellnessStore,
};

// ─── Modes and outcomes ──────────────────────────────────────────────────────

/// Where a sync pass starts in the change feed.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
  /// Resume from the account's persisted cursor; an absent cursor means
  /// this is the first sync and the full history is fetched.
  #[default]
  Incremental,
  /// Ignore the persisted cursor and re-fetch from the beginning of
  /// history. The idempotent per-record rules make this safe, just slow.
  FullResync,
}

/// Counts of change-feed events applied by one account sync. Counts reflect
/// provider events processed, not rows changed: a defensively skipped
/// duplicate "added" record still counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
  pub added:    u32,
  pub modified: u32,
  pub removed:  u32,
}

/// The result of sequentially syncing a batch of accounts.
#[derive(Debug)]
pub struct BatchOutcome {
  pub results: Vec<(Uuid, Result<SyncOutcome>)>,
}

impl BatchOutcome {
  /// Total "added" events across the accounts that synced successfully.
  pub fn total_added(&self) -> u32 {
    self
      .results
      .iter()
      .filter_map(|(_, r)| r.as_ref().ok())
      .map(|o| o.added)
      .sum()
  }

  pub fn failure_count(&self) -> usize {
    self.results.iter().filter(|(_, r)| r.is_err()).count()
  }
}

// ─── Account sync ────────────────────────────────────────────────────────────

/// Drive the provider's change feed for one account and apply every event
/// to the local ledger.
///
/// Pages are fetched while the provider reports `has_more`. Any page-fetch
/// failure aborts the pass immediately and surfaces the provider error;
/// pages already applied are not rolled back, and neither the cursor nor
/// `last_synced_at` is updated for an aborted pass. On success the final
/// cursor is persisted so the next incremental sync resumes from it.
pub async fn sync_account<P, S>(
  provider: &P,
  store: &S,
  account: &BankAccount,
  mode: SyncMode,
) -> Result<SyncOutcome>
where
  P: AggregationProvider,
  S: WellnessStore,
{
  let mut cursor = match mode {
    SyncMode::Incremental => account.sync_cursor.clone(),
    SyncMode::FullResync => None,
  };
  let mut outcome = SyncOutcome::default();

  loop {
    let page = provider
      .sync_transactions(account.access_token.clone(), cursor.clone())
      .await?;

    for record in &page.added {
      // Insert is idempotent on the external id; a provider re-add is a
      // defensive no-op.
      store
        .insert_transaction(NewTransaction::from_record(
          account.account_id,
          record,
        ))
        .await
        .map_err(Error::store)?;
      outcome.added += 1;
    }

    for record in &page.modified {
      // Overwrites name, merchant name, amount, and pending only; a miss
      // is silently ignored.
      store
        .apply_transaction_update(
          record.external_id.clone(),
          TxUpdate::from_record(record),
        )
        .await
        .map_err(Error::store)?;
      outcome.modified += 1;
    }

    for external_id in &page.removed {
      store
        .delete_transaction(external_id.clone())
        .await
        .map_err(Error::store)?;
      outcome.removed += 1;
    }

    cursor = Some(page.next_cursor);
    if !page.has_more {
      break;
    }
  }

  store
    .mark_synced(account.account_id, cursor)
    .await
    .map_err(Error::store)?;

  Ok(outcome)
}

/// Sequentially sync a batch of accounts. One account's failure does not
/// abort the rest; per-account results are collected for the caller to
/// report or log.
pub async fn sync_all_accounts<P, S>(
  provider: &P,
  store: &S,
  accounts: &[BankAccount],
  mode: SyncMode,
) -> BatchOutcome
where
  P: AggregationProvider,
  S: WellnessStore,
{
  let mut results = Vec::with_capacity(accounts.len());
  for account in accounts {
    let result = sync_account(provider, store, account, mode).await;
    results.push((account.account_id, result));
  }
  BatchOutcome { results }
}

// ─── Linking ─────────────────────────────────────────────────────────────────

/// One-shot link operation: exchange the one-time public token for a durable
/// credential, list the provider's accounts, and upsert a `BankAccount` row
/// per provider account id. Existing rows get balances and metadata
/// refreshed and `is_active` forced true.
pub async fn link_item<P, S>(
  provider: &P,
  store: &S,
  user_id: Uuid,
  public_token: String,
  institution_name: Option<&str>,
) -> Result<Vec<BankAccount>>
where
  P: AggregationProvider,
  S: WellnessStore,
{
  let grant = provider.exchange_public_token(public_token).await?;
  let provider_accounts =
    provider.get_accounts(grant.access_token.clone()).await?;

  let mut linked = Vec::with_capacity(provider_accounts.len());
  for account in &provider_accounts {
    let row = store
      .upsert_linked_account(NewBankAccount::from_provider(
        user_id,
        &grant,
        account,
        institution_name,
      ))
      .await
      .map_err(Error::store)?;
    linked.push(row);
  }

  Ok(linked)
}
