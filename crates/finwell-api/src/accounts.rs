//! Handlers for bank-account linking, syncing, and the transaction ledger.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/users/:id/link-token` | Ephemeral token for the link flow |
//! | `POST`   | `/users/:id/link` | Exchange + upsert + initial sync |
//! | `GET`    | `/users/:id/accounts` | `?include_inactive=true` lists all |
//! | `POST`   | `/users/:id/accounts/sync-all` | All active accounts |
//! | `POST`   | `/users/:id/accounts/:aid/sync` | One account |
//! | `GET`    | `/users/:id/accounts/:aid/transactions` | Newest date first |
//! | `GET`    | `/users/:id/overview` | 30-day cash-flow summary |
//! | `DELETE` | `/users/:id/accounts/:aid` | Soft delete |
//!
//! Account routes 404 when the account does not belong to the path user, so
//! foreign account ids are indistinguishable from absent ones.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{Duration, Utc};
use finwell_core::{
  analytics::{self, Overview},
  ledger::{BankAccount, Transaction},
  provider::{AggregationProvider, LinkToken, MailSender, SmsVerifier},
  store::WellnessStore,
  sync::{BatchOutcome, SyncOutcome, link_item, sync_account, sync_all_accounts},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Shared helpers ───────────────────────────────────────────────────────────

async fn require_verified_user<S>(
  store: &S,
  user_id: Uuid,
) -> Result<(), ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let user = store
    .get_user(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;
  if !user.is_verified {
    return Err(ApiError::Unauthorized("email not verified".to_string()));
  }
  Ok(())
}

/// Fetch an account and enforce path-user ownership. A foreign account id
/// gets the same 404 as a missing one.
async fn owned_account<S>(
  store: &S,
  user_id: Uuid,
  account_id: Uuid,
) -> Result<BankAccount, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_account(account_id)
    .await
    .map_err(ApiError::store)?
    .filter(|a| a.user_id == user_id)
    .ok_or_else(|| {
      ApiError::NotFound(format!("account {account_id} not found"))
    })
}

/// Per-account sync result in a batch response.
#[derive(Debug, Serialize)]
pub struct SyncReport {
  pub account_id: Uuid,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub outcome:    Option<SyncOutcome>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:      Option<String>,
}

fn reports(batch: BatchOutcome) -> Vec<SyncReport> {
  batch
    .results
    .into_iter()
    .map(|(account_id, result)| match result {
      Ok(outcome) => SyncReport { account_id, outcome: Some(outcome), error: None },
      Err(e) => {
        warn!(%account_id, error = %e, "account sync failed");
        SyncReport { account_id, outcome: None, error: Some(e.to_string()) }
      }
    })
    .collect()
}

// ─── Link ─────────────────────────────────────────────────────────────────────

/// `POST /users/:id/link-token`
pub async fn link_token<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<LinkToken>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  require_verified_user(state.store.as_ref(), user_id).await?;
  let token = state.aggregator.create_link_token(user_id.to_string()).await?;
  Ok(Json(token))
}

#[derive(Debug, Deserialize)]
pub struct LinkBody {
  pub public_token:     String,
  pub institution_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
  pub accounts: Vec<BankAccount>,
  /// Initial-sync results, one per linked account; a failed initial sync
  /// does not undo the link.
  pub sync:     Vec<SyncReport>,
}

/// `POST /users/:id/link` — exchange the public token, upsert one row per
/// provider account, then run an initial sync across the linked accounts
/// with batch semantics.
pub async fn link<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path(user_id): Path<Uuid>,
  Json(body): Json<LinkBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  require_verified_user(state.store.as_ref(), user_id).await?;

  let accounts = link_item(
    state.aggregator.as_ref(),
    state.store.as_ref(),
    user_id,
    body.public_token,
    body.institution_name.as_deref(),
  )
  .await?;
  info!(%user_id, linked = accounts.len(), "linked provider item");

  let batch = sync_all_accounts(
    state.aggregator.as_ref(),
    state.store.as_ref(),
    &accounts,
    state.config.sync_mode,
  )
  .await;

  Ok((
    StatusCode::CREATED,
    Json(LinkResponse { accounts, sync: reports(batch) }),
  ))
}

// ─── Listing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub include_inactive: bool,
}

/// `GET /users/:id/accounts[?include_inactive=true]`
pub async fn list<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path(user_id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<BankAccount>>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  require_verified_user(state.store.as_ref(), user_id).await?;
  let accounts = state
    .store
    .list_accounts(user_id, !params.include_inactive)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(accounts))
}

// ─── Sync ─────────────────────────────────────────────────────────────────────

/// `POST /users/:id/accounts/:aid/sync`
pub async fn sync_one<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path((user_id, account_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SyncOutcome>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  require_verified_user(state.store.as_ref(), user_id).await?;
  let account =
    owned_account(state.store.as_ref(), user_id, account_id).await?;

  let outcome = sync_account(
    state.aggregator.as_ref(),
    state.store.as_ref(),
    &account,
    state.config.sync_mode,
  )
  .await?;
  Ok(Json(outcome))
}

/// `POST /users/:id/accounts/sync-all` — every active account, sequentially;
/// one account's failure does not abort the rest.
pub async fn sync_all<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<SyncReport>>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  require_verified_user(state.store.as_ref(), user_id).await?;
  let accounts = state
    .store
    .list_accounts(user_id, true)
    .await
    .map_err(ApiError::store)?;

  let batch = sync_all_accounts(
    state.aggregator.as_ref(),
    state.store.as_ref(),
    &accounts,
    state.config.sync_mode,
  )
  .await;
  Ok(Json(reports(batch)))
}

// ─── Transactions ─────────────────────────────────────────────────────────────

/// `GET /users/:id/accounts/:aid/transactions`
pub async fn transactions<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path((user_id, account_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Transaction>>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  require_verified_user(state.store.as_ref(), user_id).await?;
  let account =
    owned_account(state.store.as_ref(), user_id, account_id).await?;
  let txs = state
    .store
    .list_transactions(account.account_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(txs))
}

// ─── Overview ─────────────────────────────────────────────────────────────────

/// Days of ledger history the overview summarises.
const OVERVIEW_WINDOW_DAYS: i64 = 30;

/// `GET /users/:id/overview` — balances across active accounts plus 30-day
/// cash flow and spending by category. Income and expenses are derived from
/// the transaction sign convention: negative is money in, positive is money
/// out.
pub async fn overview<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Overview>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  require_verified_user(state.store.as_ref(), user_id).await?;
  let accounts = state
    .store
    .list_accounts(user_id, true)
    .await
    .map_err(ApiError::store)?;

  let mut transactions = Vec::new();
  for account in &accounts {
    transactions.extend(
      state
        .store
        .list_transactions(account.account_id)
        .await
        .map_err(ApiError::store)?,
    );
  }

  let since =
    Utc::now().date_naive() - Duration::days(OVERVIEW_WINDOW_DAYS);
  Ok(Json(analytics::overview(&accounts, &transactions, since)))
}

// ─── Unlink ───────────────────────────────────────────────────────────────────

/// `DELETE /users/:id/accounts/:aid` — soft delete; the transaction history
/// is retained.
pub async fn unlink<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path((user_id, account_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  require_verified_user(state.store.as_ref(), user_id).await?;
  let account =
    owned_account(state.store.as_ref(), user_id, account_id).await?;
  state
    .store
    .deactivate_account(account.account_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
