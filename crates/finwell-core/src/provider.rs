//! Contracts for the three external SaaS collaborators.
//!
//! Concrete HTTP clients live in `finwell-providers`; this module owns only
//! the shapes the core consumes. Clients are constructed explicitly and
//! injected wherever provider calls are made — there is no ambient
//! process-wide singleton.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Failure ─────────────────────────────────────────────────────────────────

/// The tagged failure every collaborator call can produce. Carries the
/// provider's own error message; never escalated to a fatal process error.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
  pub message: String,
}

impl ProviderError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into() }
  }
}

// ─── Aggregation provider types ──────────────────────────────────────────────

/// Ephemeral token used by the front-end to open the provider's link flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkToken {
  pub link_token: String,
  pub expiration: Option<String>,
}

/// Durable credential obtained by exchanging a one-time public token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
  pub access_token: String,
  pub item_id:      String,
}

/// One account as reported by the provider's accounts listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAccount {
  pub account_id:        String,
  pub name:              Option<String>,
  pub account_type:      Option<String>,
  pub subtype:           Option<String>,
  pub mask:              Option<String>,
  pub current_balance:   Option<f64>,
  pub available_balance: Option<f64>,
  pub credit_limit:      Option<f64>,
}

/// One transaction event from the provider's change feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
  pub external_id:     String,
  pub name:            String,
  pub merchant_name:   Option<String>,
  /// Signed; positive = money out.
  pub amount:          f64,
  pub currency_code:   Option<String>,
  /// Ordered coarse-to-fine category path; may be empty.
  pub categories:      Vec<String>,
  pub date:            NaiveDate,
  pub pending:         Option<bool>,
  pub payment_channel: Option<String>,
}

/// One page of the cursor-based change feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPage {
  pub added:       Vec<TxRecord>,
  pub modified:    Vec<TxRecord>,
  /// External ids of deleted transactions.
  pub removed:     Vec<String>,
  pub next_cursor: String,
  pub has_more:    bool,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// The bank-data aggregation provider.
///
/// All methods return `Send` futures so implementations compose with
/// multi-threaded async runtimes (tokio with `axum`).
pub trait AggregationProvider: Send + Sync {
  /// Create an ephemeral link token for the given opaque user reference.
  fn create_link_token(
    &self,
    client_user_id: String,
  ) -> impl Future<Output = Result<LinkToken, ProviderError>> + Send + '_;

  /// Exchange a one-time public token for a durable access credential.
  fn exchange_public_token(
    &self,
    public_token: String,
  ) -> impl Future<Output = Result<AccessGrant, ProviderError>> + Send + '_;

  /// List the accounts reachable through `access_token`.
  fn get_accounts(
    &self,
    access_token: String,
  ) -> impl Future<Output = Result<Vec<ProviderAccount>, ProviderError>> + Send + '_;

  /// Fetch one page of the transaction change feed. A `None` cursor
  /// requests the feed from the beginning of history.
  fn sync_transactions(
    &self,
    access_token: String,
    cursor: Option<String>,
  ) -> impl Future<Output = Result<SyncPage, ProviderError>> + Send + '_;
}

/// The transactional-email provider.
pub trait MailSender: Send + Sync {
  fn send(
    &self,
    to: String,
    subject: String,
    html_body: String,
  ) -> impl Future<Output = Result<(), ProviderError>> + Send + '_;
}

/// The SMS one-time-password provider.
pub trait SmsVerifier: Send + Sync {
  /// Start a verification; the provider generates and delivers the code.
  /// Returns the request id to check against.
  fn start_verification(
    &self,
    phone_number: String,
  ) -> impl Future<Output = Result<String, ProviderError>> + Send + '_;

  /// Check a user-entered code. A wrong code is `Ok(false)`, not an error.
  fn check_verification(
    &self,
    request_id: String,
    code: String,
  ) -> impl Future<Output = Result<bool, ProviderError>> + Send + '_;
}
