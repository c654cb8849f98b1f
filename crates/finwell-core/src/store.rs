//! The `WellnessStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `finwell-store-sqlite`). Higher layers (`finwell-api`, the reconciliation
//! routine) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  ledger::{BankAccount, NewBankAccount, NewTransaction, Transaction, TxUpdate},
  score::{AssessmentRecord, NewAssessment},
  user::{NewUser, User},
};

/// Abstraction over a finwell storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Timestamps and
/// entity UUIDs are always assigned by the store, never by callers.
pub trait WellnessStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create and persist a new, unverified user. Fails if the email is
  /// already registered.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Store a fresh email verification code for an unverified user.
  fn set_verification_code(
    &self,
    user_id: Uuid,
    code: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Mark the user's email as verified and clear the pending code.
  fn mark_email_verified(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Enable SMS MFA with the given phone number.
  fn enable_mfa(
    &self,
    user_id: Uuid,
    phone: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Disable MFA and clear the stored phone number.
  fn disable_mfa(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Stash (or clear) the in-flight SMS verification request id.
  fn set_sms_request_id(
    &self,
    user_id: Uuid,
    request_id: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Assessments ───────────────────────────────────────────────────────

  /// Persist one assessment submission. Records are immutable once written.
  fn record_assessment(
    &self,
    input: NewAssessment,
  ) -> impl Future<Output = Result<AssessmentRecord, Self::Error>> + Send + '_;

  /// All assessments for a user, newest first.
  fn list_assessments(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AssessmentRecord>, Self::Error>> + Send + '_;

  // ── Bank accounts ─────────────────────────────────────────────────────

  /// Insert a newly linked account, or refresh an existing row keyed by
  /// provider account id: balances and descriptive metadata are updated and
  /// `is_active` is forced true. The stored access token and item id are
  /// not overwritten on refresh.
  fn upsert_linked_account(
    &self,
    input: NewBankAccount,
  ) -> impl Future<Output = Result<BankAccount, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Option<BankAccount>, Self::Error>> + Send + '_;

  /// All accounts for a user; `active_only` filters out soft-deleted rows.
  fn list_accounts(
    &self,
    user_id: Uuid,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<BankAccount>, Self::Error>> + Send + '_;

  /// Soft-delete an account. Transactions are retained. Returns false if
  /// the account does not exist.
  fn deactivate_account(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Stamp `last_synced_at` with the current time and persist the cursor
  /// returned by a completed sync pass.
  fn mark_synced(
    &self,
    account_id: Uuid,
    sync_cursor: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Transactions ──────────────────────────────────────────────────────

  /// Insert a transaction keyed by its external id. Idempotent: if a row
  /// with that external id already exists the call is a no-op and returns
  /// false.
  fn insert_transaction(
    &self,
    input: NewTransaction,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Overwrite the modify-path fields of the transaction with the given
  /// external id. A miss is a silent no-op returning false.
  fn apply_transaction_update(
    &self,
    external_id: String,
    update: TxUpdate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete the transaction with the given external id. A miss is a silent
  /// no-op returning false.
  fn delete_transaction(
    &self,
    external_id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All transactions for an account, newest date first.
  fn list_transactions(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Transaction>, Self::Error>> + Send + '_;

  fn get_transaction_by_external_id(
    &self,
    external_id: String,
  ) -> impl Future<Output = Result<Option<Transaction>, Self::Error>> + Send + '_;
}
