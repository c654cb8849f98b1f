//! JSON REST API for the finwell financial-wellness service.
//!
//! Exposes an axum [`Router`] generic over the four injected collaborators:
//! the store, the bank-data aggregation provider, the email sender, and the
//! SMS verifier. Transport, TLS, and tracing layers are the caller's
//! responsibility.

pub mod accounts;
pub mod assess;
pub mod auth;
pub mod error;
pub mod notify;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use finwell_core::{
  provider::{AggregationProvider, MailSender, SmsVerifier},
  store::WellnessStore,
  sync::SyncMode,
};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Behavioural knobs threaded into handlers.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Shown as the sender name in outbound notification emails.
  pub service_name: String,
  /// How triggered syncs traverse the provider change feed.
  #[serde(default)]
  pub sync_mode:    SyncMode,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      service_name: "finwell".to_string(),
      sync_mode:    SyncMode::Incremental,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, A, M, V> {
  pub store:      Arc<S>,
  pub aggregator: Arc<A>,
  pub mailer:     Arc<M>,
  pub sms:        Arc<V>,
  pub config:     Arc<ApiConfig>,
}

// Manual impl: a derive would demand `Clone` of the collaborators themselves.
impl<S, A, M, V> Clone for AppState<S, A, M, V> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      aggregator: Arc::clone(&self.aggregator),
      mailer:     Arc::clone(&self.mailer),
      sms:        Arc::clone(&self.sms),
      config:     Arc::clone(&self.config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S, A, M, V>(state: AppState<S, A, M, V>) -> Router<()>
where
  S: WellnessStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider + 'static,
  M: MailSender + 'static,
  V: SmsVerifier + 'static,
{
  Router::new()
    // Auth
    .route("/auth/signup", post(auth::signup::<S, A, M, V>))
    .route("/auth/verify-email", post(auth::verify_email::<S, A, M, V>))
    .route("/auth/resend-code", post(auth::resend_code::<S, A, M, V>))
    .route("/auth/login", post(auth::login::<S, A, M, V>))
    .route("/auth/mfa/start", post(auth::mfa_start::<S, A, M, V>))
    .route("/auth/mfa/confirm", post(auth::mfa_confirm::<S, A, M, V>))
    .route("/auth/mfa/verify", post(auth::mfa_verify::<S, A, M, V>))
    .route("/auth/mfa/disable", post(auth::mfa_disable::<S, A, M, V>))
    // Questionnaire and assessments
    .route("/questionnaire", get(assess::questionnaire))
    .route(
      "/users/{id}/assessments",
      post(assess::submit::<S, A, M, V>).get(assess::list::<S, A, M, V>),
    )
    // Account linking and sync
    .route(
      "/users/{id}/link-token",
      post(accounts::link_token::<S, A, M, V>),
    )
    .route("/users/{id}/link", post(accounts::link::<S, A, M, V>))
    .route("/users/{id}/accounts", get(accounts::list::<S, A, M, V>))
    .route("/users/{id}/overview", get(accounts::overview::<S, A, M, V>))
    .route(
      "/users/{id}/accounts/sync-all",
      post(accounts::sync_all::<S, A, M, V>),
    )
    .route(
      "/users/{id}/accounts/{aid}/sync",
      post(accounts::sync_one::<S, A, M, V>),
    )
    .route(
      "/users/{id}/accounts/{aid}/transactions",
      get(accounts::transactions::<S, A, M, V>),
    )
    .route(
      "/users/{id}/accounts/{aid}",
      delete(accounts::unlink::<S, A, M, V>),
    )
    .with_state(state)
}

#[cfg(test)]
mod tests;
