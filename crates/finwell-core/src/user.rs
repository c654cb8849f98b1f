//! User accounts: email verification state and optional SMS MFA.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A registered user.
///
/// The password is stored only as an argon2 PHC hash; hashing and
/// verification live in the API layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
  pub user_id:           Uuid,
  pub email:             String,
  #[serde(skip_serializing)]
  pub password_hash:     String,
  pub is_verified:       bool,
  /// Six-digit email verification code; cleared once verified.
  #[serde(skip_serializing)]
  pub verification_code: Option<String>,
  pub verified_at:       Option<DateTime<Utc>>,
  pub mfa_enabled:       bool,
  pub phone:             Option<String>,
  /// In-flight SMS verification request id; transient between the start
  /// and check calls of the verify provider.
  #[serde(skip_serializing)]
  pub sms_request_id:    Option<String>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

/// Input to [`crate::store::WellnessStore::create_user`].
/// Timestamps and the UUID are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub password_hash: String,
}
