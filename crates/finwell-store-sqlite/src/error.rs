//! Error type for `finwell-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Unknown discriminant string read back from a column.
  #[error("unknown tier: {0:?}")]
  UnknownTier(String),

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("user not found: {0}")]
  UserNotFound(uuid::Uuid),

  #[error("account not found: {0}")]
  AccountNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
