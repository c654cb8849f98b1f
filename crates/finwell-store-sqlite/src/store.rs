//! [`SqliteStore`] — the SQLite implementation of [`WellnessStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use finwell_core::{
  ledger::{BankAccount, NewBankAccount, NewTransaction, Transaction, TxUpdate},
  score::{AssessmentRecord, NewAssessment},
  store::WellnessStore,
  user::{NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    RawAccount, RawAssessment, RawTransaction, RawUser, encode_answers,
    encode_date, encode_dt, encode_tier, encode_uuid,
  },
  schema::SCHEMA,
};

const USER_COLS: &str = "user_id, email, password_hash, is_verified, \
   verification_code, verified_at, mfa_enabled, phone, sms_request_id, \
   created_at, updated_at";

const ACCOUNT_COLS: &str = "account_id, user_id, provider_item_id, \
   provider_account_id, access_token, institution_name, account_name, \
   account_type, account_subtype, mask, current_balance, available_balance, \
   credit_limit, is_active, sync_cursor, last_synced_at, created_at, \
   updated_at";

const TX_COLS: &str = "transaction_id, account_id, external_id, name, \
   merchant_name, amount, currency_code, category, primary_category, \
   detailed_category, date, pending, payment_channel, created_at, updated_at";

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn raw_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:           row.get(0)?,
    email:             row.get(1)?,
    password_hash:     row.get(2)?,
    is_verified:       row.get(3)?,
    verification_code: row.get(4)?,
    verified_at:       row.get(5)?,
    mfa_enabled:       row.get(6)?,
    phone:             row.get(7)?,
    sms_request_id:    row.get(8)?,
    created_at:        row.get(9)?,
    updated_at:        row.get(10)?,
  })
}

fn raw_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAccount> {
  Ok(RawAccount {
    account_id:          row.get(0)?,
    user_id:             row.get(1)?,
    provider_item_id:    row.get(2)?,
    provider_account_id: row.get(3)?,
    access_token:        row.get(4)?,
    institution_name:    row.get(5)?,
    account_name:        row.get(6)?,
    account_type:        row.get(7)?,
    account_subtype:     row.get(8)?,
    mask:                row.get(9)?,
    current_balance:     row.get(10)?,
    available_balance:   row.get(11)?,
    credit_limit:        row.get(12)?,
    is_active:           row.get(13)?,
    sync_cursor:         row.get(14)?,
    last_synced_at:      row.get(15)?,
    created_at:          row.get(16)?,
    updated_at:          row.get(17)?,
  })
}

fn raw_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTransaction> {
  Ok(RawTransaction {
    transaction_id:    row.get(0)?,
    account_id:        row.get(1)?,
    external_id:       row.get(2)?,
    name:              row.get(3)?,
    merchant_name:     row.get(4)?,
    amount:            row.get(5)?,
    currency_code:     row.get(6)?,
    category:          row.get(7)?,
    primary_category:  row.get(8)?,
    detailed_category: row.get(9)?,
    date:              row.get(10)?,
    pending:           row.get(11)?,
    payment_channel:   row.get(12)?,
    created_at:        row.get(13)?,
    updated_at:        row.get(14)?,
  })
}

fn raw_assessment(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAssessment> {
  Ok(RawAssessment {
    assessment_id: row.get(0)?,
    user_id:       row.get(1)?,
    answers_json:  row.get(2)?,
    raw_score:     row.get(3)?,
    tier:          row.get(4)?,
    created_at:    row.get(5)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A finwell store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run an UPDATE against `users` and fail if no row matched.
  async fn update_user_row(
    &self,
    user_id: Uuid,
    sql: &'static str,
    params: Vec<Option<String>>,
  ) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        let mut bound: Vec<&dyn rusqlite::ToSql> = Vec::new();
        for p in &params {
          bound.push(p);
        }
        bound.push(&now_str);
        bound.push(&id_str);
        Ok(conn.execute(sql, bound.as_slice())?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::UserNotFound(user_id));
    }
    Ok(())
  }
}

// ─── WellnessStore impl ──────────────────────────────────────────────────────

impl WellnessStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    if let Some(existing) = self.get_user_by_email(input.email.clone()).await?
    {
      return Err(Error::EmailTaken(existing.email));
    }

    let now = Utc::now();
    let user = User {
      user_id:           Uuid::new_v4(),
      email:             input.email,
      password_hash:     input.password_hash,
      is_verified:       false,
      verification_code: None,
      verified_at:       None,
      mfa_enabled:       false,
      phone:             None,
      sms_request_id:    None,
      created_at:        now,
      updated_at:        now,
    };

    let id_str   = encode_uuid(user.user_id);
    let email    = user.email.clone();
    let hash     = user.password_hash.clone();
    let now_str  = encode_dt(now);
    let now_str2 = now_str.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, email, password_hash, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, email, hash, now_str, now_str2],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLS} FROM users WHERE user_id = ?1"),
              rusqlite::params![id_str],
              raw_user,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user_by_email(&self, email: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
              rusqlite::params![email],
              raw_user,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn set_verification_code(
    &self,
    user_id: Uuid,
    code: String,
  ) -> Result<()> {
    self
      .update_user_row(
        user_id,
        "UPDATE users SET verification_code = ?1, updated_at = ?2 WHERE user_id = ?3",
        vec![Some(code)],
      )
      .await
  }

  async fn mark_email_verified(&self, user_id: Uuid) -> Result<()> {
    let id_str  = encode_uuid(user_id);
    let now_str = encode_dt(Utc::now());
    let now_str2 = now_str.clone();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
             SET is_verified = 1, verification_code = NULL,
                 verified_at = ?1, updated_at = ?2
           WHERE user_id = ?3",
          rusqlite::params![now_str, now_str2, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::UserNotFound(user_id));
    }
    Ok(())
  }

  async fn enable_mfa(&self, user_id: Uuid, phone: String) -> Result<()> {
    self
      .update_user_row(
        user_id,
        "UPDATE users SET mfa_enabled = 1, phone = ?1, updated_at = ?2 WHERE user_id = ?3",
        vec![Some(phone)],
      )
      .await
  }

  async fn disable_mfa(&self, user_id: Uuid) -> Result<()> {
    self
      .update_user_row(
        user_id,
        "UPDATE users SET mfa_enabled = 0, phone = ?1, updated_at = ?2 WHERE user_id = ?3",
        vec![None],
      )
      .await
  }

  async fn set_sms_request_id(
    &self,
    user_id: Uuid,
    request_id: Option<String>,
  ) -> Result<()> {
    self
      .update_user_row(
        user_id,
        "UPDATE users SET sms_request_id = ?1, updated_at = ?2 WHERE user_id = ?3",
        vec![request_id],
      )
      .await
  }

  // ── Assessments ───────────────────────────────────────────────────────────

  async fn record_assessment(
    &self,
    input: NewAssessment,
  ) -> Result<AssessmentRecord> {
    let record = AssessmentRecord {
      assessment_id: Uuid::new_v4(),
      user_id:       input.user_id,
      answers:       input.answers,
      raw_score:     input.raw_score,
      tier:          input.tier,
      created_at:    Utc::now(),
    };

    let id_str      = encode_uuid(record.assessment_id);
    let user_id_str = encode_uuid(record.user_id);
    let answers_str = encode_answers(&record.answers)?;
    let raw_score   = record.raw_score;
    let tier_str    = encode_tier(record.tier).to_owned();
    let at_str      = encode_dt(record.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO assessments (assessment_id, user_id, answers_json, raw_score, tier, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, user_id_str, answers_str, raw_score, tier_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn list_assessments(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<AssessmentRecord>> {
    let id_str = encode_uuid(user_id);

    let raws: Vec<RawAssessment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT assessment_id, user_id, answers_json, raw_score, tier, created_at
             FROM assessments WHERE user_id = ?1
            ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], raw_assessment)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawAssessment::into_assessment)
      .collect()
  }

  // ── Bank accounts ─────────────────────────────────────────────────────────

  async fn upsert_linked_account(
    &self,
    input: NewBankAccount,
  ) -> Result<BankAccount> {
    let fresh_id = encode_uuid(Uuid::new_v4());
    let now_str  = encode_dt(Utc::now());

    let raw: RawAccount = self
      .conn
      .call(move |conn| {
        let existing: Option<String> = conn
          .query_row(
            "SELECT account_id FROM bank_accounts WHERE provider_account_id = ?1",
            rusqlite::params![input.provider_account_id],
            |row| row.get(0),
          )
          .optional()?;

        if let Some(account_id) = existing {
          // Refresh metadata and balances; reactivate. The stored access
          // token and item id are intentionally left untouched.
          conn.execute(
            "UPDATE bank_accounts
               SET institution_name = ?1, account_name = ?2,
                   account_type = ?3, account_subtype = ?4, mask = ?5,
                   current_balance = ?6, available_balance = ?7,
                   credit_limit = ?8, is_active = 1, updated_at = ?9
             WHERE account_id = ?10",
            rusqlite::params![
              input.institution_name,
              input.account_name,
              input.account_type,
              input.account_subtype,
              input.mask,
              input.current_balance,
              input.available_balance,
              input.credit_limit,
              now_str,
              account_id,
            ],
          )?;
        } else {
          conn.execute(
            &format!(
              "INSERT INTO bank_accounts ({ACCOUNT_COLS})
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                       ?13, 1, NULL, NULL, ?14, ?15)"
            ),
            rusqlite::params![
              fresh_id,
              encode_uuid(input.user_id),
              input.provider_item_id,
              input.provider_account_id,
              input.access_token,
              input.institution_name,
              input.account_name,
              input.account_type,
              input.account_subtype,
              input.mask,
              input.current_balance,
              input.available_balance,
              input.credit_limit,
              now_str,
              now_str,
            ],
          )?;
        }

        Ok(conn.query_row(
          &format!(
            "SELECT {ACCOUNT_COLS} FROM bank_accounts WHERE provider_account_id = ?1"
          ),
          rusqlite::params![input.provider_account_id],
          raw_account,
        )?)
      })
      .await?;

    raw.into_account()
  }

  async fn get_account(&self, account_id: Uuid) -> Result<Option<BankAccount>> {
    let id_str = encode_uuid(account_id);

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ACCOUNT_COLS} FROM bank_accounts WHERE account_id = ?1"
              ),
              rusqlite::params![id_str],
              raw_account,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn list_accounts(
    &self,
    user_id: Uuid,
    active_only: bool,
  ) -> Result<Vec<BankAccount>> {
    let id_str = encode_uuid(user_id);

    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let sql = if active_only {
          format!(
            "SELECT {ACCOUNT_COLS} FROM bank_accounts
              WHERE user_id = ?1 AND is_active = 1 ORDER BY created_at"
          )
        } else {
          format!(
            "SELECT {ACCOUNT_COLS} FROM bank_accounts
              WHERE user_id = ?1 ORDER BY created_at"
          )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], raw_account)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }

  async fn deactivate_account(&self, account_id: Uuid) -> Result<bool> {
    let id_str  = encode_uuid(account_id);
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE bank_accounts SET is_active = 0, updated_at = ?1 WHERE account_id = ?2",
          rusqlite::params![now_str, id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn mark_synced(
    &self,
    account_id: Uuid,
    sync_cursor: Option<String>,
  ) -> Result<()> {
    let id_str  = encode_uuid(account_id);
    let now_str = encode_dt(Utc::now());
    let now_str2 = now_str.clone();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE bank_accounts
             SET last_synced_at = ?1, sync_cursor = ?2, updated_at = ?3
           WHERE account_id = ?4",
          rusqlite::params![now_str, sync_cursor, now_str2, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::AccountNotFound(account_id));
    }
    Ok(())
  }

  // ── Transactions ──────────────────────────────────────────────────────────

  async fn insert_transaction(&self, input: NewTransaction) -> Result<bool> {
    let id_str   = encode_uuid(Uuid::new_v4());
    let acct_str = encode_uuid(input.account_id);
    let date_str = encode_date(input.date);
    let now_str  = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        // OR IGNORE realises the idempotent-upsert contract: a duplicate
        // external id leaves the existing row untouched.
        Ok(conn.execute(
          &format!(
            "INSERT OR IGNORE INTO transactions ({TX_COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
          ),
          rusqlite::params![
            id_str,
            acct_str,
            input.external_id,
            input.name,
            input.merchant_name,
            input.amount,
            input.currency_code,
            input.category,
            input.primary_category,
            input.detailed_category,
            date_str,
            input.pending,
            input.payment_channel,
            now_str,
            now_str,
          ],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn apply_transaction_update(
    &self,
    external_id: String,
    update: TxUpdate,
  ) -> Result<bool> {
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE transactions
             SET name = ?1, merchant_name = ?2, amount = ?3, pending = ?4,
                 updated_at = ?5
           WHERE external_id = ?6",
          rusqlite::params![
            update.name,
            update.merchant_name,
            update.amount,
            update.pending,
            now_str,
            external_id,
          ],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn delete_transaction(&self, external_id: String) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM transactions WHERE external_id = ?1",
          rusqlite::params![external_id],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn list_transactions(
    &self,
    account_id: Uuid,
  ) -> Result<Vec<Transaction>> {
    let id_str = encode_uuid(account_id);

    let raws: Vec<RawTransaction> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TX_COLS} FROM transactions
            WHERE account_id = ?1 ORDER BY date DESC, created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], raw_transaction)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawTransaction::into_transaction)
      .collect()
  }

  async fn get_transaction_by_external_id(
    &self,
    external_id: String,
  ) -> Result<Option<Transaction>> {
    let raw: Option<RawTransaction> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TX_COLS} FROM transactions WHERE external_id = ?1"
              ),
              rusqlite::params![external_id],
              raw_transaction,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTransaction::into_transaction).transpose()
  }
}
