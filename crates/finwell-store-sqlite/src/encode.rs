//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`. Answer sets are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use finwell_core::{
  ledger::{BankAccount, Transaction},
  score::{AssessmentRecord, Tier},
  questionnaire::AnswerSet,
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Timestamps and dates ────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Tier ────────────────────────────────────────────────────────────────────

pub fn encode_tier(t: Tier) -> &'static str { t.as_str() }

pub fn decode_tier(s: &str) -> Result<Tier> {
  match s {
    "Developing" => Ok(Tier::Developing),
    "Stable" => Ok(Tier::Stable),
    "Optimized" => Ok(Tier::Optimized),
    other => Err(Error::UnknownTier(other.to_string())),
  }
}

// ─── Answers ─────────────────────────────────────────────────────────────────

pub fn encode_answers(answers: &AnswerSet) -> Result<String> {
  Ok(serde_json::to_string(answers)?)
}

pub fn decode_answers(s: &str) -> Result<AnswerSet> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:           String,
  pub email:             String,
  pub password_hash:     String,
  pub is_verified:       bool,
  pub verification_code: Option<String>,
  pub verified_at:       Option<String>,
  pub mfa_enabled:       bool,
  pub phone:             Option<String>,
  pub sms_request_id:    Option<String>,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:           decode_uuid(&self.user_id)?,
      email:             self.email,
      password_hash:     self.password_hash,
      is_verified:       self.is_verified,
      verification_code: self.verification_code,
      verified_at:       self
        .verified_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      mfa_enabled:       self.mfa_enabled,
      phone:             self.phone,
      sms_request_id:    self.sms_request_id,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `assessments` row.
pub struct RawAssessment {
  pub assessment_id: String,
  pub user_id:       String,
  pub answers_json:  String,
  pub raw_score:     f64,
  pub tier:          String,
  pub created_at:    String,
}

impl RawAssessment {
  pub fn into_assessment(self) -> Result<AssessmentRecord> {
    Ok(AssessmentRecord {
      assessment_id: decode_uuid(&self.assessment_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      answers:       decode_answers(&self.answers_json)?,
      raw_score:     self.raw_score,
      tier:          decode_tier(&self.tier)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `bank_accounts` row.
pub struct RawAccount {
  pub account_id:          String,
  pub user_id:             String,
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
  pub is_active:           bool,
  pub sync_cursor:         Option<String>,
  pub last_synced_at:      Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawAccount {
  pub fn into_account(self) -> Result<BankAccount> {
    Ok(BankAccount {
      account_id:          decode_uuid(&self.account_id)?,
      user_id:             decode_uuid(&self.user_id)?,
      provider_item_id:    self.provider_item_id,
      provider_account_id: self.provider_account_id,
      access_token:        self.access_token,
      institution_name:    self.institution_name,
      account_name:        self.account_name,
      account_type:        self.account_type,
      account_subtype:     self.account_subtype,
      mask:                self.mask,
      current_balance:     self.current_balance,
      available_balance:   self.available_balance,
      credit_limit:        self.credit_limit,
      is_active:           self.is_active,
      sync_cursor:         self.sync_cursor,
      last_synced_at:      self
        .last_synced_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `transactions` row.
pub struct RawTransaction {
  pub transaction_id:    String,
  pub account_id:        String,
  pub external_id:       String,
  pub name:              String,
  pub merchant_name:     Option<String>,
  pub amount:            f64,
  pub currency_code:     String,
  pub category:          Option<String>,
  pub primary_category:  Option<String>,
  pub detailed_category: Option<String>,
  pub date:              String,
  pub pending:           bool,
  pub payment_channel:   Option<String>,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawTransaction {
  pub fn into_transaction(self) -> Result<Transaction> {
    Ok(Transaction {
      transaction_id:    decode_uuid(&self.transaction_id)?,
      account_id:        decode_uuid(&self.account_id)?,
      external_id:       self.external_id,
      name:              self.name,
      merchant_name:     self.merchant_name,
      amount:            self.amount,
      currency_code:     self.currency_code,
      category:          self.category,
      primary_category:  self.primary_category,
      detailed_category: self.detailed_category,
      date:              decode_date(&self.date)?,
      pending:           self.pending,
      payment_channel:   self.payment_channel,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}
