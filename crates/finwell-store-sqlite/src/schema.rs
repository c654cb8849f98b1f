//! SQL schema for the finwell SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id           TEXT PRIMARY KEY,
    email             TEXT NOT NULL UNIQUE,
    password_hash     TEXT NOT NULL,   -- argon2 PHC string
    is_verified       INTEGER NOT NULL DEFAULT 0,
    verification_code TEXT,            -- six digits; NULL once verified
    verified_at       TEXT,
    mfa_enabled       INTEGER NOT NULL DEFAULT 0,
    phone             TEXT,
    sms_request_id    TEXT,            -- in-flight verify request, transient
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

-- Assessments are write-once; no UPDATE is ever issued against this table.
CREATE TABLE IF NOT EXISTS assessments (
    assessment_id TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    answers_json  TEXT NOT NULL,       -- raw AnswerSet as submitted
    raw_score     REAL NOT NULL,
    tier          TEXT NOT NULL,       -- 'Developing' | 'Stable' | 'Optimized'
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bank_accounts (
    account_id          TEXT PRIMARY KEY,
    user_id             TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    provider_item_id    TEXT NOT NULL,
    provider_account_id TEXT NOT NULL UNIQUE,
    access_token        TEXT NOT NULL,
    institution_name    TEXT,
    account_name        TEXT,
    account_type        TEXT,
    account_subtype     TEXT,
    mask                TEXT,
    current_balance     REAL,
    available_balance   REAL,
    credit_limit        REAL,
    is_active           INTEGER NOT NULL DEFAULT 1,
    sync_cursor         TEXT,          -- NULL until the first completed sync
    last_synced_at      TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

-- external_id is the provider transaction id: the reconciliation
-- idempotency key. At most one row per external id, enforced here.
CREATE TABLE IF NOT EXISTS transactions (
    transaction_id    TEXT PRIMARY KEY,
    account_id        TEXT NOT NULL REFERENCES bank_accounts(account_id) ON DELETE CASCADE,
    external_id       TEXT NOT NULL UNIQUE,
    name              TEXT NOT NULL,
    merchant_name     TEXT,
    amount            REAL NOT NULL,   -- signed; positive = money out
    currency_code     TEXT NOT NULL DEFAULT 'USD',
    category          TEXT,            -- full provider list, comma-joined
    primary_category  TEXT,
    detailed_category TEXT,
    date              TEXT NOT NULL,   -- ISO 8601 calendar date
    pending           INTEGER NOT NULL DEFAULT 0,
    payment_channel   TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS assessments_user_idx   ON assessments(user_id);
CREATE INDEX IF NOT EXISTS accounts_user_idx      ON bank_accounts(user_id);
CREATE INDEX IF NOT EXISTS transactions_acct_idx  ON transactions(account_id);
CREATE INDEX IF NOT EXISTS transactions_date_idx  ON transactions(date);

PRAGMA user_version = 1;
";
