//! Integration tests: the full router against an in-memory store and faked
//! provider clients.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use finwell_core::provider::{
  AccessGrant, AggregationProvider, LinkToken, MailSender, ProviderAccount,
  ProviderError, SmsVerifier, SyncPage, TxRecord,
};
use finwell_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{ApiConfig, AppState, router};

// ─── Fakes ────────────────────────────────────────────────────────────────────

/// Records every outbound email instead of sending it.
#[derive(Default)]
struct FakeMailer {
  sent: Mutex<Vec<(String, String, String)>>,
}

impl MailSender for FakeMailer {
  async fn send(
    &self,
    to: String,
    subject: String,
    html_body: String,
  ) -> Result<(), ProviderError> {
    self.sent.lock().unwrap().push((to, subject, html_body));
    Ok(())
  }
}

/// Accepts exactly one code and hands out a fixed request id.
struct FakeSms {
  accepted_code: String,
}

impl Default for FakeSms {
  fn default() -> Self {
    Self { accepted_code: "123456".to_string() }
  }
}

impl SmsVerifier for FakeSms {
  async fn start_verification(
    &self,
    _phone_number: String,
  ) -> Result<String, ProviderError> {
    Ok("sms-req-1".to_string())
  }

  async fn check_verification(
    &self,
    _request_id: String,
    code: String,
  ) -> Result<bool, ProviderError> {
    Ok(code == self.accepted_code)
  }
}

/// Aggregation provider with scripted link data and sync pages. Unscripted
/// sync calls return an empty final page.
#[derive(Default)]
struct FakeAggregator {
  grant:    Option<AccessGrant>,
  accounts: Vec<ProviderAccount>,
  pages:    Mutex<VecDeque<Result<SyncPage, ProviderError>>>,
}

impl AggregationProvider for FakeAggregator {
  async fn create_link_token(
    &self,
    _client_user_id: String,
  ) -> Result<LinkToken, ProviderError> {
    Ok(LinkToken {
      link_token: "link-token-1".to_string(),
      expiration: None,
    })
  }

  async fn exchange_public_token(
    &self,
    _public_token: String,
  ) -> Result<AccessGrant, ProviderError> {
    self
      .grant
      .clone()
      .ok_or_else(|| ProviderError::new("no scripted grant"))
  }

  async fn get_accounts(
    &self,
    _access_token: String,
  ) -> Result<Vec<ProviderAccount>, ProviderError> {
    Ok(self.accounts.clone())
  }

  async fn sync_transactions(
    &self,
    _access_token: String,
    _cursor: Option<String>,
  ) -> Result<SyncPage, ProviderError> {
    self.pages.lock().unwrap().pop_front().unwrap_or_else(|| {
      Ok(SyncPage {
        added:       vec![],
        modified:    vec![],
        removed:     vec![],
        next_cursor: "end".to_string(),
        has_more:    false,
      })
    })
  }
}

type TestState = AppState<SqliteStore, FakeAggregator, FakeMailer, FakeSms>;

async fn make_state(aggregator: FakeAggregator) -> TestState {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState {
    store:      Arc::new(store),
    aggregator: Arc::new(aggregator),
    mailer:     Arc::new(FakeMailer::default()),
    sms:        Arc::new(FakeSms::default()),
    config:     Arc::new(ApiConfig::default()),
  }
}

async fn state() -> TestState {
  make_state(FakeAggregator::default()).await
}

async fn request(
  state: &TestState,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let req = builder.body(body).unwrap();
  let resp = router(state.clone()).oneshot(req).await.unwrap();

  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

/// Sign up and verify a user; returns its id.
async fn verified_user(state: &TestState, email: &str) -> Uuid {
  let (status, body) = request(
    state,
    "POST",
    "/auth/signup",
    Some(json!({ "email": email, "password": "hunter2hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let user_id = Uuid::parse_str(body["user_id"].as_str().unwrap()).unwrap();

  let code = stored_code(state, email).await;
  let (status, _) = request(
    state,
    "POST",
    "/auth/verify-email",
    Some(json!({ "email": email, "code": code })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  user_id
}

async fn stored_code(state: &TestState, email: &str) -> String {
  use finwell_core::store::WellnessStore as _;
  state
    .store
    .get_user_by_email(email.to_string())
    .await
    .unwrap()
    .unwrap()
    .verification_code
    .unwrap()
}

// ─── Signup and verification ──────────────────────────────────────────────────

#[tokio::test]
async fn signup_creates_unverified_user_and_emails_the_code() {
  let state = state().await;
  let (status, body) = request(
    &state,
    "POST",
    "/auth/signup",
    Some(json!({ "email": "alice@example.com", "password": "hunter2hunter2" })),
  )
  .await;

  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["email"], "alice@example.com");
  assert_eq!(body["is_verified"], false);
  // The hash never leaves the server.
  assert!(body.get("password_hash").is_none());

  let code = stored_code(&state, "alice@example.com").await;
  let sent = state.mailer.sent.lock().unwrap();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].0, "alice@example.com");
  assert!(sent[0].2.contains(&code), "email must carry the code");
}

#[tokio::test]
async fn signup_rejects_duplicates_and_weak_input() {
  let state = state().await;
  let body = json!({ "email": "bob@example.com", "password": "hunter2hunter2" });
  let (status, _) = request(&state, "POST", "/auth/signup", Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, _) = request(&state, "POST", "/auth/signup", Some(body)).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = request(
    &state,
    "POST",
    "/auth/signup",
    Some(json!({ "email": "not-an-email", "password": "hunter2hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = request(
    &state,
    "POST",
    "/auth/signup",
    Some(json!({ "email": "short@example.com", "password": "short" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_email_requires_the_right_code() {
  let state = state().await;
  request(
    &state,
    "POST",
    "/auth/signup",
    Some(json!({ "email": "carol@example.com", "password": "hunter2hunter2" })),
  )
  .await;

  let (status, _) = request(
    &state,
    "POST",
    "/auth/verify-email",
    Some(json!({ "email": "carol@example.com", "code": "000000" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let code = stored_code(&state, "carol@example.com").await;
  let (status, body) = request(
    &state,
    "POST",
    "/auth/verify-email",
    Some(json!({ "email": "carol@example.com", "code": code })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["is_verified"], true);
}

#[tokio::test]
async fn resend_code_rotates_the_stored_code() {
  let state = state().await;
  request(
    &state,
    "POST",
    "/auth/signup",
    Some(json!({ "email": "dave@example.com", "password": "hunter2hunter2" })),
  )
  .await;
  let first = stored_code(&state, "dave@example.com").await;

  // Codes are random; resending until it changes terminates fast.
  let mut rotated = false;
  for _ in 0..5 {
    let (status, _) = request(
      &state,
      "POST",
      "/auth/resend-code",
      Some(json!({ "email": "dave@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    if stored_code(&state, "dave@example.com").await != first {
      rotated = true;
      break;
    }
  }
  assert!(rotated, "code should rotate on resend");
}

// ─── Login and MFA ────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_checks_password_and_verification() {
  let state = state().await;
  request(
    &state,
    "POST",
    "/auth/signup",
    Some(json!({ "email": "erin@example.com", "password": "hunter2hunter2" })),
  )
  .await;

  // Unverified users cannot log in.
  let (status, _) = request(
    &state,
    "POST",
    "/auth/login",
    Some(json!({ "email": "erin@example.com", "password": "hunter2hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let code = stored_code(&state, "erin@example.com").await;
  request(
    &state,
    "POST",
    "/auth/verify-email",
    Some(json!({ "email": "erin@example.com", "code": code })),
  )
  .await;

  let (status, _) = request(
    &state,
    "POST",
    "/auth/login",
    Some(json!({ "email": "erin@example.com", "password": "wrong-password" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = request(
    &state,
    "POST",
    "/auth/login",
    Some(json!({ "email": "erin@example.com", "password": "hunter2hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["mfa_required"], false);
  assert_eq!(body["user"]["email"], "erin@example.com");
}

#[tokio::test]
async fn mfa_enrolment_then_challenged_login() {
  let state = state().await;
  let user_id = verified_user(&state, "frank@example.com").await;

  let (status, _) = request(
    &state,
    "POST",
    "/auth/mfa/start",
    Some(json!({ "user_id": user_id, "phone": "+14155551234" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  // A wrong enrolment code is rejected and MFA stays off.
  let (status, _) = request(
    &state,
    "POST",
    "/auth/mfa/confirm",
    Some(json!({ "user_id": user_id, "phone": "+14155551234", "code": "999999" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = request(
    &state,
    "POST",
    "/auth/mfa/confirm",
    Some(json!({ "user_id": user_id, "phone": "+14155551234", "code": "123456" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["mfa_enabled"], true);
  assert_eq!(body["phone"], "+14155551234");

  // The enrolment notice email masks the phone number.
  {
    let sent = state.mailer.sent.lock().unwrap();
    let notice = &sent.last().unwrap().2;
    assert!(notice.contains("1234"));
    assert!(!notice.contains("+14155551234"));
  }

  // Login now reports a pending challenge instead of a user.
  let (status, body) = request(
    &state,
    "POST",
    "/auth/login",
    Some(json!({ "email": "frank@example.com", "password": "hunter2hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["mfa_required"], true);
  assert!(body.get("user").is_none());

  let (status, _) = request(
    &state,
    "POST",
    "/auth/mfa/verify",
    Some(json!({ "user_id": user_id, "code": "999999" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = request(
    &state,
    "POST",
    "/auth/mfa/verify",
    Some(json!({ "user_id": user_id, "code": "123456" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["email"], "frank@example.com");
}

#[tokio::test]
async fn mfa_disable_clears_the_phone() {
  let state = state().await;
  let user_id = verified_user(&state, "gwen@example.com").await;

  request(
    &state,
    "POST",
    "/auth/mfa/start",
    Some(json!({ "user_id": user_id, "phone": "+14155551234" })),
  )
  .await;
  request(
    &state,
    "POST",
    "/auth/mfa/confirm",
    Some(json!({ "user_id": user_id, "phone": "+14155551234", "code": "123456" })),
  )
  .await;

  let (status, body) = request(
    &state,
    "POST",
    "/auth/mfa/disable",
    Some(json!({ "user_id": user_id })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["mfa_enabled"], false);
  assert_eq!(body["phone"], Value::Null);

  // Disabling twice is a client error.
  let (status, _) = request(
    &state,
    "POST",
    "/auth/mfa/disable",
    Some(json!({ "user_id": user_id })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Questionnaire and assessments ────────────────────────────────────────────

#[tokio::test]
async fn questionnaire_serves_the_standard_definition() {
  let state = state().await;
  let (status, body) = request(&state, "GET", "/questionnaire", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["questions"].as_array().unwrap().len(), 8);
  assert_eq!(body["questions"][0]["id"], "q1");
  assert_eq!(body["questions"][0]["kind"], "numeric");
}

#[tokio::test]
async fn assessments_require_a_verified_user() {
  let state = state().await;
  let (_, body) = request(
    &state,
    "POST",
    "/auth/signup",
    Some(json!({ "email": "hugo@example.com", "password": "hunter2hunter2" })),
  )
  .await;
  let user_id = body["user_id"].as_str().unwrap().to_string();

  let (status, _) = request(
    &state,
    "POST",
    &format!("/users/{user_id}/assessments"),
    Some(json!({ "answers": { "q4": true } })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = request(
    &state,
    "POST",
    &format!("/users/{}/assessments", Uuid::new_v4()),
    Some(json!({ "answers": { "q4": true } })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_and_list_assessments() {
  let state = state().await;
  let user_id = verified_user(&state, "iris@example.com").await;

  let (status, body) = request(
    &state,
    "POST",
    &format!("/users/{user_id}/assessments"),
    Some(json!({ "answers": { "q4": true, "q7": false } })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  // q4 true scores 100 (weight 1), q7 false scores 0 (weight 1) → 50.
  assert_eq!(body["score"]["raw_score"], 50.0);
  assert_eq!(body["score"]["score_out_of_ten"], 5);
  assert_eq!(body["score"]["tier"], "Stable");
  assert_eq!(body["assessment"]["tier"], "Stable");

  let (status, body) = request(
    &state,
    "GET",
    &format!("/users/{user_id}/assessments"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let listed = body.as_array().unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0]["answers"]["q4"], true);
}

// ─── Linking and sync ─────────────────────────────────────────────────────────

fn linked_aggregator() -> FakeAggregator {
  FakeAggregator {
    grant:    Some(AccessGrant {
      access_token: "tok-A".to_string(),
      item_id:      "item-A".to_string(),
    }),
    accounts: vec![ProviderAccount {
      account_id:        "acct-1".to_string(),
      name:              Some("Checking".to_string()),
      account_type:      Some("depository".to_string()),
      subtype:           Some("checking".to_string()),
      mask:              Some("0001".to_string()),
      current_balance:   Some(1200.0),
      available_balance: Some(1100.0),
      credit_limit:      None,
    }],
    pages:    Mutex::new(VecDeque::from([Ok(SyncPage {
      added:       vec![TxRecord {
        external_id:     "tx-1".to_string(),
        name:            "COFFEE".to_string(),
        merchant_name:   None,
        amount:          4.5,
        currency_code:   Some("USD".to_string()),
        categories:      vec!["Food and Drink".to_string()],
        date:            chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        pending:         Some(false),
        payment_channel: None,
      }],
      modified:    vec![],
      removed:     vec![],
      next_cursor: "c1".to_string(),
      has_more:    false,
    })])),
  }
}

#[tokio::test]
async fn link_token_requires_a_known_user() {
  let state = state().await;
  let (status, _) = request(
    &state,
    "POST",
    &format!("/users/{}/link-token", Uuid::new_v4()),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let user_id = verified_user(&state, "jane@example.com").await;
  let (status, body) = request(
    &state,
    "POST",
    &format!("/users/{user_id}/link-token"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["link_token"], "link-token-1");
}

#[tokio::test]
async fn link_upserts_accounts_and_runs_the_initial_sync() {
  let state = make_state(linked_aggregator()).await;
  let user_id = verified_user(&state, "kate@example.com").await;

  let (status, body) = request(
    &state,
    "POST",
    &format!("/users/{user_id}/link"),
    Some(json!({
      "public_token": "public-1",
      "institution_name": "First Example Bank"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let accounts = body["accounts"].as_array().unwrap();
  assert_eq!(accounts.len(), 1);
  assert_eq!(accounts[0]["provider_account_id"], "acct-1");
  assert_eq!(accounts[0]["institution_name"], "First Example Bank");
  // Credentials stay server-side.
  assert!(accounts[0].get("access_token").is_none());

  assert_eq!(body["sync"][0]["outcome"]["added"], 1);
  let account_id = accounts[0]["account_id"].as_str().unwrap().to_string();

  let (status, body) = request(
    &state,
    "GET",
    &format!("/users/{user_id}/accounts/{account_id}/transactions"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let txs = body.as_array().unwrap();
  assert_eq!(txs.len(), 1);
  assert_eq!(txs[0]["external_id"], "tx-1");

  // Foreign users get a 404, not someone else's ledger.
  let other = verified_user(&state, "snoop@example.com").await;
  let (status, _) = request(
    &state,
    "GET",
    &format!("/users/{other}/accounts/{account_id}/transactions"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sync_endpoints_cover_single_and_batch() {
  let state = make_state(linked_aggregator()).await;
  let user_id = verified_user(&state, "liam@example.com").await;

  let (_, body) = request(
    &state,
    "POST",
    &format!("/users/{user_id}/link"),
    Some(json!({ "public_token": "public-1" })),
  )
  .await;
  let account_id =
    body["accounts"][0]["account_id"].as_str().unwrap().to_string();

  // The scripted page was consumed by the initial sync; further syncs see
  // an empty feed.
  let (status, body) = request(
    &state,
    "POST",
    &format!("/users/{user_id}/accounts/{account_id}/sync"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["added"], 0);

  let (status, body) = request(
    &state,
    "POST",
    &format!("/users/{user_id}/accounts/sync-all"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);

  let (status, _) = request(
    &state,
    "POST",
    &format!("/users/{user_id}/accounts/{}/sync", Uuid::new_v4()),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_routes_require_a_verified_user() {
  let state = state().await;
  let (_, body) = request(
    &state,
    "POST",
    "/auth/signup",
    Some(json!({ "email": "nina@example.com", "password": "hunter2hunter2" })),
  )
  .await;
  let user_id = body["user_id"].as_str().unwrap().to_string();
  let account_id = Uuid::new_v4();

  for (method, uri) in [
    ("POST", format!("/users/{user_id}/accounts/{account_id}/sync")),
    ("GET", format!("/users/{user_id}/accounts/{account_id}/transactions")),
    ("DELETE", format!("/users/{user_id}/accounts/{account_id}")),
    ("GET", format!("/users/{user_id}/overview")),
  ] {
    let (status, _) = request(&state, method, &uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
  }
}

#[tokio::test]
async fn overview_derives_income_and_expenses_from_the_sign() {
  let today = chrono::Utc::now().date_naive();
  let record = |external_id: &str, name: &str, amount: f64, category: &str| {
    TxRecord {
      external_id:     external_id.to_string(),
      name:            name.to_string(),
      merchant_name:   None,
      amount,
      currency_code:   Some("USD".to_string()),
      categories:      vec![category.to_string()],
      date:            today,
      pending:         Some(false),
      payment_channel: None,
    }
  };

  let mut aggregator = linked_aggregator();
  aggregator.pages = Mutex::new(VecDeque::from([Ok(SyncPage {
    added:       vec![
      record("tx-salary", "PAYROLL", -2500.0, "Transfer"),
      record("tx-coffee", "COFFEE", 40.0, "Food and Drink"),
      record("tx-flight", "AIRLINE", 60.0, "Travel"),
    ],
    modified:    vec![],
    removed:     vec![],
    next_cursor: "c1".to_string(),
    has_more:    false,
  })]));

  let state = make_state(aggregator).await;
  let user_id = verified_user(&state, "omar@example.com").await;
  request(
    &state,
    "POST",
    &format!("/users/{user_id}/link"),
    Some(json!({ "public_token": "public-1" })),
  )
  .await;

  let (status, body) = request(
    &state,
    "GET",
    &format!("/users/{user_id}/overview"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  // The negative amount is income, the positive ones are expenses.
  assert_eq!(body["cash_flow"]["total_income"], 2500.0);
  assert_eq!(body["cash_flow"]["total_expenses"], 100.0);
  assert_eq!(body["cash_flow"]["net_cash_flow"], 2400.0);
  assert_eq!(body["cash_flow"]["savings_rate"], 96.0);

  assert_eq!(body["total_balance"], 1200.0);
  assert_eq!(body["total_available"], 1100.0);

  let spending = body["spending_by_category"].as_array().unwrap();
  assert_eq!(spending.len(), 2);
  assert_eq!(spending[0]["category"], "Food and Drink");
  assert_eq!(spending[0]["amount"], 40.0);
  assert_eq!(spending[1]["category"], "Travel");

  assert_eq!(body["recent_transactions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unlink_soft_deletes_the_account() {
  let state = make_state(linked_aggregator()).await;
  let user_id = verified_user(&state, "mona@example.com").await;

  let (_, body) = request(
    &state,
    "POST",
    &format!("/users/{user_id}/link"),
    Some(json!({ "public_token": "public-1" })),
  )
  .await;
  let account_id =
    body["accounts"][0]["account_id"].as_str().unwrap().to_string();

  let (status, _) = request(
    &state,
    "DELETE",
    &format!("/users/{user_id}/accounts/{account_id}"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = request(
    &state,
    "GET",
    &format!("/users/{user_id}/accounts"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(body.as_array().unwrap().is_empty());

  let (_, body) = request(
    &state,
    "GET",
    &format!("/users/{user_id}/accounts?include_inactive=true"),
    None,
  )
  .await;
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["is_active"], false);
}
