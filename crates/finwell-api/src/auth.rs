//! Handlers for `/auth` endpoints: signup, email verification, login, and
//! the SMS MFA lifecycle.
//!
//! Passwords are hashed with argon2 and stored only as PHC strings. Email
//! verification uses a stored six-digit code; SMS MFA delegates code
//! generation and checking to the verify provider, so only the in-flight
//! request id is persisted.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use finwell_core::{
  provider::{AggregationProvider, MailSender, SmsVerifier},
  store::WellnessStore,
  user::{NewUser, User},
};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{AppState, error::ApiError, notify};

/// Generate a fresh six-digit verification code.
fn generate_code() -> String {
  format!("{:06}", OsRng.next_u32() % 1_000_000)
}

fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::BadRequest(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

async fn user_by_email<S>(store: &S, email: &str) -> Result<User, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_user_by_email(email.to_string())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no user for email {email}")))
}

async fn user_by_id<S>(store: &S, user_id: Uuid) -> Result<User, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_user(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))
}

// ─── Signup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignupBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/signup` — create an unverified user and email a six-digit
/// verification code. A failed email send is logged but does not fail the
/// signup; the code can be re-requested.
pub async fn signup<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Json(body): Json<SignupBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  if !body.email.contains('@') {
    return Err(ApiError::BadRequest("invalid email address".to_string()));
  }
  if body.password.len() < 8 {
    return Err(ApiError::BadRequest(
      "password must be at least 8 characters".to_string(),
    ));
  }

  if state
    .store
    .get_user_by_email(body.email.clone())
    .await
    .map_err(ApiError::store)?
    .is_some()
  {
    return Err(ApiError::Conflict("email already registered".to_string()));
  }

  let password_hash = hash_password(&body.password)?;
  let user = state
    .store
    .create_user(NewUser { email: body.email, password_hash })
    .await
    .map_err(ApiError::store)?;

  let code = generate_code();
  state
    .store
    .set_verification_code(user.user_id, code.clone())
    .await
    .map_err(ApiError::store)?;

  if let Err(e) = notify::send_verification_email(
    state.mailer.as_ref(),
    &state.config.service_name,
    &user.email,
    &code,
  )
  .await
  {
    warn!(user_id = %user.user_id, error = %e, "verification email failed");
  }

  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Email verification ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyEmailBody {
  pub email: String,
  pub code:  String,
}

/// `POST /auth/verify-email` — match the submitted code against the stored
/// one and mark the user verified.
pub async fn verify_email<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Json(body): Json<VerifyEmailBody>,
) -> Result<Json<User>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  let user = user_by_email(state.store.as_ref(), &body.email).await?;
  if user.is_verified {
    return Ok(Json(user));
  }

  match &user.verification_code {
    Some(code) if *code == body.code => {}
    _ => {
      return Err(ApiError::BadRequest(
        "invalid verification code".to_string(),
      ));
    }
  }

  state
    .store
    .mark_email_verified(user.user_id)
    .await
    .map_err(ApiError::store)?;
  let user = user_by_id(state.store.as_ref(), user.user_id).await?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct ResendCodeBody {
  pub email: String,
}

/// `POST /auth/resend-code` — rotate the verification code and re-send it.
pub async fn resend_code<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Json(body): Json<ResendCodeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  let user = user_by_email(state.store.as_ref(), &body.email).await?;
  if user.is_verified {
    return Err(ApiError::BadRequest("email already verified".to_string()));
  }

  let code = generate_code();
  state
    .store
    .set_verification_code(user.user_id, code.clone())
    .await
    .map_err(ApiError::store)?;

  notify::send_verification_email(
    state.mailer.as_ref(),
    &state.config.service_name,
    &user.email,
    &code,
  )
  .await?;

  Ok(Json(json!({ "sent": true })))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub mfa_required: bool,
  pub user_id:      Uuid,
  /// Present only when no MFA challenge is pending.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user:         Option<User>,
}

/// Start an SMS challenge for an MFA-enabled user mid-login.
async fn mfa_challenged_login<S, A, M, V>(
  state: &AppState<S, A, M, V>,
  user: User,
) -> Result<LoginResponse, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  V: SmsVerifier,
{
  let phone = user
    .phone
    .clone()
    .ok_or_else(|| ApiError::BadRequest("no phone on record".to_string()))?;

  let request_id = state.sms.start_verification(phone).await?;
  state
    .store
    .set_sms_request_id(user.user_id, Some(request_id))
    .await
    .map_err(ApiError::store)?;

  Ok(LoginResponse {
    mfa_required: true,
    user_id:      user.user_id,
    user:         None,
  })
}

/// `POST /auth/login` — verify the password. When MFA is enabled an SMS
/// challenge is started and the response reports `mfa_required`; the client
/// completes it via `/auth/mfa/verify`.
pub async fn login<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  let user = state
    .store
    .get_user_by_email(body.email.clone())
    .await
    .map_err(ApiError::store)?
    .filter(|u| verify_password(&body.password, &u.password_hash))
    .ok_or_else(|| {
      ApiError::Unauthorized("invalid email or password".to_string())
    })?;

  if !user.is_verified {
    return Err(ApiError::Unauthorized("email not verified".to_string()));
  }

  if user.mfa_enabled {
    let resp = mfa_challenged_login(&state, user).await?;
    return Ok(Json(resp));
  }

  Ok(Json(LoginResponse {
    mfa_required: false,
    user_id:      user.user_id,
    user:         Some(user),
  }))
}

// ─── MFA lifecycle ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MfaStartBody {
  pub user_id: Uuid,
  pub phone:   String,
}

/// `POST /auth/mfa/start` — begin enrolment: the verify provider sends a
/// code to the given phone number.
pub async fn mfa_start<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Json(body): Json<MfaStartBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  let user = user_by_id(state.store.as_ref(), body.user_id).await?;
  if !user.is_verified {
    return Err(ApiError::Unauthorized("email not verified".to_string()));
  }

  let request_id = state.sms.start_verification(body.phone).await?;
  state
    .store
    .set_sms_request_id(user.user_id, Some(request_id))
    .await
    .map_err(ApiError::store)?;

  Ok(Json(json!({ "challenge_sent": true })))
}

#[derive(Debug, Deserialize)]
pub struct MfaConfirmBody {
  pub user_id: Uuid,
  pub phone:   String,
  pub code:    String,
}

/// `POST /auth/mfa/confirm` — complete enrolment. A correct code enables
/// MFA for the phone number and sends a notification email (send failure is
/// logged, enrolment still succeeds).
pub async fn mfa_confirm<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Json(body): Json<MfaConfirmBody>,
) -> Result<Json<User>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  let user = user_by_id(state.store.as_ref(), body.user_id).await?;
  let request_id = user.sms_request_id.clone().ok_or_else(|| {
    ApiError::BadRequest("no verification in progress".to_string())
  })?;

  let ok = state.sms.check_verification(request_id, body.code).await?;
  if !ok {
    return Err(ApiError::BadRequest("invalid code".to_string()));
  }

  state
    .store
    .enable_mfa(user.user_id, body.phone.clone())
    .await
    .map_err(ApiError::store)?;
  state
    .store
    .set_sms_request_id(user.user_id, None)
    .await
    .map_err(ApiError::store)?;

  if let Err(e) = notify::send_mfa_enabled_email(
    state.mailer.as_ref(),
    &state.config.service_name,
    &user.email,
    &body.phone,
  )
  .await
  {
    warn!(user_id = %user.user_id, error = %e, "mfa notice email failed");
  }

  let user = user_by_id(state.store.as_ref(), user.user_id).await?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct MfaVerifyBody {
  pub user_id: Uuid,
  pub code:    String,
}

/// `POST /auth/mfa/verify` — complete a login challenge. A wrong code is a
/// 401, not a 400: the caller is mid-authentication.
pub async fn mfa_verify<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Json(body): Json<MfaVerifyBody>,
) -> Result<Json<User>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  let user = user_by_id(state.store.as_ref(), body.user_id).await?;
  let request_id = user.sms_request_id.clone().ok_or_else(|| {
    ApiError::BadRequest("no verification in progress".to_string())
  })?;

  let ok = state.sms.check_verification(request_id, body.code).await?;
  if !ok {
    return Err(ApiError::Unauthorized("invalid code".to_string()));
  }

  state
    .store
    .set_sms_request_id(user.user_id, None)
    .await
    .map_err(ApiError::store)?;

  let user = user_by_id(state.store.as_ref(), user.user_id).await?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct MfaDisableBody {
  pub user_id: Uuid,
}

/// `POST /auth/mfa/disable`
pub async fn mfa_disable<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Json(body): Json<MfaDisableBody>,
) -> Result<Json<User>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  let user = user_by_id(state.store.as_ref(), body.user_id).await?;
  if !user.mfa_enabled {
    return Err(ApiError::BadRequest("mfa is not enabled".to_string()));
  }

  state
    .store
    .disable_mfa(user.user_id)
    .await
    .map_err(ApiError::store)?;
  state
    .store
    .set_sms_request_id(user.user_id, None)
    .await
    .map_err(ApiError::store)?;

  let user = user_by_id(state.store.as_ref(), user.user_id).await?;
  Ok(Json(user))
}
