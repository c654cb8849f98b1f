//! HTTP client for the SMS one-time-password provider.
//!
//! Verify-API-style wire: `POST verify/json` starts a verification and
//! returns a request id; `POST verify/check/json` checks a user-entered
//! code. Both respond 200 with a string `status` field — `"0"` is success,
//! anything else is a provider-side refusal.

use finwell_core::provider::{ProviderError, SmsVerifier};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Connection settings for the SMS verification provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
  /// e.g. `https://api.nexmo.com`.
  pub base_url:   String,
  pub api_key:    String,
  pub api_secret: String,
  /// Sender name shown in the SMS body.
  pub brand:      String,
}

#[derive(Clone)]
pub struct SmsClient {
  client: reqwest::Client,
  config: SmsConfig,
}

impl SmsClient {
  pub fn new(config: SmsConfig) -> Result<Self, ProviderError> {
    Ok(Self { client: crate::http_client()?, config })
  }

  async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
  where
    B: Serialize,
    T: serde::de::DeserializeOwned,
  {
    let url =
      format!("{}/{path}", self.config.base_url.trim_end_matches('/'));
    let resp = self.client.post(url).json(body).send().await.map_err(|e| {
      warn!(%path, error = %e, "sms request failed");
      ProviderError::new(format!("sms request failed: {e}"))
    })?;

    let status = resp.status();
    if !status.is_success() {
      warn!(%path, %status, "sms provider returned an error");
      return Err(ProviderError::new(status.to_string()));
    }

    resp.json().await.map_err(|e| {
      ProviderError::new(format!("sms response decode failed: {e}"))
    })
  }
}

impl SmsVerifier for SmsClient {
  async fn start_verification(
    &self,
    phone_number: String,
  ) -> Result<String, ProviderError> {
    let body = StartRequest {
      api_key:    &self.config.api_key,
      api_secret: &self.config.api_secret,
      number:     phone_number,
      brand:      &self.config.brand,
      code_length: 6,
    };
    let resp: StartResponse = self.post("verify/json", &body).await?;

    // The API reports refusals in-band with a 200.
    if resp.status != "0" {
      let detail = resp
        .error_text
        .unwrap_or_else(|| format!("verify start status {}", resp.status));
      warn!(%detail, "sms verification start refused");
      return Err(ProviderError::new(detail));
    }
    Ok(resp.request_id)
  }

  async fn check_verification(
    &self,
    request_id: String,
    code: String,
  ) -> Result<bool, ProviderError> {
    let body = CheckRequest {
      api_key:    &self.config.api_key,
      api_secret: &self.config.api_secret,
      request_id,
      code,
    };
    let resp: CheckResponse = self.post("verify/check/json", &body).await?;

    // A wrong or expired code is a normal outcome, not an error.
    Ok(resp.status == "0")
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StartRequest<'a> {
  api_key:     &'a str,
  api_secret:  &'a str,
  number:      String,
  brand:       &'a str,
  code_length: u8,
}

#[derive(Deserialize)]
struct StartResponse {
  status:     String,
  #[serde(default)]
  request_id: String,
  error_text: Option<String>,
}

#[derive(Serialize)]
struct CheckRequest<'a> {
  api_key:    &'a str,
  api_secret: &'a str,
  request_id: String,
  code:       String,
}

#[derive(Deserialize)]
struct CheckResponse {
  status: String,
}
