//! HTTP client for the transactional-email provider.
//!
//! Brevo-style wire: a single `POST v3/smtp/email` endpoint authenticated
//! with an `api-key` header.

use finwell_core::provider::{MailSender, ProviderError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Connection settings for the email provider.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
  /// e.g. `https://api.brevo.com`.
  pub base_url:     String,
  pub api_key:      String,
  pub sender_name:  String,
  pub sender_email: String,
}

#[derive(Clone)]
pub struct MailClient {
  client: reqwest::Client,
  config: MailConfig,
}

impl MailClient {
  pub fn new(config: MailConfig) -> Result<Self, ProviderError> {
    Ok(Self { client: crate::http_client()?, config })
  }
}

impl MailSender for MailClient {
  async fn send(
    &self,
    to: String,
    subject: String,
    html_body: String,
  ) -> Result<(), ProviderError> {
    let body = SendEmailRequest {
      sender:       Address {
        name:  Some(&self.config.sender_name),
        email: &self.config.sender_email,
      },
      to:           vec![Address { name: None, email: &to }],
      subject:      &subject,
      html_content: &html_body,
    };

    let url = format!(
      "{}/v3/smtp/email",
      self.config.base_url.trim_end_matches('/')
    );
    let resp = self
      .client
      .post(url)
      .header("api-key", &self.config.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| {
        warn!(error = %e, "email request failed");
        ProviderError::new(format!("email request failed: {e}"))
      })?;

    let status = resp.status();
    if !status.is_success() {
      let detail = resp
        .json::<WireError>()
        .await
        .map(|e| e.message)
        .unwrap_or_else(|_| status.to_string());
      warn!(%status, %detail, "email provider returned an error");
      return Err(ProviderError::new(detail));
    }

    Ok(())
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Address<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  name:  Option<&'a str>,
  email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
  sender:       Address<'a>,
  to:           Vec<Address<'a>>,
  subject:      &'a str,
  html_content: &'a str,
}

#[derive(Deserialize)]
struct WireError {
  message: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn send_request_uses_camel_case_and_drops_empty_names() {
    let body = SendEmailRequest {
      sender:       Address { name: Some("finwell"), email: "noreply@finwell.app" },
      to:           vec![Address { name: None, email: "user@example.com" }],
      subject:      "Verify your email",
      html_content: "<p>123456</p>",
    };
    let json = serde_json::to_value(&body).unwrap();
    assert!(json.get("htmlContent").is_some());
    assert!(json["to"][0].get("name").is_none());
  }
}
