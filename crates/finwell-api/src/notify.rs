//! Outbound notification emails.
//!
//! Small HTML bodies assembled inline; anything heavier than these two
//! notices belongs in a real templating layer, which this service does not
//! carry.

use finwell_core::provider::{MailSender, ProviderError};

/// Email the six-digit verification code to a fresh or re-requesting user.
pub async fn send_verification_email<M: MailSender>(
  mailer: &M,
  service_name: &str,
  to: &str,
  code: &str,
) -> Result<(), ProviderError> {
  let subject = format!("{service_name}: verify your email");
  let body = format!(
    "<p>Welcome to {service_name}!</p>\
     <p>Your verification code is: <strong>{code}</strong></p>\
     <p>If you did not sign up, you can ignore this email.</p>"
  );
  mailer.send(to.to_string(), subject, body).await
}

/// Notify the user that SMS MFA was just enabled on their account.
pub async fn send_mfa_enabled_email<M: MailSender>(
  mailer: &M,
  service_name: &str,
  to: &str,
  phone: &str,
) -> Result<(), ProviderError> {
  let subject = format!("{service_name}: two-factor authentication enabled");
  let body = format!(
    "<p>Two-factor authentication is now enabled on your {service_name} \
     account.</p>\
     <p>Codes will be sent to the phone number ending in \
     <strong>{}</strong>.</p>\
     <p>If this wasn't you, reset your password immediately.</p>",
    mask_phone(phone)
  );
  mailer.send(to.to_string(), subject, body).await
}

/// Keep only the last four digits of a phone number.
fn mask_phone(phone: &str) -> String {
  let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
  let start = digits.len().saturating_sub(4);
  digits[start..].iter().collect()
}
