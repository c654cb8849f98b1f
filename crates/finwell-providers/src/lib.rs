//! HTTP clients for the three external SaaS collaborators: the bank-data
//! aggregation provider, the transactional-email provider, and the SMS
//! verification provider.
//!
//! Each client implements its trait from [`finwell_core::provider`] over a
//! shared [`reqwest::Client`]. Failures are logged at warn level and surfaced
//! as [`finwell_core::provider::ProviderError`] — a collaborator outage is
//! never fatal to the process.

mod aggregator;
mod mail;
mod sms;

pub use aggregator::{AggregatorClient, AggregatorConfig};
pub use mail::{MailClient, MailConfig};
pub use sms::{SmsClient, SmsConfig};

use std::time::Duration;

use finwell_core::provider::ProviderError;

/// Shared client-builder defaults for every provider client.
fn http_client() -> Result<reqwest::Client, ProviderError> {
  reqwest::Client::builder()
    .timeout(Duration::from_secs(30))
    .build()
    .map_err(|e| ProviderError::new(format!("failed to build HTTP client: {e}")))
}
