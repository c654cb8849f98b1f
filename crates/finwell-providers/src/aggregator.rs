//! HTTP client for the bank-data aggregation provider.
//!
//! The wire protocol is JSON-over-POST with the API credentials repeated in
//! every request body. Non-success responses carry a JSON error object whose
//! `error_message` field we surface when parseable.

use finwell_core::provider::{
  AccessGrant, AggregationProvider, LinkToken, ProviderAccount, ProviderError,
  SyncPage, TxRecord,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Connection settings for the aggregation provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
  /// e.g. `https://sandbox.plaid.com`.
  pub base_url:  String,
  pub client_id: String,
  pub secret:    String,
}

/// Aggregation provider client.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct AggregatorClient {
  client: reqwest::Client,
  config: AggregatorConfig,
}

impl AggregatorClient {
  pub fn new(config: AggregatorConfig) -> Result<Self, ProviderError> {
    Ok(Self { client: crate::http_client()?, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
  }

  /// POST `body` to `path` and decode a success response as `T`.
  async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
  where
    B: Serialize,
    T: serde::de::DeserializeOwned,
  {
    let resp = self
      .client
      .post(self.url(path))
      .json(body)
      .send()
      .await
      .map_err(|e| {
        warn!(%path, error = %e, "aggregator request failed");
        ProviderError::new(format!("aggregator request failed: {e}"))
      })?;

    let status = resp.status();
    if !status.is_success() {
      let detail = resp
        .json::<WireError>()
        .await
        .map(|e| e.error_message)
        .unwrap_or_else(|_| status.to_string());
      warn!(%path, %status, %detail, "aggregator returned an error");
      return Err(ProviderError::new(detail));
    }

    resp.json().await.map_err(|e| {
      ProviderError::new(format!("aggregator response decode failed: {e}"))
    })
  }
}

impl AggregationProvider for AggregatorClient {
  async fn create_link_token(
    &self,
    client_user_id: String,
  ) -> Result<LinkToken, ProviderError> {
    let body = CreateLinkTokenRequest {
      client_id:     &self.config.client_id,
      secret:        &self.config.secret,
      client_name:   "finwell",
      language:      "en",
      country_codes: &["US"],
      products:      &["transactions"],
      user:          LinkTokenUser { client_user_id },
    };
    let resp: CreateLinkTokenResponse =
      self.post("link/token/create", &body).await?;
    Ok(LinkToken {
      link_token: resp.link_token,
      expiration: resp.expiration,
    })
  }

  async fn exchange_public_token(
    &self,
    public_token: String,
  ) -> Result<AccessGrant, ProviderError> {
    let body = ExchangeRequest {
      client_id: &self.config.client_id,
      secret: &self.config.secret,
      public_token,
    };
    let resp: ExchangeResponse =
      self.post("item/public_token/exchange", &body).await?;
    Ok(AccessGrant {
      access_token: resp.access_token,
      item_id:      resp.item_id,
    })
  }

  async fn get_accounts(
    &self,
    access_token: String,
  ) -> Result<Vec<ProviderAccount>, ProviderError> {
    let body = AccountsRequest {
      client_id: &self.config.client_id,
      secret: &self.config.secret,
      access_token,
    };
    let resp: AccountsResponse = self.post("accounts/get", &body).await?;
    Ok(resp.accounts.into_iter().map(WireAccount::into_account).collect())
  }

  async fn sync_transactions(
    &self,
    access_token: String,
    cursor: Option<String>,
  ) -> Result<SyncPage, ProviderError> {
    let body = SyncRequest {
      client_id: &self.config.client_id,
      secret: &self.config.secret,
      access_token,
      cursor,
    };
    let resp: SyncResponse = self.post("transactions/sync", &body).await?;
    Ok(SyncPage {
      added:       resp.added.into_iter().map(WireTx::into_record).collect(),
      modified:    resp.modified.into_iter().map(WireTx::into_record).collect(),
      removed:     resp
        .removed
        .into_iter()
        .map(|r| r.transaction_id)
        .collect(),
      next_cursor: resp.next_cursor,
      has_more:    resp.has_more,
    })
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WireError {
  error_message: String,
}

#[derive(Serialize)]
struct LinkTokenUser {
  client_user_id: String,
}

#[derive(Serialize)]
struct CreateLinkTokenRequest<'a> {
  client_id:     &'a str,
  secret:        &'a str,
  client_name:   &'a str,
  language:      &'a str,
  country_codes: &'a [&'a str],
  products:      &'a [&'a str],
  user:          LinkTokenUser,
}

#[derive(Deserialize)]
struct CreateLinkTokenResponse {
  link_token: String,
  expiration: Option<String>,
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
  client_id:    &'a str,
  secret:       &'a str,
  public_token: String,
}

#[derive(Deserialize)]
struct ExchangeResponse {
  access_token: String,
  item_id:      String,
}

#[derive(Serialize)]
struct AccountsRequest<'a> {
  client_id:    &'a str,
  secret:       &'a str,
  access_token: String,
}

#[derive(Deserialize)]
struct AccountsResponse {
  accounts: Vec<WireAccount>,
}

#[derive(Deserialize)]
struct WireBalances {
  current:   Option<f64>,
  available: Option<f64>,
  limit:     Option<f64>,
}

#[derive(Deserialize)]
struct WireAccount {
  account_id: String,
  name:       Option<String>,
  #[serde(rename = "type")]
  kind:       Option<String>,
  subtype:    Option<String>,
  mask:       Option<String>,
  balances:   WireBalances,
}

impl WireAccount {
  fn into_account(self) -> ProviderAccount {
    ProviderAccount {
      account_id:        self.account_id,
      name:              self.name,
      account_type:      self.kind,
      subtype:           self.subtype,
      mask:              self.mask,
      current_balance:   self.balances.current,
      available_balance: self.balances.available,
      credit_limit:      self.balances.limit,
    }
  }
}

#[derive(Serialize)]
struct SyncRequest<'a> {
  client_id:    &'a str,
  secret:       &'a str,
  access_token: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  cursor:       Option<String>,
}

#[derive(Deserialize)]
struct WireTx {
  transaction_id:   String,
  name:             String,
  merchant_name:    Option<String>,
  amount:           f64,
  iso_currency_code: Option<String>,
  #[serde(default)]
  category:         Vec<String>,
  date:             chrono::NaiveDate,
  pending:          Option<bool>,
  payment_channel:  Option<String>,
}

impl WireTx {
  fn into_record(self) -> TxRecord {
    TxRecord {
      external_id:     self.transaction_id,
      name:            self.name,
      merchant_name:   self.merchant_name,
      amount:          self.amount,
      currency_code:   self.iso_currency_code,
      categories:      self.category,
      date:            self.date,
      pending:         self.pending,
      payment_channel: self.payment_channel,
    }
  }
}

#[derive(Deserialize)]
struct RemovedTx {
  transaction_id: String,
}

#[derive(Deserialize)]
struct SyncResponse {
  added:       Vec<WireTx>,
  modified:    Vec<WireTx>,
  removed:     Vec<RemovedTx>,
  next_cursor: String,
  has_more:    bool,
}
