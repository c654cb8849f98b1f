//! finwell server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens an
//! in-process SQLite store, builds the three provider clients, and serves
//! the JSON API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use finwell_api::{ApiConfig, AppState};
use finwell_core::sync::SyncMode;
use finwell_providers::{
  AggregatorClient, AggregatorConfig, MailClient, MailConfig, SmsClient,
  SmsConfig,
};
use finwell_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Runtime server configuration, deserialised from `config.toml` plus
/// `FINWELL_`-prefixed environment variables.
#[derive(Deserialize, Clone)]
struct ServerConfig {
  host:         String,
  port:         u16,
  store_path:   PathBuf,
  #[serde(default = "default_service_name")]
  service_name: String,
  #[serde(default)]
  sync_mode:    SyncMode,
  aggregator:   AggregatorConfig,
  mail:         MailConfig,
  sms:          SmsConfig,
}

fn default_service_name() -> String {
  "finwell".to_string()
}

#[derive(Parser)]
#[command(author, version, about = "finwell financial-wellness server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("FINWELL").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Build provider clients.
  let aggregator = AggregatorClient::new(server_cfg.aggregator.clone())
    .context("failed to build aggregator client")?;
  let mailer = MailClient::new(server_cfg.mail.clone())
    .context("failed to build mail client")?;
  let sms = SmsClient::new(server_cfg.sms.clone())
    .context("failed to build sms client")?;

  // Build application state.
  let state = AppState {
    store:      Arc::new(store),
    aggregator: Arc::new(aggregator),
    mailer:     Arc::new(mailer),
    sms:        Arc::new(sms),
    config:     Arc::new(ApiConfig {
      service_name: server_cfg.service_name.clone(),
      sync_mode:    server_cfg.sync_mode,
    }),
  };

  let app = finwell_api::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
