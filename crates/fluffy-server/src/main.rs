//! Fluffy server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `FLUFFY_*`
//! environment variables, opens an in-process SQLite store, and serves the
//! JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `bridge_password_hash`:
//!
//! ```
//! cargo run -p fluffy-server -- --hash-password
//! ```

mod config;
mod webhook;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use fluffy_api::{AppState, BridgeAuth, NoopNotifier, Notifier};
use fluffy_core::admin::AdminAllowlist;
use fluffy_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{config::ServerConfig, webhook::WebhookNotifier};

#[derive(Parser)]
#[command(author, version, about = "Fluffy link-in-bio server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(
      ::config::Environment::with_prefix("FLUFFY")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("admin_ids"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let admins =
    AdminAllowlist::new(server_cfg.owner_id.clone(), server_cfg.admin_ids.clone());
  tracing::info!(admins = ?admins.ids().collect::<Vec<_>>(), "admin allowlist loaded");

  let notifier: Arc<dyn Notifier> = match &server_cfg.webhook_url {
    Some(url) if !url.trim().is_empty() => Arc::new(WebhookNotifier::new(url.trim())?),
    _ => {
      tracing::info!("no webhook_url configured; notifications disabled");
      Arc::new(NoopNotifier)
    }
  };

  let state = AppState {
    store: Arc::new(store),
    admins: Arc::new(admins),
    bridge: Arc::new(BridgeAuth {
      username:      server_cfg.bridge_username.clone(),
      password_hash: server_cfg.bridge_password_hash.clone(),
    }),
    notifier,
    secure_cookies: server_cfg.secure_cookies,
  };

  let app = fluffy_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
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
