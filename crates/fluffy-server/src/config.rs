//! Runtime server configuration, deserialised from `config.toml` and
//! `FLUFFY_*` environment variables.

use std::path::PathBuf;

use serde::Deserialize;

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 3000 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/fluffy/fluffy.db") }

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// Always an admin; can never be deleted.
  pub owner_id:             String,
  #[serde(default)]
  pub admin_ids:            Vec<String>,
  pub bridge_username:      String,
  pub bridge_password_hash: String,
  /// Outbound notification endpoint. Notifications are off when unset.
  #[serde(default)]
  pub webhook_url:          Option<String>,
  #[serde(default)]
  pub secure_cookies:       bool,
}
