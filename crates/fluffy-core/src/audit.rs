//! Audit log entries. Append-only; never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// The event an entry records. Stored as its SCREAMING_SNAKE name.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
  Login,
  Logout,
  UserCreate,
  ProfileUpdate,
  LinkCreate,
  LinkUpdate,
  LinkDelete,
  LinkBulkUpdate,
  LinkReorder,
  AdminUserUpdate,
  AdminUserDelete,
  AdminLinkUpdate,
  AdminLinkDelete,
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
  #[serde(rename = "id")]
  pub log_id:         Uuid,
  #[serde(rename = "type")]
  pub kind:           LogKind,
  pub message:        String,
  pub actor_user_id:  Option<String>,
  pub target_user_id: Option<String>,
  /// Best-effort client address; may be empty.
  pub ip:             String,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::ProfileStore::append_log`].
#[derive(Debug, Clone)]
pub struct NewLogEntry {
  pub kind:           LogKind,
  pub message:        String,
  pub actor_user_id:  Option<String>,
  pub target_user_id: Option<String>,
  pub ip:             String,
}

impl NewLogEntry {
  /// An entry where `actor` acted on their own account.
  pub fn own(kind: LogKind, actor: &str, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
      actor_user_id: Some(actor.to_owned()),
      target_user_id: Some(actor.to_owned()),
      ip: String::new(),
    }
  }

  pub fn with_target(mut self, target: impl Into<String>) -> Self {
    self.target_user_id = Some(target.into());
    self
  }

  pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
    self.ip = ip.into();
    self
  }
}
