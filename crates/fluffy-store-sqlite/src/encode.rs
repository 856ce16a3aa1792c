//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Enums are stored by their wire names.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use fluffy_core::{
  audit::{LogEntry, LogKind},
  link::Link,
  platform::Platform,
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_platform(s: &str) -> Result<Platform> {
  Platform::from_str(s).map_err(|_| Error::UnknownValue {
    column: "platform",
    value:  s.to_owned(),
  })
}

pub fn decode_log_kind(s: &str) -> Result<LogKind> {
  LogKind::from_str(s).map_err(|_| Error::UnknownValue {
    column: "kind",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, name, handle, handle_lower, bio, \
  theme, theme_json, banner_url, image, provider_image, is_public, \
  profile_tag, created_at, updated_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:        String,
  pub name:           String,
  pub handle:         String,
  pub handle_lower:   String,
  pub bio:            String,
  pub theme:          String,
  pub theme_json:     String,
  pub banner_url:     String,
  pub image:          String,
  pub provider_image: String,
  pub is_public:      bool,
  pub profile_tag:    Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawUser {
  /// Map a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(0)?,
      name:           row.get(1)?,
      handle:         row.get(2)?,
      handle_lower:   row.get(3)?,
      bio:            row.get(4)?,
      theme:          row.get(5)?,
      theme_json:     row.get(6)?,
      banner_url:     row.get(7)?,
      image:          row.get(8)?,
      provider_image: row.get(9)?,
      is_public:      row.get(10)?,
      profile_tag:    row.get(11)?,
      created_at:     row.get(12)?,
      updated_at:     row.get(13)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:        self.user_id,
      name:           self.name,
      handle:         self.handle,
      handle_lower:   self.handle_lower,
      bio:            self.bio,
      theme:          self.theme,
      theme_json:     self.theme_json,
      banner_url:     self.banner_url,
      image:          self.image,
      provider_image: self.provider_image,
      is_public:      self.is_public,
      profile_tag:    self.profile_tag,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub const LINK_COLUMNS: &str = "link_id, user_id, platform, title, url, \
  subtitle, icon, enabled, ord, created_at, updated_at";

/// Raw values read directly from a `links` row.
pub struct RawLink {
  pub link_id:    String,
  pub user_id:    String,
  pub platform:   String,
  pub title:      String,
  pub url:        String,
  pub subtitle:   String,
  pub icon:       String,
  pub enabled:    bool,
  pub order:      u32,
  pub created_at: String,
  pub updated_at: String,
}

impl RawLink {
  /// Map a row selected with [`LINK_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:    row.get(0)?,
      user_id:    row.get(1)?,
      platform:   row.get(2)?,
      title:      row.get(3)?,
      url:        row.get(4)?,
      subtitle:   row.get(5)?,
      icon:       row.get(6)?,
      enabled:    row.get(7)?,
      order:      row.get(8)?,
      created_at: row.get(9)?,
      updated_at: row.get(10)?,
    })
  }

  pub fn into_link(self) -> Result<Link> {
    Ok(Link {
      link_id:    decode_uuid(&self.link_id)?,
      user_id:    self.user_id,
      platform:   decode_platform(&self.platform)?,
      title:      self.title,
      url:        self.url,
      subtitle:   self.subtitle,
      icon:       self.icon,
      enabled:    self.enabled,
      order:      self.order,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const LOG_COLUMNS: &str =
  "log_id, kind, message, actor_user_id, target_user_id, ip, created_at";

/// Raw values read directly from a `logs` row.
pub struct RawLogEntry {
  pub log_id:         String,
  pub kind:           String,
  pub message:        String,
  pub actor_user_id:  Option<String>,
  pub target_user_id: Option<String>,
  pub ip:             String,
  pub created_at:     String,
}

impl RawLogEntry {
  /// Map a row selected with [`LOG_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:         row.get(0)?,
      kind:           row.get(1)?,
      message:        row.get(2)?,
      actor_user_id:  row.get(3)?,
      target_user_id: row.get(4)?,
      ip:             row.get(5)?,
      created_at:     row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<LogEntry> {
    Ok(LogEntry {
      log_id:         decode_uuid(&self.log_id)?,
      kind:           decode_log_kind(&self.kind)?,
      message:        self.message,
      actor_user_id:  self.actor_user_id,
      target_user_id: self.target_user_id,
      ip:             self.ip,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}
