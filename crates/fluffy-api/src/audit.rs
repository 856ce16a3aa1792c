//! Audit log writer and outbound notifications.
//!
//! Both are best-effort. A failed log write or notification is reported via
//! `tracing` and never reaches the caller of the triggering mutation.

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use fluffy_core::{
  audit::{LogKind, NewLogEntry},
  store::ProfileStore,
};
use tracing::warn;

use crate::AppState;

// ─── Notifications ───────────────────────────────────────────────────────────

/// A human-readable event for an external messaging endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub kind: LogKind,
  pub text: String,
}

impl Notification {
  pub fn from_entry(entry: &NewLogEntry) -> Self {
    let mut text = format!("[{}] {}", entry.kind, entry.message);
    if let Some(actor) = &entry.actor_user_id {
      text.push_str(&format!(" (by {actor})"));
    }
    if !entry.ip.is_empty() {
      text.push_str(&format!(" from {}", entry.ip));
    }
    Self { kind: entry.kind, text }
  }
}

/// Sink for [`Notification`]s.
///
/// `notify` must return promptly and never fail; implementations that do I/O
/// hand the work to a background task.
pub trait Notifier: Send + Sync {
  fn notify(&self, notification: Notification);
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
  fn notify(&self, _: Notification) {}
}

// ─── Audit writer ────────────────────────────────────────────────────────────

impl<S: ProfileStore> AppState<S> {
  /// Append `entry` to the audit log. Write failures are logged and dropped.
  pub async fn audit(&self, entry: NewLogEntry) {
    let kind = entry.kind;
    if let Err(e) = self.store.append_log(entry).await {
      warn!(%kind, error = %e, "audit log write failed");
    }
  }

  /// [`audit`](Self::audit), plus a notification for the same event.
  pub async fn audit_and_notify(&self, entry: NewLogEntry) {
    self.notifier.notify(Notification::from_entry(&entry));
    self.audit(entry).await;
  }
}

// ─── Client address ──────────────────────────────────────────────────────────

/// Best-effort client address for audit entries; empty when unknown.
pub fn client_ip(headers: &HeaderMap) -> String {
  let forwarded = headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .map(str::trim)
    .filter(|v| !v.is_empty());
  let real = || {
    headers
      .get("x-real-ip")
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
  };
  forwarded.or_else(real).unwrap_or_default().to_owned()
}

/// Extractor wrapper around [`client_ip`].
pub struct ClientIp(pub String);

impl<St: Send + Sync> FromRequestParts<St> for ClientIp {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _: &St,
  ) -> Result<Self, Self::Rejection> {
    Ok(ClientIp(client_ip(&parts.headers)))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn forwarded_for_wins() {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
    assert_eq!(client_ip(&headers), "10.0.0.2");

    headers.insert(
      "x-forwarded-for",
      HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
    );
    assert_eq!(client_ip(&headers), "203.0.113.9");

    assert_eq!(client_ip(&HeaderMap::new()), "");
  }

  #[test]
  fn notification_text() {
    let entry = NewLogEntry::own(LogKind::Login, "42", "login @fox")
      .with_ip("203.0.113.9");
    let n = Notification::from_entry(&entry);
    assert_eq!(n.kind, LogKind::Login);
    assert_eq!(n.text, "[LOGIN] login @fox (by 42) from 203.0.113.9");
  }
}
