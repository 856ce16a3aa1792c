//! Visit attribution: at most one counted visit per (target, session).
//!
//! Profile views are keyed by `(user_id, session_id)` and link clicks by
//! `(link_id, session_id)`. The store's uniqueness constraint is the authority;
//! a duplicate insert is an expected outcome, not a failure.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What was visited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VisitTarget {
  /// A public profile page, by owning user id.
  Profile(String),
  /// A link redirect, by link id.
  Link(Uuid),
}

/// Result of an idempotent visit insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitOutcome {
  Recorded,
  /// This session was already counted for the target.
  AlreadyCounted,
  /// No session id was supplied; nothing to attribute.
  Skipped,
}

/// Normalize a caller-supplied session id: blank means absent.
pub fn session_id(raw: Option<&str>) -> Option<&str> {
  raw.map(str::trim).filter(|s| !s.is_empty())
}
