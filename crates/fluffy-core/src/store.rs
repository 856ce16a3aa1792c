//! The `ProfileStore` trait.
//!
//! Implemented by storage backends (e.g. `fluffy-store-sqlite`). The HTTP
//! layer depends on this abstraction, never on a concrete backend.
//!
//! Link mutations take the acting owner's id; a link id that does not belong
//! to that owner behaves exactly like a missing one ([`Error::NotFound`]).
//! Every link mutation returns the owner's full link list in display order.
//!
//! [`Error::NotFound`]: crate::Error::NotFound

use std::{collections::HashMap, future::Future};

use uuid::Uuid;

use crate::{
  DomainError,
  audit::{LogEntry, NewLogEntry},
  link::{Link, LinkPatch, LinkReplacement, NewLink, OrderUpdate},
  user::{Identity, ProfileChanges, Provisioned, User},
  visit::{VisitOutcome, VisitTarget},
};

/// Abstraction over a profile store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ProfileStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create the user for `identity` on first login, otherwise refresh the
  /// cached display name and avatar.
  fn provision_user(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<(User, Provisioned), Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Case-insensitive lookup by handle.
  fn get_user_by_handle(
    &self,
    handle: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Apply validated profile changes. Fails with `HandleTaken` when the new
  /// handle's lowercase key belongs to another user; the stored handle is
  /// left untouched in that case.
  fn update_profile(
    &self,
    user_id: String,
    changes: ProfileChanges,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Delete a user together with their links, visits and sessions.
  fn delete_user(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Links ─────────────────────────────────────────────────────────────

  fn list_links(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Vec<Link>, Self::Error>> + Send + '_;

  fn get_link(
    &self,
    link_id: Uuid,
  ) -> impl Future<Output = Result<Option<Link>, Self::Error>> + Send + '_;

  /// Validate and append a link at `order = count`.
  fn append_link(
    &self,
    user_id: String,
    input: NewLink,
  ) -> impl Future<Output = Result<Vec<Link>, Self::Error>> + Send + '_;

  /// Merge `patch` onto an owned link.
  fn update_link(
    &self,
    user_id: String,
    link_id: Uuid,
    patch: LinkPatch,
  ) -> impl Future<Output = Result<Vec<Link>, Self::Error>> + Send + '_;

  /// Replace the state of several owned links in one transaction. Fails
  /// without writing anything unless every id is owned by `user_id`.
  fn replace_links(
    &self,
    user_id: String,
    links: Vec<LinkReplacement>,
  ) -> impl Future<Output = Result<Vec<Link>, Self::Error>> + Send + '_;

  /// Assign caller-supplied orders in one transaction. Fails with `Forbidden`
  /// without writing anything unless every id is owned by `user_id`.
  fn reorder_links(
    &self,
    user_id: String,
    orders: Vec<OrderUpdate>,
  ) -> impl Future<Output = Result<Vec<Link>, Self::Error>> + Send + '_;

  /// Delete an owned link, then reindex the owner's remaining links one row
  /// at a time. Individual reindex failures are logged, not returned.
  fn delete_link(
    &self,
    user_id: String,
    link_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Link>, Self::Error>> + Send + '_;

  // ── Visits ────────────────────────────────────────────────────────────

  /// Idempotently record one visit for `(target, session_id)`.
  fn record_visit(
    &self,
    target: VisitTarget,
    session_id: Option<String>,
  ) -> impl Future<Output = Result<VisitOutcome, Self::Error>> + Send + '_;

  /// Visit counts per target. Targets with no visits map to zero.
  fn count_visits(
    &self,
    targets: Vec<VisitTarget>,
  ) -> impl Future<Output = Result<HashMap<VisitTarget, u64>, Self::Error>> + Send + '_;

  // ── Audit log ─────────────────────────────────────────────────────────

  fn append_log(
    &self,
    entry: NewLogEntry,
  ) -> impl Future<Output = Result<LogEntry, Self::Error>> + Send + '_;

  /// Most recent entries first.
  fn list_logs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LogEntry>, Self::Error>> + Send + '_;

  // ── Login sessions ────────────────────────────────────────────────────

  /// Persist a login session, identified by the hash of its bearer token.
  fn create_session(
    &self,
    user_id: String,
    token_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The user a session token hash belongs to, if any.
  fn session_user(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  fn delete_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
