//! Admin surface. Every handler requires an [`AdminUser`].
//!
//! | Method   | Path                | Notes |
//! |----------|---------------------|-------|
//! | `GET`    | `/admin/users`      | all users, newest first |
//! | `PUT`    | `/admin/users/{id}` | body: profile patch |
//! | `DELETE` | `/admin/users/{id}` | the owner cannot be deleted |
//! | `PUT`    | `/admin/links/{id}` | body: link patch |
//! | `DELETE` | `/admin/links/{id}` | reindexes the owner's links |
//! | `GET`    | `/admin/logs`       | `?limit=` (default 200, max 1000) |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use fluffy_core::{
  Error as CoreError,
  audit::{LogEntry, LogKind, NewLogEntry},
  link::LinkPatch,
  store::ProfileStore,
  user::{ProfilePatch, User},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState, audit::ClientIp, auth::AdminUser, error::ApiError,
  links::LinksResponse,
};

pub const DEFAULT_LOG_LIMIT: usize = 200;
pub const MAX_LOG_LIMIT: usize = 1000;

/// An admin-scoped entry: acted on `target` by `admin`.
fn admin_entry(
  kind: LogKind,
  admin: &AdminUser,
  target: &str,
  message: String,
  ip: String,
) -> NewLogEntry {
  NewLogEntry::own(kind, &admin.0.user_id, message)
    .with_target(target)
    .with_ip(ip)
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
  #[serde(flatten)]
  pub user:     User,
  pub is_admin: bool,
  pub is_owner: bool,
}

/// `GET /admin/users`
pub async fn list_users<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
) -> Result<Json<Vec<AdminUserView>>, ApiError>
where
  S: ProfileStore,
{
  let users = state.store.list_users().await.map_err(ApiError::store)?;
  let views = users
    .into_iter()
    .map(|user| AdminUserView {
      is_admin: state.admins.is_admin(&user.user_id),
      is_owner: state.admins.is_owner(&user.user_id),
      user,
    })
    .collect();
  Ok(Json(views))
}

/// `PUT /admin/users/{id}`
pub async fn update_user<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  admin: AdminUser,
  Path(id): Path<String>,
  Json(patch): Json<ProfilePatch>,
) -> Result<Json<User>, ApiError>
where
  S: ProfileStore,
{
  let changes = patch.validate()?;
  let updated = state
    .store
    .update_profile(id.clone(), changes)
    .await
    .map_err(ApiError::store)?;

  let message = format!("admin updated user @{}", updated.handle);
  state
    .audit_and_notify(admin_entry(LogKind::AdminUserUpdate, &admin, &id, message, ip))
    .await;
  Ok(Json(updated))
}

/// `DELETE /admin/users/{id}`
pub async fn delete_user<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  admin: AdminUser,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: ProfileStore,
{
  if state.admins.is_owner(&id) {
    return Err(CoreError::Forbidden.into());
  }
  state
    .store
    .delete_user(id.clone())
    .await
    .map_err(ApiError::store)?;

  let message = format!("admin deleted user id={id}");
  state
    .audit_and_notify(admin_entry(LogKind::AdminUserDelete, &admin, &id, message, ip))
    .await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// `PUT /admin/links/{id}`
pub async fn update_link<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  admin: AdminUser,
  Path(id): Path<Uuid>,
  Json(patch): Json<LinkPatch>,
) -> Result<Json<LinksResponse>, ApiError>
where
  S: ProfileStore,
{
  let before = state
    .store
    .get_link(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::NotFound)?;

  let links = state
    .store
    .update_link(before.user_id.clone(), id, patch)
    .await
    .map_err(ApiError::store)?;

  let after = links
    .iter()
    .find(|l| l.link_id == id)
    .map(|l| l.title.as_str())
    .unwrap_or_default();
  let message = format!("admin updated link {:?} -> {after:?}", before.title);
  state
    .audit_and_notify(admin_entry(
      LogKind::AdminLinkUpdate,
      &admin,
      &before.user_id,
      message,
      ip,
    ))
    .await;
  Ok(Json(LinksResponse { links }))
}

/// `DELETE /admin/links/{id}`
pub async fn delete_link<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  admin: AdminUser,
  Path(id): Path<Uuid>,
) -> Result<Json<LinksResponse>, ApiError>
where
  S: ProfileStore,
{
  let before = state
    .store
    .get_link(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::NotFound)?;

  let links = state
    .store
    .delete_link(before.user_id.clone(), id)
    .await
    .map_err(ApiError::store)?;

  let message = format!("admin deleted link {:?}", before.title);
  state
    .audit_and_notify(admin_entry(
      LogKind::AdminLinkDelete,
      &admin,
      &before.user_id,
      message,
      ip,
    ))
    .await;
  Ok(Json(LinksResponse { links }))
}

// ─── Logs ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogParams {
  pub limit: Option<usize>,
}

/// `GET /admin/logs[?limit=<n>]`
pub async fn list_logs<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
  Query(params): Query<LogParams>,
) -> Result<Json<Vec<LogEntry>>, ApiError>
where
  S: ProfileStore,
{
  let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT).min(MAX_LOG_LIMIT);
  let logs = state.store.list_logs(limit).await.map_err(ApiError::store)?;
  Ok(Json(logs))
}
