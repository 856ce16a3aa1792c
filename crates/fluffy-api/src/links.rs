//! Handlers for the caller's own links.
//!
//! | Method   | Path             | Body |
//! |----------|------------------|------|
//! | `POST`   | `/links`         | [`NewLink`] |
//! | `PUT`    | `/links`         | `{"id": .., "patch": {..}}` |
//! | `DELETE` | `/links`         | `{"id": ..}` |
//! | `PUT`    | `/links/bulk`    | `{"links": [..]}` |
//! | `POST`   | `/links/reorder` | `{"orders": [{"id": .., "order": ..}]}` |
//!
//! Every handler responds with the caller's full link list in display order.

use axum::{Json, extract::State, http::StatusCode};
use fluffy_core::{
  audit::{LogKind, NewLogEntry},
  link::{Link, LinkPatch, LinkReplacement, NewLink, OrderUpdate},
  store::ProfileStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, audit::ClientIp, auth::CurrentUser, error::ApiError};

#[derive(Debug, Serialize)]
pub struct LinksResponse {
  pub links: Vec<Link>,
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /links`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  user: CurrentUser,
  Json(input): Json<NewLink>,
) -> Result<(StatusCode, Json<LinksResponse>), ApiError>
where
  S: ProfileStore,
{
  let message = format!(
    "link created ({}) title={:?}",
    input.platform,
    input.title.trim()
  );
  let links = state
    .store
    .append_link(user.user_id.clone(), input)
    .await
    .map_err(ApiError::store)?;

  state
    .audit(NewLogEntry::own(LogKind::LinkCreate, &user.user_id, message).with_ip(ip))
    .await;
  Ok((StatusCode::CREATED, Json(LinksResponse { links })))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub id:    Uuid,
  #[serde(default)]
  pub patch: LinkPatch,
}

/// `PUT /links`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  user: CurrentUser,
  Json(body): Json<UpdateBody>,
) -> Result<Json<LinksResponse>, ApiError>
where
  S: ProfileStore,
{
  let links = state
    .store
    .update_link(user.user_id.clone(), body.id, body.patch)
    .await
    .map_err(ApiError::store)?;

  let title = links
    .iter()
    .find(|l| l.link_id == body.id)
    .map(|l| l.title.as_str())
    .unwrap_or_default();
  let message = format!("link updated id={} title={title:?}", body.id);
  state
    .audit(NewLogEntry::own(LogKind::LinkUpdate, &user.user_id, message).with_ip(ip))
    .await;
  Ok(Json(LinksResponse { links }))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
  pub id: Uuid,
}

/// `DELETE /links`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  user: CurrentUser,
  Json(body): Json<DeleteBody>,
) -> Result<Json<LinksResponse>, ApiError>
where
  S: ProfileStore,
{
  let links = state
    .store
    .delete_link(user.user_id.clone(), body.id)
    .await
    .map_err(ApiError::store)?;

  let message = format!("link deleted id={}", body.id);
  state
    .audit(NewLogEntry::own(LogKind::LinkDelete, &user.user_id, message).with_ip(ip))
    .await;
  Ok(Json(LinksResponse { links }))
}

// ─── Bulk replace ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BulkBody {
  pub links: Vec<LinkReplacement>,
}

/// `PUT /links/bulk`: all-or-nothing.
pub async fn bulk<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  user: CurrentUser,
  Json(body): Json<BulkBody>,
) -> Result<Json<LinksResponse>, ApiError>
where
  S: ProfileStore,
{
  let count = body.links.len();
  let links = state
    .store
    .replace_links(user.user_id.clone(), body.links)
    .await
    .map_err(ApiError::store)?;

  let message = format!("links bulk updated count={count}");
  state
    .audit(
      NewLogEntry::own(LogKind::LinkBulkUpdate, &user.user_id, message).with_ip(ip),
    )
    .await;
  Ok(Json(LinksResponse { links }))
}

// ─── Reorder ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
  pub orders: Vec<OrderUpdate>,
}

/// `POST /links/reorder`: all-or-nothing.
pub async fn reorder<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  user: CurrentUser,
  Json(body): Json<ReorderBody>,
) -> Result<Json<LinksResponse>, ApiError>
where
  S: ProfileStore,
{
  let count = body.orders.len();
  let links = state
    .store
    .reorder_links(user.user_id.clone(), body.orders)
    .await
    .map_err(ApiError::store)?;

  let message = format!("links reordered count={count}");
  state
    .audit(NewLogEntry::own(LogKind::LinkReorder, &user.user_id, message).with_ip(ip))
    .await;
  Ok(Json(LinksResponse { links }))
}
