//! The caller's own profile.

use axum::{Json, extract::State};
use fluffy_core::{
  Error as CoreError,
  audit::{LogKind, NewLogEntry},
  store::ProfileStore,
  user::{ProfilePatch, User, UserWithLinks},
};

use crate::{AppState, audit::ClientIp, auth::CurrentUser, error::ApiError};

/// `GET /me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<UserWithLinks>, ApiError>
where
  S: ProfileStore,
{
  let found = state
    .store
    .get_user(user.user_id.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::NotFound)?;
  let links = state
    .store
    .list_links(user.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(UserWithLinks { user: found, links }))
}

/// `PUT /profile`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  user: CurrentUser,
  Json(patch): Json<ProfilePatch>,
) -> Result<Json<User>, ApiError>
where
  S: ProfileStore,
{
  let changes = patch.validate()?;
  let updated = state
    .store
    .update_profile(user.user_id.clone(), changes)
    .await
    .map_err(ApiError::store)?;

  let message = format!("profile updated @{}", updated.handle);
  state
    .audit(NewLogEntry::own(LogKind::ProfileUpdate, &user.user_id, message).with_ip(ip))
    .await;
  Ok(Json(updated))
}
