//! Visit counters for the caller's profile and links.

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use fluffy_core::{store::ProfileStore, visit::VisitTarget};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
  /// Click count per owned link id.
  pub counts:        BTreeMap<Uuid, u64>,
  pub profile_views: u64,
}

/// `GET /stats`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<StatsResponse>, ApiError>
where
  S: ProfileStore,
{
  let links = state
    .store
    .list_links(user.user_id.clone())
    .await
    .map_err(ApiError::store)?;

  let profile = VisitTarget::Profile(user.user_id);
  let mut targets: Vec<VisitTarget> =
    links.iter().map(|l| VisitTarget::Link(l.link_id)).collect();
  targets.push(profile.clone());

  let counts = state
    .store
    .count_visits(targets)
    .await
    .map_err(ApiError::store)?;

  let profile_views = counts.get(&profile).copied().unwrap_or(0);
  let counts = counts
    .into_iter()
    .filter_map(|(target, n)| match target {
      VisitTarget::Link(id) => Some((id, n)),
      VisitTarget::Profile(_) => None,
    })
    .collect();

  Ok(Json(StatsResponse { counts, profile_views }))
}
