//! Visitor-facing endpoints: public profiles, link redirects and raw user JSON.
//!
//! `/p/` and `/go/` attribute visits to the `fl_sid` visitor cookie, issuing a
//! fresh one when the browser has none.

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, HeaderValue, header},
  response::{IntoResponse, Redirect, Response},
};
use fluffy_core::{
  Error as CoreError,
  link::Link,
  store::ProfileStore,
  theme::{self, CUSTOM_THEME_ID, CustomTheme, ProfileTag, ThemePreset},
  user::{User, UserWithLinks},
  visit::VisitTarget,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{AppState, cookie, error::ApiError};

// ─── Visitor session ─────────────────────────────────────────────────────────

/// The visitor's session id, plus a `Set-Cookie` value when it was just minted.
fn visitor_session(
  headers: &HeaderMap,
  secure: bool,
) -> (String, Option<HeaderValue>) {
  match cookie::get(headers, cookie::VISITOR_COOKIE) {
    Some(sid) => (sid.to_owned(), None),
    None => {
      let sid = Uuid::new_v4().to_string();
      let set = cookie::set(
        cookie::VISITOR_COOKIE,
        &sid,
        cookie::VISITOR_MAX_AGE_SECS,
        secure,
      );
      (sid, set)
    }
  }
}

fn with_cookie(mut res: Response, set: Option<HeaderValue>) -> Response {
  if let Some(c) = set {
    res.headers_mut().append(header::SET_COOKIE, c);
  }
  res
}

async fn record<S: ProfileStore>(state: &AppState<S>, target: VisitTarget, sid: String) {
  if let Err(e) = state.store.record_visit(target, Some(sid)).await {
    warn!(error = %e, "visit not recorded");
  }
}

// ─── Public profile ──────────────────────────────────────────────────────────

/// What a visitor sees on `/p/{handle}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
  pub id:           String,
  pub handle:       String,
  pub name:         String,
  pub bio:          String,
  pub theme:        String,
  /// Resolved preset; absent for the custom theme.
  pub preset:       Option<ThemePreset>,
  /// Custom-theme settings; absent for presets.
  pub custom_theme: Option<CustomTheme>,
  pub is_dark:      bool,
  pub banner_url:   String,
  pub image:        String,
  pub profile_tag:  Option<ProfileTag>,
  /// Enabled links only, in display order.
  pub links:        Vec<Link>,
}

impl PublicProfile {
  fn new(user: User, links: Vec<Link>) -> Self {
    let custom = user.theme == CUSTOM_THEME_ID;
    Self {
      preset: (!custom).then(|| *theme::preset(&user.theme)),
      custom_theme: custom.then(|| user.custom_theme()),
      is_dark: theme::is_dark(&user.theme),
      profile_tag: user.profile_tag.as_deref().and_then(theme::profile_tag).copied(),
      links: links.into_iter().filter(|l| l.enabled).collect(),
      id: user.user_id,
      handle: user.handle,
      name: user.name,
      bio: user.bio,
      theme: user.theme,
      banner_url: user.banner_url,
      image: user.image,
    }
  }
}

/// `GET /p/{handle}`: 404 when absent or private.
pub async fn profile<S>(
  State(state): State<AppState<S>>,
  Path(handle): Path<String>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: ProfileStore,
{
  let user = state
    .store
    .get_user_by_handle(handle)
    .await
    .map_err(ApiError::store)?
    .filter(|u| u.is_public)
    .ok_or(CoreError::NotFound)?;

  let (sid, set) = visitor_session(&headers, state.secure_cookies);
  record(&state, VisitTarget::Profile(user.user_id.clone()), sid).await;

  let links = state
    .store
    .list_links(user.user_id.clone())
    .await
    .map_err(ApiError::store)?;

  let res = Json(PublicProfile::new(user, links)).into_response();
  Ok(with_cookie(res, set))
}

// ─── Link redirect ───────────────────────────────────────────────────────────

/// `GET /go/{id}`: counts the click and redirects; unknown links go home.
pub async fn go<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: ProfileStore,
{
  let link = match Uuid::parse_str(&id) {
    Ok(link_id) => state.store.get_link(link_id).await.map_err(ApiError::store)?,
    Err(_) => None,
  };
  let Some(link) = link.filter(|l| l.enabled) else {
    return Ok(Redirect::to("/").into_response());
  };

  let (sid, set) = visitor_session(&headers, state.secure_cookies);
  record(&state, VisitTarget::Link(link.link_id), sid).await;

  Ok(with_cookie(Redirect::to(&link.url).into_response(), set))
}

// ─── Raw user JSON ───────────────────────────────────────────────────────────

/// `GET /users/{id}`
pub async fn user<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<UserWithLinks>, ApiError>
where
  S: ProfileStore,
{
  let id = id.trim().to_owned();
  if id.is_empty() {
    return Err(CoreError::MissingInput("user id".to_owned()).into());
  }
  let user = state
    .store
    .get_user(id.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::NotFound)?;
  let links = state.store.list_links(id).await.map_err(ApiError::store)?;
  Ok(Json(UserWithLinks { user, links }))
}
