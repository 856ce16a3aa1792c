//! Login sessions and the identity bridge.
//!
//! The OAuth exchange happens elsewhere. A trusted bridge, authenticated with
//! HTTP Basic credentials, reports the resulting identity to `POST /auth/login`
//! and receives an opaque session token. Only the token's SHA-256 digest is
//! stored.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::{HeaderMap, StatusCode, header, request::Parts},
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use fluffy_core::{
  Error as CoreError,
  audit::{LogKind, NewLogEntry},
  store::ProfileStore,
  user::{Identity, Provisioned, User},
};
use rand_core::{OsRng, RngCore as _};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{AppState, audit::ClientIp, cookie, error::ApiError};

// ─── Bridge credentials ──────────────────────────────────────────────────────

/// Credentials the identity bridge must present.
#[derive(Clone)]
pub struct BridgeAuth {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify HTTP Basic bridge credentials from `headers`.
pub fn verify_bridge(headers: &HeaderMap, bridge: &BridgeAuth) -> Result<(), ApiError> {
  let unauthorized = || ApiError::from(CoreError::Unauthorized);

  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or_else(unauthorized)?;
  let decoded = B64.decode(encoded).map_err(|_| unauthorized())?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| unauthorized())?;

  let (username, password) = creds.split_once(':').ok_or_else(unauthorized)?;
  if username != bridge.username {
    return Err(unauthorized());
  }

  let parsed_hash =
    PasswordHash::new(&bridge.password_hash).map_err(|_| unauthorized())?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| unauthorized())?;

  Ok(())
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// A fresh 256-bit session token, hex encoded.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// The stored form of a session token.
pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// The caller's token: `Authorization: Bearer` first, then the session cookie.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .or_else(|| cookie::get(headers, cookie::SESSION_COOKIE))
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// The authenticated caller. Rejects with 401 when no valid session exists.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub user_id: String,
  token_hash:  String,
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: ProfileStore,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = presented_token(&parts.headers).ok_or(CoreError::Unauthorized)?;
    let token_hash = hash_token(token);
    let user_id = state
      .store
      .session_user(token_hash.clone())
      .await
      .map_err(ApiError::store)?
      .ok_or(CoreError::Unauthorized)?;
    Ok(CurrentUser { user_id, token_hash })
  }
}

/// An authenticated caller on the admin allowlist. Rejects with 403 otherwise.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl<S> FromRequestParts<AppState<S>> for AdminUser
where
  S: ProfileStore,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let user = CurrentUser::from_request_parts(parts, state).await?;
    if !state.admins.is_admin(&user.user_id) {
      return Err(CoreError::Forbidden.into());
    }
    Ok(AdminUser(user))
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub user:    User,
  pub token:   String,
  /// Whether this login provisioned a new user.
  pub created: bool,
}

/// `POST /auth/login`: bridge-authenticated; body is an [`Identity`].
pub async fn login<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  headers: HeaderMap,
  Json(identity): Json<Identity>,
) -> Result<Response, ApiError>
where
  S: ProfileStore,
{
  verify_bridge(&headers, &state.bridge)?;
  if identity.external_id.trim().is_empty() {
    return Err(CoreError::MissingInput("external_id".to_owned()).into());
  }

  let (user, provisioned) = state
    .store
    .provision_user(identity)
    .await
    .map_err(ApiError::store)?;

  let token = new_token();
  state
    .store
    .create_session(user.user_id.clone(), hash_token(&token))
    .await
    .map_err(ApiError::store)?;

  let created = provisioned == Provisioned::Created;
  let entry = if created {
    NewLogEntry::own(
      LogKind::UserCreate,
      &user.user_id,
      format!("user created @{} ({})", user.handle, user.name),
    )
  } else {
    NewLogEntry::own(LogKind::Login, &user.user_id, format!("login @{}", user.handle))
  };
  state.audit_and_notify(entry.with_ip(ip)).await;

  let session_cookie = cookie::set(
    cookie::SESSION_COOKIE,
    &token,
    cookie::SESSION_MAX_AGE_SECS,
    state.secure_cookies,
  );
  let mut res = Json(LoginResponse { user, token, created }).into_response();
  if let Some(c) = session_cookie {
    res.headers_mut().append(header::SET_COOKIE, c);
  }
  Ok(res)
}

/// `POST /auth/logout`: ends the caller's session.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  user: CurrentUser,
) -> Result<Response, ApiError>
where
  S: ProfileStore,
{
  state
    .store
    .delete_session(user.token_hash.clone())
    .await
    .map_err(ApiError::store)?;

  state
    .audit_and_notify(
      NewLogEntry::own(LogKind::Logout, &user.user_id, "logout").with_ip(ip),
    )
    .await;

  let mut res = StatusCode::NO_CONTENT.into_response();
  if let Some(c) = cookie::clear(cookie::SESSION_COOKIE, state.secure_cookies) {
    res.headers_mut().append(header::SET_COOKIE, c);
  }
  Ok(res)
}
