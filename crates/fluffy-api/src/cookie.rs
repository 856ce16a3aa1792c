//! Minimal cookie reading and `Set-Cookie` construction.

use axum::http::{HeaderMap, HeaderValue, header};

/// Login session cookie; carries the bearer token.
pub const SESSION_COOKIE: &str = "fl_session";

/// Anonymous per-browser id used to de-duplicate visit counts.
pub const VISITOR_COOKIE: &str = "fl_sid";

pub const VISITOR_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;
pub const SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// The value of cookie `name`, if the request carries a non-empty one.
pub fn get<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v.trim())
    .filter(|v| !v.is_empty())
}

/// A `Set-Cookie` value for an HTTP-only, path-wide cookie.
///
/// `None` is returned only if `value` contains bytes that cannot appear in a
/// header.
pub fn set(
  name: &str,
  value: &str,
  max_age_secs: u64,
  secure: bool,
) -> Option<HeaderValue> {
  let secure = if secure { "; Secure" } else { "" };
  HeaderValue::from_str(&format!(
    "{name}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax{secure}"
  ))
  .ok()
}

/// A `Set-Cookie` value that expires `name` immediately.
pub fn clear(name: &str, secure: bool) -> Option<HeaderValue> {
  set(name, "", 0, secure)
}
