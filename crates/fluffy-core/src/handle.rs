//! Handle normalization.
//!
//! A handle is both a display name and a URL path segment (`/p/{handle}`).
//! The stored display form keeps the user's casing; uniqueness is enforced on
//! the lowercase key.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum handle length, in characters.
pub const MAX_HANDLE_LEN: usize = 20;

/// Handle assigned when a display name normalizes to nothing.
pub const FALLBACK_HANDLE: &str = "user";

/// A normalized handle: the display form plus its uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handle {
  pub display: String,
  pub lower:   String,
}

fn is_separator(c: char) -> bool { c == '_' || c == '.' }

fn is_allowed(c: char) -> bool { c.is_alphanumeric() || is_separator(c) }

fn trim_separators(s: &str) -> &str { s.trim_matches(is_separator) }

/// Canonicalize a user-supplied handle.
///
/// Characters outside letters, digits, `_` and `.` become `_`; runs of
/// separators collapse to their first character; separators are trimmed from
/// both ends; the result is cut to [`MAX_HANDLE_LEN`] characters. The
/// operation is idempotent.
pub fn normalize(raw: &str) -> Result<Handle> {
  let mut cleaned = String::with_capacity(raw.len());
  let mut prev_sep = false;

  for c in raw.trim().chars() {
    let c = if is_allowed(c) { c } else { '_' };
    if is_separator(c) {
      if prev_sep {
        continue;
      }
      prev_sep = true;
    } else {
      prev_sep = false;
    }
    cleaned.push(c);
  }

  let truncated: String = trim_separators(&cleaned)
    .chars()
    .take(MAX_HANDLE_LEN)
    .collect();
  // Truncation can expose a trailing separator.
  let display = trim_separators(&truncated).to_owned();

  if display.is_empty() {
    return Err(Error::InvalidHandle);
  }

  let lower = display.to_lowercase();
  Ok(Handle { display, lower })
}

/// Derive a first handle for a newly provisioned user from their identity
/// provider display name.
pub fn from_display_name(name: &str) -> Handle {
  normalize(name).unwrap_or_else(|_| Handle {
    display: FALLBACK_HANDLE.to_owned(),
    lower:   FALLBACK_HANDLE.to_owned(),
  })
}

/// The `n`-th disambiguated candidate for `base` (`base_2`, `base_3`, ...),
/// shortened so the suffix always fits.
pub fn with_suffix(base: &Handle, n: u32) -> Handle {
  let suffix = format!("_{n}");
  let room = MAX_HANDLE_LEN.saturating_sub(suffix.chars().count());
  let stem: String = base.display.chars().take(room).collect();
  let stem = trim_separators(&stem);
  let stem = if stem.is_empty() { FALLBACK_HANDLE } else { stem };
  let display = format!("{stem}{suffix}");
  let lower = display.to_lowercase();
  Handle { display, lower }
}
