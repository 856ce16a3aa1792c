//! Link platforms and canonical URL construction.
//!
//! Handle-based platforms (`x`, `instagram`, `bluesky`) accept a bare handle
//! or a profile URL and always store the canonical profile URL. Free-form
//! platforms store the trimmed input verbatim.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// Icon stored for `other` links without a usable custom glyph.
pub const DEFAULT_LINK_ICON: &str = "link";

/// Closed set of link destinations. Drives URL-building and icon rules.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
  DiscordServer,
  X,
  Youtube,
  Bluesky,
  Instagram,
  Other,
}

impl Platform {
  /// Whether this platform stores a URL derived from a bare handle.
  pub fn takes_handle(self) -> bool {
    matches!(self, Self::X | Self::Instagram | Self::Bluesky)
  }

  /// Path segments of the canonical URL that precede the handle.
  fn handle_prefix(self) -> &'static [&'static str] {
    match self {
      Self::Bluesky => &["profile"],
      _ => &[],
    }
  }

  fn label(self) -> &'static str {
    match self {
      Self::X => "X (Twitter) handle",
      Self::Instagram => "Instagram handle",
      Self::Bluesky => "Bluesky handle",
      _ => "URL",
    }
  }

  /// The icon assigned to a link of this platform when none is chosen.
  pub fn default_icon(self) -> &'static str {
    match self {
      Self::DiscordServer => "discord_server",
      Self::X => "x",
      Self::Youtube => "youtube",
      Self::Bluesky => "bluesky",
      Self::Instagram => "instagram",
      Self::Other => DEFAULT_LINK_ICON,
    }
  }
}

fn strip_scheme(input: &str) -> Option<&str> {
  ["https://", "http://"].iter().find_map(|scheme| {
    input
      .get(..scheme.len())
      .filter(|p| p.eq_ignore_ascii_case(scheme))
      .map(|_| &input[scheme.len()..])
  })
}

/// Control characters can never appear in a stored URL or a `Location` header.
fn reject_control(input: &str) -> Result<()> {
  if input.chars().any(char::is_control) {
    return Err(Error::InvalidInput(
      "input contains control characters".to_owned(),
    ));
  }
  Ok(())
}

/// Whether `input` begins with an `http://` or `https://` scheme.
pub fn has_scheme(input: &str) -> bool { strip_scheme(input).is_some() }

/// Reduce a handle-or-URL input to a bare handle for `platform`.
///
/// A URL input is parsed and the first path segment after the platform's
/// canonical prefix is taken; otherwise leading `@`s are stripped.
pub fn extract_handle(platform: Platform, input: &str) -> Result<String> {
  let v = input.trim();
  reject_control(v)?;

  let candidate = match strip_scheme(v) {
    Some(rest) => {
      let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
      if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(Error::InvalidInput(format!(
          "enter only the {}, not a URL",
          platform.label()
        )));
      }
      let path = path.split(['?', '#']).next().unwrap_or("");
      let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
      for prefix in platform.handle_prefix() {
        if segments.peek() == Some(prefix) {
          segments.next();
        }
      }
      segments.next().unwrap_or("").to_owned()
    }
    None => v.to_owned(),
  };

  let handle = candidate.trim_start_matches('@').to_owned();
  if handle.is_empty() {
    return Err(Error::MissingInput(platform.label().to_owned()));
  }
  if handle.contains(|c: char| c.is_whitespace() || c == '/') {
    return Err(Error::InvalidInput(format!(
      "{} must not contain spaces or slashes",
      platform.label()
    )));
  }
  Ok(handle)
}

/// Build the canonical stored URL for `platform` from a handle or URL.
pub fn build_url(platform: Platform, handle_or_url: &str) -> Result<String> {
  match platform {
    Platform::X => {
      Ok(format!("https://x.com/{}", extract_handle(platform, handle_or_url)?))
    }
    Platform::Instagram => Ok(format!(
      "https://www.instagram.com/{}/",
      extract_handle(platform, handle_or_url)?
    )),
    Platform::Bluesky => Ok(format!(
      "https://bsky.app/profile/{}",
      extract_handle(platform, handle_or_url)?
    )),
    Platform::Youtube | Platform::DiscordServer | Platform::Other => {
      let u = handle_or_url.trim();
      if u.is_empty() {
        return Err(Error::MissingInput(platform.label().to_owned()));
      }
      reject_control(u)?;
      if !has_scheme(u) {
        return Err(Error::InvalidInput(
          "expected a full URL starting with http:// or https://".to_owned(),
        ));
      }
      Ok(u.to_owned())
    }
  }
}

/// Rough `Extended_Pictographic` membership test over the emoji blocks.
fn is_pictographic(c: char) -> bool {
  matches!(
    c as u32,
    0x00A9
      | 0x00AE
      | 0x203C
      | 0x2049
      | 0x2122
      | 0x2139
      | 0x2194..=0x2199
      | 0x21A9..=0x21AA
      | 0x231A..=0x231B
      | 0x2328
      | 0x23CF
      | 0x23E9..=0x23FA
      | 0x24C2
      | 0x25AA..=0x25FE
      | 0x2600..=0x27BF
      | 0x2934..=0x2935
      | 0x2B05..=0x2B55
      | 0x3030
      | 0x303D
      | 0x3297
      | 0x3299
      | 0x1F000..=0x1FAFF
  )
}

/// Choose the icon stored for a link.
///
/// Only `other` links honour a custom glyph, and only a single pictographic
/// character (optionally followed by a variation selector). Anything else
/// silently falls back to the default icon.
pub fn resolve_icon(platform: Platform, custom: Option<&str>) -> String {
  if platform != Platform::Other {
    return platform.default_icon().to_owned();
  }

  let Some(raw) = custom.map(str::trim).filter(|s| !s.is_empty()) else {
    return DEFAULT_LINK_ICON.to_owned();
  };
  if raw == DEFAULT_LINK_ICON || raw == "🔗" {
    return DEFAULT_LINK_ICON.to_owned();
  }

  let mut chars = raw.chars();
  let first = chars.next();
  let rest: Vec<char> = chars.collect();
  match (first, rest.as_slice()) {
    (Some(c), []) | (Some(c), ['\u{FE0F}']) if is_pictographic(c) => {
      raw.to_owned()
    }
    _ => DEFAULT_LINK_ICON.to_owned(),
  }
}
