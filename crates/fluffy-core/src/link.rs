//! Links: a user's ordered list of outbound destinations.
//!
//! For a fixed owner, `order` values form a dense zero-based permutation of
//! `0..count` after every completed mutation. Ties are not prevented by the
//! store; [`reindex_plan`] restores density.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  platform::{Platform, build_url, resolve_icon},
};

// ─── Limits ──────────────────────────────────────────────────────────────────

pub const MAX_TITLE_LEN: usize = 60;
pub const MAX_SUBTITLE_LEN: usize = 80;
pub const MAX_HANDLE_INPUT_LEN: usize = 80;
pub const MAX_URL_LEN: usize = 2048;
/// Largest reorder batch accepted in one request.
pub const MAX_REORDER_BATCH: usize = 200;

// ─── Link ────────────────────────────────────────────────────────────────────

/// A stored link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
  #[serde(rename = "id")]
  pub link_id:    Uuid,
  /// Owning user; never changes after creation.
  pub user_id:    String,
  pub platform:   Platform,
  pub title:      String,
  /// Canonical resolved URL.
  pub url:        String,
  pub subtitle:   String,
  pub icon:       String,
  pub enabled:    bool,
  pub order:      u32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Validated, storable link attributes (everything but identity and order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFields {
  pub platform: Platform,
  pub title:    String,
  pub url:      String,
  pub subtitle: String,
  pub icon:     String,
  pub enabled:  bool,
}

// ─── Field checks ────────────────────────────────────────────────────────────

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
  if value.chars().count() > max {
    return Err(Error::InvalidInput(format!(
      "{field} must be at most {max} characters"
    )));
  }
  Ok(())
}

fn check_title(title: &str) -> Result<String> {
  let title = title.trim();
  if title.is_empty() {
    return Err(Error::MissingInput("title".to_owned()));
  }
  check_len("title", title, MAX_TITLE_LEN)?;
  Ok(title.to_owned())
}

fn check_subtitle(subtitle: Option<&str>) -> Result<String> {
  let subtitle = subtitle.unwrap_or_default();
  check_len("subtitle", subtitle, MAX_SUBTITLE_LEN)?;
  Ok(subtitle.to_owned())
}

fn check_source(handle: Option<&str>, url: Option<&str>) -> Result<()> {
  if let Some(h) = handle {
    check_len("handle", h, MAX_HANDLE_INPUT_LEN)?;
  }
  if let Some(u) = url {
    check_len("url", u, MAX_URL_LEN)?;
  }
  Ok(())
}

/// Pick the raw input the URL builder should see: handle-based platforms
/// prefer the handle, free-form platforms prefer the URL.
fn url_source<'a>(
  platform: Platform,
  handle: Option<&'a str>,
  url: Option<&'a str>,
) -> Option<&'a str> {
  let non_blank = |s: &&str| !s.trim().is_empty();
  let (first, second) = if platform.takes_handle() {
    (handle, url)
  } else {
    (url, handle)
  };
  first.filter(non_blank).or(second.filter(non_blank))
}

// ─── NewLink ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ProfileStore::append_link`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewLink {
  pub platform: Platform,
  pub title:    String,
  pub handle:   Option<String>,
  pub url:      Option<String>,
  pub subtitle: Option<String>,
  pub icon:     Option<String>,
  pub enabled:  Option<bool>,
}

impl NewLink {
  /// Validate every field and resolve the canonical URL and icon.
  pub fn resolve(&self) -> Result<LinkFields> {
    check_source(self.handle.as_deref(), self.url.as_deref())?;
    let title = check_title(&self.title)?;
    let subtitle = check_subtitle(self.subtitle.as_deref())?;
    let source =
      url_source(self.platform, self.handle.as_deref(), self.url.as_deref())
        .unwrap_or("");
    let url = build_url(self.platform, source)?;

    Ok(LinkFields {
      platform: self.platform,
      title,
      url,
      subtitle,
      icon: resolve_icon(self.platform, self.icon.as_deref()),
      enabled: self.enabled.unwrap_or(true),
    })
  }
}

// ─── LinkPatch ───────────────────────────────────────────────────────────────

/// A partial update. Present fields replace the stored value; absent fields
/// keep it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkPatch {
  pub platform: Option<Platform>,
  pub title:    Option<String>,
  pub handle:   Option<String>,
  pub url:      Option<String>,
  pub subtitle: Option<String>,
  pub icon:     Option<String>,
  pub enabled:  Option<bool>,
  pub order:    Option<u32>,
}

impl LinkPatch {
  /// Merge onto `current`, returning the resulting fields and order.
  ///
  /// The URL is rebuilt only when the platform, handle or URL changes.
  pub fn apply(&self, current: &Link) -> Result<(LinkFields, u32)> {
    check_source(self.handle.as_deref(), self.url.as_deref())?;

    let platform = self.platform.unwrap_or(current.platform);
    let title = match &self.title {
      Some(t) => check_title(t)?,
      None => current.title.clone(),
    };
    let subtitle = match &self.subtitle {
      Some(s) => check_subtitle(Some(s))?,
      None => current.subtitle.clone(),
    };

    // A present but blank source is an error, never a no-op.
    let url = if self.handle.is_some() || self.url.is_some() {
      let source =
        url_source(platform, self.handle.as_deref(), self.url.as_deref())
          .unwrap_or("");
      build_url(platform, source)?
    } else if platform != current.platform {
      build_url(platform, &current.url)?
    } else {
      current.url.clone()
    };

    let icon = if self.icon.is_some() || platform != current.platform {
      let custom = self.icon.as_deref().or(Some(current.icon.as_str()));
      resolve_icon(platform, custom)
    } else {
      current.icon.clone()
    };

    let fields = LinkFields {
      platform,
      title,
      url,
      subtitle,
      icon,
      enabled: self.enabled.unwrap_or(current.enabled),
    };
    Ok((fields, self.order.unwrap_or(current.order)))
  }
}

// ─── Bulk replace / reorder ──────────────────────────────────────────────────

/// One entry of a bulk replace: the full desired state of an owned link.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkReplacement {
  #[serde(rename = "id")]
  pub link_id:  Uuid,
  pub platform: Platform,
  pub title:    String,
  pub url:      String,
  pub subtitle: Option<String>,
  pub icon:     Option<String>,
  pub enabled:  Option<bool>,
  pub order:    u32,
}

impl LinkReplacement {
  pub fn resolve(&self) -> Result<(Uuid, LinkFields, u32)> {
    check_source(None, Some(&self.url))?;
    let fields = LinkFields {
      platform: self.platform,
      title:    check_title(&self.title)?,
      url:      build_url(self.platform, &self.url)?,
      subtitle: check_subtitle(self.subtitle.as_deref())?,
      icon:     resolve_icon(self.platform, self.icon.as_deref()),
      enabled:  self.enabled.unwrap_or(true),
    };
    Ok((self.link_id, fields, self.order))
  }
}

/// One entry of a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
  #[serde(rename = "id")]
  pub link_id: Uuid,
  pub order:   u32,
}

/// Reject oversized reorder batches.
pub fn check_reorder_batch(orders: &[OrderUpdate]) -> Result<()> {
  if orders.len() > MAX_REORDER_BATCH {
    return Err(Error::InvalidInput(format!(
      "at most {MAX_REORDER_BATCH} links can be reordered at once"
    )));
  }
  Ok(())
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Display order: by `order`, ties broken by creation time, then id.
pub fn sort_links(links: &mut [Link]) {
  links.sort_by(|a, b| {
    a.order
      .cmp(&b.order)
      .then(a.created_at.cmp(&b.created_at))
      .then(a.link_id.cmp(&b.link_id))
  });
}

/// The writes needed to make `links` dense (`0..count`) while preserving their
/// relative display order. Links already in place are skipped.
pub fn reindex_plan(links: &[Link]) -> Vec<OrderUpdate> {
  let mut sorted = links.to_vec();
  sort_links(&mut sorted);
  sorted
    .iter()
    .enumerate()
    .filter(|(i, l)| l.order != *i as u32)
    .map(|(i, l)| OrderUpdate { link_id: l.link_id, order: i as u32 })
    .collect()
}

/// Whether `links` satisfy the density invariant.
pub fn is_dense(links: &[Link]) -> bool {
  let mut orders: Vec<u32> = links.iter().map(|l| l.order).collect();
  orders.sort_unstable();
  orders.iter().enumerate().all(|(i, o)| *o == i as u32)
}
