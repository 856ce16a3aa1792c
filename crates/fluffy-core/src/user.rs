//! Users, identity-provider input and profile patches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  handle::{self, Handle},
  link::Link,
  theme::{self, CustomTheme},
};

pub const MAX_BIO_LEN: usize = 500;
pub const MAX_ASSET_LEN: usize = 200_000;

/// A provisioned user. `user_id` is the identity provider's stable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  #[serde(rename = "id")]
  pub user_id:        String,
  /// Display name last reported by the identity provider.
  pub name:           String,
  pub handle:         String,
  /// Lowercase of `handle`; unique across all users.
  pub handle_lower:   String,
  pub bio:            String,
  pub theme:          String,
  pub theme_json:     String,
  pub banner_url:     String,
  pub image:          String,
  /// Avatar last reported by the identity provider.
  pub provider_image: String,
  pub is_public:      bool,
  pub profile_tag:    Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

impl User {
  /// Parsed custom-theme settings; empty when malformed.
  pub fn custom_theme(&self) -> CustomTheme { CustomTheme::parse(&self.theme_json) }
}

/// A user together with every link they own, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithLinks {
  #[serde(flatten)]
  pub user:  User,
  pub links: Vec<Link>,
}

// ─── Identity provider ───────────────────────────────────────────────────────

/// What the external identity provider reports on a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
  pub external_id:  String,
  pub display_name: String,
  pub avatar_url:   Option<String>,
}

/// Whether a login created the user or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provisioned {
  Created,
  Refreshed,
}

/// Image to keep on refresh: a user-uploaded `data:` image survives, anything
/// else follows the provider avatar.
pub fn refreshed_image(current: &str, provider_image: &str) -> String {
  if current.starts_with("data:") || provider_image.is_empty() {
    current.to_owned()
  } else {
    provider_image.to_owned()
  }
}

// ─── Profile patch ───────────────────────────────────────────────────────────

/// A partial profile update. Present fields replace; absent fields keep.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
  pub handle:      Option<String>,
  pub bio:         Option<String>,
  pub theme:       Option<String>,
  pub theme_json:  Option<String>,
  pub banner_url:  Option<String>,
  pub image:       Option<String>,
  pub is_public:   Option<bool>,
  /// `Some("")` clears the tag.
  pub profile_tag: Option<String>,
}

/// A validated [`ProfilePatch`], ready to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
  pub handle:      Option<Handle>,
  pub bio:         Option<String>,
  pub theme:       Option<String>,
  pub theme_json:  Option<String>,
  pub banner_url:  Option<String>,
  pub image:       Option<String>,
  pub is_public:   Option<bool>,
  pub profile_tag: Option<Option<String>>,
}

impl ProfileChanges {
  /// Merge onto `user` in place.
  pub fn apply(self, user: &mut User) {
    if let Some(h) = self.handle {
      user.handle = h.display;
      user.handle_lower = h.lower;
    }
    if let Some(v) = self.bio {
      user.bio = v;
    }
    if let Some(v) = self.theme {
      user.theme = v;
    }
    if let Some(v) = self.theme_json {
      user.theme_json = v;
    }
    if let Some(v) = self.banner_url {
      user.banner_url = v;
    }
    if let Some(v) = self.image {
      user.image = v;
    }
    if let Some(v) = self.is_public {
      user.is_public = v;
    }
    if let Some(v) = self.profile_tag {
      user.profile_tag = v;
    }
  }
}

fn check_asset(field: &str, value: &Option<String>) -> Result<()> {
  match value {
    Some(v) if v.len() > MAX_ASSET_LEN => {
      Err(Error::InvalidInput(format!("{field} is too large")))
    }
    _ => Ok(()),
  }
}

impl ProfilePatch {
  /// Validate and normalize. Handle uniqueness is checked by the store.
  pub fn validate(self) -> Result<ProfileChanges> {
    let handle = self.handle.as_deref().map(handle::normalize).transpose()?;

    if let Some(t) = &self.theme
      && (t.is_empty() || t.chars().count() > theme::MAX_THEME_ID_LEN)
    {
      return Err(Error::InvalidInput("theme id is invalid".to_owned()));
    }
    check_asset("themeJson", &self.theme_json)?;
    check_asset("bannerUrl", &self.banner_url)?;
    check_asset("image", &self.image)?;

    let profile_tag = match self.profile_tag {
      None => None,
      Some(t) if t.is_empty() => Some(None),
      Some(t) => match theme::profile_tag(&t) {
        Some(tag) => Some(Some(tag.id.to_owned())),
        None => {
          return Err(Error::InvalidInput(format!("unknown profile tag {t:?}")));
        }
      },
    };

    Ok(ProfileChanges {
      handle,
      bio: self.bio.map(|b| b.chars().take(MAX_BIO_LEN).collect()),
      theme: self.theme,
      theme_json: self.theme_json,
      banner_url: self.banner_url,
      image: self.image,
      is_public: self.is_public,
      profile_tag,
    })
  }
}
