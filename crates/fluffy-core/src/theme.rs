//! Theme presets, custom-theme settings and profile tags.

use serde::{Deserialize, Serialize};

/// Theme id that selects [`CustomTheme`] settings instead of a preset.
pub const CUSTOM_THEME_ID: &str = "custom";

pub const DEFAULT_THEME_ID: &str = "pastel";

pub const MAX_THEME_ID_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemePreset {
  pub id:      &'static str,
  pub name:    &'static str,
  pub is_dark: bool,
}

pub const PRESETS: &[ThemePreset] = &[
  ThemePreset { id: "pastel", name: "Pastel Paw", is_dark: false },
  ThemePreset { id: "darkneon", name: "Dark Neon", is_dark: true },
  ThemePreset { id: "sky", name: "Sky Blue", is_dark: false },
  ThemePreset { id: "candy", name: "Candy Pop", is_dark: false },
  ThemePreset { id: "midnight", name: "Midnight Blue", is_dark: true },
  ThemePreset { id: "sunset", name: "Soft Sunset", is_dark: false },
];

/// Resolve a stored theme id; unknown ids fall back to the default preset.
pub fn preset(id: &str) -> &'static ThemePreset {
  PRESETS
    .iter()
    .find(|p| p.id == id)
    .unwrap_or(&PRESETS[0])
}

pub fn is_dark(id: &str) -> bool {
  id != CUSTOM_THEME_ID && preset(id).is_dark
}

/// Settings stored in `themeJson` for the custom theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTheme {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bg_image: Option<String>,
}

impl CustomTheme {
  /// Parse stored settings. Blank or malformed JSON yields the empty default;
  /// this never fails.
  pub fn parse(raw: &str) -> Self {
    if raw.trim().is_empty() {
      return Self::default();
    }
    serde_json::from_str(raw).unwrap_or_default()
  }
}

// ─── Profile tags ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileTag {
  pub id:    &'static str,
  pub label: &'static str,
  pub image: &'static str,
}

pub const PROFILE_TAGS: &[ProfileTag] = &[
  ProfileTag { id: "furry", label: "Fursuiter", image: "/tags/FURSUITER.png" },
  ProfileTag { id: "artist", label: "Artist", image: "/tags/ARTIST.png" },
  ProfileTag { id: "developer", label: "Developer", image: "/tags/GITHUB.png" },
];

pub fn profile_tag(id: &str) -> Option<&'static ProfileTag> {
  PROFILE_TAGS.iter().find(|t| t.id == id)
}
