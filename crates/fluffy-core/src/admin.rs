//! The admin allowlist, built once from configuration.

use std::collections::BTreeSet;

/// Identities allowed to use the admin surface.
///
/// The owner is always an admin and can never be deleted.
#[derive(Debug, Clone)]
pub struct AdminAllowlist {
  owner_id: String,
  ids:      BTreeSet<String>,
}

impl AdminAllowlist {
  pub fn new(
    owner_id: impl Into<String>,
    extra: impl IntoIterator<Item = String>,
  ) -> Self {
    let owner_id = owner_id.into();
    let mut ids: BTreeSet<String> = extra
      .into_iter()
      .map(|s| s.trim().to_owned())
      .filter(|s| !s.is_empty())
      .collect();
    if !owner_id.is_empty() {
      ids.insert(owner_id.clone());
    }
    Self { owner_id, ids }
  }

  pub fn is_admin(&self, user_id: &str) -> bool { self.ids.contains(user_id) }

  pub fn is_owner(&self, user_id: &str) -> bool {
    !self.owner_id.is_empty() && self.owner_id == user_id
  }

  pub fn ids(&self) -> impl Iterator<Item = &str> { self.ids.iter().map(String::as_str) }
}
