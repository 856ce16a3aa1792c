//! JSON HTTP API for Fluffy.
//!
//! Exposes an axum [`Router`] backed by any [`fluffy_core::store::ProfileStore`].
//! OAuth and TLS are the caller's responsibility; identities arrive through a
//! trusted bridge on `POST /auth/login`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = fluffy_api::router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod admin;
pub mod audit;
pub mod auth;
pub mod cookie;
pub mod error;
pub mod links;
pub mod profile;
pub mod public;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use fluffy_core::{admin::AdminAllowlist, store::ProfileStore};
use tower_http::trace::TraceLayer;

pub use audit::{Notification, Notifier, NoopNotifier};
pub use auth::BridgeAuth;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:          Arc<S>,
  pub admins:         Arc<AdminAllowlist>,
  pub bridge:         Arc<BridgeAuth>,
  pub notifier:       Arc<dyn Notifier>,
  /// Adds the `Secure` attribute to every cookie we set.
  pub secure_cookies: bool,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:          Arc::clone(&self.store),
      admins:         Arc::clone(&self.admins),
      bridge:         Arc::clone(&self.bridge),
      notifier:       Arc::clone(&self.notifier),
      secure_cookies: self.secure_cookies,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ProfileStore + 'static,
{
  Router::new()
    // Auth
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/logout", post(auth::logout::<S>))
    // Owner
    .route("/me", get(profile::me::<S>))
    .route("/profile", put(profile::update::<S>))
    .route(
      "/links",
      post(links::create::<S>)
        .put(links::update::<S>)
        .delete(links::delete::<S>),
    )
    .route("/links/bulk", put(links::bulk::<S>))
    .route("/links/reorder", post(links::reorder::<S>))
    .route("/stats", get(stats::handler::<S>))
    // Public
    .route("/p/{handle}", get(public::profile::<S>))
    .route("/go/{id}", get(public::go::<S>))
    .route("/users/{id}", get(public::user::<S>))
    // Admin
    .route("/admin/users", get(admin::list_users::<S>))
    .route(
      "/admin/users/{id}",
      put(admin::update_user::<S>).delete(admin::delete_user::<S>),
    )
    .route(
      "/admin/links/{id}",
      put(admin::update_link::<S>).delete(admin::delete_link::<S>),
    )
    .route("/admin/logs", get(admin::list_logs::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
