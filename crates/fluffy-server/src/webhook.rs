//! Webhook [`Notifier`]: posts `{"content": ..}` to a chat-style endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use fluffy_api::{Notification, Notifier};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

/// Delivers each notification on its own background task.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct WebhookNotifier {
  client: Client,
  url:    String,
}

impl WebhookNotifier {
  pub fn new(url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, url: url.into() })
  }
}

impl Notifier for WebhookNotifier {
  fn notify(&self, notification: Notification) {
    let client = self.client.clone();
    let url = self.url.clone();
    tokio::spawn(async move {
      let kind = notification.kind;
      let body = json!({ "content": notification.text });
      match client.post(&url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => {
          debug!(%kind, "notification delivered");
        }
        Ok(resp) => warn!(%kind, status = %resp.status(), "webhook rejected notification"),
        Err(e) => warn!(%kind, error = %e, "webhook delivery failed"),
      }
    });
  }
}
