//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use fluffy_core::DomainError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Domain(#[from] fluffy_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Lift a backend error, keeping its domain meaning when it has one.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    match err.domain() {
      Some(domain) => ApiError::Domain(domain.clone()),
      None => ApiError::Store(Box::new(err)),
    }
  }

  fn status(&self) -> StatusCode {
    use fluffy_core::Error as E;
    match self {
      ApiError::Domain(e) => match e {
        E::Unauthorized => StatusCode::UNAUTHORIZED,
        E::Forbidden => StatusCode::FORBIDDEN,
        E::NotFound => StatusCode::NOT_FOUND,
        E::InvalidInput(_) | E::InvalidHandle | E::MissingInput(_) => {
          StatusCode::BAD_REQUEST
        }
        E::HandleTaken(_) | E::Conflict(_) => StatusCode::CONFLICT,
      },
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      ApiError::Domain(e) => e.kind(),
      ApiError::Store(_) => "internal",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = json!({ "error": self.to_string(), "kind": self.kind() });
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn domain_errors_map_to_statuses() {
    let cases = [
      (fluffy_core::Error::Unauthorized, StatusCode::UNAUTHORIZED),
      (fluffy_core::Error::Forbidden, StatusCode::FORBIDDEN),
      (fluffy_core::Error::NotFound, StatusCode::NOT_FOUND),
      (fluffy_core::Error::InvalidHandle, StatusCode::BAD_REQUEST),
      (fluffy_core::Error::MissingInput("title".into()), StatusCode::BAD_REQUEST),
      (fluffy_core::Error::HandleTaken("fox".into()), StatusCode::CONFLICT),
      (fluffy_core::Error::Conflict("dup".into()), StatusCode::CONFLICT),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[test]
  fn opaque_store_errors_are_500() {
    let err = ApiError::Store(Box::new(std::io::Error::other("disk gone")));
    assert_eq!(
      err.into_response().status(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }
}
