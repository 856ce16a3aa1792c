//! Error types for `fluffy-core`.

use thiserror::Error;

/// The domain error taxonomy shared by every layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden")]
  Forbidden,

  /// Target absent or not owned by the caller; the two are never told apart.
  #[error("not found")]
  NotFound,

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("handle is empty after normalization")]
  InvalidHandle,

  #[error("missing input: {0}")]
  MissingInput(String),

  #[error("handle already taken: {0}")]
  HandleTaken(String),

  #[error("conflict: {0}")]
  Conflict(String),
}

impl Error {
  /// Stable machine-readable name, echoed to API clients.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Unauthorized => "unauthorized",
      Self::Forbidden => "forbidden",
      Self::NotFound => "not_found",
      Self::InvalidInput(_) => "invalid_input",
      Self::InvalidHandle => "invalid_handle",
      Self::MissingInput(_) => "missing_input",
      Self::HandleTaken(_) => "handle_taken",
      Self::Conflict(_) => "conflict",
    }
  }
}

/// Implemented by backend error types so callers can recover the domain
/// failure (if any) without knowing the backend.
pub trait DomainError {
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
