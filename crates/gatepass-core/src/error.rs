//! Error types for `gatepass-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{identity::Role, pass::PassStatus};

#[derive(Debug, Error)]
pub enum Error {
  /// A uniqueness rule would be violated (duplicate active pass, duplicate
  /// account).
  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  NotFound(String),

  /// The pass exists but is not `active`.
  #[error("gate pass is {0}")]
  Status(PassStatus),

  #[error("gate pass has expired")]
  Expired(Uuid),

  /// The payload names a subject other than the pass owner.
  #[error("gate pass mismatch")]
  Mismatch { pass_id: Uuid, claimed_subject: Uuid },

  #[error("invalid QR code format: {0}")]
  MalformedPayload(String),

  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("user {0} is inactive")]
  Inactive(Uuid),

  #[error("insufficient permissions: requires {0} role")]
  Forbidden(Role),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("render error: {0}")]
  Render(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub(crate) fn render<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Render(Box::new(e))
  }

  /// Whether this error is a verdict of the scan protocol, as opposed to an
  /// infrastructure failure.
  pub fn is_scan_rejection(&self) -> bool {
    matches!(
      self,
      Self::NotFound(_)
        | Self::Status(_)
        | Self::Expired(_)
        | Self::Mismatch { .. }
        | Self::MalformedPayload(_)
        | Self::Inactive(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
