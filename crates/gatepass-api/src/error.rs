//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gatepass_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

use crate::token::TokenError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Unauthorized(String),

  #[error("Insufficient permissions")]
  Forbidden,

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a core error raised while verifying a scan. Every verification
  /// verdict is reported as a bad request.
  pub fn scan(e: CoreError) -> Self {
    if e.is_scan_rejection() {
      Self::BadRequest(e.to_string())
    } else {
      Self::from(e)
    }
  }
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::Conflict(m) => Self::Conflict(m),
      CoreError::NotFound(m) => Self::NotFound(m),
      CoreError::Status(_) => Self::Conflict(e.to_string()),
      CoreError::Expired(_)
      | CoreError::Mismatch { .. }
      | CoreError::MalformedPayload(_)
      | CoreError::Inactive(_) => Self::BadRequest(e.to_string()),
      CoreError::InvalidCredentials => Self::Unauthorized("Invalid credentials".into()),
      CoreError::Forbidden(_) => Self::Forbidden,
      CoreError::Serialization(_) | CoreError::Store(_) | CoreError::Render(_) => {
        Self::Internal(Box::new(e))
      }
    }
  }
}

impl From<TokenError> for ApiError {
  fn from(e: TokenError) -> Self {
    match e {
      TokenError::Sign(_) => Self::Internal(Box::new(e)),
      _ => Self::Unauthorized("Invalid or expired token".into()),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { Self::BadRequest(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { Self::BadRequest(r.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use gatepass_core::{identity::Role, pass::PassStatus};
  use uuid::Uuid;

  use super::*;

  fn status_of(e: ApiError) -> StatusCode { e.into_response().status() }

  #[test]
  fn scan_verdicts_are_bad_requests() {
    let not_found = CoreError::NotFound("Gate pass not found".into());
    assert_eq!(status_of(ApiError::scan(not_found)), StatusCode::BAD_REQUEST);

    let revoked = CoreError::Status(PassStatus::Revoked);
    assert_eq!(status_of(ApiError::scan(revoked)), StatusCode::BAD_REQUEST);

    let forbidden = CoreError::Forbidden(Role::Admin);
    assert_eq!(status_of(ApiError::scan(forbidden)), StatusCode::FORBIDDEN);
  }

  #[test]
  fn core_errors_map_outside_scan() {
    assert_eq!(
      status_of(CoreError::NotFound("x".into()).into()),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      status_of(CoreError::Conflict("x".into()).into()),
      StatusCode::CONFLICT
    );
    assert_eq!(
      status_of(CoreError::Status(PassStatus::Expired).into()),
      StatusCode::CONFLICT
    );
    assert_eq!(
      status_of(CoreError::InvalidCredentials.into()),
      StatusCode::UNAUTHORIZED
    );
    assert_eq!(
      status_of(CoreError::Expired(Uuid::new_v4()).into()),
      StatusCode::BAD_REQUEST
    );
  }
}
