//! Bearer-token extractor and password hashing.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use gatepass_core::{
  identity::Caller, render::QrRenderer, store::GatePassStore,
};
use rand_core::OsRng;

use crate::{AppState, error::ApiError, token::TokenSigner};

/// Present in a handler's arguments means the request carried a valid bearer
/// token. Role checks happen in the core against the wrapped [`Caller`].
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Caller);

/// Resolve the caller from an `Authorization: Bearer` header.
pub fn verify_bearer(headers: &HeaderMap, tokens: &TokenSigner) -> Result<Caller, ApiError> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

  Ok(tokens.verify(token)?.caller())
}

impl<S, R> FromRequestParts<AppState<S, R>> for Authenticated
where
  S: GatePassStore + 'static,
  R: QrRenderer + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, R>,
  ) -> Result<Self, Self::Rejection> {
    verify_bearer(&parts.headers, &state.tokens).map(Authenticated)
  }
}

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}").into()))
}

/// Check `password` against a stored PHC string. Any failure, including an
/// unparseable hash, is reported as invalid credentials.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;
  use chrono::{Duration, Utc};
  use gatepass_core::identity::{Identity, Role};
  use uuid::Uuid;

  use super::*;

  fn signer() -> TokenSigner { TokenSigner::new("test-secret", Duration::hours(1)) }

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  fn student() -> Identity {
    let now = Utc::now();
    Identity {
      id: Uuid::new_v4(),
      email: "s@example.edu".into(),
      password_hash: String::new(),
      full_name: "Student".into(),
      student_id: None,
      phone: None,
      department: None,
      role: Role::Student,
      is_active: true,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn bearer_token_resolves_caller() {
    let tokens = signer();
    let who = student();
    let token = tokens.issue(&who).unwrap();

    let caller = verify_bearer(&headers(&format!("Bearer {token}")), &tokens).unwrap();
    assert_eq!(caller, Caller::new(who.id, Role::Student));
  }

  #[test]
  fn missing_header() {
    assert!(matches!(
      verify_bearer(&HeaderMap::new(), &signer()),
      Err(ApiError::Unauthorized(_))
    ));
  }

  #[test]
  fn wrong_scheme() {
    assert!(matches!(
      verify_bearer(&headers("Basic dXNlcjpwYXNz"), &signer()),
      Err(ApiError::Unauthorized(_))
    ));
  }

  #[test]
  fn password_round_trip() {
    let phc = hash_password("correct horse").unwrap();
    assert!(phc.starts_with("$argon2"));
    assert!(verify_password("correct horse", &phc));
    assert!(!verify_password("wrong horse", &phc));
    assert!(!verify_password("correct horse", "not-a-phc-string"));
  }
}
