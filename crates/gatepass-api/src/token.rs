//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying [`Claims`]. Expiry is checked against the
//! signer's [`Clock`] rather than the library's wall clock, so tests can age a
//! token without sleeping.

use std::sync::Arc;

use chrono::Duration;
use gatepass_core::{
  clock::{Clock, SystemClock},
  identity::{Caller, Identity, Role},
};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default token lifetime.
pub const DEFAULT_TTL_HOURS: i64 = 7 * 24;

#[derive(Debug, Error)]
pub enum TokenError {
  #[error("malformed token")]
  Malformed,

  #[error("bad token signature")]
  BadSignature,

  #[error("token expired")]
  Expired,

  #[error("failed to sign token: {0}")]
  Sign(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
  fn from(e: jsonwebtoken::errors::Error) -> Self {
    match e.kind() {
      ErrorKind::InvalidSignature => Self::BadSignature,
      ErrorKind::ExpiredSignature => Self::Expired,
      _ => Self::Malformed,
    }
  }
}

/// What a token asserts about its bearer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub:   Uuid,
  pub email: String,
  pub role:  Role,
  /// Expiry, Unix seconds.
  pub exp:   i64,
}

impl Claims {
  pub fn caller(&self) -> Caller { Caller::new(self.sub, self.role) }
}

/// Issues and verifies bearer tokens with a shared secret.
pub struct TokenSigner {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Duration,
  clock:      Arc<dyn Clock>,
}

impl TokenSigner {
  pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
    let secret = secret.as_ref();
    let mut validation = Validation::new(Algorithm::HS256);
    // `exp` must be present; its value is compared against `clock` below.
    validation.validate_exp = false;
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl,
      clock: Arc::new(SystemClock),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Sign a token for `identity`, valid for the configured lifetime.
  pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
    let claims = Claims {
      sub:   identity.id,
      email: identity.email.clone(),
      role:  identity.role,
      exp:   (self.clock.now() + self.ttl).timestamp(),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(TokenError::Sign)
  }

  /// Check the signature and expiry of `token` and return its claims.
  pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
    let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
    if self.clock.now().timestamp() >= claims.exp {
      return Err(TokenError::Expired);
    }
    Ok(claims)
  }
}
