//! The credential payload embedded in a pass's QR code.
//!
//! The payload is compact JSON with a fixed, versioned schema:
//!
//! ```json
//! {"v":1,"subject_id":"…","pass_id":"…","issued_at":1700000000000,"nonce":"…"}
//! ```
//!
//! `nonce` is 16 random bytes, hex-encoded. It makes payloads unguessable;
//! it is never compared against stored state. Decoding is strict: anything
//! that does not match the schema exactly is rejected.

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const PAYLOAD_VERSION: u8 = 1;

/// Random bytes in the anti-tamper nonce.
pub const NONCE_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialPayload {
  /// Schema version; always [`PAYLOAD_VERSION`] when produced by this crate.
  pub v:          u8,
  pub subject_id: Uuid,
  pub pass_id:    Uuid,
  /// Unix milliseconds.
  pub issued_at:  i64,
  pub nonce:      String,
}

impl CredentialPayload {
  /// Bind `subject_id` to `pass_id` with a fresh random nonce.
  pub fn new(subject_id: Uuid, pass_id: Uuid, issued_at: DateTime<Utc>) -> Self {
    let mut bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut bytes);
    Self {
      v: PAYLOAD_VERSION,
      subject_id,
      pass_id,
      issued_at: issued_at.timestamp_millis(),
      nonce: hex::encode(bytes),
    }
  }

  /// Serialise to the text embedded in the QR code.
  pub fn encode(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  /// Parse a scanned payload, failing with [`Error::MalformedPayload`] on
  /// anything but an exact schema match.
  pub fn decode(raw: &str) -> Result<Self> {
    let payload: Self = serde_json::from_str(raw.trim())
      .map_err(|e| Error::MalformedPayload(e.to_string()))?;

    if payload.v != PAYLOAD_VERSION {
      return Err(Error::MalformedPayload(format!(
        "unsupported payload version {}",
        payload.v
      )));
    }

    let nonce_ok = payload.nonce.len() == NONCE_LEN * 2
      && payload
        .nonce
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !nonce_ok {
      return Err(Error::MalformedPayload("nonce is not 32 hex characters".into()));
    }

    Ok(payload)
  }
}
