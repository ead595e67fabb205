//! Gate passes and their lifecycle states.
//!
//! A pass is `active` from issuance until it is expired (lazily, on read,
//! once `valid_until` has passed; or eagerly, by a refresh) or revoked.
//! `expired` and `revoked` are terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
  Active,
  Expired,
  Revoked,
}

impl PassStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Expired => "expired",
      Self::Revoked => "revoked",
    }
  }

  pub fn is_active(self) -> bool { matches!(self, Self::Active) }

  pub fn is_terminal(self) -> bool { !self.is_active() }
}

impl fmt::Display for PassStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── GatePass ────────────────────────────────────────────────────────────────

/// A time-bounded credential bound to one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePass {
  pub id:           Uuid,
  /// The identity that holds this pass.
  pub identity_id:  Uuid,
  /// Encoded [`CredentialPayload`](crate::credential::CredentialPayload);
  /// the exact text embedded in the QR code.
  pub credential:   String,
  pub status:       PassStatus,
  pub valid_from:   DateTime<Utc>,
  pub valid_until:  DateTime<Utc>,
  pub created_at:   DateTime<Utc>,
  pub revoked_at:   Option<DateTime<Utc>>,
  /// Where the rendered QR image was persisted, once it has been.
  pub qr_code_path: Option<String>,
}

impl GatePass {
  /// A pass has run out once `now` reaches `valid_until`.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now >= self.valid_until
  }
}

/// A pass together with a displayable rendering of its QR code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedPass {
  #[serde(flatten)]
  pub pass:          GatePass,
  /// `data:` URL of the rendered QR image.
  pub qr_code_image: String,
}

/// The part of a pass a verifier is shown after a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
  pub id:          Uuid,
  pub valid_until: DateTime<Utc>,
}

impl From<&GatePass> for PassSummary {
  fn from(p: &GatePass) -> Self {
    Self { id: p.id, valid_until: p.valid_until }
  }
}

// ─── Issuance ────────────────────────────────────────────────────────────────

/// How [`GatePassStore::issue_pass`](crate::store::GatePassStore::issue_pass)
/// treats passes that are already active for the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueMode {
  /// Refuse if an active pass is still within its validity window. Active
  /// rows whose window has lapsed are expired as part of the same write.
  Exclusive,
  /// Expire every active pass for the identity, then insert.
  Rotate,
}

/// Result of a transactional issuance attempt.
#[derive(Debug, Clone)]
pub enum Issue {
  /// The new pass was committed; `expired` older rows were retired with it.
  Created { pass: GatePass, expired: usize },
  /// Nothing was written; this pass is still active and within its window.
  Conflict(GatePass),
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn pass_until(valid_until: DateTime<Utc>) -> GatePass {
    let start = Utc.timestamp_opt(0, 0).unwrap();
    GatePass {
      id: Uuid::new_v4(),
      identity_id: Uuid::new_v4(),
      credential: String::new(),
      status: PassStatus::Active,
      valid_from: start,
      valid_until,
      created_at: start,
      revoked_at: None,
      qr_code_path: None,
    }
  }

  #[test]
  fn expiry_boundary_is_inclusive() {
    let until = Utc.timestamp_opt(1_000, 0).unwrap();
    let pass = pass_until(until);
    assert!(!pass.is_expired_at(until - Duration::microseconds(1)));
    assert!(pass.is_expired_at(until));
    assert!(pass.is_expired_at(until + Duration::days(1)));
  }

  #[test]
  fn status_display_matches_wire_form() {
    for status in [PassStatus::Active, PassStatus::Expired, PassStatus::Revoked] {
      let wire = serde_json::to_string(&status).unwrap();
      assert_eq!(wire, format!("\"{status}\""));
    }
    assert!(PassStatus::Revoked.is_terminal());
    assert!(!PassStatus::Active.is_terminal());
  }
}
