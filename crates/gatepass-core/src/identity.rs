//! Identities: the accounts that hold and verify gate passes.
//!
//! The core creates and looks up identities but never mutates them after
//! registration. Password hashing stays with the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// What an identity is allowed to do with gate passes.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  /// Holds passes: may issue, refresh and view their own.
  #[default]
  Student,
  /// Verifies passes at the gate and reads the facility-wide log.
  Admin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Student => "student",
      Self::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A stored account. Not `Serialize`: it carries the password
/// hash. Use [`Profile`] or [`SubjectSummary`] for anything leaving the
/// process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  pub id:            Uuid,
  pub email:         String,
  /// PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub full_name:     String,
  pub student_id:    Option<String>,
  pub phone:         Option<String>,
  pub department:    Option<String>,
  pub role:          Role,
  pub is_active:     bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::service::GatePassService::register`].
/// `id` is assigned by the store; both timestamps come from the service clock.
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub email:         String,
  pub password_hash: String,
  pub full_name:     String,
  pub student_id:    Option<String>,
  pub phone:         Option<String>,
  pub department:    Option<String>,
  pub role:          Role,
}

/// The public view of an identity: everything except the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub id:         Uuid,
  pub email:      String,
  pub full_name:  String,
  pub student_id: Option<String>,
  pub phone:      Option<String>,
  pub department: Option<String>,
  pub role:       Role,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<&Identity> for Profile {
  fn from(i: &Identity) -> Self {
    Self {
      id:         i.id,
      email:      i.email.clone(),
      full_name:  i.full_name.clone(),
      student_id: i.student_id.clone(),
      phone:      i.phone.clone(),
      department: i.department.clone(),
      role:       i.role,
      is_active:  i.is_active,
      created_at: i.created_at,
      updated_at: i.updated_at,
    }
  }
}

/// What a verifier sees about the holder after a successful scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSummary {
  pub id:         Uuid,
  pub full_name:  String,
  pub student_id: Option<String>,
  pub department: Option<String>,
  pub email:      String,
}

impl From<&Identity> for SubjectSummary {
  fn from(i: &Identity) -> Self {
    Self {
      id:         i.id,
      full_name:  i.full_name.clone(),
      student_id: i.student_id.clone(),
      department: i.department.clone(),
      email:      i.email.clone(),
    }
  }
}

/// The authenticated identity on whose behalf a core operation runs.
///
/// Produced by the auth collaborator; the core trusts it as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
  pub id:   Uuid,
  pub role: Role,
}

impl Caller {
  pub fn new(id: Uuid, role: Role) -> Self { Self { id, role } }

  /// Fail with [`Error::Forbidden`] unless the caller has `role`.
  pub fn require(&self, role: Role) -> Result<()> {
    if self.role == role {
      Ok(())
    } else {
      Err(Error::Forbidden(role))
    }
  }
}
