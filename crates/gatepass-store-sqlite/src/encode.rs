//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings. Enums are stored as
//! their lowercase names. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use gatepass_core::{
  identity::{Identity, Role},
  log::{EntryType, LogEntry, LogRecord, PersonRef},
  pass::{GatePass, PassStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "student" => Ok(Role::Student),
    "admin" => Ok(Role::Admin),
    other => Err(Error::UnknownVariant { column: "role", value: other.to_owned() }),
  }
}

pub fn decode_status(s: &str) -> Result<PassStatus> {
  match s {
    "active" => Ok(PassStatus::Active),
    "expired" => Ok(PassStatus::Expired),
    "revoked" => Ok(PassStatus::Revoked),
    other => Err(Error::UnknownVariant { column: "status", value: other.to_owned() }),
  }
}

pub fn decode_entry_type(s: &str) -> Result<EntryType> {
  match s {
    "inward" => Ok(EntryType::Inward),
    "outward" => Ok(EntryType::Outward),
    other => Err(Error::UnknownVariant { column: "entry_type", value: other.to_owned() }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const IDENTITY_COLUMNS: &str = "identity_id, email, password_hash, full_name, student_id, \
   phone, department, role, is_active, created_at, updated_at";

/// Raw values read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id:   String,
  pub email:         String,
  pub password_hash: String,
  pub full_name:     String,
  pub student_id:    Option<String>,
  pub phone:         Option<String>,
  pub department:    Option<String>,
  pub role:          String,
  pub is_active:     bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawIdentity {
  /// Map a row selected with [`IDENTITY_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_id:   row.get(0)?,
      email:         row.get(1)?,
      password_hash: row.get(2)?,
      full_name:     row.get(3)?,
      student_id:    row.get(4)?,
      phone:         row.get(5)?,
      department:    row.get(6)?,
      role:          row.get(7)?,
      is_active:     row.get(8)?,
      created_at:    row.get(9)?,
      updated_at:    row.get(10)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      id:            decode_uuid(&self.identity_id)?,
      email:         self.email,
      password_hash: self.password_hash,
      full_name:     self.full_name,
      student_id:    self.student_id,
      phone:         self.phone,
      department:    self.department,
      role:          decode_role(&self.role)?,
      is_active:     self.is_active,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub const PASS_COLUMNS: &str = "pass_id, identity_id, credential, status, valid_from, \
   valid_until, created_at, revoked_at, qr_code_path";

/// Raw values read directly from a `gate_passes` row.
pub struct RawPass {
  pub pass_id:      String,
  pub identity_id:  String,
  pub credential:   String,
  pub status:       String,
  pub valid_from:   String,
  pub valid_until:  String,
  pub created_at:   String,
  pub revoked_at:   Option<String>,
  pub qr_code_path: Option<String>,
}

impl RawPass {
  /// Map a row selected with [`PASS_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      pass_id:      row.get(0)?,
      identity_id:  row.get(1)?,
      credential:   row.get(2)?,
      status:       row.get(3)?,
      valid_from:   row.get(4)?,
      valid_until:  row.get(5)?,
      created_at:   row.get(6)?,
      revoked_at:   row.get(7)?,
      qr_code_path: row.get(8)?,
    })
  }

  pub fn into_pass(self) -> Result<GatePass> {
    Ok(GatePass {
      id:           decode_uuid(&self.pass_id)?,
      identity_id:  decode_uuid(&self.identity_id)?,
      credential:   self.credential,
      status:       decode_status(&self.status)?,
      valid_from:   decode_dt(&self.valid_from)?,
      valid_until:  decode_dt(&self.valid_until)?,
      created_at:   decode_dt(&self.created_at)?,
      revoked_at:   self.revoked_at.as_deref().map(decode_dt).transpose()?,
      qr_code_path: self.qr_code_path,
    })
  }
}

/// Raw values from a `gate_pass_logs` row left-joined with the subject and
/// verifier identities.
pub struct RawLogRecord {
  // gate_pass_logs columns
  pub log_id:              String,
  pub pass_id:             String,
  pub subject_id:          String,
  pub verifier_id:         String,
  pub entry_type:          String,
  pub scanned_at:          String,
  pub location:            Option<String>,
  pub notes:               Option<String>,
  // subject join
  pub subject_name:        Option<String>,
  pub subject_student_id:  Option<String>,
  pub subject_department:  Option<String>,
  // verifier join
  pub verifier_name:       Option<String>,
  pub verifier_student_id: Option<String>,
  pub verifier_department: Option<String>,
}

impl RawLogRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:              row.get(0)?,
      pass_id:             row.get(1)?,
      subject_id:          row.get(2)?,
      verifier_id:         row.get(3)?,
      entry_type:          row.get(4)?,
      scanned_at:          row.get(5)?,
      location:            row.get(6)?,
      notes:               row.get(7)?,
      subject_name:        row.get(8)?,
      subject_student_id:  row.get(9)?,
      subject_department:  row.get(10)?,
      verifier_name:       row.get(11)?,
      verifier_student_id: row.get(12)?,
      verifier_department: row.get(13)?,
    })
  }

  pub fn into_record(self) -> Result<LogRecord> {
    let entry = LogEntry {
      id:          decode_uuid(&self.log_id)?,
      pass_id:     decode_uuid(&self.pass_id)?,
      subject_id:  decode_uuid(&self.subject_id)?,
      verifier_id: decode_uuid(&self.verifier_id)?,
      entry_type:  decode_entry_type(&self.entry_type)?,
      scanned_at:  decode_dt(&self.scanned_at)?,
      location:    self.location,
      notes:       self.notes,
    };

    let subject = self.subject_name.map(|full_name| PersonRef {
      id: entry.subject_id,
      full_name,
      student_id: self.subject_student_id,
      department: self.subject_department,
    });
    let scanned_by = self.verifier_name.map(|full_name| PersonRef {
      id: entry.verifier_id,
      full_name,
      student_id: self.verifier_student_id,
      department: self.verifier_department,
    });

    Ok(LogRecord { entry, subject, scanned_by })
  }
}
