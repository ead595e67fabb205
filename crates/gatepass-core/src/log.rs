//! Scan log entries: the append-only record of gate crossings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a gate crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
  Inward,
  Outward,
}

impl EntryType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Inward => "inward",
      Self::Outward => "outward",
    }
  }
}

impl fmt::Display for EntryType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One successful scan. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
  pub id:          Uuid,
  pub pass_id:     Uuid,
  /// The pass holder.
  pub subject_id:  Uuid,
  /// The identity that performed the scan.
  pub verifier_id: Uuid,
  pub entry_type:  EntryType,
  pub scanned_at:  DateTime<Utc>,
  pub location:    Option<String>,
  pub notes:       Option<String>,
}

/// Display details of an identity referenced by a log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
  pub id:         Uuid,
  pub full_name:  String,
  pub student_id: Option<String>,
  pub department: Option<String>,
}

/// A log entry joined with the people it references.
///
/// Either side is `None` only if the referenced identity row is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
  #[serde(flatten)]
  pub entry:      LogEntry,
  pub subject:    Option<PersonRef>,
  pub scanned_by: Option<PersonRef>,
}

/// Listing bounds applied by the service before reaching the store.
pub const DEFAULT_OWN_LOG_LIMIT: usize = 50;
pub const DEFAULT_ALL_LOG_LIMIT: usize = 100;
pub const MAX_LOG_LIMIT: usize = 500;

/// Clamp a caller-supplied limit into `1..=MAX_LOG_LIMIT`.
pub fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
  limit.unwrap_or(default).clamp(1, MAX_LOG_LIMIT)
}
