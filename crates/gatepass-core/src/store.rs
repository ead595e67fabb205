//! The `GatePassStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `gatepass-store-sqlite`).
//! [`crate::service::GatePassService`] and the HTTP layer depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  identity::{Identity, NewIdentity},
  log::{LogEntry, LogRecord},
  pass::{GatePass, Issue, IssueMode},
};

/// Abstraction over a gate pass store backend.
///
/// Log entries are append-only. Pass rows change only through the narrow
/// status and image-path updates below.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait GatePassStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  /// Persist a new identity created at `at`. Returns `None`, writing
  /// nothing, if the email or student id is already taken.
  fn add_identity(
    &self,
    input: NewIdentity,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn get_identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn find_identity_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  // ── Passes ────────────────────────────────────────────────────────────

  /// Insert `pass` atomically with the active-pass check dictated by `mode`.
  ///
  /// The check, any expiry of older rows, and the insert happen in a single
  /// transaction. "Still valid" means `valid_until > pass.valid_from`.
  ///
  /// The committed `created_at` is strictly later than that of every earlier
  /// pass for the identity; the returned pass carries the stored value.
  fn issue_pass(
    &self,
    pass: GatePass,
    mode: IssueMode,
  ) -> impl Future<Output = Result<Issue, Self::Error>> + Send + '_;

  fn get_pass(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<GatePass>, Self::Error>> + Send + '_;

  /// The most recently created `active` pass for `identity_id`, regardless
  /// of whether its window has lapsed.
  fn latest_active_pass(
    &self,
    identity_id: Uuid,
  ) -> impl Future<Output = Result<Option<GatePass>, Self::Error>> + Send + '_;

  /// Move a pass from `active` to `expired`.
  ///
  /// Idempotent: returns `false` and changes nothing if the pass is missing
  /// or already in a terminal state.
  fn expire_pass(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Move a pass from `active` to `revoked` at `at`. Same idempotency as
  /// [`expire_pass`](Self::expire_pass).
  fn revoke_pass(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record where the pass's QR image was persisted.
  fn set_qr_code_path(
    &self,
    id: Uuid,
    path: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Logs ──────────────────────────────────────────────────────────────

  fn append_log(
    &self,
    entry: LogEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Entries whose subject is `identity_id`, newest `scanned_at` first,
  /// ties broken by later insertion first.
  fn logs_for_identity(
    &self,
    identity_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LogRecord>, Self::Error>> + Send + '_;

  /// All entries, ordered as [`logs_for_identity`](Self::logs_for_identity).
  fn all_logs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LogRecord>, Self::Error>> + Send + '_;
}
