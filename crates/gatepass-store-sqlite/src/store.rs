//! [`SqliteStore`], the SQLite implementation of [`GatePassStore`].

use std::path::Path;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use gatepass_core::{
  identity::{Identity, NewIdentity},
  log::{LogEntry, LogRecord},
  pass::{GatePass, Issue, IssueMode},
  store::GatePassStore,
};

use crate::{
  encode::{
    encode_dt, encode_uuid, RawIdentity, RawLogRecord, RawPass, IDENTITY_COLUMNS,
    PASS_COLUMNS,
  },
  schema::SCHEMA,
  Result,
};

/// Joined projection shared by both log listings.
const LOG_SELECT: &str = "
  SELECT
    l.log_id, l.pass_id, l.subject_id, l.verifier_id,
    l.entry_type, l.scanned_at, l.location, l.notes,
    s.full_name  AS subject_name,
    s.student_id AS subject_student_id,
    s.department AS subject_department,
    v.full_name  AS verifier_name,
    v.student_id AS verifier_student_id,
    v.department AS verifier_department
  FROM gate_pass_logs l
  LEFT JOIN identities s ON s.identity_id = l.subject_id
  LEFT JOIN identities v ON v.identity_id = l.verifier_id";

/// What the issuance transaction decided, before decoding.
enum RawIssue {
  Created { expired: usize, created_at: DateTime<Utc> },
  Conflict(RawPass),
}

/// `at`, pushed forward to one microsecond past `latest` if it is not
/// already later.
fn strictly_after(at: DateTime<Utc>, latest: Option<&str>) -> rusqlite::Result<DateTime<Utc>> {
  let Some(latest) = latest else {
    return Ok(at);
  };
  let latest = DateTime::parse_from_rfc3339(latest).map_err(|e| {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
  })?;
  Ok(at.max(latest.with_timezone(&Utc) + Duration::microseconds(1)))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gate pass store backed by a single SQLite file.
///
/// Clones share the same connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch a single identity by an arbitrary unique column.
  async fn identity_where(&self, column: &'static str, value: String) -> Result<Option<Identity>> {
    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM identities WHERE {column} = ?1", IDENTITY_COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawIdentity::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  /// Move one pass out of `active` into `status`, touching nothing else.
  async fn close_pass(
    &self,
    id: Uuid,
    status: &'static str,
    revoked_at: Option<DateTime<Utc>>,
  ) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_str = revoked_at.map(encode_dt);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE gate_passes
              SET status = ?2, revoked_at = COALESCE(?3, revoked_at)
            WHERE pass_id = ?1 AND status = 'active'",
          rusqlite::params![id_str, status, at_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn query_logs(
    &self,
    subject: Option<Uuid>,
    limit: usize,
  ) -> Result<Vec<LogRecord>> {
    let subject_str = subject.map(encode_uuid);
    let limit_val   = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawLogRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{}
           WHERE (?1 IS NULL OR l.subject_id = ?1)
           ORDER BY l.scanned_at DESC, l.rowid DESC
           LIMIT ?2",
          LOG_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![subject_str, limit_val],
            RawLogRecord::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLogRecord::into_record).collect()
  }
}

// ─── GatePassStore impl ──────────────────────────────────────────────────────

impl GatePassStore for SqliteStore {
  type Error = crate::Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn add_identity(&self, input: NewIdentity, at: DateTime<Utc>) -> Result<Option<Identity>> {
    let now = at.trunc_subsecs(6);
    let identity = Identity {
      id:            Uuid::new_v4(),
      email:         input.email,
      password_hash: input.password_hash,
      full_name:     input.full_name,
      student_id:    input.student_id,
      phone:         input.phone,
      department:    input.department,
      role:          input.role,
      is_active:     true,
      created_at:    now,
      updated_at:    now,
    };

    let id_str     = encode_uuid(identity.id);
    let email      = identity.email.clone();
    let hash       = identity.password_hash.clone();
    let full_name  = identity.full_name.clone();
    let student_id = identity.student_id.clone();
    let phone      = identity.phone.clone();
    let department = identity.department.clone();
    let role_str   = identity.role.as_str();
    let at_str     = encode_dt(now);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM identities
              WHERE email = ?1 OR (?2 IS NOT NULL AND student_id = ?2)",
            rusqlite::params![email, student_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO identities (
             identity_id, email, password_hash, full_name, student_id,
             phone, department, role, is_active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
          rusqlite::params![
            id_str, email, hash, full_name, student_id, phone, department,
            role_str, at_str,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(inserted.then_some(identity))
  }

  async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
    self.identity_where("identity_id", encode_uuid(id)).await
  }

  async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
    self.identity_where("email", email.to_owned()).await
  }

  // ── Passes ────────────────────────────────────────────────────────────────

  async fn issue_pass(&self, pass: GatePass, mode: IssueMode) -> Result<Issue> {
    let pass_id_str     = encode_uuid(pass.id);
    let identity_id_str = encode_uuid(pass.identity_id);
    let credential      = pass.credential.clone();
    let status_str      = pass.status.as_str();
    let valid_from_str  = encode_dt(pass.valid_from);
    let valid_until_str = encode_dt(pass.valid_until);
    let created_at      = pass.created_at.trunc_subsecs(6);
    let revoked_at_str  = pass.revoked_at.map(encode_dt);
    let qr_code_path    = pass.qr_code_path.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn
          .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        if mode == IssueMode::Exclusive {
          let sql = format!(
            "SELECT {} FROM gate_passes
              WHERE identity_id = ?1 AND status = 'active' AND valid_until > ?2
              ORDER BY created_at DESC
              LIMIT 1",
            PASS_COLUMNS
          );
          let blocking = tx
            .query_row(
              &sql,
              rusqlite::params![identity_id_str, valid_from_str],
              RawPass::from_row,
            )
            .optional()?;
          if let Some(raw) = blocking {
            // Dropping `tx` rolls back; nothing has been written yet.
            return Ok(RawIssue::Conflict(raw));
          }
        }

        let expired = tx.execute(
          "UPDATE gate_passes SET status = 'expired'
            WHERE identity_id = ?1 AND status = 'active'",
          rusqlite::params![identity_id_str],
        )?;

        // Fixed-width timestamps order the same as text and as instants.
        let latest: Option<String> = tx.query_row(
          "SELECT MAX(created_at) FROM gate_passes WHERE identity_id = ?1",
          rusqlite::params![identity_id_str],
          |row| row.get(0),
        )?;
        let created_at = strictly_after(created_at, latest.as_deref())?;
        let created_at_str = encode_dt(created_at);

        tx.execute(
          "INSERT INTO gate_passes (
             pass_id, identity_id, credential, status, valid_from,
             valid_until, created_at, revoked_at, qr_code_path
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            pass_id_str,
            identity_id_str,
            credential,
            status_str,
            valid_from_str,
            valid_until_str,
            created_at_str,
            revoked_at_str,
            qr_code_path,
          ],
        )?;

        tx.commit()?;
        Ok(RawIssue::Created { expired, created_at })
      })
      .await?;

    match outcome {
      RawIssue::Created { expired, created_at } => Ok(Issue::Created {
        pass: GatePass { created_at, ..pass },
        expired,
      }),
      RawIssue::Conflict(raw) => Ok(Issue::Conflict(raw.into_pass()?)),
    }
  }

  async fn get_pass(&self, id: Uuid) -> Result<Option<GatePass>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPass> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM gate_passes WHERE pass_id = ?1", PASS_COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawPass::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPass::into_pass).transpose()
  }

  async fn latest_active_pass(&self, identity_id: Uuid) -> Result<Option<GatePass>> {
    let id_str = encode_uuid(identity_id);

    let raw: Option<RawPass> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM gate_passes
            WHERE identity_id = ?1 AND status = 'active'
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1",
          PASS_COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawPass::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPass::into_pass).transpose()
  }

  async fn expire_pass(&self, id: Uuid) -> Result<bool> {
    self.close_pass(id, "expired", None).await
  }

  async fn revoke_pass(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    self.close_pass(id, "revoked", Some(at)).await
  }

  async fn set_qr_code_path(&self, id: Uuid, path: String) -> Result<()> {
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE gate_passes SET qr_code_path = ?2 WHERE pass_id = ?1",
          rusqlite::params![id_str, path],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Logs ──────────────────────────────────────────────────────────────────

  async fn append_log(&self, entry: LogEntry) -> Result<()> {
    let log_id_str      = encode_uuid(entry.id);
    let pass_id_str     = encode_uuid(entry.pass_id);
    let subject_id_str  = encode_uuid(entry.subject_id);
    let verifier_id_str = encode_uuid(entry.verifier_id);
    let entry_type_str  = entry.entry_type.as_str();
    let scanned_at_str  = encode_dt(entry.scanned_at);
    let location        = entry.location;
    let notes           = entry.notes;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO gate_pass_logs (
             log_id, pass_id, subject_id, verifier_id,
             entry_type, scanned_at, location, notes
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            log_id_str,
            pass_id_str,
            subject_id_str,
            verifier_id_str,
            entry_type_str,
            scanned_at_str,
            location,
            notes,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn logs_for_identity(&self, identity_id: Uuid, limit: usize) -> Result<Vec<LogRecord>> {
    self.query_logs(Some(identity_id), limit).await
  }

  async fn all_logs(&self, limit: usize) -> Result<Vec<LogRecord>> {
    self.query_logs(None, limit).await
  }
}
