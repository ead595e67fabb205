//! [`GatePassService`]: pass lifecycle and scan verification.
//!
//! Expiry is lazy: nothing sweeps the store in the background. A pass whose
//! window has lapsed keeps its `active` status until the next read or scan
//! touches it, at which point it is moved to `expired`.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  clock::{Clock, SystemClock},
  credential::CredentialPayload,
  identity::{Caller, Identity, NewIdentity, Role, SubjectSummary},
  log::{
    DEFAULT_ALL_LOG_LIMIT, DEFAULT_OWN_LOG_LIMIT, EntryType, LogEntry,
    LogRecord, clamp_limit,
  },
  pass::{GatePass, Issue, IssueMode, IssuedPass, PassStatus, PassSummary},
  render::QrRenderer,
  store::GatePassStore,
  Error, Result,
};

/// Validity window applied when none is configured.
pub const DEFAULT_VALIDITY_DAYS: i64 = 7;

/// Issuance policy.
#[derive(Debug, Clone, Copy)]
pub struct PassPolicy {
  /// How long a freshly issued pass stays valid.
  pub validity: Duration,
}

impl Default for PassPolicy {
  fn default() -> Self {
    Self { validity: Duration::days(DEFAULT_VALIDITY_DAYS) }
  }
}

/// A presented QR payload plus what the verifier recorded about the crossing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
  pub payload:    String,
  pub entry_type: EntryType,
  pub location:   Option<String>,
  pub notes:      Option<String>,
}

/// Everything a verifier is shown after a successful scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
  pub log:       LogEntry,
  pub user:      SubjectSummary,
  pub gate_pass: PassSummary,
}

/// Issues, rotates, reads and verifies gate passes against a store.
pub struct GatePassService<S, R> {
  store:    Arc<S>,
  renderer: Arc<R>,
  clock:    Arc<dyn Clock>,
  policy:   PassPolicy,
}

impl<S, R> Clone for GatePassService<S, R> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      renderer: Arc::clone(&self.renderer),
      clock:    Arc::clone(&self.clock),
      policy:   self.policy,
    }
  }
}

impl<S, R> GatePassService<S, R>
where
  S: GatePassStore,
  R: QrRenderer,
{
  pub fn new(store: Arc<S>, renderer: Arc<R>) -> Self {
    Self {
      store,
      renderer,
      clock: Arc::new(SystemClock),
      policy: PassPolicy::default(),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_policy(mut self, policy: PassPolicy) -> Self {
    self.policy = policy;
    self
  }

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Create an account. Fails with [`Error::Conflict`] if the email or
  /// student id is already registered.
  pub async fn register(&self, input: NewIdentity) -> Result<Identity> {
    let identity = self
      .store
      .add_identity(input, self.clock.now())
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::Conflict("User already exists".into()))?;

    tracing::info!(identity_id = %identity.id, role = %identity.role, "identity registered");
    Ok(identity)
  }

  /// Look up an active account by email and let `verify` check the supplied
  /// secret against its stored password hash.
  ///
  /// An unknown email, a rejected secret and a deactivated account all fail
  /// with the same [`Error::InvalidCredentials`].
  pub async fn authenticate<F>(&self, email: &str, verify: F) -> Result<Identity>
  where
    F: FnOnce(&str) -> bool,
  {
    let identity = self
      .store
      .find_identity_by_email(email)
      .await
      .map_err(Error::store)?
      .filter(|i| i.is_active && verify(&i.password_hash))
      .ok_or(Error::InvalidCredentials)?;

    tracing::debug!(identity_id = %identity.id, "authenticated");
    Ok(identity)
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Issue a pass for the caller.
  ///
  /// Fails with [`Error::Conflict`] if the caller already holds an active
  /// pass that is still inside its validity window.
  pub async fn issue(&self, caller: &Caller) -> Result<IssuedPass> {
    caller.require(Role::Student)?;
    self.issue_with(caller.id, IssueMode::Exclusive).await
  }

  /// Expire whatever the caller currently holds and issue a replacement.
  pub async fn refresh(&self, caller: &Caller) -> Result<IssuedPass> {
    caller.require(Role::Student)?;
    self.issue_with(caller.id, IssueMode::Rotate).await
  }

  /// The caller's current pass, or `None` if they have none or it has
  /// lapsed. A lapsed pass is marked `expired` as a side effect.
  pub async fn get_active(&self, caller: &Caller) -> Result<Option<IssuedPass>> {
    caller.require(Role::Student)?;

    let Some(pass) = self
      .store
      .latest_active_pass(caller.id)
      .await
      .map_err(Error::store)?
    else {
      return Ok(None);
    };

    if pass.is_expired_at(self.clock.now()) {
      self.expire(&pass).await?;
      return Ok(None);
    }

    let qr_code_image = self.renderer.render(&pass.credential).map_err(Error::render)?;
    Ok(Some(IssuedPass { pass, qr_code_image }))
  }

  /// Administratively revoke an active pass. Revoking a pass that is already
  /// expired or revoked fails with [`Error::Status`].
  pub async fn revoke(&self, caller: &Caller, pass_id: Uuid) -> Result<GatePass> {
    caller.require(Role::Admin)?;

    let pass = self
      .store
      .get_pass(pass_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("Gate pass not found".into()))?;

    if pass.status.is_terminal() {
      return Err(Error::Status(pass.status));
    }

    let now = self.clock.now();
    self.store.revoke_pass(pass_id, now).await.map_err(Error::store)?;
    tracing::info!(pass_id = %pass_id, revoked_by = %caller.id, "gate pass revoked");

    Ok(GatePass {
      status: PassStatus::Revoked,
      revoked_at: Some(now),
      ..pass
    })
  }

  async fn issue_with(&self, identity_id: Uuid, mode: IssueMode) -> Result<IssuedPass> {
    let now = self.clock.now();
    let pass_id = Uuid::new_v4();
    let credential = CredentialPayload::new(identity_id, pass_id, now).encode()?;

    // Rendering is pure; a payload that cannot be drawn never reaches the store.
    let qr_code_image = self.renderer.render(&credential).map_err(Error::render)?;

    let candidate = GatePass {
      id: pass_id,
      identity_id,
      credential,
      status: PassStatus::Active,
      valid_from: now,
      valid_until: now + self.policy.validity,
      created_at: now,
      revoked_at: None,
      qr_code_path: None,
    };

    let mut pass = match self
      .store
      .issue_pass(candidate, mode)
      .await
      .map_err(Error::store)?
    {
      Issue::Conflict(_) => {
        return Err(Error::Conflict("You already have an active gate pass".into()));
      }
      Issue::Created { pass, expired } => {
        tracing::info!(
          pass_id = %pass.id,
          identity_id = %identity_id,
          valid_until = %pass.valid_until,
          expired,
          rotated = matches!(mode, IssueMode::Rotate),
          "gate pass issued"
        );
        pass
      }
    };

    // The pass is committed. Losing its image file does not undo that.
    match self.persist_image(&pass).await {
      Ok(path) => pass.qr_code_path = Some(path),
      Err(e) => tracing::warn!(pass_id = %pass.id, error = %e, "QR image not persisted"),
    }

    Ok(IssuedPass { pass, qr_code_image })
  }

  async fn persist_image(&self, pass: &GatePass) -> Result<String> {
    let path = self
      .renderer
      .persist(&pass.credential, pass.id)
      .await
      .map_err(Error::render)?;
    self
      .store
      .set_qr_code_path(pass.id, path.clone())
      .await
      .map_err(Error::store)?;
    Ok(path)
  }

  async fn expire(&self, pass: &GatePass) -> Result<()> {
    let changed = self.store.expire_pass(pass.id).await.map_err(Error::store)?;
    if changed {
      tracing::debug!(pass_id = %pass.id, valid_until = %pass.valid_until, "gate pass lazily expired");
    }
    Ok(())
  }

  // ── Scanning ──────────────────────────────────────────────────────────

  /// Verify a presented payload and, only if every check passes, record the
  /// crossing.
  ///
  /// Checks run in a fixed order so that, for example, a lapsed pass reports
  /// [`Error::Expired`] even when its holder has since been deactivated.
  pub async fn scan(&self, verifier: &Caller, request: ScanRequest) -> Result<ScanOutcome> {
    verifier.require(Role::Admin)?;

    let payload = CredentialPayload::decode(&request.payload)?;

    let pass = self
      .store
      .get_pass(payload.pass_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("Gate pass not found".into()))?;

    if pass.status.is_terminal() {
      return Err(Error::Status(pass.status));
    }

    let now = self.clock.now();
    if pass.is_expired_at(now) {
      self.expire(&pass).await?;
      return Err(Error::Expired(pass.id));
    }

    if pass.identity_id != payload.subject_id {
      return Err(Error::Mismatch {
        pass_id:         pass.id,
        claimed_subject: payload.subject_id,
      });
    }

    let subject = self
      .store
      .get_identity(payload.subject_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("User not found".into()))?;
    if !subject.is_active {
      return Err(Error::Inactive(subject.id));
    }

    let log = LogEntry {
      id:          Uuid::new_v4(),
      pass_id:     pass.id,
      subject_id:  subject.id,
      verifier_id: verifier.id,
      entry_type:  request.entry_type,
      scanned_at:  now,
      location:    request.location,
      notes:       request.notes,
    };
    self.store.append_log(log.clone()).await.map_err(Error::store)?;

    tracing::info!(
      log_id = %log.id,
      pass_id = %pass.id,
      subject_id = %subject.id,
      verifier_id = %verifier.id,
      entry_type = %log.entry_type,
      "scan recorded"
    );

    Ok(ScanOutcome {
      log,
      user: SubjectSummary::from(&subject),
      gate_pass: PassSummary::from(&pass),
    })
  }

  // ── Logs ──────────────────────────────────────────────────────────────

  /// The caller's own crossings, newest first.
  pub async fn own_logs(&self, caller: &Caller, limit: Option<usize>) -> Result<Vec<LogRecord>> {
    caller.require(Role::Student)?;
    self
      .store
      .logs_for_identity(caller.id, clamp_limit(limit, DEFAULT_OWN_LOG_LIMIT))
      .await
      .map_err(Error::store)
  }

  /// Every crossing at the facility, newest first.
  pub async fn all_logs(&self, caller: &Caller, limit: Option<usize>) -> Result<Vec<LogRecord>> {
    caller.require(Role::Admin)?;
    self
      .store
      .all_logs(clamp_limit(limit, DEFAULT_ALL_LOG_LIMIT))
      .await
      .map_err(Error::store)
  }
}
