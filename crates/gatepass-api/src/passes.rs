//! Handlers for `/gatepass` endpoints.
//!
//! | Method | Path | Role | Notes |
//! |--------|------|------|-------|
//! | `POST` | `/gatepass/generate` | student | 201 + pass with `qr_code_image`; 409 if one is active |
//! | `POST` | `/gatepass/refresh` | student | Expires any active pass and issues a new one |
//! | `GET`  | `/gatepass/active` | student | 404 if none |
//! | `GET`  | `/gatepass/logs` | student | Own crossings; optional `?limit` |
//! | `POST` | `/gatepass/scan` | admin | Body: [`ScanBody`]; verification failures are 400 |
//! | `GET`  | `/gatepass/logs/all` | admin | Optional `?limit` (default 100) |
//! | `POST` | `/gatepass/{id}/revoke` | admin | Returns the revoked pass |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
};
use gatepass_core::{
  log::{EntryType, LogRecord},
  pass::{GatePass, IssuedPass},
  render::QrRenderer,
  service::{ScanOutcome, ScanRequest},
  store::GatePassStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── Lifecycle ────────────────────────────────────────────────────────────────

/// `POST /gatepass/generate`
pub async fn generate<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(caller): Authenticated,
) -> Result<(StatusCode, Json<IssuedPass>), ApiError>
where
  S: GatePassStore,
  R: QrRenderer,
{
  let issued = state.service.issue(&caller).await?;
  Ok((StatusCode::CREATED, Json(issued)))
}

/// `POST /gatepass/refresh`
pub async fn refresh<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(caller): Authenticated,
) -> Result<Json<IssuedPass>, ApiError>
where
  S: GatePassStore,
  R: QrRenderer,
{
  Ok(Json(state.service.refresh(&caller).await?))
}

/// `GET /gatepass/active`
pub async fn active<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(caller): Authenticated,
) -> Result<Json<IssuedPass>, ApiError>
where
  S: GatePassStore,
  R: QrRenderer,
{
  state
    .service
    .get_active(&caller)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("No active gate pass found".into()))
}

/// `POST /gatepass/{id}/revoke`
pub async fn revoke<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<GatePass>, ApiError>
where
  S: GatePassStore,
  R: QrRenderer,
{
  Ok(Json(state.service.revoke(&caller, id).await?))
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /gatepass/scan`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanBody {
  /// The text decoded from the presented QR code.
  #[serde(alias = "qr_data")]
  pub qr_data:    String,
  #[serde(alias = "entry_type")]
  pub entry_type: EntryType,
  pub location:   Option<String>,
  pub notes:      Option<String>,
}

impl From<ScanBody> for ScanRequest {
  fn from(b: ScanBody) -> Self {
    ScanRequest {
      payload:    b.qr_data,
      entry_type: b.entry_type,
      location:   b.location,
      notes:      b.notes,
    }
  }
}

/// `POST /gatepass/scan`
pub async fn scan<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(verifier): Authenticated,
  body: Result<Json<ScanBody>, JsonRejection>,
) -> Result<Json<ScanOutcome>, ApiError>
where
  S: GatePassStore,
  R: QrRenderer,
{
  let Json(body) = body?;
  let outcome = state
    .service
    .scan(&verifier, ScanRequest::from(body))
    .await
    .map_err(ApiError::scan)?;
  Ok(Json(outcome))
}

// ─── Logs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogParams {
  pub limit: Option<usize>,
}

/// `GET /gatepass/logs[?limit=N]`
pub async fn own_logs<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(caller): Authenticated,
  params: Result<Query<LogParams>, QueryRejection>,
) -> Result<Json<Vec<LogRecord>>, ApiError>
where
  S: GatePassStore,
  R: QrRenderer,
{
  let Query(params) = params?;
  Ok(Json(state.service.own_logs(&caller, params.limit).await?))
}

/// `GET /gatepass/logs/all[?limit=N]`
pub async fn all_logs<S, R>(
  State(state): State<AppState<S, R>>,
  Authenticated(caller): Authenticated,
  params: Result<Query<LogParams>, QueryRejection>,
) -> Result<Json<Vec<LogRecord>>, ApiError>
where
  S: GatePassStore,
  R: QrRenderer,
{
  let Query(params) = params?;
  Ok(Json(state.service.all_logs(&caller, params.limit).await?))
}
