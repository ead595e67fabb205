//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Body: [`RegisterBody`]; returns 201 + [`AuthResponse`] |
//! | `POST` | `/auth/login` | Body: [`LoginBody`]; returns [`AuthResponse`] |
//!
//! Registration always creates a student. Request bodies use camelCase keys;
//! snake_case is accepted too.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
};
use gatepass_core::{
  identity::{NewIdentity, Profile, Role},
  render::QrRenderer,
  store::GatePassStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{hash_password, verify_password},
  error::ApiError,
  validate,
};

/// Returned by both register and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
  pub user:  Profile,
  pub token: String,
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
  pub email:      String,
  pub password:   String,
  #[serde(alias = "full_name")]
  pub full_name:  String,
  #[serde(alias = "student_id")]
  pub student_id: String,
  pub phone:      Option<String>,
  pub department: Option<String>,
}

impl RegisterBody {
  fn validate(&self) -> Result<(), ApiError> {
    validate::email(&self.email)?;
    validate::min_len("password", &self.password, validate::MIN_PASSWORD_LEN)?;
    validate::min_len("fullName", &self.full_name, validate::MIN_FULL_NAME_LEN)?;
    validate::min_len("studentId", &self.student_id, validate::MIN_STUDENT_ID_LEN)?;
    Ok(())
  }
}

/// `POST /auth/register`
pub async fn register<S, R>(
  State(state): State<AppState<S, R>>,
  body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError>
where
  S: GatePassStore,
  R: QrRenderer,
{
  let Json(body) = body?;
  body.validate()?;

  let input = NewIdentity {
    email:         body.email,
    password_hash: hash_password(&body.password)?,
    full_name:     body.full_name.trim().to_string(),
    student_id:    Some(body.student_id.trim().to_string()),
    phone:         body.phone,
    department:    body.department,
    role:          Role::Student,
  };

  let identity = state.service.register(input).await?;
  let token = state.tokens.issue(&identity)?;
  Ok((
    StatusCode::CREATED,
    Json(AuthResponse { user: Profile::from(&identity), token }),
  ))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
///
/// Unknown email, wrong password and a deactivated account are
/// indistinguishable to the client.
pub async fn login<S, R>(
  State(state): State<AppState<S, R>>,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError>
where
  S: GatePassStore,
  R: QrRenderer,
{
  let Json(body) = body?;
  validate::email(&body.email)?;
  validate::non_empty("password", &body.password)?;

  let identity = state
    .service
    .authenticate(&body.email, |hash| verify_password(&body.password, hash))
    .await?;
  let token = state.tokens.issue(&identity)?;
  Ok(Json(AuthResponse { user: Profile::from(&identity), token }))
}
