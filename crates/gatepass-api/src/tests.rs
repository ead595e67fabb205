//! Router-level tests: an in-memory store, SVG renderer writing to a temp
//! directory, and a manual clock for pass expiry.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::Duration;
use gatepass_core::{
  clock::ManualClock,
  identity::{NewIdentity, Role},
  service::GatePassService,
};
use gatepass_qr::SvgQrRenderer;
use gatepass_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt as _;

use crate::{AppState, TokenSigner, api_router, auth::hash_password};

struct Harness {
  router:  Router,
  state:   AppState<SqliteStore, SvgQrRenderer>,
  clock:   Arc<ManualClock>,
  _qr_dir: TempDir,
}

async fn harness() -> Harness {
  let qr_dir = tempfile::tempdir().unwrap();
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let renderer = Arc::new(SvgQrRenderer::new(qr_dir.path()));
  let clock = Arc::new(ManualClock::starting_now());

  let state = AppState {
    service: GatePassService::new(store, renderer).with_clock(clock.clone()),
    tokens:  Arc::new(TokenSigner::new("test-secret", Duration::hours(1))),
  };

  Harness {
    router: api_router(state.clone()),
    state,
    clock,
    _qr_dir: qr_dir,
  }
}

impl Harness {
  async fn call(
    &self,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = self.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
      .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
  }

  /// Register a student and return their token.
  async fn student(&self, email: &str, student_id: &str) -> String {
    let (status, body) = self
      .call(
        "POST",
        "/auth/register",
        None,
        Some(json!({
          "email": email,
          "password": "password123",
          "fullName": "Test Student",
          "studentId": student_id,
          "department": "Physics",
        })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
  }

  /// Provision an admin out of band, then log in over HTTP.
  async fn admin(&self, email: &str) -> String {
    self
      .state
      .service
      .register(NewIdentity {
        email:         email.into(),
        password_hash: hash_password("admin-password").unwrap(),
        full_name:     "Gate Keeper".into(),
        student_id:    None,
        phone:         None,
        department:    None,
        role:          Role::Admin,
      })
      .await
      .unwrap();

    let (status, body) = self
      .call(
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": "admin-password" })),
      )
      .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
  }
}

fn error_of(body: &Value) -> &str { body["error"].as_str().unwrap_or_default() }

// ─── Accounts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_ok() {
  let h = harness().await;
  let (status, body) = h.call("GET", "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn register_returns_profile_and_token() {
  let h = harness().await;
  let (status, body) = h
    .call(
      "POST",
      "/auth/register",
      None,
      Some(json!({
        "email": "ada@example.edu",
        "password": "password123",
        "full_name": "Ada Lovelace",
        "student_id": "S-100",
      })),
    )
    .await;

  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["user"]["email"], "ada@example.edu");
  assert_eq!(body["user"]["role"], "student");
  assert_eq!(body["user"]["student_id"], "S-100");
  assert!(body["user"].get("password_hash").is_none());
  assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
  let h = harness().await;
  h.student("ada@example.edu", "S-100").await;

  let (status, body) = h
    .call(
      "POST",
      "/auth/register",
      None,
      Some(json!({
        "email": "ada@example.edu",
        "password": "password123",
        "fullName": "Someone Else",
        "studentId": "S-200",
      })),
    )
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(error_of(&body), "User already exists");
}

#[tokio::test]
async fn registration_is_validated() {
  let h = harness().await;
  let cases = [
    json!({ "email": "not-an-email", "password": "password123", "fullName": "Ada", "studentId": "S-1" }),
    json!({ "email": "a@example.edu", "password": "short", "fullName": "Ada", "studentId": "S-1" }),
    json!({ "email": "a@example.edu", "password": "password123", "fullName": "A", "studentId": "S-1" }),
    json!({ "email": "a@example.edu", "password": "password123", "fullName": "Ada", "studentId": "S1" }),
    json!({ "email": "a@example.edu", "password": "password123" }),
  ];
  for case in cases {
    let (status, body) = h.call("POST", "/auth/register", None, Some(case.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{case} -> {body}");
    assert!(!error_of(&body).is_empty());
  }
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email() {
  let h = harness().await;
  h.student("ada@example.edu", "S-100").await;

  for (email, password) in [("ada@example.edu", "wrong-password"), ("nobody@example.edu", "password123")] {
    let (status, body) = h
      .call("POST", "/auth/login", None, Some(json!({ "email": email, "password": password })))
      .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(&body), "Invalid credentials");
  }

  let (status, _) = h
    .call(
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": "ada@example.edu", "password": "password123" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
  let h = harness().await;

  let (status, _) = h.call("GET", "/gatepass/active", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = h.call("GET", "/gatepass/active", Some("forged.token"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_are_enforced() {
  let h = harness().await;
  let student = h.student("ada@example.edu", "S-100").await;
  let admin = h.admin("gate@example.edu").await;

  let (status, body) = h
    .call(
      "POST",
      "/gatepass/scan",
      Some(&student),
      Some(json!({ "qrData": "{}", "entryType": "inward" })),
    )
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(error_of(&body), "Insufficient permissions");

  let (status, _) = h.call("POST", "/gatepass/generate", Some(&admin), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = h.call("GET", "/gatepass/logs/all", Some(&student), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_twice_conflicts_and_active_returns_the_pass() {
  let h = harness().await;
  let student = h.student("ada@example.edu", "S-100").await;

  let (status, issued) = h.call("POST", "/gatepass/generate", Some(&student), None).await;
  assert_eq!(status, StatusCode::CREATED, "{issued}");
  assert_eq!(issued["status"], "active");
  assert!(
    issued["qr_code_image"]
      .as_str()
      .unwrap()
      .starts_with("data:image/svg+xml;base64,")
  );
  let path = issued["qr_code_path"].as_str().unwrap();
  assert!(std::path::Path::new(path).exists());

  let (status, body) = h.call("POST", "/gatepass/generate", Some(&student), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(error_of(&body), "You already have an active gate pass");

  let (status, active) = h.call("GET", "/gatepass/active", Some(&student), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(active["id"], issued["id"]);
}

#[tokio::test]
async fn active_is_404_when_none_or_lapsed() {
  let h = harness().await;
  let student = h.student("ada@example.edu", "S-100").await;

  let (status, body) = h.call("GET", "/gatepass/active", Some(&student), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(error_of(&body), "No active gate pass found");

  h.call("POST", "/gatepass/generate", Some(&student), None).await;
  h.clock.advance(Duration::days(8));

  let (status, _) = h.call("GET", "/gatepass/active", Some(&student), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  // The lapsed pass no longer blocks a new one.
  let (status, _) = h.call("POST", "/gatepass/generate", Some(&student), None).await;
  assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn refresh_replaces_the_active_pass() {
  let h = harness().await;
  let student = h.student("ada@example.edu", "S-100").await;

  let (_, first) = h.call("POST", "/gatepass/generate", Some(&student), None).await;
  h.clock.advance(Duration::seconds(1));

  let (status, second) = h.call("POST", "/gatepass/refresh", Some(&student), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_ne!(first["id"], second["id"]);

  let (_, active) = h.call("GET", "/gatepass/active", Some(&student), None).await;
  assert_eq!(active["id"], second["id"]);
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scan_records_a_crossing_visible_in_both_logs() {
  let h = harness().await;
  let student = h.student("ada@example.edu", "S-100").await;
  let admin = h.admin("gate@example.edu").await;

  let (_, issued) = h.call("POST", "/gatepass/generate", Some(&student), None).await;
  let qr_data = issued["credential"].as_str().unwrap();

  let (status, outcome) = h
    .call(
      "POST",
      "/gatepass/scan",
      Some(&admin),
      Some(json!({ "qrData": qr_data, "entryType": "inward", "location": "North gate" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK, "{outcome}");
  assert_eq!(outcome["log"]["entry_type"], "inward");
  assert_eq!(outcome["user"]["email"], "ada@example.edu");
  assert_eq!(outcome["gate_pass"]["id"], issued["id"]);
  assert!(outcome["user"].get("password_hash").is_none());

  let (status, own) = h.call("GET", "/gatepass/logs", Some(&student), None).await;
  assert_eq!(status, StatusCode::OK);
  let own = own.as_array().unwrap();
  assert_eq!(own.len(), 1);
  assert_eq!(own[0]["location"], "North gate");
  assert_eq!(own[0]["scanned_by"]["full_name"], "Gate Keeper");

  let (status, all) = h.call("GET", "/gatepass/logs/all?limit=10", Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  let all = all.as_array().unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0]["subject"]["student_id"], "S-100");
}

#[tokio::test]
async fn scan_failures_are_bad_requests_and_log_nothing() {
  let h = harness().await;
  let student = h.student("ada@example.edu", "S-100").await;
  let admin = h.admin("gate@example.edu").await;

  let (_, issued) = h.call("POST", "/gatepass/generate", Some(&student), None).await;
  let qr_data = issued["credential"].as_str().unwrap().to_string();

  let (status, body) = h
    .call(
      "POST",
      "/gatepass/scan",
      Some(&admin),
      Some(json!({ "qrData": "not json", "entryType": "inward" })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(error_of(&body).starts_with("invalid QR code format"));

  let (status, _) = h
    .call(
      "POST",
      "/gatepass/scan",
      Some(&admin),
      Some(json!({ "qrData": qr_data, "entryType": "sideways" })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  h.clock.advance(Duration::days(8));
  let (status, body) = h
    .call(
      "POST",
      "/gatepass/scan",
      Some(&admin),
      Some(json!({ "qrData": qr_data, "entryType": "outward" })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(error_of(&body), "gate pass has expired");

  // Second scan sees the status written by the first.
  let (status, body) = h
    .call(
      "POST",
      "/gatepass/scan",
      Some(&admin),
      Some(json!({ "qrData": qr_data, "entryType": "outward" })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(error_of(&body), "gate pass is expired");

  let (_, all) = h.call("GET", "/gatepass/logs/all", Some(&admin), None).await;
  assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn revoked_pass_cannot_be_scanned() {
  let h = harness().await;
  let student = h.student("ada@example.edu", "S-100").await;
  let admin = h.admin("gate@example.edu").await;

  let (_, issued) = h.call("POST", "/gatepass/generate", Some(&student), None).await;
  let id = issued["id"].as_str().unwrap();
  let uri = format!("/gatepass/{id}/revoke");

  let (status, revoked) = h.call("POST", &uri, Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK, "{revoked}");
  assert_eq!(revoked["status"], "revoked");
  assert!(revoked["revoked_at"].is_string());

  let (status, _) = h.call("POST", &uri, Some(&admin), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, body) = h
    .call(
      "POST",
      "/gatepass/scan",
      Some(&admin),
      Some(json!({ "qrData": issued["credential"], "entryType": "inward" })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(error_of(&body), "gate pass is revoked");

  let (status, _) = h.call("GET", "/gatepass/active", Some(&student), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revoking_unknown_pass_is_404() {
  let h = harness().await;
  let admin = h.admin("gate@example.edu").await;
  let uri = format!("/gatepass/{}/revoke", uuid::Uuid::new_v4());

  let (status, body) = h.call("POST", &uri, Some(&admin), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(error_of(&body), "Gate pass not found");
}
