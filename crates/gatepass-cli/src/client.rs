//! Async HTTP client wrapping the gate pass JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use gatepass_core::{
  identity::Profile,
  log::LogRecord,
  pass::{GatePass, IssuedPass},
  service::ScanOutcome,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

/// Connection settings for the gate pass API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Bearer token; empty for the unauthenticated endpoints.
  pub token:    String,
}

/// Body of `/auth/register` and `/auth/login` responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
  pub user:  Profile,
  pub token: String,
}

/// Fields sent to `/auth/register`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
  pub email:      String,
  pub password:   String,
  pub full_name:  String,
  pub student_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub department: Option<String>,
}

/// Fields sent to `/gatepass/scan`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
  pub qr_data:    String,
  pub entry_type: gatepass_core::log::EntryType,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes:      Option<String>,
}

/// Async HTTP client for the gate pass JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let req = self.client.request(method, self.url(path));
    if self.config.token.is_empty() {
      req
    } else {
      req.bearer_auth(&self.config.token)
    }
  }

  /// Send `req` and decode a JSON body, turning non-2xx responses into errors
  /// that carry the server's message.
  async fn send<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<T> {
    tracing::debug!(request = what, "sending");
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let resp = check(what, resp).await?;
    resp.json().await.with_context(|| format!("deserialising {what} response"))
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  /// `POST /api/auth/register`
  pub async fn register(&self, body: &Registration) -> Result<Session> {
    self
      .send("POST /auth/register", self.request(Method::POST, "/auth/register").json(body))
      .await
  }

  /// `POST /api/auth/login`
  pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
    let body = json!({ "email": email, "password": password });
    self
      .send("POST /auth/login", self.request(Method::POST, "/auth/login").json(&body))
      .await
  }

  // ── Passes ────────────────────────────────────────────────────────────────

  /// `POST /api/gatepass/generate`
  pub async fn issue(&self) -> Result<IssuedPass> {
    self
      .send("POST /gatepass/generate", self.request(Method::POST, "/gatepass/generate"))
      .await
  }

  /// `POST /api/gatepass/refresh`
  pub async fn refresh(&self) -> Result<IssuedPass> {
    self
      .send("POST /gatepass/refresh", self.request(Method::POST, "/gatepass/refresh"))
      .await
  }

  /// `GET /api/gatepass/active`
  pub async fn active(&self) -> Result<IssuedPass> {
    self
      .send("GET /gatepass/active", self.request(Method::GET, "/gatepass/active"))
      .await
  }

  /// `POST /api/gatepass/{id}/revoke`
  pub async fn revoke(&self, pass_id: Uuid) -> Result<GatePass> {
    let path = format!("/gatepass/{pass_id}/revoke");
    self.send(&format!("POST {path}"), self.request(Method::POST, &path)).await
  }

  /// `POST /api/gatepass/scan`
  pub async fn scan(&self, body: &Scan) -> Result<ScanOutcome> {
    self
      .send("POST /gatepass/scan", self.request(Method::POST, "/gatepass/scan").json(body))
      .await
  }

  // ── Logs ──────────────────────────────────────────────────────────────────

  /// `GET /api/gatepass/logs[?limit=N]`
  pub async fn own_logs(&self, limit: Option<usize>) -> Result<Vec<LogRecord>> {
    let req = self.request(Method::GET, "/gatepass/logs").query(&limit_query(limit));
    self.send("GET /gatepass/logs", req).await
  }

  /// `GET /api/gatepass/logs/all[?limit=N]`
  pub async fn all_logs(&self, limit: Option<usize>) -> Result<Vec<LogRecord>> {
    let req = self.request(Method::GET, "/gatepass/logs/all").query(&limit_query(limit));
    self.send("GET /gatepass/logs/all", req).await
  }
}

fn limit_query(limit: Option<usize>) -> Vec<(&'static str, String)> {
  limit.map(|l| ("limit", l.to_string())).into_iter().collect()
}

async fn check(what: &str, resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(anyhow!("{what} → {status}: {}", error_message(&body)))
}

/// Pull the `error` field out of a JSON error body, falling back to the raw
/// text.
fn error_message(body: &str) -> String {
  serde_json::from_str::<Value>(body)
    .ok()
    .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
    .unwrap_or_else(|| body.trim().to_string())
}
