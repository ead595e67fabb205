//! JSON REST API for the gate pass service.
//!
//! Exposes an axum [`Router`] backed by any [`GatePassStore`] and
//! [`QrRenderer`]. Callers authenticate with a bearer token obtained from
//! `/auth/register` or `/auth/login`; role checks are left to the core.
//! TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gatepass_api::api_router(state))
//! ```

pub mod accounts;
pub mod auth;
pub mod error;
pub mod passes;
pub mod token;
pub mod validate;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use gatepass_core::{render::QrRenderer, service::GatePassService, store::GatePassStore};

pub use error::ApiError;
pub use token::TokenSigner;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, R> {
  pub service: GatePassService<S, R>,
  pub tokens:  Arc<TokenSigner>,
}

impl<S, R> Clone for AppState<S, R> {
  fn clone(&self) -> Self {
    Self { service: self.service.clone(), tokens: Arc::clone(&self.tokens) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, R>(state: AppState<S, R>) -> Router<()>
where
  S: GatePassStore + 'static,
  R: QrRenderer + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Accounts
    .route("/auth/register", post(accounts::register::<S, R>))
    .route("/auth/login", post(accounts::login::<S, R>))
    // Holder
    .route("/gatepass/generate", post(passes::generate::<S, R>))
    .route("/gatepass/refresh", post(passes::refresh::<S, R>))
    .route("/gatepass/active", get(passes::active::<S, R>))
    .route("/gatepass/logs", get(passes::own_logs::<S, R>))
    // Verifier
    .route("/gatepass/scan", post(passes::scan::<S, R>))
    .route("/gatepass/logs/all", get(passes::all_logs::<S, R>))
    .route("/gatepass/{id}/revoke", post(passes::revoke::<S, R>))
    .with_state(state)
}

async fn health() -> &'static str { "ok" }

#[cfg(test)]
mod tests;
