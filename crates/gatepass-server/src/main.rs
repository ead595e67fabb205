//! gatepass-server binary.
//!
//! Reads `gatepass.toml` (or the path specified with `--config`) overlaid by
//! `GATEPASS_*` environment variables, opens an in-process SQLite store, and
//! serves the JSON API under `/api`.
//!
//! # Operator helpers
//!
//! ```text
//! gatepass-server --hash-password            # print an argon2 PHC string
//! gatepass-server --create-admin gate@uni.edu --admin-name "North Gate"
//! ```

mod config;

use std::{
  io::{self, BufRead, Write as _},
  path::PathBuf,
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use chrono::Duration;
use clap::Parser;
use gatepass_api::{AppState, TokenSigner, auth::hash_password, validate};
use gatepass_core::{
  identity::{NewIdentity, Role},
  service::{GatePassService, PassPolicy},
};
use gatepass_qr::SvgQrRenderer;
use gatepass_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Gate pass issuance and scan server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "gatepass.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create an admin (verifier) account with this email, reading its
  /// password from stdin, and exit.
  #[arg(long, value_name = "EMAIL")]
  create_admin: Option<String>,

  /// Display name for `--create-admin`.
  #[arg(long, requires = "create_admin", default_value = "Administrator")]
  admin_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password_line(io::stdin().lock())?;
    println!("{}", hash_password(&password)?);
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let service = GatePassService::new(
    Arc::new(store),
    Arc::new(SvgQrRenderer::new(&cfg.qr_dir)),
  )
  .with_policy(PassPolicy { validity: Duration::days(cfg.pass_validity_days) });

  if let Some(email) = cli.create_admin {
    return create_admin(&service, email, cli.admin_name).await;
  }

  let state = AppState {
    service,
    tokens: Arc::new(TokenSigner::new(
      cfg.token_secret.clone(),
      Duration::hours(cfg.token_ttl_hours),
    )),
  };

  let app = Router::new()
    .nest("/api", gatepass_api::api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!(
    store = %cfg.store_path.display(),
    qr_dir = %cfg.qr_dir.display(),
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn create_admin(
  service: &GatePassService<SqliteStore, SvgQrRenderer>,
  email: String,
  full_name: String,
) -> anyhow::Result<()> {
  validate::email(&email)?;
  validate::min_len("admin name", &full_name, validate::MIN_FULL_NAME_LEN)?;

  let password = read_password_line(io::stdin().lock())?;
  validate::min_len("password", &password, validate::MIN_PASSWORD_LEN)?;

  let identity = service
    .register(NewIdentity {
      email,
      password_hash: hash_password(&password)?,
      full_name,
      student_id: None,
      phone: None,
      department: None,
      role: Role::Admin,
    })
    .await
    .context("failed to create admin")?;

  println!("{}", identity.id);
  Ok(())
}

/// Prompt on stdout and read one password line from `input`. Input is
/// echoed; only the line terminator is stripped.
fn read_password_line(mut input: impl BufRead) -> anyhow::Result<String> {
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  input.read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
