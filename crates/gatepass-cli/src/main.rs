//! `gatepass`: command-line client for the gate pass server.
//!
//! # Usage
//!
//! ```text
//! gatepass login --email ada@uni.edu --password ...      # prints a session with a token
//! export GATEPASS_TOKEN=...
//! gatepass issue --qr-out pass.svg
//! gatepass scan --entry-type inward - < payload.txt      # as an admin
//! gatepass --config ~/.config/gatepass/cli.toml all-logs --limit 20
//! ```

mod client;

use std::{io::Read as _, path::PathBuf};

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use clap::{Parser, Subcommand, ValueEnum};
use client::{ApiClient, ApiConfig, Registration, Scan};
use gatepass_core::{log::EntryType, pass::IssuedPass};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:3000";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "gatepass", about = "Client for the gate pass server")]
struct Args {
  /// Path to a TOML config file (url, token).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the gate pass server (default: http://localhost:3000).
  #[arg(long, env = "GATEPASS_URL")]
  url: Option<String>,

  /// Bearer token from `login` or `register`.
  #[arg(long, env = "GATEPASS_TOKEN", hide_env_values = true)]
  token: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create a student account.
  Register {
    #[arg(long)]
    email:      String,
    #[arg(long)]
    password:   String,
    #[arg(long)]
    full_name:  String,
    #[arg(long)]
    student_id: String,
    #[arg(long)]
    phone:      Option<String>,
    #[arg(long)]
    department: Option<String>,
  },
  /// Log in and print the session token.
  Login {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    password: String,
  },
  /// Issue a gate pass for yourself.
  Issue {
    #[command(flatten)]
    qr: QrOut,
  },
  /// Replace your current gate pass with a fresh one.
  Refresh {
    #[command(flatten)]
    qr: QrOut,
  },
  /// Show your active gate pass.
  Active {
    #[command(flatten)]
    qr: QrOut,
  },
  /// List your own gate crossings.
  Logs {
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Verify a presented QR payload and record the crossing (admin).
  Scan {
    /// The decoded QR text, or `-` to read it from stdin.
    payload:    String,
    #[arg(long, value_enum)]
    entry_type: Direction,
    #[arg(long)]
    location:   Option<String>,
    #[arg(long)]
    notes:      Option<String>,
  },
  /// List every crossing at the facility (admin).
  AllLogs {
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Revoke an active gate pass (admin).
  Revoke { pass_id: Uuid },
}

#[derive(clap::Args, Debug)]
struct QrOut {
  /// Also write the QR image (SVG) to this file.
  #[arg(long, value_name = "FILE")]
  qr_out: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Direction {
  Inward,
  Outward,
}

impl From<Direction> for EntryType {
  fn from(d: Direction) -> Self {
    match d {
      Direction::Inward => EntryType::Inward,
      Direction::Outward => EntryType::Outward,
    }
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:   String,
  #[serde(default)]
  token: String,
}

fn resolve_config(args_url: Option<String>, args_token: Option<String>, file: ConfigFile) -> ApiConfig {
  ApiConfig {
    base_url: args_url
      .or_else(|| (!file.url.is_empty()).then(|| file.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    token:    args_token
      .or_else(|| (!file.token.is_empty()).then(|| file.token.clone()))
      .unwrap_or_default(),
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags and env override the config file, which overrides defaults.
  let client = ApiClient::new(resolve_config(args.url, args.token, file_cfg))?;

  match args.command {
    Command::Register { email, password, full_name, student_id, phone, department } => {
      let session = client
        .register(&Registration { email, password, full_name, student_id, phone, department })
        .await?;
      print_json(&session)
    }
    Command::Login { email, password } => print_json(&client.login(&email, &password).await?),
    Command::Issue { qr } => show_pass(client.issue().await?, qr),
    Command::Refresh { qr } => show_pass(client.refresh().await?, qr),
    Command::Active { qr } => show_pass(client.active().await?, qr),
    Command::Logs { limit } => print_json(&client.own_logs(limit).await?),
    Command::Scan { payload, entry_type, location, notes } => {
      let qr_data = read_payload(payload)?;
      let outcome = client
        .scan(&Scan { qr_data, entry_type: entry_type.into(), location, notes })
        .await?;
      print_json(&outcome)
    }
    Command::AllLogs { limit } => print_json(&client.all_logs(limit).await?),
    Command::Revoke { pass_id } => print_json(&client.revoke(pass_id).await?),
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn show_pass(issued: IssuedPass, qr: QrOut) -> Result<()> {
  if let Some(path) = &qr.qr_out {
    let svg = decode_data_url(&issued.qr_code_image)?;
    std::fs::write(path, svg).with_context(|| format!("writing {}", path.display()))?;
    eprintln!("QR image written to {}", path.display());
  }
  print_json(&issued.pass)
}

fn read_payload(arg: String) -> Result<String> {
  let payload = if arg == "-" {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).context("reading payload from stdin")?;
    buf
  } else {
    arg
  };
  let payload = payload.trim().to_string();
  if payload.is_empty() {
    bail!("empty QR payload");
  }
  Ok(payload)
}

/// Decode a `data:<mime>;base64,<data>` URL.
fn decode_data_url(url: &str) -> Result<Vec<u8>> {
  let (header, data) = url
    .strip_prefix("data:")
    .and_then(|rest| rest.split_once(','))
    .context("QR image is not a data URL")?;
  if !header.ends_with(";base64") {
    bail!("QR image data URL is not base64-encoded");
  }
  B64.decode(data).context("decoding QR image")
}
