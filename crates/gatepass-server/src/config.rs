//! Server configuration: an optional TOML file overlaid by `GATEPASS_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Where rendered QR images are written.
  pub qr_dir:             PathBuf,
  /// HMAC key for bearer tokens. Required.
  pub token_secret:       String,
  pub token_ttl_hours:    i64,
  pub pass_validity_days: i64,
}

impl ServerConfig {
  /// Load from `path` (skipped if missing) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("host", "0.0.0.0")?
      .set_default("port", 3000)?
      .set_default("store_path", "gatepass.db")?
      .set_default("qr_dir", "qrcodes")?
      .set_default("token_ttl_hours", gatepass_api::token::DEFAULT_TTL_HOURS)?
      .set_default("pass_validity_days", gatepass_core::service::DEFAULT_VALIDITY_DAYS)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("GATEPASS").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    let cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig (is token_secret set?)")?;

    if cfg.token_secret.trim().is_empty() {
      anyhow::bail!("token_secret must not be empty");
    }
    if cfg.pass_validity_days < 1 {
      anyhow::bail!("pass_validity_days must be at least 1");
    }
    if cfg.token_ttl_hours < 1 {
      anyhow::bail!("token_ttl_hours must be at least 1");
    }

    Ok(ServerConfig {
      store_path: expand_tilde(&cfg.store_path),
      qr_dir: expand_tilde(&cfg.qr_dir),
      ..cfg
    })
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
