//! QR rendering for gate pass credentials.
//!
//! Codes use the highest error-correction level so a scuffed phone screen or
//! printout still scans. Output is SVG: embeddable as a `data:` URL for
//! immediate display, and written to `<dir>/<pass_id>.svg` for later
//! retrieval.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use gatepass_core::render::QrRenderer;
use qrcode::{EcLevel, QrCode, render::svg};
use thiserror::Error;
use uuid::Uuid;

/// Minimum edge length of the rendered image, in pixels.
pub const MIN_DIMENSION: u32 = 300;

#[derive(Debug, Error)]
pub enum Error {
  #[error("qr encoding failed: {0}")]
  Encode(String),

  #[error("failed to write {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Renders payloads to SVG and stores them under a fixed directory.
#[derive(Debug, Clone)]
pub struct SvgQrRenderer {
  dir: PathBuf,
}

impl SvgQrRenderer {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn dir(&self) -> &Path { &self.dir }

  /// Render `payload` to an SVG document.
  pub fn svg(&self, payload: &str) -> Result<String> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)
      .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(
      code
        .render::<svg::Color<'_>>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .quiet_zone(true)
        .build(),
    )
  }

  fn path_for(&self, pass_id: Uuid) -> PathBuf {
    self.dir.join(format!("{pass_id}.svg"))
  }
}

impl QrRenderer for SvgQrRenderer {
  type Error = Error;

  fn render(&self, payload: &str) -> Result<String> {
    let svg = self.svg(payload)?;
    Ok(format!("data:image/svg+xml;base64,{}", B64.encode(svg)))
  }

  async fn persist(&self, payload: &str, pass_id: Uuid) -> Result<String> {
    let svg = self.svg(payload)?;

    tokio::fs::create_dir_all(&self.dir)
      .await
      .map_err(|source| Error::Io { path: self.dir.clone(), source })?;

    let path = self.path_for(pass_id);
    tokio::fs::write(&path, svg)
      .await
      .map_err(|source| Error::Io { path: path.clone(), source })?;

    Ok(path.to_string_lossy().into_owned())
  }
}
