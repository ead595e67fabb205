//! The imaging seam: turning an encoded credential into a QR image.

use std::future::Future;

use uuid::Uuid;

/// Renders credential payloads as QR codes.
///
/// Implemented by `gatepass-qr`; the core only ever hands it text it has
/// already encoded.
pub trait QrRenderer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Render `payload` as a displayable `data:` URL.
  fn render(&self, payload: &str) -> Result<String, Self::Error>;

  /// Render `payload` and persist the image for `pass_id`, returning a
  /// reference path that can be stored on the pass.
  fn persist<'a>(
    &'a self,
    payload: &'a str,
    pass_id: Uuid,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
