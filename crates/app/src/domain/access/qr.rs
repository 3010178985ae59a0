//! QR image rendering.

use base64::{Engine, engine::general_purpose::STANDARD};
use mockall::automock;
use qrcode::{EcLevel, QrCode, render::svg, types::QrError};
use thiserror::Error;

/// Minimum rendered edge, in pixels.
const MIN_DIMENSION: u32 = 300;

#[derive(Debug, Error)]
pub enum QrRenderError {
    #[error("payload cannot be encoded as a QR code")]
    Encode(#[source] QrError),
}

/// Turns a payload into something a browser can display directly.
#[automock]
pub trait QrRenderer: Send + Sync {
    /// Render `payload` into a `data:` URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload does not fit in a QR code.
    fn render_data_url(&self, payload: &str) -> Result<String, QrRenderError>;
}

/// High error-correction SVG renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgQrRenderer;

impl QrRenderer for SvgQrRenderer {
    fn render_data_url(&self, payload: &str) -> Result<String, QrRenderError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)
            .map_err(QrRenderError::Encode)?;

        let image = code
            .render::<svg::Color<'_>>()
            .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
            .quiet_zone(true)
            .build();

        Ok(format!(
            "data:image/svg+xml;base64,{}",
            STANDARD.encode(image.as_bytes())
        ))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn renders_svg_data_url() -> TestResult {
        let url = SvgQrRenderer.render_data_url(r#"{"sessionToken":"abc"}"#)?;

        let encoded = url
            .strip_prefix("data:image/svg+xml;base64,")
            .ok_or("missing data url prefix")?;

        let svg = String::from_utf8(STANDARD.decode(encoded)?)?;

        assert!(svg.contains("<svg"), "expected svg markup");

        Ok(())
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let payload = "x".repeat(4_000);

        assert!(
            matches!(
                SvgQrRenderer.render_data_url(&payload),
                Err(QrRenderError::Encode(_))
            ),
            "payload beyond level H capacity must fail"
        );
    }
}
