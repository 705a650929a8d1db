use qrcode::{render::svg, EcLevel, QrCode};

use crate::error::AppError;

pub const PASS_CONTENT_TYPE: &str = "image/svg+xml";

pub fn pass_artifact_name(visitor_id: &str) -> String {
    format!("{}.svg", visitor_id)
}

/// Renders `payload` as a standalone SVG QR code.
pub fn render_qr_svg(payload: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| AppError::InternalWithMsg(format!("QR encoding failed: {}", e)))?;

    let image = code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(image.into_bytes())
}
