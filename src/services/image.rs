use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Re-encodes an uploaded photo (JPEG or PNG) as a base64 JPEG.
///
/// The inference request always declares `image/jpeg`, so PNG uploads and
/// images with an alpha channel are flattened to RGB first.
pub fn to_jpeg_base64(bytes: &[u8]) -> Result<String> {
    let decoded = image::load_from_memory(bytes).context("unsupported or corrupt image")?;
    log::debug!(
        "🖼️ Decoded upload: {}x{} ({} bytes)",
        decoded.width(),
        decoded.height(),
        bytes.len()
    );

    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut jpeg = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .context("failed to encode JPEG")?;

    log::debug!("🔄 JPEG size: {} bytes", jpeg.len());
    Ok(general_purpose::STANDARD.encode(&jpeg))
}
