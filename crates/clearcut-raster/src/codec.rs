//! Decode/encode boundary between file bytes and [`RasterBuffer`].
//!
//! None of the raster operations call into this module. It exists for
//! callers (CLI, worker, tests) that start from image files and need to
//! hand results back as PNG.

use image::ImageEncoder;

use crate::types::{RasterBuffer, RasterError};

/// Decode raw image bytes into an RGBA buffer.
///
/// Supports PNG, JPEG, BMP, and WebP formats (whatever the `image` crate
/// can decode with the enabled features).
///
/// # Errors
///
/// Returns [`RasterError::EmptyInput`] if `bytes` is empty.
/// Returns [`RasterError::Decode`] if the image format is unrecognized or
/// the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RasterBuffer, RasterError> {
    if bytes.is_empty() {
        return Err(RasterError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    RasterBuffer::try_from(img.to_rgba8())
}

/// Encode a buffer as an RGBA PNG.
///
/// # Errors
///
/// Returns [`RasterError::Encode`] if the PNG encoder fails.
pub fn encode_png(buffer: &RasterBuffer) -> Result<Vec<u8>, RasterError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            buffer.pixels(),
            buffer.width(),
            buffer.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| RasterError::Encode(e.to_string()))?;
    Ok(png_bytes)
}
