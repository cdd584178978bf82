//! Merge a subject mask into an image's alpha channel.
//!
//! The segmentation service returns a grayscale mask (white = subject,
//! black = background) that may not match the source dimensions. The
//! mask is resampled to the source size, then its red channel becomes
//! the new alpha. Near-black values are forced to full transparency.

use crate::resample::{ResampleFilter, resample_cow};
use crate::types::{CHANNELS, RasterBuffer, RasterError};

/// Mask values below this become alpha 0 instead of faint residual
/// opacity.
pub const MASK_NOISE_THRESHOLD: u8 = 10;

/// Alpha produced for a mask sample `m`.
#[must_use]
pub const fn mask_alpha(m: u8) -> u8 {
    if m < MASK_NOISE_THRESHOLD { 0 } else { m }
}

/// Replace the alpha channel of `original` with the red channel of
/// `mask`.
///
/// `mask` is bilinearly resampled to `original`'s dimensions first. The
/// mask's green and blue channels are ignored, and the RGB channels of
/// `original` are copied through untouched.
///
/// # Errors
///
/// Returns [`RasterError::RenderContextUnavailable`] if the output or the
/// resampled mask cannot be allocated.
pub fn composite_mask(
    original: &RasterBuffer,
    mask: &RasterBuffer,
) -> Result<RasterBuffer, RasterError> {
    let mask = resample_cow(
        mask,
        original.width(),
        original.height(),
        ResampleFilter::default(),
    )?;
    let mut output = original.try_clone()?;

    let mut transparent = 0usize;
    for (pixel, sample) in output
        .pixels_mut()
        .chunks_exact_mut(CHANNELS)
        .zip(mask.pixels().chunks_exact(CHANNELS))
    {
        let alpha = mask_alpha(sample[0]);
        if alpha == 0 {
            transparent += 1;
        }
        pixel[3] = alpha;
    }

    log::debug!(
        "composited {}x{} mask: {transparent} of {} pixels transparent",
        original.width(),
        original.height(),
        original.pixel_count(),
    );
    Ok(output)
}
