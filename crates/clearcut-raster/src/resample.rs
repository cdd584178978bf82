//! Full-frame resampling to explicit target dimensions.
//!
//! The output is stretched or compressed to exactly the requested size;
//! aspect ratio is not preserved and nothing is letterboxed. Bilinear
//! (`Triangle`) filtering is the default. Output pixel values depend on
//! the filter, so only dimensions are part of the contract.
//!
//! [`ResizeTarget`] covers the resizer's dimension arithmetic: ratio
//! lock on either side and uniform scale presets.

use std::borrow::Cow;
use std::fmt;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::types::{CHANNELS, Dimensions, RasterBuffer, RasterError, allocate};

/// Resampling filter.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest/best for photos.
    Lanczos3,
}

impl ResampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Resample `image` to exactly `target_width x target_height` with the
/// default bilinear filter.
///
/// # Errors
///
/// Returns [`RasterError::InvalidDimensions`] if either target side is
/// zero and [`RasterError::RenderContextUnavailable`] if the output
/// cannot be allocated.
pub fn resample(
    image: &RasterBuffer,
    target_width: u32,
    target_height: u32,
) -> Result<RasterBuffer, RasterError> {
    resample_with(image, target_width, target_height, ResampleFilter::default())
}

/// Resample `image` to exactly `target_width x target_height` using
/// `filter`.
///
/// Same-size requests return an exact copy without filtering.
///
/// # Errors
///
/// Same as [`resample`].
pub fn resample_with(
    image: &RasterBuffer,
    target_width: u32,
    target_height: u32,
    filter: ResampleFilter,
) -> Result<RasterBuffer, RasterError> {
    Ok(resample_cow(image, target_width, target_height, filter)?.into_owned())
}

/// Resample, borrowing `image` unchanged when it already has the target
/// dimensions.
pub(crate) fn resample_cow(
    image: &RasterBuffer,
    target_width: u32,
    target_height: u32,
    filter: ResampleFilter,
) -> Result<Cow<'_, RasterBuffer>, RasterError> {
    let target = Dimensions::new(target_width, target_height)?;
    let output_len = target.byte_len()?;

    if target == image.dimensions() {
        return Ok(Cow::Borrowed(image));
    }

    reserve_working_memory(image.width(), target, output_len)?;

    log::trace!(
        "resampling {}x{} -> {target_width}x{target_height} ({filter})",
        image.width(),
        image.height(),
    );
    let resized = image::imageops::resize(
        image.as_image(),
        target_width,
        target_height,
        filter.to_image_filter(),
    );
    RasterBuffer::try_from(resized).map(Cow::Owned)
}

/// Reserve, then release, the memory `imageops::resize` is about to use.
///
/// `resize` allocates infallibly: an `f32` RGBA buffer of source width by
/// target height for the vertical pass, then the output. Claiming both up
/// front turns exhaustion into [`RasterError::RenderContextUnavailable`]
/// instead of an abort, and leaves the allocator holding the memory the
/// real passes reuse.
fn reserve_working_memory(
    source_width: u32,
    target: Dimensions,
    output_len: usize,
) -> Result<(), RasterError> {
    let scratch_len = (source_width as usize)
        .checked_mul(target.height as usize)
        .and_then(|pixels| pixels.checked_mul(CHANNELS * std::mem::size_of::<f32>()))
        .and_then(|scratch| scratch.checked_add(output_len))
        .ok_or(RasterError::RenderContextUnavailable)?;
    drop(allocate::<u8>(scratch_len)?);
    Ok(())
}

/// How the user asked for the output size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResizeTarget {
    /// Both sides given explicitly.
    Exact {
        /// Target width.
        width: u32,
        /// Target height.
        height: u32,
    },
    /// Width given; height follows the source ratio.
    FitWidth {
        /// Target width.
        width: u32,
    },
    /// Height given; width follows the source ratio.
    FitHeight {
        /// Target height.
        height: u32,
    },
    /// Both sides multiplied by the same factor.
    Scale {
        /// Multiplier applied to the source size.
        factor: f64,
    },
}

impl ResizeTarget {
    /// Resolve to concrete dimensions for a `source` image.
    ///
    /// Derived sides are rounded to the nearest pixel, halves up.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::InvalidDimensions`] if a resolved side is
    /// zero (or the scale factor is not a positive finite number).
    pub fn resolve(self, source: Dimensions) -> Result<Dimensions, RasterError> {
        let src_w = f64::from(source.width);
        let src_h = f64::from(source.height);
        let (width, height) = match self {
            Self::Exact { width, height } => (width, height),
            Self::FitWidth { width } => (width, round_px(f64::from(width) * src_h / src_w)),
            Self::FitHeight { height } => (round_px(f64::from(height) * src_w / src_h), height),
            Self::Scale { factor } => (round_px(src_w * factor), round_px(src_h * factor)),
        };
        Dimensions::new(width, height)
    }
}

/// Round a derived side length to whole pixels.
///
/// Non-finite and negative values collapse to zero so the caller's
/// dimension check rejects them.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_px(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Download name for a resized image: `resized-{w}x{h}-{name}`.
#[must_use]
pub fn resized_file_name(dimensions: Dimensions, original_name: &str) -> String {
    format!(
        "resized-{}x{}-{original_name}",
        dimensions.width, dimensions.height
    )
}
