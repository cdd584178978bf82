//! Magic-wand selection: 4-connected flood fill from a seed pixel.
//!
//! A pixel joins the region when each of its R, G and B channels lies
//! within `tolerance` of the seed's (a per-channel bound, not a color
//! distance). Alpha is not compared. Exploration uses an explicit stack
//! and a visited bitmap, so every pixel is evaluated at most once and
//! memory stays bounded on large images.
//!
//! Selections are always taken against the buffer passed in. Callers
//! that keep an edit history pass the pristine original on every click,
//! so repeated clicks do not accumulate.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::{CHANNELS, RasterBuffer, RasterError, allocate, filled};

/// Per-channel color tolerance for the magic wand, `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SelectionTolerance(u8);

impl SelectionTolerance {
    /// Largest accepted tolerance.
    pub const MAX: u8 = 100;

    /// Tolerance used when the caller does not pick one.
    pub const DEFAULT: Self = Self(30);

    /// Validate a tolerance value.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::ToleranceOutOfRange`] above [`Self::MAX`].
    pub fn new(value: u8) -> Result<Self, RasterError> {
        if value > Self::MAX {
            return Err(RasterError::ToleranceOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// The raw tolerance value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for SelectionTolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for SelectionTolerance {
    type Error = RasterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SelectionTolerance> for u8 {
    fn from(tolerance: SelectionTolerance) -> Self {
        tolerance.0
    }
}

/// Cooperative cancellation checked between flood-fill steps.
pub trait CancelToken {
    /// Returns `true` once the caller wants the operation abandoned.
    fn is_cancelled(&self) -> bool;
}

impl CancelToken for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// A [`CancelToken`] that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Axis-aligned bounding box of a selection, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Leftmost selected column.
    pub x: u32,
    /// Topmost selected row.
    pub y: u32,
    /// Width of the box.
    pub width: u32,
    /// Height of the box.
    pub height: u32,
}

/// The set of pixels picked by one magic-wand click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    width: u32,
    height: u32,
    mask: Vec<bool>,
    pixel_count: usize,
    bounds: Bounds,
}

impl Selection {
    /// Whether `(x, y)` is part of the selection.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.mask[self.index(x, y)]
    }

    /// Number of selected pixels. Always at least one (the seed).
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    /// Bounding box of the selected pixels.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Row-major membership flags, one per pixel.
    #[must_use]
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Copy `image` and set alpha to 0 on every selected pixel.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::BufferSizeMismatch`] if `image` does not
    /// have the dimensions the selection was made on, and
    /// [`RasterError::RenderContextUnavailable`] if the copy cannot be
    /// allocated.
    pub fn apply(&self, image: &RasterBuffer) -> Result<RasterBuffer, RasterError> {
        if image.width() != self.width || image.height() != self.height {
            return Err(RasterError::BufferSizeMismatch {
                expected: self.mask.len() * CHANNELS,
                actual: image.pixels().len(),
            });
        }

        let mut output = image.try_clone()?;
        for (pixel, &selected) in output
            .pixels_mut()
            .chunks_exact_mut(CHANNELS)
            .zip(&self.mask)
        {
            if selected {
                pixel[3] = 0;
            }
        }
        Ok(output)
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Erase the 4-connected region of pixels similar to the seed at
/// `(x, y)`, returning a copy of `image` with their alpha set to 0.
///
/// # Errors
///
/// Returns [`RasterError::SeedOutOfBounds`] if the seed lies outside
/// `image`, and [`RasterError::RenderContextUnavailable`] if the output
/// cannot be allocated.
pub fn select_region(
    image: &RasterBuffer,
    x: u32,
    y: u32,
    tolerance: SelectionTolerance,
) -> Result<RasterBuffer, RasterError> {
    select_region_mask(image, x, y, tolerance)?.apply(image)
}

/// Compute the region [`select_region`] would erase, without erasing it.
///
/// # Errors
///
/// Returns [`RasterError::SeedOutOfBounds`] if the seed lies outside
/// `image`, and [`RasterError::RenderContextUnavailable`] if the fill's
/// bitmaps cannot be allocated.
pub fn select_region_mask(
    image: &RasterBuffer,
    x: u32,
    y: u32,
    tolerance: SelectionTolerance,
) -> Result<Selection, RasterError> {
    select_region_mask_cancellable(image, x, y, tolerance, &NeverCancel)
}

/// Like [`select_region_mask`], checking `cancel` before each stack pop.
///
/// # Errors
///
/// Returns [`RasterError::SeedOutOfBounds`] if the seed lies outside
/// `image`, [`RasterError::RenderContextUnavailable`] if the fill's
/// bitmaps cannot be allocated, and [`RasterError::Cancelled`] once
/// `cancel` fires.
pub fn select_region_mask_cancellable<C: CancelToken + ?Sized>(
    image: &RasterBuffer,
    x: u32,
    y: u32,
    tolerance: SelectionTolerance,
    cancel: &C,
) -> Result<Selection, RasterError> {
    let (width, height) = (image.width(), image.height());
    if x >= width || y >= height {
        return Err(RasterError::SeedOutOfBounds {
            x,
            y,
            width,
            height,
        });
    }

    let pixels = image.pixels();
    let w = width as usize;
    let index = |px: u32, py: u32| py as usize * w + px as usize;
    let tol = i16::from(tolerance.get());

    let seed_offset = index(x, y) * CHANNELS;
    let seed = [
        pixels[seed_offset],
        pixels[seed_offset + 1],
        pixels[seed_offset + 2],
    ];
    let matches = |offset: usize| {
        (0..3).all(|c| (i16::from(pixels[offset + c]) - i16::from(seed[c])).abs() <= tol)
    };

    let mut visited = filled(image.pixel_count(), false)?;
    let mut mask = filled(image.pixel_count(), false)?;
    // Each pixel is pushed at most once, so the stack never grows past this.
    let mut stack = allocate(image.pixel_count())?;
    stack.push((x, y));
    visited[index(x, y)] = true;

    let mut pixel_count = 0usize;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);

    while let Some((px, py)) = stack.pop() {
        if cancel.is_cancelled() {
            log::debug!("magic wand cancelled after {pixel_count} pixels");
            return Err(RasterError::Cancelled);
        }

        let i = index(px, py);
        if !matches(i * CHANNELS) {
            continue;
        }

        mask[i] = true;
        pixel_count += 1;
        min_x = min_x.min(px);
        min_y = min_y.min(py);
        max_x = max_x.max(px);
        max_y = max_y.max(py);

        // Push order: left, right, up, down.
        let neighbors = [
            (px > 0).then(|| (px - 1, py)),
            (px + 1 < width).then(|| (px + 1, py)),
            (py > 0).then(|| (px, py - 1)),
            (py + 1 < height).then(|| (px, py + 1)),
        ];
        for (nx, ny) in neighbors.into_iter().flatten() {
            let n = index(nx, ny);
            if !visited[n] {
                visited[n] = true;
                stack.push((nx, ny));
            }
        }
    }

    log::debug!(
        "magic wand at ({x}, {y}) tolerance {}: {pixel_count} pixels selected",
        tolerance.get(),
    );

    Ok(Selection {
        width,
        height,
        mask,
        pixel_count,
        bounds: Bounds {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        },
    })
}
