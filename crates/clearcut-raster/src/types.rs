//! Shared types for the clearcut raster engine.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hand decoded images
/// to the engine without depending on `image` directly.
pub use image::RgbaImage;

/// Bytes per pixel in a [`RasterBuffer`] (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions, rejecting a zero width or height.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::InvalidDimensions`] if either side is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of pixels covered by these dimensions.
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Length in bytes of an RGBA buffer with these dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::RenderContextUnavailable`] if the length
    /// does not fit in `usize`.
    pub fn byte_len(self) -> Result<usize, RasterError> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(CHANNELS))
            .ok_or(RasterError::RenderContextUnavailable)
    }
}

/// An in-memory RGBA pixel grid: row-major, top-left origin, four 8-bit
/// channels per pixel.
///
/// Width and height are always positive and the backing storage always
/// holds exactly `width * height * 4` bytes. Every engine operation takes
/// a buffer by reference and hands back a new one; nothing keeps a
/// reference after returning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer(RgbaImage);

impl RasterBuffer {
    /// Allocate a fully transparent black buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::InvalidDimensions`] for a zero side and
    /// [`RasterError::RenderContextUnavailable`] if the backing store
    /// cannot be allocated.
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        let dimensions = Dimensions::new(width, height)?;
        let pixels = filled(dimensions.byte_len()?, 0)?;
        Self::from_raw(width, height, pixels)
    }

    /// Allocate a buffer filled with a single RGBA color.
    ///
    /// # Errors
    ///
    /// Same as [`RasterBuffer::new`].
    pub fn from_pixel(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, RasterError> {
        let mut buffer = Self::new(width, height)?;
        for pixel in buffer.pixels_mut().chunks_exact_mut(CHANNELS) {
            pixel.copy_from_slice(&rgba);
        }
        Ok(buffer)
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    ///
    /// # Errors
    ///
    /// Same as [`RasterBuffer::new`].
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Result<Self, RasterError>
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        let mut buffer = Self::new(width, height)?;
        for (x, y, pixel) in buffer.0.enumerate_pixels_mut() {
            pixel.0 = f(x, y);
        }
        Ok(buffer)
    }

    /// Wrap raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::InvalidDimensions`] for a zero side and
    /// [`RasterError::BufferSizeMismatch`] if `pixels.len()` is not
    /// `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RasterError> {
        let expected = Dimensions::new(width, height)?.byte_len()?;
        let actual = pixels.len();
        // `RgbaImage::from_raw` only rejects short buffers; longer ones are
        // refused here.
        if actual > expected {
            return Err(RasterError::BufferSizeMismatch { expected, actual });
        }
        RgbaImage::from_raw(width, height, pixels)
            .map(Self)
            .ok_or(RasterError::BufferSizeMismatch { expected, actual })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Width and height together.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Number of pixels (`width * height`).
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.dimensions().pixel_count()
    }

    /// The RGBA value at `(x, y)`, or `None` outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.0.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Raw row-major RGBA bytes.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.0.as_raw()
    }

    /// Mutable raw row-major RGBA bytes.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Borrow as an `image` crate buffer.
    #[must_use]
    pub const fn as_image(&self) -> &RgbaImage {
        &self.0
    }

    /// Consume into an `image` crate buffer.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.0
    }

    /// Consume into the raw RGBA bytes.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.0.into_raw()
    }

    /// Copy the buffer, reporting allocation failure instead of aborting.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::RenderContextUnavailable`] if the copy
    /// cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, RasterError> {
        let mut pixels = allocate(self.pixels().len())?;
        pixels.extend_from_slice(self.pixels());
        Self::from_raw(self.width(), self.height(), pixels)
    }
}

impl TryFrom<RgbaImage> for RasterBuffer {
    type Error = RasterError;

    fn try_from(image: RgbaImage) -> Result<Self, Self::Error> {
        Dimensions::new(image.width(), image.height())?;
        Ok(Self(image))
    }
}

impl From<RasterBuffer> for RgbaImage {
    fn from(buffer: RasterBuffer) -> Self {
        buffer.0
    }
}

/// An empty vector with room for exactly `len` elements, mapping
/// allocation failure to [`RasterError::RenderContextUnavailable`].
pub(crate) fn allocate<T>(len: usize) -> Result<Vec<T>, RasterError> {
    let mut items = Vec::new();
    items
        .try_reserve_exact(len)
        .map_err(|_| RasterError::RenderContextUnavailable)?;
    Ok(items)
}

/// `len` copies of `value`, allocated through [`allocate`].
pub(crate) fn filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, RasterError> {
    let mut items = allocate(len)?;
    items.resize(len, value);
    Ok(items)
}

/// Errors surfaced by the raster engine.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `Decode` variant is serialized
/// as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// A width or height of zero was supplied to a sizing operation.
    #[error("invalid dimensions {width}x{height}: width and height must be positive")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Flood-fill seed outside the buffer.
    #[error("seed ({x}, {y}) lies outside the {width}x{height} image")]
    SeedOutOfBounds {
        /// Seed column.
        x: u32,
        /// Seed row.
        y: u32,
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
    },

    /// The pixel backing store could not be allocated.
    #[error("pixel buffer could not be allocated")]
    RenderContextUnavailable,

    /// Raw pixel data does not match the declared dimensions.
    #[error("pixel data holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// Byte length implied by the dimensions.
        expected: usize,
        /// Byte length actually supplied.
        actual: usize,
    },

    /// Magic-wand tolerance above the supported maximum.
    #[error("selection tolerance {0} is outside 0..=100")]
    ToleranceOutOfRange(u8),

    /// A ratio identifier that the segmentation service does not accept.
    #[error("unsupported aspect ratio {0:?}")]
    UnknownAspectRatio(String),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The input bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Encoding a result to PNG failed.
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// A cancellable operation observed its cancel token.
    #[error("operation cancelled")]
    Cancelled,
}

/// Serde-compatible proxy for `RasterError`.
#[derive(Serialize, Deserialize)]
enum RasterErrorProxy {
    InvalidDimensions { width: u32, height: u32 },
    SeedOutOfBounds { x: u32, y: u32, width: u32, height: u32 },
    RenderContextUnavailable,
    BufferSizeMismatch { expected: usize, actual: usize },
    ToleranceOutOfRange(u8),
    UnknownAspectRatio(String),
    EmptyInput,
    Decode(String),
    Encode(String),
    Cancelled,
}

impl Serialize for RasterError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::InvalidDimensions { width, height } => RasterErrorProxy::InvalidDimensions {
                width: *width,
                height: *height,
            },
            Self::SeedOutOfBounds {
                x,
                y,
                width,
                height,
            } => RasterErrorProxy::SeedOutOfBounds {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            },
            Self::RenderContextUnavailable => RasterErrorProxy::RenderContextUnavailable,
            Self::BufferSizeMismatch { expected, actual } => RasterErrorProxy::BufferSizeMismatch {
                expected: *expected,
                actual: *actual,
            },
            Self::ToleranceOutOfRange(t) => RasterErrorProxy::ToleranceOutOfRange(*t),
            Self::UnknownAspectRatio(s) => RasterErrorProxy::UnknownAspectRatio(s.clone()),
            Self::EmptyInput => RasterErrorProxy::EmptyInput,
            Self::Decode(e) => RasterErrorProxy::Decode(e.to_string()),
            Self::Encode(s) => RasterErrorProxy::Encode(s.clone()),
            Self::Cancelled => RasterErrorProxy::Cancelled,
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RasterError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = RasterErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            RasterErrorProxy::InvalidDimensions { width, height } => {
                Self::InvalidDimensions { width, height }
            }
            RasterErrorProxy::SeedOutOfBounds {
                x,
                y,
                width,
                height,
            } => Self::SeedOutOfBounds {
                x,
                y,
                width,
                height,
            },
            RasterErrorProxy::RenderContextUnavailable => Self::RenderContextUnavailable,
            RasterErrorProxy::BufferSizeMismatch { expected, actual } => {
                Self::BufferSizeMismatch { expected, actual }
            }
            RasterErrorProxy::ToleranceOutOfRange(t) => Self::ToleranceOutOfRange(t),
            RasterErrorProxy::UnknownAspectRatio(s) => Self::UnknownAspectRatio(s),
            RasterErrorProxy::EmptyInput => Self::EmptyInput,
            // The typed decoder error cannot be rebuilt; keep its message.
            RasterErrorProxy::Decode(msg) => Self::Decode(image::ImageError::Decoding(
                image::error::DecodingError::new(image::error::ImageFormatHint::Unknown, msg),
            )),
            RasterErrorProxy::Encode(s) => Self::Encode(s),
            RasterErrorProxy::Cancelled => Self::Cancelled,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Dimensions tests ---

    #[test]
    fn dimensions_reject_zero_sides() {
        assert!(matches!(
            Dimensions::new(0, 5),
            Err(RasterError::InvalidDimensions {
                width: 0,
                height: 5
            })
        ));
        assert!(matches!(
            Dimensions::new(5, 0),
            Err(RasterError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn dimensions_byte_len() {
        let d = Dimensions::new(3, 2).unwrap();
        assert_eq!(d.pixel_count(), 6);
        assert_eq!(d.byte_len().unwrap(), 24);
    }

    // --- RasterBuffer tests ---

    #[test]
    fn new_buffer_is_transparent_black() {
        let buf = RasterBuffer::new(4, 3).unwrap();
        assert_eq!(buf.pixels().len(), 4 * 3 * 4);
        assert!(buf.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn new_buffer_rejects_zero_dimensions() {
        assert!(matches!(
            RasterBuffer::new(0, 0),
            Err(RasterError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn from_raw_checks_length() {
        let result = RasterBuffer::from_raw(2, 2, vec![0; 15]);
        assert!(matches!(
            result,
            Err(RasterError::BufferSizeMismatch {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn from_raw_rejects_long_buffers() {
        let result = RasterBuffer::from_raw(2, 2, vec![0; 17]);
        assert!(matches!(
            result,
            Err(RasterError::BufferSizeMismatch {
                expected: 16,
                actual: 17
            })
        ));
    }

    #[test]
    fn oversized_allocation_is_reported() {
        // Above `isize::MAX`: refused before any memory is requested.
        let len = usize::MAX / 2 + 1;
        assert!(matches!(
            allocate::<u8>(len),
            Err(RasterError::RenderContextUnavailable)
        ));
        assert!(matches!(
            filled(len, false),
            Err(RasterError::RenderContextUnavailable)
        ));
        assert_eq!(filled(3, 7u8).unwrap(), vec![7, 7, 7]);
    }

    #[test]
    fn from_fn_is_row_major_top_left() {
        let buf = RasterBuffer::from_fn(3, 2, |x, y| [x as u8, y as u8, 0, 255]).unwrap();
        assert_eq!(buf.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(buf.pixel(2, 1), Some([2, 1, 0, 255]));
        // (x=1, y=1) sits at byte offset (1 * 3 + 1) * 4.
        assert_eq!(&buf.pixels()[16..20], &[1, 1, 0, 255]);
        assert_eq!(buf.pixel(3, 0), None);
    }

    #[test]
    fn from_pixel_fills_every_cell() {
        let buf = RasterBuffer::from_pixel(5, 5, [1, 2, 3, 4]).unwrap();
        assert!(buf.pixels().chunks_exact(4).all(|p| p == [1, 2, 3, 4]));
    }

    #[test]
    fn try_clone_is_independent() {
        let original = RasterBuffer::from_pixel(2, 2, [9, 9, 9, 255]).unwrap();
        let mut copy = original.try_clone().unwrap();
        copy.pixels_mut()[3] = 0;
        assert_eq!(original.pixel(0, 0), Some([9, 9, 9, 255]));
        assert_eq!(copy.pixel(0, 0), Some([9, 9, 9, 0]));
    }

    #[test]
    fn rgba_image_conversion_round_trips() {
        let img = RgbaImage::from_pixel(3, 3, image::Rgba([10, 20, 30, 40]));
        let buf = RasterBuffer::try_from(img.clone()).unwrap();
        assert_eq!(buf.dimensions(), Dimensions::new(3, 3).unwrap());
        assert_eq!(RgbaImage::from(buf), img);
    }

    #[test]
    fn empty_rgba_image_is_rejected() {
        let img = RgbaImage::new(0, 7);
        assert!(matches!(
            RasterBuffer::try_from(img),
            Err(RasterError::InvalidDimensions { .. })
        ));
    }

    // --- RasterError tests ---

    #[test]
    fn error_seed_out_of_bounds_display() {
        let err = RasterError::SeedOutOfBounds {
            x: 5,
            y: 1,
            width: 5,
            height: 5,
        };
        assert_eq!(err.to_string(), "seed (5, 1) lies outside the 5x5 image");
    }

    #[test]
    fn error_serde_round_trip_seed_out_of_bounds() {
        let err = RasterError::SeedOutOfBounds {
            x: 7,
            y: 8,
            width: 4,
            height: 4,
        };
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: RasterError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            RasterError::SeedOutOfBounds {
                x: 7,
                y: 8,
                width: 4,
                height: 4
            }
        ));
    }

    #[test]
    fn error_serde_keeps_decode_message() {
        let err = crate::codec::decode(&[0xFF, 0x00, 0x01]).unwrap_err();
        let message = err.to_string();
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: RasterError = serde_json::from_str(&json).unwrap();
        assert!(matches!(deserialized, RasterError::Decode(_)));
        let inner = message.trim_start_matches("failed to decode image: ");
        assert!(
            deserialized.to_string().contains(inner),
            "expected {:?} to contain {inner:?}",
            deserialized.to_string(),
        );
    }
}
