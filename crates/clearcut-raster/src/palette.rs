//! Dominant color extraction by frequency-ranked quantization.
//!
//! The source is first stretched to a fixed 100x100 working sample.
//! Pixels with alpha below 128 are skipped. Each remaining channel is
//! rounded to the nearest multiple of 10 (so 255 lands on 260, which
//! is kept as-is), and the resulting triples are counted in first-seen
//! order. A stable sort by descending count then yields the palette, so
//! equal counts keep the order in which the colors first appeared.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::resample::{ResampleFilter, resample_cow};
use crate::types::{CHANNELS, RasterBuffer, RasterError};

/// Side length of the square working sample.
pub const SAMPLE_SIZE: u32 = 100;

/// Pixels with alpha below this are ignored.
pub const OPAQUE_ALPHA_THRESHOLD: u8 = 128;

/// Bucket width for channel quantization.
pub const QUANTIZATION_STEP: u16 = 10;

/// Palette length used when the caller does not pick one.
pub const DEFAULT_MAX_COLORS: usize = 6;

/// Round a channel to the nearest multiple of [`QUANTIZATION_STEP`],
/// halves up.
#[must_use]
pub const fn quantize_channel(value: u8) -> u16 {
    (value as u16 + QUANTIZATION_STEP / 2) / QUANTIZATION_STEP * QUANTIZATION_STEP
}

/// A quantized RGB triple. Channels range over `0..=260` in steps of 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedColor {
    /// Red bucket.
    pub r: u16,
    /// Green bucket.
    pub g: u16,
    /// Blue bucket.
    pub b: u16,
}

impl QuantizedColor {
    /// Quantize an RGB triple.
    #[must_use]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: quantize_channel(r),
            g: quantize_channel(g),
            b: quantize_channel(b),
        }
    }

    /// `#rrggbb` with lower-case digits, each channel padded to at least
    /// two digits. A 260 bucket renders as three digits (`104`).
    #[must_use]
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSample {
    /// Red bucket.
    pub r: u16,
    /// Green bucket.
    pub g: u16,
    /// Blue bucket.
    pub b: u16,
    /// Hex rendering, see [`QuantizedColor::hex`].
    pub hex: String,
}

impl From<QuantizedColor> for ColorSample {
    fn from(color: QuantizedColor) -> Self {
        Self {
            r: color.r,
            g: color.g,
            b: color.b,
            hex: color.hex(),
        }
    }
}

/// Insertion-ordered frequency counts of quantized colors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorHistogram {
    entries: Vec<(QuantizedColor, u32)>,
    index: HashMap<QuantizedColor, usize>,
}

impl ColorHistogram {
    /// Count every opaque-enough pixel of `buffer` as-is, without the
    /// working-sample resize.
    #[must_use]
    pub fn from_buffer(buffer: &RasterBuffer) -> Self {
        let mut histogram = Self::default();
        for pixel in buffer.pixels().chunks_exact(CHANNELS) {
            if pixel[3] < OPAQUE_ALPHA_THRESHOLD {
                continue;
            }
            histogram.add(QuantizedColor::from_rgb(pixel[0], pixel[1], pixel[2]));
        }
        histogram
    }

    fn add(&mut self, color: QuantizedColor) {
        if let Some(&slot) = self.index.get(&color) {
            self.entries[slot].1 += 1;
        } else {
            self.index.insert(color, self.entries.len());
            self.entries.push((color, 1));
        }
    }

    /// Number of distinct colors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no pixel was counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count for `color`, zero if never seen.
    #[must_use]
    pub fn count(&self, color: QuantizedColor) -> u32 {
        self.index.get(&color).map_or(0, |&slot| self.entries[slot].1)
    }

    /// Total number of counted pixels.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|&(_, n)| u64::from(n)).sum()
    }

    /// Colors in first-seen order with their counts.
    #[must_use]
    pub fn entries(&self) -> &[(QuantizedColor, u32)] {
        &self.entries
    }

    /// Colors by descending count. Ties keep first-seen order.
    #[must_use]
    pub fn ranked(&self) -> Vec<(QuantizedColor, u32)> {
        let mut ranked = self.entries.clone();
        // `sort_by` is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// Histogram of the 100x100 working sample of `image`.
///
/// # Errors
///
/// Returns [`RasterError::RenderContextUnavailable`] if the working
/// sample cannot be allocated.
pub fn color_histogram(image: &RasterBuffer) -> Result<ColorHistogram, RasterError> {
    let sample = resample_cow(image, SAMPLE_SIZE, SAMPLE_SIZE, ResampleFilter::default())?;
    Ok(ColorHistogram::from_buffer(&sample))
}

/// Up to `max_colors` dominant colors of `image`, most frequent first.
///
/// An image with no pixel at alpha 128 or above yields an empty list,
/// as does `max_colors == 0`.
///
/// # Errors
///
/// Returns [`RasterError::RenderContextUnavailable`] if the working
/// sample cannot be allocated.
pub fn extract_palette(
    image: &RasterBuffer,
    max_colors: usize,
) -> Result<Vec<ColorSample>, RasterError> {
    let histogram = color_histogram(image)?;
    let palette: Vec<ColorSample> = histogram
        .ranked()
        .into_iter()
        .take(max_colors)
        .map(|(color, _)| ColorSample::from(color))
        .collect();

    log::debug!(
        "palette: {} of {} distinct colors from {} pixels",
        palette.len(),
        histogram.len(),
        histogram.total(),
    );
    Ok(palette)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_rounding() {
        assert_eq!(quantize_channel(0), 0);
        assert_eq!(quantize_channel(4), 0);
        assert_eq!(quantize_channel(5), 10);
        assert_eq!(quantize_channel(123), 120);
        assert_eq!(quantize_channel(45), 50);
        assert_eq!(quantize_channel(250), 250);
        assert_eq!(quantize_channel(254), 250);
        // Rounding past the channel range is preserved.
        assert_eq!(quantize_channel(255), 260);
    }

    #[test]
    fn hex_is_lower_case_and_padded() {
        assert_eq!(QuantizedColor::from_rgb(0, 10, 250).hex(), "#000afa");
        assert_eq!(QuantizedColor::from_rgb(255, 255, 255).hex(), "#104104104");
    }

    #[test]
    fn solid_image_has_a_single_bucket() {
        let image = RasterBuffer::from_pixel(10, 10, [123, 45, 200, 255]).unwrap();
        let bucket = QuantizedColor {
            r: 120,
            g: 50,
            b: 200,
        };

        let histogram = ColorHistogram::from_buffer(&image);
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram.count(bucket), 100);

        let palette = extract_palette(&image, 6).unwrap();
        assert_eq!(
            palette,
            vec![ColorSample {
                r: 120,
                g: 50,
                b: 200,
                hex: "#7832c8".to_string(),
            }]
        );
    }

    #[test]
    fn transparent_pixels_never_count() {
        // Left half opaque red, right half blue just below the alpha cutoff.
        let half = |x: u32| -> [u8; 4] {
            if x < 5 { [200, 0, 0, 255] } else { [0, 0, 200, 127] }
        };
        let image = RasterBuffer::from_fn(10, 10, |x, _| half(x)).unwrap();

        let histogram = ColorHistogram::from_buffer(&image);
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram.count(QuantizedColor::from_rgb(200, 0, 0)), 50);
        assert_eq!(histogram.count(QuantizedColor::from_rgb(0, 0, 200)), 0);

        // Same layout at the working-sample size, so no resampling blends
        // the two halves.
        let image = RasterBuffer::from_fn(100, 100, |x, _| half(x / 10)).unwrap();
        let palette = extract_palette(&image, 10).unwrap();
        let hexes: Vec<&str> = palette.iter().map(|c| c.hex.as_str()).collect();
        assert_eq!(hexes, ["#c80000"]);
    }

    #[test]
    fn fully_transparent_image_gives_empty_palette() {
        let image = RasterBuffer::from_pixel(30, 30, [10, 20, 30, 0]).unwrap();
        assert!(extract_palette(&image, 6).unwrap().is_empty());
    }

    #[test]
    fn ranking_is_by_descending_frequency() {
        // 100x100 source: the working sample is the image itself.
        let image = RasterBuffer::from_fn(100, 100, |x, _| match x {
            0..10 => [10, 10, 10, 255],
            10..40 => [100, 100, 100, 255],
            _ => [200, 200, 200, 255],
        })
        .unwrap();
        let palette = extract_palette(&image, 6).unwrap();
        let hexes: Vec<&str> = palette.iter().map(|c| c.hex.as_str()).collect();
        assert_eq!(hexes, ["#c8c8c8", "#646464", "#0a0a0a"]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        // Row-major scan meets green before red; both cover half the image.
        let image = RasterBuffer::from_fn(100, 100, |x, _| {
            if x < 50 { [0, 200, 0, 255] } else { [200, 0, 0, 255] }
        })
        .unwrap();
        let palette = extract_palette(&image, 2).unwrap();
        assert_eq!(palette[0].hex, "#00c800");
        assert_eq!(palette[1].hex, "#c80000");
    }

    #[test]
    fn max_colors_truncates() {
        let image = RasterBuffer::from_fn(100, 100, |x, y| {
            [(x * 2) as u8, (y * 2) as u8, 0, 255]
        })
        .unwrap();
        assert_eq!(extract_palette(&image, 3).unwrap().len(), 3);
        assert!(extract_palette(&image, 0).unwrap().is_empty());
    }

    #[test]
    fn working_sample_is_always_100_by_100() {
        let image = RasterBuffer::from_pixel(7, 3, [0, 0, 0, 255]).unwrap();
        let histogram = color_histogram(&image).unwrap();
        assert_eq!(histogram.total(), 10_000);
    }

    #[test]
    fn color_sample_serializes_flat() {
        let sample = ColorSample::from(QuantizedColor::from_rgb(10, 20, 30));
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r##"{"r":10,"g":20,"b":30,"hex":"#0a141e"}"##);
    }
}
