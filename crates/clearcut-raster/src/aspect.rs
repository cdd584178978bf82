//! Nearest supported aspect ratio for segmentation requests.
//!
//! The segmentation service only accepts a fixed set of ratio strings.
//! Requests carry the ratio closest to the source image, with ties going
//! to whichever ratio appears first in [`AspectRatio::ALL`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, RasterError};

/// A ratio accepted by the segmentation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    /// `1:1`
    #[serde(rename = "1:1")]
    Square,
    /// `4:3`
    #[serde(rename = "4:3")]
    Landscape4x3,
    /// `3:4`
    #[serde(rename = "3:4")]
    Portrait3x4,
    /// `16:9`
    #[serde(rename = "16:9")]
    Landscape16x9,
    /// `9:16`
    #[serde(rename = "9:16")]
    Portrait9x16,
}

impl AspectRatio {
    /// Every supported ratio in declaration order. Matching walks this
    /// order, so it also decides ties.
    pub const ALL: [Self; 5] = [
        Self::Square,
        Self::Landscape4x3,
        Self::Portrait3x4,
        Self::Landscape16x9,
        Self::Portrait9x16,
    ];

    /// The identifier string sent to the segmentation service.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape4x3 => "4:3",
            Self::Portrait3x4 => "3:4",
            Self::Landscape16x9 => "16:9",
            Self::Portrait9x16 => "9:16",
        }
    }

    /// Width divided by height.
    #[must_use]
    pub fn value(self) -> f64 {
        match self {
            Self::Square => 1.0,
            Self::Landscape4x3 => 4.0 / 3.0,
            Self::Portrait3x4 => 3.0 / 4.0,
            Self::Landscape16x9 => 16.0 / 9.0,
            Self::Portrait9x16 => 9.0 / 16.0,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AspectRatio {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.id() == s)
            .ok_or_else(|| RasterError::UnknownAspectRatio(s.to_string()))
    }
}

/// Pick the supported ratio closest to `width / height`.
///
/// A candidate replaces the current best only when its distance is
/// strictly smaller, so exact ties keep the earlier-declared ratio.
///
/// # Errors
///
/// Returns [`RasterError::InvalidDimensions`] if either side is zero.
pub fn match_aspect_ratio(width: u32, height: u32) -> Result<AspectRatio, RasterError> {
    let dimensions = Dimensions::new(width, height)?;
    let ratio = f64::from(dimensions.width) / f64::from(dimensions.height);

    let mut best = AspectRatio::ALL[0];
    let mut best_diff = (best.value() - ratio).abs();
    for candidate in &AspectRatio::ALL[1..] {
        let diff = (candidate.value() - ratio).abs();
        if diff < best_diff {
            best = *candidate;
            best_diff = diff;
        }
    }

    log::debug!("aspect ratio for {width}x{height} ({ratio:.4}) -> {best}");
    Ok(best)
}
