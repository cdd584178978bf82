//! clearcut-raster: Pure raster pixel-editing engine (sans-IO).
//!
//! Every operation works on an in-memory RGBA [`RasterBuffer`] and
//! returns a new buffer or a derived value:
//!
//! - [`match_aspect_ratio`]: nearest ratio accepted by the segmentation
//!   service
//! - [`composite_mask`]: subject mask into the alpha channel
//! - [`select_region`]: magic-wand flood fill that clears alpha
//! - [`resample`]: full-frame stretch to target dimensions
//! - [`extract_palette`]: frequency-ranked dominant colors
//!
//! The operations hold no shared state and can be called from any
//! thread. Decoding and encoding image files lives in [`codec`] and is
//! only used at the edges (CLI, web worker).

pub mod aspect;
pub mod codec;
pub mod composite;
pub mod palette;
pub mod region;
pub mod resample;
pub mod types;

pub use aspect::{AspectRatio, match_aspect_ratio};
pub use composite::{MASK_NOISE_THRESHOLD, composite_mask};
pub use palette::{
    ColorHistogram, ColorSample, DEFAULT_MAX_COLORS, QuantizedColor, color_histogram,
    extract_palette,
};
pub use region::{
    Bounds, CancelToken, NeverCancel, Selection, SelectionTolerance, select_region,
    select_region_mask, select_region_mask_cancellable,
};
pub use resample::{ResampleFilter, ResizeTarget, resample, resample_with, resized_file_name};
pub use types::{Dimensions, RasterBuffer, RasterError, RgbaImage};
