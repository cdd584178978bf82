//! Integration test: decode a PNG, run each raster operation the way the
//! browser front end chains them, and encode the result.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use clearcut_raster::{
    AspectRatio, RasterBuffer, SelectionTolerance, codec, composite_mask, extract_palette,
    match_aspect_ratio, resample, select_region,
};

/// 64x48 photo stand-in: a white backdrop with an orange disc.
fn subject_png() -> Vec<u8> {
    let image = RasterBuffer::from_fn(64, 48, |x, y| {
        let (dx, dy) = (i64::from(x) - 32, i64::from(y) - 24);
        if dx * dx + dy * dy <= 15 * 15 {
            [240, 120, 20, 255]
        } else {
            [250, 250, 250, 255]
        }
    })
    .unwrap();
    codec::encode_png(&image).unwrap()
}

/// Mask as the segmentation service would return it: half resolution,
/// white subject on black.
fn subject_mask() -> RasterBuffer {
    RasterBuffer::from_fn(32, 24, |x, y| {
        let (dx, dy) = (i64::from(x) - 16, i64::from(y) - 12);
        if dx * dx + dy * dy <= 7 * 7 {
            [255, 255, 255, 255]
        } else {
            [0, 0, 0, 255]
        }
    })
    .unwrap()
}

#[test]
fn segmentation_request_and_mask_compositing() {
    let _ = env_logger::builder().is_test(true).try_init();

    let original = codec::decode(&subject_png()).expect("decode");
    let ratio = match_aspect_ratio(original.width(), original.height()).unwrap();
    assert_eq!(ratio, AspectRatio::Landscape4x3);
    assert_eq!(ratio.id(), "4:3");

    let cutout = composite_mask(&original, &subject_mask()).unwrap();
    assert_eq!(cutout.dimensions(), original.dimensions());

    // Subject center is opaque, backdrop corners are cleared.
    assert_eq!(cutout.pixel(32, 24).unwrap()[3], 255);
    for (x, y) in [(0, 0), (63, 0), (0, 47), (63, 47)] {
        assert_eq!(cutout.pixel(x, y).unwrap()[3], 0, "corner ({x}, {y})");
    }

    let png = codec::encode_png(&cutout).unwrap();
    let round_trip = codec::decode(&png).unwrap();
    assert_eq!(round_trip, cutout);
}

#[test]
fn magic_wand_clears_backdrop_and_keeps_subject() {
    let _ = env_logger::builder().is_test(true).try_init();

    let original = codec::decode(&subject_png()).unwrap();
    let tolerance = SelectionTolerance::DEFAULT;
    let edited = select_region(&original, 0, 0, tolerance).unwrap();

    assert_eq!(edited.pixel(0, 0).unwrap()[3], 0);
    assert_eq!(edited.pixel(63, 47).unwrap()[3], 0);
    assert_eq!(edited.pixel(32, 24).unwrap(), [240, 120, 20, 255]);

    // A second click on the original is independent of the first edit.
    let again = select_region(&original, 32, 24, tolerance).unwrap();
    assert_eq!(again.pixel(0, 0).unwrap()[3], 255);
    assert_eq!(again.pixel(32, 24).unwrap()[3], 0);
}

#[test]
fn resize_then_palette() {
    let original = codec::decode(&subject_png()).unwrap();

    let small = resample(&original, 16, 16).unwrap();
    assert_eq!((small.width(), small.height()), (16, 16));

    let palette = extract_palette(&original, 2).unwrap();
    assert_eq!(palette.len(), 2);
    // The backdrop covers more area than the disc.
    assert_eq!(palette[0].hex, "#fafafa");
    assert_eq!(palette[1].hex, "#f07814");
}
