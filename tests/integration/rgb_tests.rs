//! RGB rendering integration tests.
//!
//! Tests verify:
//! - RGB images pass through untouched
//! - 2-bit palette indices expand through the color map
//! - Grayscale scales into the full 8-bit range in both polarities
//! - Missing or unconvertible photometric interpretations are rejected
//! - The async entry point renders the same bytes

use geotiff_rasters::{FormatError, RasterError, RgbOptions, Window};

use super::test_utils::ImageBuilder;

#[test]
fn rgb_image_passes_through() {
    let builder = ImageBuilder::new(20, 12, 3, 8).tiled(16, 8).photometric(2);
    let image = builder.open();

    let rgb = image.read_rgb(&RgbOptions::new()).unwrap();
    let bytes = rgb.as_u8().unwrap();
    assert_eq!(bytes.len(), 20 * 12 * 3);
    for y in 0..12u32 {
        for x in 0..20u32 {
            for sample in 0..3usize {
                assert_eq!(
                    bytes[((y * 20 + x) as usize) * 3 + sample] as u32,
                    builder.value(x, y, sample),
                    "sample {sample} at ({x}, {y})"
                );
            }
        }
    }
}

#[test]
fn two_bit_palette_expands_through_color_map() {
    // 4-entry map: black, red, green, gray.
    let map: Vec<u16> = vec![
        0x0000, 0xFF00, 0x0000, 0x8080, // reds
        0x0000, 0x0000, 0xFF00, 0x8080, // greens
        0x0000, 0x0000, 0x0000, 0x8080, // blues
    ];
    let builder = ImageBuilder::new(18, 9, 1, 2)
        .tiled(16, 4)
        .photometric(3)
        .color_map(map.clone());
    let image = builder.open();

    // The underlying 2-bit indices land in one u8 band of width * height.
    let bands = image
        .read_rasters(&geotiff_rasters::ReadOptions::new())
        .unwrap()
        .into_bands()
        .unwrap();
    assert_eq!(bands.len(), 1);
    assert_eq!(bands[0].as_u8().unwrap().len(), 18 * 9);

    let rgb = image.read_rgb(&RgbOptions::new()).unwrap();
    let bytes = rgb.as_u8().unwrap();
    assert_eq!(bytes.len(), 18 * 9 * 3);

    let expected = |index: u32, channel: usize| (map[channel * 4 + index as usize] >> 8) as u8;
    for y in 0..9u32 {
        for x in 0..18u32 {
            let index = builder.value(x, y, 0);
            let at = ((y * 18 + x) as usize) * 3;
            assert_eq!(bytes[at], expected(index, 0), "red at ({x}, {y})");
            assert_eq!(bytes[at + 1], expected(index, 1), "green at ({x}, {y})");
            assert_eq!(bytes[at + 2], expected(index, 2), "blue at ({x}, {y})");
        }
    }
}

#[test]
fn palette_without_color_map_is_rejected() {
    let image = ImageBuilder::new(8, 8, 1, 2).photometric(3).open();
    assert!(matches!(
        image.read_rgb(&RgbOptions::new()),
        Err(RasterError::Format(FormatError::MissingColorMap))
    ));
}

#[test]
fn grayscale_black_is_zero_scales_full_range() {
    let builder = ImageBuilder::new(16, 4, 1, 8).photometric(1);
    let image = builder.open();

    let rgb = image.read_rgb(&RgbOptions::new()).unwrap();
    let bytes = rgb.as_u8().unwrap();
    for i in 0..16 * 4usize {
        let value = builder.value((i % 16) as u32, (i / 16) as u32, 0) as u8;
        assert_eq!(bytes[i * 3], value);
        assert_eq!(bytes[i * 3 + 1], value);
        assert_eq!(bytes[i * 3 + 2], value);
    }
}

#[test]
fn grayscale_white_is_zero_inverts() {
    let builder = ImageBuilder::new(16, 4, 1, 8).photometric(0);
    let image = builder.open();

    let rgb = image.read_rgb(&RgbOptions::new()).unwrap();
    let bytes = rgb.as_u8().unwrap();
    for i in 0..16 * 4usize {
        let value = builder.value((i % 16) as u32, (i / 16) as u32, 0) as u8;
        assert_eq!(bytes[i * 3], 255 - value);
    }
}

#[test]
fn windowed_rgb_matches_windowed_raster() {
    let builder = ImageBuilder::new(30, 20, 3, 8).tiled(16, 16).photometric(2);
    let image = builder.open();
    let window = Window::new(4, 3, 25, 17);

    let rgb = image
        .read_rgb(&RgbOptions::new().with_window(window))
        .unwrap();
    let bytes = rgb.as_u8().unwrap();
    assert_eq!(bytes.len(), window.num_pixels() * 3);
    for (wy, y) in (3u32..17).enumerate() {
        for (wx, x) in (4u32..25).enumerate() {
            let at = (wy * 21 + wx) * 3;
            assert_eq!(bytes[at] as u32, builder.value(x, y, 0));
        }
    }
}

#[test]
fn missing_photometric_is_rejected() {
    let image = ImageBuilder::new(8, 8, 3, 8).open();
    assert!(matches!(
        image.read_rgb(&RgbOptions::new()),
        Err(RasterError::Format(FormatError::MissingPhotometric))
    ));
}

#[test]
fn transparency_mask_is_not_convertible() {
    let image = ImageBuilder::new(8, 8, 1, 1).photometric(4).open();
    assert!(matches!(
        image.read_rgb(&RgbOptions::new()),
        Err(RasterError::Format(FormatError::UnsupportedPhotometric(4)))
    ));
}

#[tokio::test]
async fn async_rgb_matches_sync() {
    let builder = ImageBuilder::new(24, 16, 3, 8).tiled(16, 16).photometric(2);
    let image = builder.open();

    let sync = image.read_rgb(&RgbOptions::new()).unwrap();
    let through_async = image.read_rgb_async(&RgbOptions::new()).await.unwrap();
    assert_eq!(sync, through_async);
}
