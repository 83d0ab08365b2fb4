//! Color space conversions to interleaved 8-bit RGB.
//!
//! Each converter takes the interleaved raster read for its photometric
//! interpretation and produces a `pixels * 3` byte vector. Grayscale values
//! scale linearly so full-scale input maps to 255 exactly; YCbCr uses the
//! ITU-R BT.601 matrix and CIE L*a*b* goes through XYZ under the D65
//! illuminant with sRGB gamma. Out-of-gamut results clamp to 0..=255.

use crate::buffer::RasterBuffer;

#[inline]
fn clamp_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Grayscale where 0 is white; `max_value` is the sample's full-scale value.
pub fn from_white_is_zero(raster: &RasterBuffer, max_value: f64, pixels: usize) -> Vec<u8> {
    let mut rgb = vec![0u8; pixels * 3];
    for i in 0..pixels {
        let value = clamp_u8(255.0 - (raster.get(i) / max_value) * 255.0);
        rgb[i * 3] = value;
        rgb[i * 3 + 1] = value;
        rgb[i * 3 + 2] = value;
    }
    rgb
}

/// Grayscale where 0 is black; `max_value` is the sample's full-scale value.
pub fn from_black_is_zero(raster: &RasterBuffer, max_value: f64, pixels: usize) -> Vec<u8> {
    let mut rgb = vec![0u8; pixels * 3];
    for i in 0..pixels {
        let value = clamp_u8((raster.get(i) / max_value) * 255.0);
        rgb[i * 3] = value;
        rgb[i * 3 + 1] = value;
        rgb[i * 3 + 2] = value;
    }
    rgb
}

/// Palette indices expanded through the color map.
///
/// The map holds `3 * 2^bits` 16-bit entries, all reds first, then greens,
/// then blues; entries scale down to 8 bits. Indices beyond the map produce
/// black rather than a panic, matching lenient reader behavior for short
/// color maps.
pub fn from_palette(raster: &RasterBuffer, color_map: &[u16], pixels: usize) -> Vec<u8> {
    let greens_offset = color_map.len() / 3;
    let blues_offset = greens_offset * 2;
    let mut rgb = vec![0u8; pixels * 3];
    for i in 0..pixels {
        let index = raster.get(i) as usize;
        if index < greens_offset {
            rgb[i * 3] = (color_map[index] >> 8) as u8;
            rgb[i * 3 + 1] = (color_map[greens_offset + index] >> 8) as u8;
            rgb[i * 3 + 2] = (color_map[blues_offset + index] >> 8) as u8;
        }
    }
    rgb
}

/// Four-sample CMYK, 8 bits per sample.
pub fn from_cmyk(raster: &RasterBuffer, pixels: usize) -> Vec<u8> {
    let mut rgb = vec![0u8; pixels * 3];
    for i in 0..pixels {
        let c = raster.get(i * 4);
        let m = raster.get(i * 4 + 1);
        let y = raster.get(i * 4 + 2);
        let k = raster.get(i * 4 + 3);

        rgb[i * 3] = clamp_u8(255.0 * (1.0 - c / 256.0) * (1.0 - k / 256.0));
        rgb[i * 3 + 1] = clamp_u8(255.0 * (1.0 - m / 256.0) * (1.0 - k / 256.0));
        rgb[i * 3 + 2] = clamp_u8(255.0 * (1.0 - y / 256.0) * (1.0 - k / 256.0));
    }
    rgb
}

/// Three-sample YCbCr using the ITU-R BT.601 full-range matrix.
pub fn from_ycbcr(raster: &RasterBuffer, pixels: usize) -> Vec<u8> {
    let mut rgb = vec![0u8; pixels * 3];
    for i in 0..pixels {
        let y = raster.get(i * 3);
        let cb = raster.get(i * 3 + 1);
        let cr = raster.get(i * 3 + 2);

        rgb[i * 3] = clamp_u8(y + 1.402 * (cr - 128.0));
        rgb[i * 3 + 1] = clamp_u8(y - 0.344_14 * (cb - 128.0) - 0.714_14 * (cr - 128.0));
        rgb[i * 3 + 2] = clamp_u8(y + 1.772 * (cb - 128.0));
    }
    rgb
}

// CIE L*a*b* -> XYZ -> sRGB, D65 reference white.
const WHITE_X: f64 = 0.95047;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.08883;

/// Three-sample CIE L*a*b*: L* in 0..=100, a*/b* as signed 8-bit values.
pub fn from_cielab(raster: &RasterBuffer, pixels: usize) -> Vec<u8> {
    let mut rgb = vec![0u8; pixels * 3];
    for i in 0..pixels {
        let l = raster.get(i * 3);
        // a*/b* are stored as unsigned bytes carrying two's-complement values.
        let a = raster.get(i * 3 + 1) as i64 as i8 as f64;
        let b = raster.get(i * 3 + 2) as i64 as i8 as f64;

        let fy = (l + 16.0) / 116.0;
        let fx = a / 500.0 + fy;
        let fz = fy - b / 200.0;

        let finv = |t: f64| {
            let t3 = t * t * t;
            if t3 > 0.008856 {
                t3
            } else {
                (t - 16.0 / 116.0) / 7.787
            }
        };

        let x = WHITE_X * finv(fx);
        let yr = if l > 0.008856 * 903.3 {
            fy * fy * fy
        } else {
            l / 903.3
        };
        let y = WHITE_Y * yr;
        let z = WHITE_Z * finv(fz);

        // XYZ to linear sRGB.
        let r = x * 3.2406 + y * -1.5372 + z * -0.4986;
        let g = x * -0.9689 + y * 1.8758 + z * 0.0415;
        let bl = x * 0.0557 + y * -0.2040 + z * 1.0570;

        let gamma = |c: f64| {
            let c = if c > 0.0031308 {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            } else {
                12.92 * c
            };
            clamp_u8(c * 255.0)
        };

        rgb[i * 3] = gamma(r);
        rgb[i * 3 + 1] = gamma(g);
        rgb[i * 3 + 2] = gamma(bl);
    }
    rgb
}

// =============================================================================
// Tests
// =============================================================================
