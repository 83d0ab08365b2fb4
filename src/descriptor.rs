//! Parsed image directory fields consumed by the raster engine.
//!
//! The container/tag parser that produces these fields lives outside this
//! crate. An [`ImageDescriptor`] carries the already-parsed values exactly as
//! they appear in the file directory: optional tags stay `Option`, numeric
//! tag values stay raw `u16` codes. Validation into the closed enums below
//! happens once, when a [`crate::RasterImage`] is constructed.
//!
//! # Strips vs tiles
//!
//! The engine is uniform over stripped and tiled images. For stripped images
//! the caller maps `tile_width = width` and `tile_height = rows_per_strip`,
//! and `block_offsets`/`block_byte_counts` come from the strip tags instead
//! of the tile tags.

use crate::error::{ConfigError, FormatError};

// =============================================================================
// Byte Order
// =============================================================================

/// Byte order of the source file, declared by the TIFF header magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 2 bytes.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes([bytes[0], bytes[1]]),
            ByteOrder::BigEndian => u16::from_be_bytes([bytes[0], bytes[1]]),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 4 bytes.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            }
            ByteOrder::BigEndian => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 8 bytes.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
            ByteOrder::BigEndian => u64::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }

    /// Read an i16 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 2 bytes.
    #[inline]
    pub fn read_i16(self, bytes: &[u8]) -> i16 {
        self.read_u16(bytes) as i16
    }

    /// Read an i32 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 4 bytes.
    #[inline]
    pub fn read_i32(self, bytes: &[u8]) -> i32 {
        self.read_u32(bytes) as i32
    }

    /// Read an f32 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 4 bytes.
    #[inline]
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }

    /// Read an f64 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 8 bytes.
    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }
}

// =============================================================================
// Directory Value Enums
// =============================================================================

/// How the samples of one pixel are laid out across blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PlanarConfiguration {
    /// Samples interleaved within one tile
    Chunky = 1,
    /// Each sample stored in its own sequence of tiles
    Planar = 2,
}

impl PlanarConfiguration {
    /// Validate a raw tag value. The tag is optional and defaults to chunky;
    /// any value other than 1 or 2 is a configuration error.
    pub fn from_tag(value: Option<u16>) -> Result<Self, ConfigError> {
        match value {
            None | Some(1) => Ok(PlanarConfiguration::Chunky),
            Some(2) => Ok(PlanarConfiguration::Planar),
            Some(other) => Err(ConfigError::InvalidPlanarConfiguration(other)),
        }
    }
}

/// Pre-compression transform applied to sample values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Predictor {
    /// Samples stored as absolute values
    None = 1,
    /// Samples stored as differences from the previous column in the row
    HorizontalDifferencing = 2,
}

impl Predictor {
    /// Interpret a raw tag value; absent or unrecognized values fall back to
    /// no prediction, matching common reader behavior for this tag.
    pub fn from_tag(value: Option<u16>) -> Self {
        match value {
            Some(2) => Predictor::HorizontalDifferencing,
            _ => Predictor::None,
        }
    }
}

/// Numeric kind of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum SampleFormat {
    /// Unsigned integer data
    Unsigned = 1,
    /// Two's-complement signed integer data
    Signed = 2,
    /// IEEE floating point data
    Float = 3,
}

impl SampleFormat {
    /// Validate a raw tag value.
    pub fn from_tag(value: u16) -> Result<Self, FormatError> {
        match value {
            1 => Ok(SampleFormat::Unsigned),
            2 => Ok(SampleFormat::Signed),
            3 => Ok(SampleFormat::Float),
            other => Err(FormatError::UnknownSampleFormat(other)),
        }
    }
}

/// TIFF compression scheme identifiers recognized by this engine.
///
/// JPEG (value 6) is recognized but explicitly unsupported; any other
/// unlisted value is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CompressionMethod {
    /// No compression
    None = 1,
    /// LZW compression
    Lzw = 5,
    /// "Old-style" JPEG (explicitly unsupported)
    Jpeg = 6,
    /// Deflate/zlib compression
    Deflate = 8,
    /// PackBits run-length encoding
    PackBits = 32773,
}

impl CompressionMethod {
    /// Validate a raw tag value. An absent tag means uncompressed.
    pub fn from_tag(value: Option<u16>) -> Result<Self, ConfigError> {
        match value {
            None | Some(1) => Ok(CompressionMethod::None),
            Some(5) => Ok(CompressionMethod::Lzw),
            Some(6) => Ok(CompressionMethod::Jpeg),
            Some(8) => Ok(CompressionMethod::Deflate),
            Some(32773) => Ok(CompressionMethod::PackBits),
            Some(other) => Err(ConfigError::UnknownCompression(other)),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(self) -> &'static str {
        match self {
            CompressionMethod::None => "None",
            CompressionMethod::Lzw => "LZW",
            CompressionMethod::Jpeg => "JPEG",
            CompressionMethod::Deflate => "Deflate",
            CompressionMethod::PackBits => "PackBits",
        }
    }
}

/// How sample values map to visual color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PhotometricInterpretation {
    /// Grayscale, 0 is white
    WhiteIsZero = 0,
    /// Grayscale, 0 is black
    BlackIsZero = 1,
    /// Samples are already RGB
    Rgb = 2,
    /// One index sample expanded through a color map
    Palette = 3,
    /// Transparency mask (recognized, not convertible to RGB)
    TransparencyMask = 4,
    /// Four-sample CMYK
    Cmyk = 5,
    /// Three-sample YCbCr
    YCbCr = 6,
    /// Three-sample CIE L*a*b*
    CieLab = 8,
}

impl PhotometricInterpretation {
    /// Validate a raw tag value.
    pub fn from_tag(value: u16) -> Result<Self, FormatError> {
        match value {
            0 => Ok(PhotometricInterpretation::WhiteIsZero),
            1 => Ok(PhotometricInterpretation::BlackIsZero),
            2 => Ok(PhotometricInterpretation::Rgb),
            3 => Ok(PhotometricInterpretation::Palette),
            4 => Ok(PhotometricInterpretation::TransparencyMask),
            5 => Ok(PhotometricInterpretation::Cmyk),
            6 => Ok(PhotometricInterpretation::YCbCr),
            8 => Ok(PhotometricInterpretation::CieLab),
            other => Err(FormatError::UnsupportedPhotometric(other)),
        }
    }
}

// =============================================================================
// Image Descriptor
// =============================================================================

/// Already-parsed directory fields for one image, as handed over by the
/// container parser. Optional tags are `Option`; enum-valued tags stay raw
/// `u16` and are validated when the image is opened.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    /// Pixel width of the full image
    pub width: u32,
    /// Pixel height of the full image
    pub height: u32,
    /// Width of one decoding unit; equals `width` for stripped images
    pub tile_width: u32,
    /// Height of one decoding unit; equals rows-per-strip for stripped images
    pub tile_height: u32,
    /// Number of bands
    pub samples_per_pixel: usize,
    /// Bit width per sample index; values need not be multiples of 8
    pub bits_per_sample: Vec<u8>,
    /// Per-sample numeric kind; absent means unsigned for all samples
    pub sample_format: Option<Vec<u16>>,
    /// Raw planar configuration tag, if present
    pub planar_configuration: Option<u16>,
    /// Raw compression tag, if present
    pub compression: Option<u16>,
    /// Raw predictor tag, if present
    pub predictor: Option<u16>,
    /// Raw photometric interpretation tag, if present
    pub photometric_interpretation: Option<u16>,
    /// Palette color map: 3 * 2^bits 16-bit entries, reds then greens then blues
    pub color_map: Option<Vec<u16>>,
    /// Per-block byte offset into the source, indexed by the addressing rule
    pub block_offsets: Vec<u64>,
    /// Per-block byte count, indexed like `block_offsets`
    pub block_byte_counts: Vec<u64>,
}

impl ImageDescriptor {
    /// Number of tile columns spanning the image width.
    #[inline]
    pub fn tiles_per_row(&self) -> u32 {
        self.width.div_ceil(self.tile_width)
    }

    /// Number of tile rows spanning the image height.
    #[inline]
    pub fn tiles_per_col(&self) -> u32 {
        self.height.div_ceil(self.tile_height)
    }

    /// Bit width of the given sample.
    pub fn sample_bit_width(&self, index: usize) -> Result<u8, crate::error::RasterError> {
        self.bits_per_sample.get(index).copied().ok_or(
            crate::error::RasterError::SampleIndexOutOfRange {
                index,
                samples_per_pixel: self.samples_per_pixel,
            },
        )
    }

    /// Byte width of the given sample; errors when the sample is bit-packed.
    pub fn sample_byte_width(&self, index: usize) -> Result<u8, crate::error::RasterError> {
        let bits = self.sample_bit_width(index)?;
        if bits % 8 != 0 {
            return Err(FormatError::NotByteAligned { bits }.into());
        }
        Ok(bits / 8)
    }

    /// Raw sample format value for the given sample (default: unsigned).
    pub fn sample_format_tag(&self, index: usize) -> u16 {
        self.sample_format
            .as_ref()
            .and_then(|formats| formats.get(index).copied())
            .unwrap_or(SampleFormat::Unsigned as u16)
    }

    /// Sum of all sample bit widths: the storage stride of one chunky pixel.
    #[inline]
    pub fn bits_per_pixel(&self) -> usize {
        self.bits_per_sample.iter().map(|&b| b as usize).sum()
    }
}

// =============================================================================
// Tests
// =============================================================================
