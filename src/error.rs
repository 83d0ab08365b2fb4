use thiserror::Error;

use crate::descriptor::SampleFormat;

/// Errors caused by an image whose directory fields describe a configuration
/// this engine cannot decode.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Compression tag value is not one of the recognized schemes
    #[error("Unknown compression method identifier: {0}")]
    UnknownCompression(u16),

    /// Planar configuration must be 1 (chunky) or 2 (planar)
    #[error("Invalid planar configuration: {0}")]
    InvalidPlanarConfiguration(u16),

    /// All samples of a pixel must share one bit width
    #[error("Differing sample bit widths in a pixel are not supported: {first} vs {other}")]
    MixedBitWidths { first: u8, other: u8 },

    /// The directory declares no samples at all
    #[error("Image declares zero samples per pixel")]
    NoSamples,

    /// `bits_per_sample` must list one width per declared sample
    #[error("Directory lists {bits_listed} sample bit widths for {samples_per_pixel} samples per pixel")]
    SampleCountMismatch {
        samples_per_pixel: usize,
        bits_listed: usize,
    },
}

/// Errors caused by sample formats or color spaces this engine does not
/// implement.
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// JPEG compression is explicitly out of scope
    #[error("JPEG compression is not supported")]
    JpegCompression,

    /// The (sample format, bit width) pair has no reader
    #[error("Unsupported sample format: {format:?} at {bits} bits per sample")]
    UnsupportedSample { format: SampleFormat, bits: u8 },

    /// Signed samples are only readable at byte-aligned widths
    #[error("Signed integers are only supported for 8/16/32 bits per sample, got {bits}")]
    SignedBitPacked { bits: u8 },

    /// Sample format tag value outside 1..=3
    #[error("Unknown sample format identifier: {0}")]
    UnknownSampleFormat(u16),

    /// Photometric interpretation with no RGB conversion
    #[error("Invalid or unsupported photometric interpretation: {0}")]
    UnsupportedPhotometric(u16),

    /// RGB conversion requires a declared photometric interpretation
    #[error("Image does not declare a photometric interpretation")]
    MissingPhotometric,

    /// Palette images require a color map in the directory
    #[error("Palette image is missing its color map")]
    MissingColorMap,

    /// Sample bit width is not a whole number of bytes where one is required
    #[error("Sample bit width of {bits} is not byte-aligned")]
    NotByteAligned { bits: u8 },
}

/// Errors produced while decompressing a single strip or tile block.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// Block byte range points outside the source buffer
    #[error("Block {index} range is out of bounds: offset {offset} + {len} bytes, source is {size}")]
    BlockOutOfBounds {
        index: usize,
        offset: u64,
        len: u64,
        size: usize,
    },

    /// Addressing produced an index with no recorded offset/byte count
    #[error("Block index {index} has no recorded offset (directory lists {count} blocks)")]
    MissingBlock { index: usize, count: usize },

    /// LZW stream is malformed or truncated
    #[error("LZW decode failed: {0}")]
    Lzw(String),

    /// Deflate stream is malformed or truncated
    #[error("Deflate decode failed: {0}")]
    Deflate(String),

    /// PackBits run crosses the end of the block
    #[error("PackBits stream is truncated")]
    PackBitsTruncated,

    /// Decoded block holds fewer bytes than the pixel window needs
    #[error("Decoded block {index} is too short: need {needed} bytes, got {actual}")]
    ShortBlock {
        index: usize,
        needed: usize,
        actual: usize,
    },

    /// A decode task was cancelled or panicked before completing
    #[error("Decode task failed to complete: {0}")]
    TaskFailed(String),
}

/// Top-level error type for the raster reading surface.
#[derive(Debug, Clone, Error)]
pub enum RasterError {
    /// Unsupported image configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unsupported sample format or color space
    #[error("Unsupported format: {0}")]
    Format(#[from] FormatError),

    /// A codec failed to decompress a block; the whole read is aborted
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Requested sample index is not below samples-per-pixel
    #[error("Invalid sample index {index}: image has {samples_per_pixel} samples per pixel")]
    SampleIndexOutOfRange {
        index: usize,
        samples_per_pixel: usize,
    },

    /// Requested window reaches outside the image
    #[error("Selected window [{x0}, {y0}, {x1}, {y1}) is out of image bounds ({width}x{height})")]
    WindowOutOfBounds {
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
        width: u32,
        height: u32,
    },

    /// Requested window is inverted
    #[error("Invalid window subset: [{x0}, {y0}, {x1}, {y1})")]
    InvalidWindow { x0: u32, y0: u32, x1: u32, y1: u32 },

    /// A synchronous read was requested but the codec decodes asynchronously
    #[error("Codec decodes asynchronously; use the async raster reading methods")]
    AsyncCodecRequiresAsyncRead,
}
