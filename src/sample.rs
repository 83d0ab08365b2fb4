//! Per-sample value extraction from decoded blocks.
//!
//! A [`SampleReader`] is built once per selected sample from the sample's
//! declared format and bit width, and then invoked for every pixel of every
//! block that overlaps the requested window. Unsupported (format, width)
//! pairs are rejected at construction, never during decode.
//!
//! Values are returned as `f64`, which represents every supported sample
//! exactly: integers are at most 32 bits wide and half/single floats widen
//! losslessly.

use half::f16;

use crate::descriptor::{ByteOrder, SampleFormat};
use crate::error::FormatError;

/// Decoder for one sample value at a bit offset within a decoded block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleReader {
    /// Aligned unsigned 8-bit read
    U8,
    /// Aligned endian-aware unsigned 16-bit read
    U16,
    /// Aligned endian-aware unsigned 32-bit read
    U32,
    /// MSB-first bit-by-bit unsigned read at an arbitrary width
    BitPacked { bits: u8 },
    /// Aligned signed 8-bit read
    I8,
    /// Aligned endian-aware signed 16-bit read
    I16,
    /// Aligned endian-aware signed 32-bit read
    I32,
    /// Half-precision float expanded to f64
    F16,
    /// Single-precision float read
    F32,
    /// Double-precision float read
    F64,
}

impl SampleReader {
    /// Build the reader for a (format, bit width) pair.
    ///
    /// Unsigned samples at 8/16/32 bits use aligned reads; any other unsigned
    /// width (1-7, 9-15, ...) goes through the MSB-first bit-packed path, the
    /// on-disk convention for TIFF bit-packed rasters. Signed samples are only
    /// supported at 8/16/32 bits, floats at 16/32/64 bits.
    pub fn new(format: SampleFormat, bits: u8) -> Result<Self, FormatError> {
        match format {
            SampleFormat::Unsigned => match bits {
                8 => Ok(SampleReader::U8),
                16 => Ok(SampleReader::U16),
                32 => Ok(SampleReader::U32),
                1..=31 => Ok(SampleReader::BitPacked { bits }),
                _ => Err(FormatError::UnsupportedSample { format, bits }),
            },
            SampleFormat::Signed => match bits {
                8 => Ok(SampleReader::I8),
                16 => Ok(SampleReader::I16),
                32 => Ok(SampleReader::I32),
                _ => Err(FormatError::SignedBitPacked { bits }),
            },
            SampleFormat::Float => match bits {
                16 => Ok(SampleReader::F16),
                32 => Ok(SampleReader::F32),
                64 => Ok(SampleReader::F64),
                _ => Err(FormatError::UnsupportedSample { format, bits }),
            },
        }
    }

    /// Number of bits this reader consumes per sample.
    pub fn bit_width(&self) -> u8 {
        match *self {
            SampleReader::U8 | SampleReader::I8 => 8,
            SampleReader::U16 | SampleReader::I16 | SampleReader::F16 => 16,
            SampleReader::U32 | SampleReader::I32 | SampleReader::F32 => 32,
            SampleReader::F64 => 64,
            SampleReader::BitPacked { bits } => bits,
        }
    }

    /// Extract one sample value starting at `bit_offset` within `block`.
    ///
    /// Aligned variants read at `bit_offset / 8`; the bit-packed variant
    /// accumulates exactly `bits` bits starting at `bit_offset`,
    /// most-significant-bit first, regardless of byte alignment.
    ///
    /// # Panics
    /// Panics if the block is too short for the read. Callers bound the block
    /// length against the window before extracting (see the raster assembler).
    #[inline]
    pub fn read(&self, block: &[u8], bit_offset: usize, order: ByteOrder) -> f64 {
        let byte = bit_offset / 8;
        match *self {
            SampleReader::U8 => block[byte] as f64,
            SampleReader::U16 => order.read_u16(&block[byte..]) as f64,
            SampleReader::U32 => order.read_u32(&block[byte..]) as f64,
            SampleReader::BitPacked { bits } => {
                let mut value: u32 = 0;
                let mut offset = bit_offset;
                for bit in 0..bits {
                    if block[offset >> 3] & (0x80 >> (offset & 7)) != 0 {
                        value |= 1 << (bits - 1 - bit);
                    }
                    offset += 1;
                }
                value as f64
            }
            SampleReader::I8 => block[byte] as i8 as f64,
            SampleReader::I16 => order.read_i16(&block[byte..]) as f64,
            SampleReader::I32 => order.read_i32(&block[byte..]) as f64,
            SampleReader::F16 => f16::from_bits(order.read_u16(&block[byte..])).to_f64(),
            SampleReader::F32 => order.read_f32(&block[byte..]) as f64,
            SampleReader::F64 => order.read_f64(&block[byte..]),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
