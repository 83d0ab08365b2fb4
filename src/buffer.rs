//! Typed output buffers for assembled rasters.
//!
//! Each band is decoded into a buffer whose element type is chosen from the
//! sample's declared format and bit width, so an unsigned 12-bit band lands
//! in `u16` cells and a half-float band widens into `f32` cells. Interleaved
//! reads use a single buffer typed by the widest format and bit width across
//! the selected samples.

use crate::descriptor::SampleFormat;
use crate::error::FormatError;

/// One pre-sized output buffer of a concrete element type.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl RasterBuffer {
    /// Allocate a zeroed buffer of `len` cells for a (format, bit width) pair.
    ///
    /// Unsigned widths round up to the containing 8/16/32-bit cell, signed
    /// likewise; 16-bit floats widen into `f32` cells. Pairs with no cell
    /// type are an unsupported-format error.
    pub fn for_sample(format: SampleFormat, bits: u8, len: usize) -> Result<Self, FormatError> {
        match format {
            SampleFormat::Unsigned => match bits {
                1..=8 => Ok(RasterBuffer::U8(vec![0; len])),
                9..=16 => Ok(RasterBuffer::U16(vec![0; len])),
                17..=32 => Ok(RasterBuffer::U32(vec![0; len])),
                _ => Err(FormatError::UnsupportedSample { format, bits }),
            },
            SampleFormat::Signed => match bits {
                1..=8 => Ok(RasterBuffer::I8(vec![0; len])),
                9..=16 => Ok(RasterBuffer::I16(vec![0; len])),
                17..=32 => Ok(RasterBuffer::I32(vec![0; len])),
                _ => Err(FormatError::UnsupportedSample { format, bits }),
            },
            SampleFormat::Float => match bits {
                16 | 32 => Ok(RasterBuffer::F32(vec![0.0; len])),
                64 => Ok(RasterBuffer::F64(vec![0.0; len])),
                _ => Err(FormatError::UnsupportedSample { format, bits }),
            },
        }
    }

    /// Number of cells in the buffer.
    pub fn len(&self) -> usize {
        match self {
            RasterBuffer::U8(v) => v.len(),
            RasterBuffer::U16(v) => v.len(),
            RasterBuffer::U32(v) => v.len(),
            RasterBuffer::I8(v) => v.len(),
            RasterBuffer::I16(v) => v.len(),
            RasterBuffer::I32(v) => v.len(),
            RasterBuffer::F32(v) => v.len(),
            RasterBuffer::F64(v) => v.len(),
        }
    }

    /// Whether the buffer has zero cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a value, converting into the cell type.
    #[inline]
    pub fn set(&mut self, index: usize, value: f64) {
        match self {
            RasterBuffer::U8(v) => v[index] = value as u8,
            RasterBuffer::U16(v) => v[index] = value as u16,
            RasterBuffer::U32(v) => v[index] = value as u32,
            RasterBuffer::I8(v) => v[index] = value as i8,
            RasterBuffer::I16(v) => v[index] = value as i16,
            RasterBuffer::I32(v) => v[index] = value as i32,
            RasterBuffer::F32(v) => v[index] = value as f32,
            RasterBuffer::F64(v) => v[index] = value,
        }
    }

    /// Read a cell back as `f64`.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        match self {
            RasterBuffer::U8(v) => v[index] as f64,
            RasterBuffer::U16(v) => v[index] as f64,
            RasterBuffer::U32(v) => v[index] as f64,
            RasterBuffer::I8(v) => v[index] as f64,
            RasterBuffer::I16(v) => v[index] as f64,
            RasterBuffer::I32(v) => v[index] as f64,
            RasterBuffer::F32(v) => v[index] as f64,
            RasterBuffer::F64(v) => v[index],
        }
    }

    /// Accumulate the cell at `prev` into the cell at `index`, wrapping in
    /// the cell's native integer width. This is the horizontal-differencing
    /// reversal step: the differenced value was stored first, then the
    /// previous column's final value is added in.
    #[inline]
    pub fn accumulate_prev(&mut self, index: usize, prev: usize) {
        match self {
            RasterBuffer::U8(v) => v[index] = v[index].wrapping_add(v[prev]),
            RasterBuffer::U16(v) => v[index] = v[index].wrapping_add(v[prev]),
            RasterBuffer::U32(v) => v[index] = v[index].wrapping_add(v[prev]),
            RasterBuffer::I8(v) => v[index] = v[index].wrapping_add(v[prev]),
            RasterBuffer::I16(v) => v[index] = v[index].wrapping_add(v[prev]),
            RasterBuffer::I32(v) => v[index] = v[index].wrapping_add(v[prev]),
            RasterBuffer::F32(v) => v[index] += v[prev],
            RasterBuffer::F64(v) => v[index] += v[prev],
        }
    }

    /// View the cells as `u8`, when that is the cell type.
    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            RasterBuffer::U8(v) => Some(v),
            _ => None,
        }
    }

    /// View the cells as `u16`, when that is the cell type.
    pub fn as_u16(&self) -> Option<&[u16]> {
        match self {
            RasterBuffer::U16(v) => Some(v),
            _ => None,
        }
    }

    /// View the cells as `u32`, when that is the cell type.
    pub fn as_u32(&self) -> Option<&[u32]> {
        match self {
            RasterBuffer::U32(v) => Some(v),
            _ => None,
        }
    }

    /// View the cells as `i16`, when that is the cell type.
    pub fn as_i16(&self) -> Option<&[i16]> {
        match self {
            RasterBuffer::I16(v) => Some(v),
            _ => None,
        }
    }

    /// View the cells as `f32`, when that is the cell type.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            RasterBuffer::F32(v) => Some(v),
            _ => None,
        }
    }

    /// View the cells as `f64`, when that is the cell type.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            RasterBuffer::F64(v) => Some(v),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
