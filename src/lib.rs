//! # geotiff-rasters
//!
//! A windowed raster decoding engine for TIFF/GeoTIFF images.
//!
//! This library turns the already-parsed directory fields of one TIFF image
//! plus its raw bytes into typed pixel buffers. It handles stripped and tiled
//! layouts, chunky and planar sample organization, sub-byte bit-packed
//! samples, horizontal-differencing reversal and conversion of common color
//! spaces to RGB.
//!
//! ## Features
//!
//! - **Windowed reads**: Decodes only the strips/tiles overlapping a pixel
//!   window, with per-band or interleaved output
//! - **Compression support**: Raw, LZW, Deflate and PackBits codecs behind
//!   one trait, extensible with asynchronous codecs
//! - **Arbitrary bit depths**: Unsigned samples at any width up to 32 bits,
//!   byte-aligned signed integers, half/single/double floats
//! - **Block caching**: Decoded blocks are memoized per image, with
//!   concurrent requests for one block coalesced into a single decode
//! - **RGB conversion**: Grayscale, palette, CMYK, YCbCr and CIE L*a*b*
//!   images render to interleaved 8-bit RGB
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`descriptor`] - Parsed directory fields and their validated enums
//! - [`sample`] - Per-sample value extraction, including bit-packed reads
//! - [`codec`] - Block decompression behind the [`codec::BlockCodec`] trait
//! - [`tile`] - Block resolution, decoding and caching
//! - [`buffer`] - Typed output buffers
//! - [`raster`] - Windowed read surface ([`RasterImage`])
//! - [`rgb`] - Color space conversions
//! - [`error`] - Error types for each layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use geotiff_rasters::{ByteOrder, ImageDescriptor, RasterImage, ReadOptions, Window};
//!
//! fn read(descriptor: ImageDescriptor, file: Bytes) -> Result<(), geotiff_rasters::RasterError> {
//!     let image = RasterImage::new(descriptor, file, ByteOrder::LittleEndian, true)?;
//!     let options = ReadOptions::new()
//!         .with_window(Window::new(200, 200, 210, 210))
//!         .with_samples(vec![0, 2]);
//!     let bands = image.read_rasters(&options)?.into_bands().unwrap();
//!     println!("read {} bands of {} pixels", bands.len(), bands[0].len());
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod raster;
pub mod rgb;
pub mod sample;
pub mod tile;

// Re-export commonly used types
pub use buffer::RasterBuffer;
pub use codec::{codec_for, BlockCodec, DeflateCodec, LzwCodec, PackBitsCodec, RawCodec};
pub use descriptor::{
    ByteOrder, CompressionMethod, ImageDescriptor, PhotometricInterpretation, PlanarConfiguration,
    Predictor, SampleFormat,
};
pub use error::{ConfigError, DecodeError, FormatError, RasterError};
pub use raster::{RasterData, RasterImage, ReadOptions, RgbOptions, Window};
pub use sample::SampleReader;
pub use tile::TileStore;
