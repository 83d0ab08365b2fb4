//! Compression codec adapters.
//!
//! Every strip or tile is an independently compressed block. A [`BlockCodec`]
//! turns one compressed block into raw bytes, either synchronously or
//! asynchronously; the engine asks [`BlockCodec::is_async`] once per image
//! and routes every block of that image through the matching path.
//!
//! Codec selection happens once, from the directory's compression tag:
//! an absent tag or value 1 is raw copy, 5 is LZW, 8 is Deflate, 32773 is
//! PackBits. JPEG (value 6) is recognized and explicitly rejected; anything
//! else is a configuration error.

mod deflate;
mod lzw;
mod packbits;
mod raw;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::descriptor::CompressionMethod;
use crate::error::{DecodeError, FormatError, RasterError};

pub use deflate::DeflateCodec;
pub use lzw::LzwCodec;
pub use packbits::PackBitsCodec;
pub use raw::RawCodec;

/// Uniform interface over the per-block compression algorithms.
///
/// The two decode paths must produce byte-identical output; [`is_async`]
/// declares which one the engine uses for every block of an image. The
/// default async path simply runs the synchronous decode, which is correct
/// for any codec that never suspends.
///
/// [`is_async`]: BlockCodec::is_async
#[async_trait]
pub trait BlockCodec: Send + Sync {
    /// Whether decoding may suspend. Checked once per raster read.
    fn is_async(&self) -> bool {
        false
    }

    /// Decode one compressed block synchronously.
    fn decode_block(&self, block: &[u8]) -> Result<Bytes, DecodeError>;

    /// Decode one compressed block asynchronously.
    async fn decode_block_async(&self, block: Bytes) -> Result<Bytes, DecodeError> {
        self.decode_block(&block)
    }
}

/// Select the codec for an image from its raw compression tag.
pub fn codec_for(compression: Option<u16>) -> Result<Arc<dyn BlockCodec>, RasterError> {
    let method = CompressionMethod::from_tag(compression)?;
    match method {
        CompressionMethod::None => Ok(Arc::new(RawCodec)),
        CompressionMethod::Lzw => Ok(Arc::new(LzwCodec)),
        CompressionMethod::Jpeg => Err(FormatError::JpegCompression.into()),
        CompressionMethod::Deflate => Ok(Arc::new(DeflateCodec)),
        CompressionMethod::PackBits => Ok(Arc::new(PackBitsCodec)),
    }
}

// =============================================================================
// Tests
// =============================================================================
