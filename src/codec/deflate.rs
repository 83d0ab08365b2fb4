//! Deflate (zlib) codec.

use std::io::Read;

use bytes::Bytes;

use crate::error::DecodeError;

use super::BlockCodec;

/// Codec for Deflate-compressed blocks (compression tag 8).
///
/// TIFF Deflate blocks are zlib streams (RFC 1950 wrapper around RFC 1951).
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateCodec;

#[async_trait::async_trait]
impl BlockCodec for DeflateCodec {
    fn decode_block(&self, block: &[u8]) -> Result<Bytes, DecodeError> {
        let mut out = Vec::new();
        flate2::read::ZlibDecoder::new(block)
            .read_to_end(&mut out)
            .map_err(|err| DecodeError::Deflate(err.to_string()))?;
        Ok(Bytes::from(out))
    }
}
