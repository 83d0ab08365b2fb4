//! Pass-through codec for uncompressed blocks.

use bytes::Bytes;

use crate::error::DecodeError;

use super::BlockCodec;

/// Codec for images with no compression: the block bytes are the raster bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

#[async_trait::async_trait]
impl BlockCodec for RawCodec {
    fn decode_block(&self, block: &[u8]) -> Result<Bytes, DecodeError> {
        Ok(Bytes::copy_from_slice(block))
    }
}
