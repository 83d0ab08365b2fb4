//! LZW codec.
//!
//! TIFF LZW uses MSB-first code packing with 8-bit symbols and the early
//! code-size switch; `weezl` implements exactly this variant.

use bytes::Bytes;

use crate::error::DecodeError;

use super::BlockCodec;

/// Codec for LZW-compressed blocks (compression tag 5).
#[derive(Debug, Clone, Copy, Default)]
pub struct LzwCodec;

#[async_trait::async_trait]
impl BlockCodec for LzwCodec {
    fn decode_block(&self, block: &[u8]) -> Result<Bytes, DecodeError> {
        let mut decoder = weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
        let mut out = Vec::new();
        decoder
            .into_stream(&mut out)
            .decode_all(block)
            .status
            .map_err(|err| DecodeError::Lzw(err.to_string()))?;
        Ok(Bytes::from(out))
    }
}
