//! PackBits run-length codec.

use bytes::Bytes;

use crate::error::DecodeError;

use super::BlockCodec;

/// Codec for PackBits-compressed blocks (compression tag 32773).
///
/// A control byte `n` in 0..=127 is followed by `n + 1` literal bytes;
/// `n` in 129..=255 repeats the next byte `257 - n` times; 128 is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackBitsCodec;

#[async_trait::async_trait]
impl BlockCodec for PackBitsCodec {
    fn decode_block(&self, block: &[u8]) -> Result<Bytes, DecodeError> {
        let mut out = Vec::with_capacity(block.len() * 2);
        let mut pos = 0usize;

        while pos < block.len() {
            let control = block[pos] as i8;
            pos += 1;

            if control >= 0 {
                let count = control as usize + 1;
                let literal = block
                    .get(pos..pos + count)
                    .ok_or(DecodeError::PackBitsTruncated)?;
                out.extend_from_slice(literal);
                pos += count;
            } else if control != -128 {
                let count = (1 - control as isize) as usize;
                let byte = *block.get(pos).ok_or(DecodeError::PackBitsTruncated)?;
                pos += 1;
                out.resize(out.len() + count, byte);
            }
            // -128 is a no-op
        }

        Ok(Bytes::from(out))
    }
}
