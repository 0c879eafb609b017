use lz4_flex::block::{compress_into, decompress_size_prepended, get_maximum_output_size};

use crate::{Result, VzipError};

use super::Codec;

const SIZE_PREFIX: usize = 4;

/// LZ4 block format with a little-endian `u32` uncompressed-size prefix,
/// compatible with `lz4_flex::block::decompress_size_prepended`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn max_encoded_len(&self, input_len: usize) -> usize {
        get_maximum_output_size(input_len).saturating_add(SIZE_PREFIX)
    }

    fn encode(&self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let len = u32::try_from(input.len()).map_err(|_| {
            VzipError::CodecError("lz4 encode failed: input exceeds 32-bit size prefix".into())
        })?;

        let start = out.len();
        out.extend_from_slice(&len.to_le_bytes());
        out.resize(start + self.max_encoded_len(input.len()), 0);

        let written = compress_into(input, &mut out[start + SIZE_PREFIX..])
            .map_err(|error| VzipError::CodecError(format!("lz4 encode failed: {error}")))?;
        out.truncate(start + SIZE_PREFIX + written);
        Ok(())
    }

    fn decode(&self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let decoded = decompress_size_prepended(input)
            .map_err(|error| VzipError::CodecError(format!("lz4 decode failed: {error}")))?;
        out.extend_from_slice(&decoded);
        Ok(())
    }
}
