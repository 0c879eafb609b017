use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::{Result, VzipError};

use super::Codec;

/// zlib-wrapped deflate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibCodec {
    level: u32,
}

impl ZlibCodec {
    pub const MAX_LEVEL: u32 = 9;

    /// Creates a codec at `level` (0 = store, 9 = best).
    pub fn new(level: u32) -> Result<Self> {
        if level > Self::MAX_LEVEL {
            return Err(VzipError::CodecError(format!(
                "zlib level {level} is out of range 0..={}",
                Self::MAX_LEVEL
            )));
        }
        Ok(Self { level })
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self {
            level: Self::MAX_LEVEL,
        }
    }
}

impl Codec for ZlibCodec {
    fn name(&self) -> &'static str {
        "zlib"
    }

    // Same bound as zlib's compressBound().
    fn max_encoded_len(&self, input_len: usize) -> usize {
        input_len
            .saturating_add(input_len >> 12)
            .saturating_add(input_len >> 14)
            .saturating_add(input_len >> 25)
            .saturating_add(13)
    }

    fn encode(&self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let mut encoder = ZlibEncoder::new(out, Compression::new(self.level));
        encoder.write_all(input)?;
        encoder.finish()?;
        Ok(())
    }

    fn decode(&self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        ZlibDecoder::new(input)
            .read_to_end(out)
            .map_err(|error| VzipError::CodecError(format!("zlib decode failed: {error}")))?;
        Ok(())
    }
}
