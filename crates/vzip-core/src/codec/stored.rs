use crate::Result;

use super::Codec;

/// Identity codec; frames are archived verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoredCodec;

impl Codec for StoredCodec {
    fn name(&self) -> &'static str {
        "stored"
    }

    fn max_encoded_len(&self, input_len: usize) -> usize {
        input_len
    }

    fn encode(&self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(input);
        Ok(())
    }

    fn decode(&self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(input);
        Ok(())
    }
}
