//! RunLengthDecode implementation.
//!
//! - Length byte 0-127: copy the next N+1 bytes literally
//! - Length byte 128: end of data
//! - Length byte 129-255: repeat the next byte 257-N times

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// RunLengthDecode filter implementation.
pub struct RunLengthDecoder;

impl StreamDecoder for RunLengthDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut rest = input;

        while let Some((&length, tail)) = rest.split_first() {
            match length {
                0..=127 => {
                    let count = length as usize + 1;
                    if tail.len() < count {
                        return Err(Error::Decode(format!(
                            "RunLengthDecode: literal run of {} with {} bytes left",
                            count,
                            tail.len()
                        )));
                    }
                    output.extend_from_slice(&tail[..count]);
                    rest = &tail[count..];
                },
                128 => break,
                129..=255 => {
                    let (&byte, after) = tail.split_first().ok_or_else(|| {
                        Error::Decode("RunLengthDecode: missing byte for run".to_string())
                    })?;
                    output.resize(output.len() + 257 - length as usize, byte);
                    rest = after;
                },
            }
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "RunLengthDecode"
    }
}
