//! ASCII85Decode (Base85) implementation.
//!
//! Five characters in `!`..=`u` encode four bytes, `z` stands for four zero bytes and
//! `~>` ends the data.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCII85Decode filter implementation.
pub struct Ascii85Decoder;

impl StreamDecoder for Ascii85Decoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() * 4 / 5);
        let mut group = [0u8; 5];
        let mut count = 0usize;

        for &byte in input {
            match byte {
                b'~' => break,
                b'z' if count == 0 => output.extend_from_slice(&[0; 4]),
                b'z' => {
                    return Err(Error::Decode("ASCII85Decode: 'z' inside a group".to_string()))
                },
                b'!'..=b'u' => {
                    group[count] = byte - b'!';
                    count += 1;
                    if count == 5 {
                        output.extend_from_slice(&group_value(&group)?.to_be_bytes());
                        count = 0;
                    }
                },
                _ if crate::lexer::is_whitespace(byte) => {},
                _ => {
                    return Err(Error::Decode(format!(
                        "ASCII85Decode: invalid character '{}'",
                        byte as char
                    )))
                },
            }
        }

        match count {
            0 => {},
            1 => {
                return Err(Error::Decode("ASCII85Decode: dangling single character".to_string()))
            },
            n => {
                // Pad with 'u' and keep n - 1 bytes.
                for slot in group.iter_mut().skip(n) {
                    *slot = b'u' - b'!';
                }
                let bytes = group_value(&group)?.to_be_bytes();
                output.extend_from_slice(&bytes[..n - 1]);
            },
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}

fn group_value(group: &[u8; 5]) -> Result<u32> {
    group
        .iter()
        .try_fold(0u32, |acc, &digit| acc.checked_mul(85)?.checked_add(digit as u32))
        .ok_or_else(|| Error::Decode("ASCII85Decode: group overflows 32 bits".to_string()))
}
