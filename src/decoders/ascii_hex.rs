//! ASCIIHexDecode implementation.
//!
//! Pairs of hex digits become bytes, whitespace is ignored, `>` ends the data and an odd
//! final digit is padded with 0.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCIIHexDecode filter implementation.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        let mut high: Option<u8> = None;

        for &byte in input {
            if byte == b'>' {
                break;
            }
            if crate::lexer::is_whitespace(byte) {
                continue;
            }
            let nibble = (byte as char).to_digit(16).ok_or_else(|| {
                Error::Decode(format!("ASCIIHexDecode: invalid character '{}'", byte as char))
            })? as u8;

            match high.take() {
                Some(h) => output.push((h << 4) | nibble),
                None => high = Some(nibble),
            }
        }

        if let Some(h) = high {
            output.push(h << 4);
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_with_whitespace_and_eod() {
        let out = AsciiHexDecoder.decode(b"48 65\n6C6c 6F>ignored").unwrap();
        assert_eq!(out, b"Hello");
    }

    #[test]
    fn test_hex_odd_digit() {
        assert_eq!(AsciiHexDecoder.decode(b"7>").unwrap(), vec![0x70]);
    }

    #[test]
    fn test_hex_invalid() {
        assert!(AsciiHexDecoder.decode(b"4G").is_err());
    }
}
