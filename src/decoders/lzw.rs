//! LZWDecode implementation.
//!
//! PDF LZW is MSB-first with 9 to 12 bit codes, clear code 256 and EOD 257. With the
//! default `/EarlyChange 1` the code width grows one code early, which is the same
//! convention TIFF uses, so weezl's TIFF size switch covers it.

use weezl::decode::Decoder;
use weezl::BitOrder;

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// LZWDecode filter implementation.
pub struct LzwDecoder {
    /// `/EarlyChange` from the decode parameters (default true)
    pub early_change: bool,
}

impl Default for LzwDecoder {
    fn default() -> Self {
        Self { early_change: true }
    }
}

impl StreamDecoder for LzwDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = if self.early_change {
            Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            Decoder::new(BitOrder::Msb, 8)
        };

        decoder
            .decode(input)
            .map_err(|e| Error::Decode(format!("LZWDecode: {:?}", e)))
    }

    fn name(&self) -> &str {
        "LZWDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weezl::encode::Encoder;

    #[test]
    fn test_lzw_roundtrip_early_change() {
        let text = b"-----A---B-----A---B-----A---B";
        let encoded = Encoder::with_tiff_size_switch(BitOrder::Msb, 8)
            .encode(text)
            .unwrap();
        let decoded = LzwDecoder::default().decode(&encoded).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_lzw_without_early_change() {
        let text = b"abababababababab";
        let encoded = Encoder::new(BitOrder::Msb, 8).encode(text).unwrap();
        let decoded = LzwDecoder {
            early_change: false,
        }
        .decode(&encoded)
        .unwrap();
        assert_eq!(decoded, text);
    }
}
