//! FlateDecode (zlib/deflate) implementation.
//!
//! Uses the flate2 crate. Data with a damaged zlib wrapper is retried as raw deflate;
//! anything beyond that is reported as a decode error.

use std::io::{Read, Write};

use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// FlateDecode filter implementation.
pub struct FlateDecoder;

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match ZlibDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => Ok(output),
            Err(zlib_err) => {
                log::debug!("Zlib decode failed ({}), retrying as raw deflate", zlib_err);
                output.clear();
                DeflateDecoder::new(input)
                    .read_to_end(&mut output)
                    .map_err(|_| Error::Decode(format!("FlateDecode: {}", zlib_err)))?;
                Ok(output)
            },
        }
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

/// Compress data with zlib, as written for `/Filter /FlateDecode`.
pub fn encode_flate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
