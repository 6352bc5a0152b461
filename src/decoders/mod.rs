//! Stream decoder implementations for PDF filters.
//!
//! Only the general purpose filters are decoded:
//! - FlateDecode (zlib/deflate)
//! - LZWDecode
//! - ASCIIHexDecode
//! - ASCII85Decode
//! - RunLengthDecode
//!
//! Image codecs (DCT, JPX, CCITT, JBIG2) are never needed to move pages around and are
//! reported as [`Error::UnsupportedFilter`] if anyone asks for their decoded bytes.
//! Decoders are chained in `/Filter` order, with `/DecodeParms` predictors applied
//! after the filter that declares them.

use crate::error::{Error, Result};

mod ascii85;
mod ascii_hex;
mod flate;
mod lzw;
mod predictor;
mod runlength;

pub use ascii85::Ascii85Decoder;
pub use ascii_hex::AsciiHexDecoder;
pub use flate::{encode_flate, FlateDecoder};
pub use lzw::LzwDecoder;
pub use predictor::{apply_predictor, DecodeParams};
pub use runlength::RunLengthDecoder;

/// Trait for PDF stream decoders.
///
/// Each decoder implements a single filter algorithm.
pub trait StreamDecoder {
    /// Decode the input data.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of this decoder (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

/// Look up the decoder for a filter name, accepting the inline-image abbreviations.
pub fn decoder_for(filter: &str, params: Option<&DecodeParams>) -> Result<Box<dyn StreamDecoder>> {
    let decoder: Box<dyn StreamDecoder> = match filter {
        "FlateDecode" | "Fl" => Box::new(FlateDecoder),
        "LZWDecode" | "LZW" => Box::new(LzwDecoder {
            early_change: params.map_or(true, |p| p.early_change),
        }),
        "ASCIIHexDecode" | "AHx" => Box::new(AsciiHexDecoder),
        "ASCII85Decode" | "A85" => Box::new(Ascii85Decoder),
        "RunLengthDecode" | "RL" => Box::new(RunLengthDecoder),
        other => return Err(Error::UnsupportedFilter(other.to_string())),
    };
    Ok(decoder)
}

/// Decode stream data through a filter pipeline.
///
/// `params` holds one optional parameter set per filter. `max_size` caps the size of every
/// intermediate and final buffer (0 = unlimited).
pub fn decode_stream(
    data: &[u8],
    filters: &[String],
    params: &[Option<DecodeParams>],
    max_size: usize,
) -> Result<Vec<u8>> {
    let mut current = data.to_vec();

    for (i, filter) in filters.iter().enumerate() {
        let filter_params = params.get(i).and_then(Option::as_ref);
        let decoder = decoder_for(filter, filter_params)?;
        current = decoder.decode(&current)?;

        if let Some(p) = filter_params {
            if p.predictor > 1 {
                current = apply_predictor(&current, p)?;
            }
        }

        if max_size > 0 && current.len() > max_size {
            return Err(Error::Decode(format!(
                "{} output of {} bytes exceeds limit of {} bytes",
                decoder.name(),
                current.len(),
                max_size
            )));
        }
    }

    Ok(current)
}
