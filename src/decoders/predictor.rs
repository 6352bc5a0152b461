//! Predictor post-processing for FlateDecode and LZWDecode.
//!
//! Cross-reference streams are almost always written with PNG Up prediction
//! (`/Predictor 12`), so this path is exercised by ordinary PDF 1.5 files.

use crate::error::{Error, Result};
use crate::object::Dictionary;

/// Decode parameters for stream decoders.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Number of samples per row
    pub columns: usize,
    /// Color components per sample
    pub colors: usize,
    /// Bits per color component
    pub bits_per_component: usize,
    /// LZW `/EarlyChange`
    pub early_change: bool,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
            early_change: true,
        }
    }
}

impl DecodeParams {
    /// Read parameters from a `/DecodeParms` dictionary, defaulting missing entries.
    pub fn from_dict(dict: &Dictionary) -> Self {
        let int = |key: &str, default: i64| {
            dict.get(key).and_then(|obj| obj.as_integer()).unwrap_or(default)
        };

        Self {
            predictor: int("Predictor", 1),
            columns: int("Columns", 1).max(1) as usize,
            colors: int("Colors", 1).max(1) as usize,
            bits_per_component: int("BitsPerComponent", 8).max(1) as usize,
            early_change: int("EarlyChange", 1) != 0,
        }
    }

    /// Bytes of sample data in one row.
    pub fn row_bytes(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Bytes per complete pixel, at least 1.
    pub fn pixel_bytes(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Undo the predictor named in `params`.
pub fn apply_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => undo_tiff(data, params),
        10..=15 => undo_png(data, params),
        other => Err(Error::Decode(format!("Unsupported predictor: {}", other))),
    }
}

fn undo_tiff(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::Decode(format!(
            "TIFF predictor with {} bits per component",
            params.bits_per_component
        )));
    }
    let row = params.row_bytes();
    let bpp = params.pixel_bytes();
    let mut output = data.to_vec();

    for line in output.chunks_mut(row) {
        for i in bpp..line.len() {
            line[i] = line[i].wrapping_add(line[i - bpp]);
        }
    }
    Ok(output)
}

fn undo_png(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row = params.row_bytes();
    let bpp = params.pixel_bytes();
    let stride = row + 1;

    if data.len() % stride != 0 {
        // A short final row is tolerated; anything else is not PNG-predicted data.
        log::debug!("PNG predictor data of {} bytes is not a multiple of {}", data.len(), stride);
    }

    let mut output = Vec::with_capacity(data.len() / stride * row);
    let mut previous = vec![0u8; row];

    for chunk in data.chunks(stride) {
        let (&tag, encoded) = chunk
            .split_first()
            .ok_or_else(|| Error::Decode("PNG predictor: empty row".to_string()))?;
        let mut current = encoded.to_vec();

        for i in 0..current.len() {
            let left = if i >= bpp { current[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(Error::Decode(format!("PNG predictor: invalid row tag {}", other)))
                },
            };
            current[i] = current[i].wrapping_add(predicted);
        }

        output.extend_from_slice(&current);
        previous[..current.len()].copy_from_slice(&current);
    }

    Ok(output)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
