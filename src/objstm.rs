//! Object stream parsing (PDF 1.5+).
//!
//! An object stream (`/Type /ObjStm`) packs several non-stream objects into one
//! compressed stream:
//! ```text
//! 12 0 obj
//! << /Type /ObjStm /N 2 /First 9 /Filter /FlateDecode /Length ... >>
//! stream
//! 4 0 5 12                        % (object number, offset from /First) pairs
//! << /Type /Font ... >> [1 2 3]   % object 4 at offset 0, object 5 at offset 12
//! endstream
//! ```

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef, Stream};
use crate::parser::ObjectParser;
use crate::parser_config::ParserOptions;

/// The decoded contents of one object stream.
#[derive(Debug, Clone, Default)]
pub struct ObjectStream {
    objects: Vec<(u32, Object)>,
}

impl ObjectStream {
    /// Decode `stream` and parse every object it contains.
    ///
    /// `container` is only used in error messages.
    pub fn parse(container: ObjectRef, stream: &Stream, options: &ParserOptions) -> Result<Self> {
        let invalid = |reason: String| Error::parse(0, format!("object stream {}: {}", container, reason));

        if stream.dict.get("Type").and_then(Object::as_name) != Some("ObjStm") {
            return Err(invalid("missing /Type /ObjStm".to_string()));
        }
        let n = stream
            .dict
            .get("N")
            .and_then(Object::as_integer)
            .filter(|n| (0..=1_000_000).contains(n))
            .ok_or_else(|| invalid("missing or invalid /N".to_string()))? as usize;
        let first = stream
            .dict
            .get("First")
            .and_then(Object::as_integer)
            .filter(|f| *f >= 0)
            .ok_or_else(|| invalid("missing or invalid /First".to_string()))? as usize;

        let data = stream.decoded_with_limit(options.max_decompressed_size)?;
        if data.len() < first {
            return Err(invalid(format!(
                "decoded data is {} bytes but /First is {}",
                data.len(),
                first
            )));
        }

        let header = parse_header_pairs(&data[..first], n)
            .ok_or_else(|| invalid(format!("header does not hold {} number pairs", n)))?;

        let mut objects = Vec::with_capacity(n);
        for (number, offset) in header {
            let mut parser =
                ObjectParser::new(data, first + offset).with_max_nesting(options.max_nesting);
            let object = parser.parse_object().map_err(|e| {
                invalid(format!("object {} at offset {}: {}", number, offset, e))
            })?;
            objects.push((number, object));
        }

        log::debug!("Object stream {} holds {} objects", container, objects.len());
        Ok(Self { objects })
    }

    /// Object number `number`, expected at position `index`.
    ///
    /// Falls back to a search when the xref index and the header disagree.
    pub fn get(&self, number: u32, index: usize) -> Option<&Object> {
        match self.objects.get(index) {
            Some((n, obj)) if *n == number => Some(obj),
            _ => self.objects.iter().find(|(n, _)| *n == number).map(|(_, obj)| obj),
        }
    }

    /// Number of objects in the stream.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if the stream holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn parse_header_pairs(header: &[u8], n: usize) -> Option<Vec<(u32, usize)>> {
    let mut rest = header;
    let mut pairs = Vec::with_capacity(n);
    for _ in 0..n {
        let (after, number) = match crate::lexer::token(rest) {
            Ok((after, crate::lexer::Token::Integer(i))) => (after, u32::try_from(i).ok()?),
            _ => return None,
        };
        let (after, offset) = match crate::lexer::token(after) {
            Ok((after, crate::lexer::Token::Integer(i))) => (after, usize::try_from(i).ok()?),
            _ => return None,
        };
        pairs.push((number, offset));
        rest = after;
    }
    Some(pairs)
}
