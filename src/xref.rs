//! Cross-reference parsing.
//!
//! The xref data maps object numbers to byte offsets (or to a slot in an object
//! stream). Both forms are supported:
//! - classic tables (`xref` keyword, `trailer` dictionary), PDF 1.0-1.4
//! - cross-reference streams (`/Type /XRef`), PDF 1.5+
//!
//! Incrementally updated files carry several sections chained through `/Prev`. Sections
//! are read newest first and older entries never override newer ones.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::lexer::{self, Token};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::parser::ObjectParser;
use crate::parser_config::ParserOptions;

/// Cross-reference table entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntryType {
    /// Entry for a free object
    Free,
    /// Object stored directly in the file
    Uncompressed,
    /// Object stored inside an object stream (PDF 1.5+)
    Compressed,
}

/// Cross-reference table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    /// Type of entry
    pub entry_type: XRefEntryType,
    /// Byte offset (uncompressed) or object stream number (compressed)
    pub offset: u64,
    /// Generation number (uncompressed) or index within the object stream (compressed)
    pub generation: u32,
}

impl XRefEntry {
    /// Entry for an object at a byte offset.
    pub fn uncompressed(offset: u64, generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Uncompressed,
            offset,
            generation: generation as u32,
        }
    }

    /// Entry for object number `index` inside object stream `stream`.
    pub fn compressed(stream: u32, index: u32) -> Self {
        Self {
            entry_type: XRefEntryType::Compressed,
            offset: stream as u64,
            generation: index,
        }
    }

    /// Free entry.
    pub fn free(generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Free,
            offset: 0,
            generation: generation as u32,
        }
    }

    /// True for uncompressed and compressed entries.
    pub fn in_use(&self) -> bool {
        self.entry_type != XRefEntryType::Free
    }
}

/// Cross-reference data of a whole file, all sections merged.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: HashMap<u32, XRefEntry>,
    trailer: Dictionary,
}

impl CrossRefTable {
    /// Create a new empty cross-reference table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an entry.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Get an entry by object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Entry for `reference` if it is in use with a matching generation.
    ///
    /// Compressed objects always have generation 0.
    pub fn lookup(&self, reference: ObjectRef) -> Option<&XRefEntry> {
        let entry = self.entries.get(&reference.id)?;
        match entry.entry_type {
            XRefEntryType::Free => None,
            XRefEntryType::Uncompressed if entry.generation != reference.gen as u32 => None,
            XRefEntryType::Compressed if reference.gen != 0 => None,
            _ => Some(entry),
        }
    }

    /// Merged trailer dictionary. Newer sections win key by key.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Merge an older section into this one.
    ///
    /// Entries (and trailer keys) already present are kept, so the newest definition of
    /// each object wins.
    pub fn merge_from(&mut self, older: CrossRefTable) {
        for (obj_num, entry) in older.entries {
            self.entries.entry(obj_num).or_insert(entry);
        }
        for (key, value) in older.trailer {
            self.trailer.entry(key).or_insert(value);
        }
    }

    /// Get the number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the offset recorded after the last `startxref` keyword.
///
/// The search runs backwards over the whole buffer, so trailing garbage after `%%EOF`
/// is tolerated.
pub fn find_startxref(data: &[u8]) -> Result<usize> {
    const KEYWORD: &[u8] = b"startxref";

    let pos = data
        .windows(KEYWORD.len())
        .rposition(|w| w == KEYWORD)
        .ok_or_else(|| Error::MalformedTrailer("no startxref keyword found".to_string()))?;

    match lexer::token(&data[pos + KEYWORD.len()..]) {
        Ok((_, Token::Integer(offset))) if offset >= 0 => Ok(offset as usize),
        _ => Err(Error::MalformedTrailer(format!(
            "startxref at byte {} is not followed by an offset",
            pos
        ))),
    }
}

/// Read every cross-reference section reachable from `start`, newest first.
///
/// `base` is added to every offset; it is the position of the `%PDF-` header, which
/// is non-zero when junk precedes the header.
pub fn parse_xref_chain(
    data: &[u8],
    start: usize,
    base: usize,
    options: &ParserOptions,
) -> Result<CrossRefTable> {
    let mut merged = CrossRefTable::new();
    let mut visited = HashSet::new();
    let mut next = Some(start);

    while let Some(offset) = next.take() {
        if !visited.insert(offset) {
            return Err(Error::MalformedTrailer(format!(
                "/Prev chain loops back to offset {}",
                offset
            )));
        }
        if visited.len() > options.max_xref_sections {
            return Err(Error::MalformedTrailer(format!(
                "more than {} cross-reference sections",
                options.max_xref_sections
            )));
        }

        let mut section = parse_section(data, offset + base, options)?;
        log::debug!(
            "Read xref section at {} with {} entries",
            offset,
            section.entries.len()
        );

        // Hybrid-reference file: the classic section points at an xref stream holding
        // the compressed objects. Its entries fill in what the table leaves free.
        if let Some(stm_offset) = section.trailer.get("XRefStm").and_then(Object::as_integer) {
            let stream_section = parse_section(data, stm_offset as usize + base, options)?;
            for (num, entry) in stream_section.entries {
                let fill = section.entries.get(&num).map_or(true, |e| !e.in_use());
                if fill {
                    section.entries.insert(num, entry);
                }
            }
        }

        next = match section.trailer.get("Prev") {
            Some(Object::Integer(prev)) if *prev >= 0 => Some(*prev as usize),
            Some(other) => {
                return Err(Error::MalformedTrailer(format!(
                    "/Prev is a {}",
                    other.type_name()
                )))
            },
            None => None,
        };

        merged.merge_from(section);
    }

    if !merged.trailer.contains_key("Root") {
        return Err(Error::MalformedTrailer("trailer has no /Root".to_string()));
    }

    Ok(merged)
}

/// Parse one section (table or stream) at an absolute offset.
fn parse_section(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let at = data.get(offset..).ok_or_else(|| {
        Error::MalformedTrailer(format!("xref offset {} is past end of file", offset))
    })?;

    if lexer::peek_keyword(at, b"xref") {
        parse_classic_section(data, offset, options)
    } else {
        parse_stream_section(data, offset, options)
    }
}

/// Parse a classic table plus the trailer dictionary that follows it.
///
/// ```text
/// xref
/// 0 3
/// 0000000000 65535 f
/// 0000000018 00000 n
/// 0000000077 00000 n
/// trailer
/// << /Size 3 /Root 1 0 R >>
/// ```
fn parse_classic_section(
    data: &[u8],
    offset: usize,
    options: &ParserOptions,
) -> Result<CrossRefTable> {
    let malformed = |what: &str| Error::MalformedTrailer(format!("{} in xref at {}", what, offset));

    let mut parser = ObjectParser::new(data, offset).with_max_nesting(options.max_nesting);
    parser.expect_keyword(b"xref").map_err(|_| malformed("missing xref keyword"))?;

    let mut section = CrossRefTable::new();
    let mut rest = &data[parser.position()..];

    loop {
        if lexer::peek_keyword(rest, b"trailer") {
            break;
        }

        let (after, first) = int_token(rest).ok_or_else(|| malformed("bad subsection header"))?;
        let (after, count) = int_token(after).ok_or_else(|| malformed("bad subsection header"))?;
        rest = after;

        let (first, count) =
            subsection(first, count).ok_or_else(|| malformed("subsection out of range"))?;
        for i in 0..count {
            let (after, entry_offset) =
                int_token(rest).ok_or_else(|| malformed("truncated entry"))?;
            let (after, generation) = int_token(after).ok_or_else(|| malformed("truncated entry"))?;
            let (after, kind) = match lexer::token(after) {
                Ok((after, Token::Keyword(k))) => (after, k),
                _ => return Err(malformed("entry without n/f flag")),
            };
            rest = after;

            let generation = u16::try_from(generation).unwrap_or(u16::MAX);
            let entry = match kind {
                b"n" => XRefEntry::uncompressed(entry_offset.max(0) as u64, generation),
                b"f" => XRefEntry::free(generation),
                _ => return Err(malformed("entry flag is not n or f")),
            };
            section.entries.insert(first + i, entry);
        }
    }

    let trailer_pos = data.len() - rest.len();
    let mut parser = ObjectParser::new(data, trailer_pos).with_max_nesting(options.max_nesting);
    parser.expect_keyword(b"trailer")?;
    section.trailer = match parser.parse_object() {
        Ok(Object::Dictionary(dict)) => dict,
        Ok(other) => {
            return Err(Error::MalformedTrailer(format!(
                "trailer is a {}",
                other.type_name()
            )))
        },
        Err(e) => return Err(Error::MalformedTrailer(format!("unreadable trailer: {}", e))),
    };

    Ok(section)
}

fn int_token(input: &[u8]) -> Option<(&[u8], i64)> {
    match lexer::token(input) {
        Ok((rest, Token::Integer(i))) => Some((rest, i)),
        _ => None,
    }
}

/// Parse a cross-reference stream object at `offset`.
fn parse_stream_section(
    data: &[u8],
    offset: usize,
    options: &ParserOptions,
) -> Result<CrossRefTable> {
    let mut parser = ObjectParser::new(data, offset).with_max_nesting(options.max_nesting);
    let mut no_indirect_length = |r: ObjectRef| -> Result<i64> {
        Err(Error::MalformedTrailer(format!(
            "xref stream /Length must be direct, found {}",
            r
        )))
    };
    let (reference, object) = parser
        .parse_indirect_object(&mut no_indirect_length, options.allow_missing_endobj)
        .map_err(|e| match e {
            Error::ParseError { .. } => Error::MalformedTrailer(format!(
                "no xref table or xref stream at offset {}: {}",
                offset, e
            )),
            other => other,
        })?;

    let stream = match object {
        Object::Stream(stream) if stream.dict.get("Type").and_then(Object::as_name) == Some("XRef") => {
            stream
        },
        other => {
            return Err(Error::MalformedTrailer(format!(
                "object {} at xref offset {} is a {}, not an xref stream",
                reference,
                offset,
                other.type_name()
            )))
        },
    };

    let dict = &stream.dict;
    let widths: Vec<usize> = dict
        .get("W")
        .and_then(Object::as_array)
        .map(|w| w.iter().filter_map(Object::as_integer).map(|v| v.max(0) as usize).collect())
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|&w| w > 8) {
        return Err(Error::MalformedTrailer(format!("xref stream {} has bad /W", reference)));
    }

    let size = dict.get("Size").and_then(Object::as_integer).ok_or_else(|| {
        Error::MalformedTrailer(format!("xref stream {} has no /Size", reference))
    })?;
    let out_of_range =
        || Error::MalformedTrailer(format!("xref stream {} has an out-of-range /Index", reference));
    let index: Vec<(u32, u32)> = match dict.get("Index").and_then(Object::as_array) {
        Some(arr) => arr
            .chunks(2)
            .filter_map(|pair| match pair {
                [Object::Integer(first), Object::Integer(count)] => {
                    Some(subsection(*first, *count).ok_or_else(out_of_range))
                },
                _ => None,
            })
            .collect::<Result<_>>()?,
        None => vec![subsection(0, size).ok_or_else(out_of_range)?],
    };

    let decoded = stream.decoded_with_limit(options.max_decompressed_size)?;
    let row = widths.iter().sum::<usize>();
    if row == 0 {
        return Err(Error::MalformedTrailer(format!("xref stream {} has zero /W", reference)));
    }

    let mut section = CrossRefTable::new();
    let mut rows = decoded.chunks_exact(row);
    for (first, count) in index {
        for i in 0..count {
            let Some(fields) = rows.next() else {
                return Err(Error::MalformedTrailer(format!(
                    "xref stream {} is shorter than its /Index",
                    reference
                )));
            };
            let (f1, rest) = fields.split_at(widths[0]);
            let (f2, f3) = rest.split_at(widths[1]);
            // Type defaults to 1 when its field is absent.
            let kind = if widths[0] == 0 { 1 } else { read_be(f1) };
            let (a, b) = (read_be(f2), read_be(f3));

            let generation = u16::try_from(b).unwrap_or(u16::MAX);
            let entry = match kind {
                0 => XRefEntry::free(generation),
                1 => XRefEntry::uncompressed(a, generation),
                2 => match (u32::try_from(a), u32::try_from(b)) {
                    (Ok(container), Ok(index)) => XRefEntry::compressed(container, index),
                    _ => {
                        return Err(Error::MalformedTrailer(format!(
                            "xref stream {} points into object stream {} beyond the object range",
                            reference, a
                        )))
                    },
                },
                // Unknown types are references to the null object.
                _ => XRefEntry::free(0),
            };
            section.entries.insert(first + i, entry);
        }
    }

    let mut trailer = stream.dict.clone();
    for key in ["Filter", "DecodeParms", "Length", "W", "Index", "Type"] {
        trailer.shift_remove(key);
    }
    section.trailer = trailer;

    Ok(section)
}

/// Check that a subsection's object numbers `first..first + count` fit in a u32.
fn subsection(first: i64, count: i64) -> Option<(u32, u32)> {
    let first = u32::try_from(first).ok()?;
    let count = u32::try_from(count).ok()?;
    first.checked_add(count)?;
    Some((first, count))
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
