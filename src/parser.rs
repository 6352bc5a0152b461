//! PDF object parser.
//!
//! Recursive descent over lexer tokens:
//! 1. read a token
//! 2. numbers may turn out to be the start of an `N G R` reference
//! 3. arrays and dictionaries recurse, bounded by `max_nesting`
//!
//! [`ObjectParser`] works on the whole file buffer so reported offsets are absolute.
//! Stream bodies are sliced out by `/Length`; an indirect `/Length` is resolved through
//! a caller-supplied closure because its target lives elsewhere in the file.

use crate::error::{Error, Result};
use crate::lexer::{self, Token};
use crate::object::{Dictionary, Object, ObjectRef, Stream};

/// Resolves an indirect `/Length` to its integer value.
pub type LengthResolver<'r> = dyn FnMut(ObjectRef) -> Result<i64> + 'r;

/// Cursor-based object parser over a byte buffer.
pub struct ObjectParser<'a> {
    data: &'a [u8],
    pos: usize,
    max_nesting: usize,
}

impl<'a> ObjectParser<'a> {
    /// Start parsing `data` at byte `pos`.
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos,
            max_nesting: 100,
        }
    }

    /// Set the maximum array/dictionary nesting depth.
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn rest(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or(&[])
    }

    fn next_token(&mut self) -> Result<Token<'a>> {
        let rest = self.rest();
        if lexer::skip_ws(rest).is_empty() {
            return Err(Error::parse(self.data.len(), "unexpected end of data"));
        }
        match lexer::token(rest) {
            Ok((after, tok)) => {
                self.pos = self.data.len() - after.len();
                Ok(tok)
            },
            Err(_) => {
                let offset = self.data.len() - lexer::skip_ws(rest).len();
                Err(Error::parse(offset, "unrecognized token"))
            },
        }
    }

    fn peek_token(&self) -> Option<Token<'a>> {
        lexer::token(self.rest()).ok().map(|(_, tok)| tok)
    }

    /// Consume keyword `kw` or fail.
    pub fn expect_keyword(&mut self, kw: &'static [u8]) -> Result<()> {
        let start = self.pos;
        match self.next_token()? {
            Token::Keyword(k) if k == kw => Ok(()),
            other => {
                self.pos = start;
                Err(Error::parse(
                    start,
                    format!("expected '{}', found {:?}", String::from_utf8_lossy(kw), other),
                ))
            },
        }
    }

    /// True if the next token is keyword `kw`.
    pub fn at_keyword(&self, kw: &[u8]) -> bool {
        lexer::peek_keyword(self.rest(), kw)
    }

    /// Parse one direct object (which may be a reference).
    pub fn parse_object(&mut self) -> Result<Object> {
        self.parse_nested(0)
    }

    fn parse_nested(&mut self, depth: usize) -> Result<Object> {
        if depth > self.max_nesting {
            return Err(Error::parse(
                self.pos,
                format!("nesting deeper than {} levels", self.max_nesting),
            ));
        }

        let start = self.pos;
        let object = match self.next_token()? {
            Token::Integer(i) => self.maybe_reference(i)?,
            Token::Real(r) => Object::Real(r),
            Token::String(s) => Object::String(s),
            Token::Name(n) => Object::Name(n),
            Token::ArrayStart => {
                let mut items = Vec::new();
                loop {
                    if matches!(self.peek_token(), Some(Token::ArrayEnd)) {
                        self.next_token()?;
                        break;
                    }
                    items.push(self.parse_nested(depth + 1)?);
                }
                Object::Array(items)
            },
            Token::DictStart => Object::Dictionary(self.parse_dict_body(depth)?),
            Token::Keyword(b"true") => Object::Boolean(true),
            Token::Keyword(b"false") => Object::Boolean(false),
            Token::Keyword(b"null") => Object::Null,
            other => {
                return Err(Error::parse(
                    start,
                    format!("unexpected token {:?}", other),
                ))
            },
        };
        Ok(object)
    }

    fn parse_dict_body(&mut self, depth: usize) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            let key_pos = self.pos;
            match self.next_token()? {
                Token::DictEnd => return Ok(dict),
                Token::Name(key) => {
                    let value = self.parse_nested(depth + 1)?;
                    // A null value is the same as an absent key.
                    if !value.is_null() {
                        dict.insert(key, value);
                    }
                },
                other => {
                    return Err(Error::parse(
                        key_pos,
                        format!("expected dictionary key, found {:?}", other),
                    ))
                },
            }
        }
    }

    /// After an integer: `N G R` becomes a reference, anything else stays an integer.
    fn maybe_reference(&mut self, first: i64) -> Result<Object> {
        let save = self.pos;
        if let Ok((after_gen, Token::Integer(gen))) = lexer::token(self.rest()) {
            if let Ok((after_r, Token::Keyword(b"R"))) = lexer::token(after_gen) {
                if let (Ok(id), Ok(gen)) = (u32::try_from(first), u16::try_from(gen)) {
                    self.pos = self.data.len() - after_r.len();
                    return Ok(Object::Reference(ObjectRef::new(id, gen)));
                }
            }
        }
        self.pos = save;
        Ok(Object::Integer(first))
    }

    /// Parse `N G obj`, returning the declared reference.
    pub fn parse_object_header(&mut self) -> Result<ObjectRef> {
        let start = self.pos;
        let id = self.next_token()?;
        let gen = self.next_token()?;
        match (id, gen) {
            (Token::Integer(id), Token::Integer(gen)) => {
                let id = u32::try_from(id)
                    .map_err(|_| Error::parse(start, format!("invalid object number {}", id)))?;
                let gen = u16::try_from(gen)
                    .map_err(|_| Error::parse(start, format!("invalid generation {}", gen)))?;
                self.expect_keyword(b"obj")?;
                Ok(ObjectRef::new(id, gen))
            },
            _ => Err(Error::parse(start, "expected 'N G obj' object header")),
        }
    }

    /// Parse a complete `N G obj ... endobj` starting at the cursor.
    ///
    /// `resolve_length` is only called when a stream's `/Length` is a reference.
    pub fn parse_indirect_object(
        &mut self,
        resolve_length: &mut LengthResolver<'_>,
        allow_missing_endobj: bool,
    ) -> Result<(ObjectRef, Object)> {
        let reference = self.parse_object_header()?;
        let mut object = self.parse_object()?;

        if self.at_keyword(b"stream") {
            let dict = match object {
                Object::Dictionary(dict) => dict,
                other => {
                    return Err(Error::parse(
                        self.pos,
                        format!("stream keyword after {}", other.type_name()),
                    ))
                },
            };
            object = Object::Stream(self.parse_stream_body(reference, dict, resolve_length)?);
        }

        if let Err(e) = self.expect_keyword(b"endobj") {
            if !allow_missing_endobj {
                return Err(e);
            }
            log::warn!("Object {} has no endobj keyword", reference);
        }

        Ok((reference, object))
    }

    fn parse_stream_body(
        &mut self,
        reference: ObjectRef,
        dict: Dictionary,
        resolve_length: &mut LengthResolver<'_>,
    ) -> Result<Stream> {
        self.expect_keyword(b"stream")?;

        // The keyword is followed by CRLF or LF (a lone CR is tolerated).
        let data = self.data;
        match data.get(self.pos..self.pos + 2) {
            Some(b"\r\n") => self.pos += 2,
            _ => match data.get(self.pos) {
                Some(b'\n') | Some(b'\r') => self.pos += 1,
                _ => {},
            },
        }

        let length = match dict.get("Length") {
            Some(Object::Integer(n)) => *n,
            Some(Object::Reference(r)) => resolve_length(*r)?,
            Some(other) => {
                return Err(Error::TruncatedStream {
                    object: reference,
                    reason: format!("/Length is a {}", other.type_name()),
                })
            },
            None => {
                return Err(Error::TruncatedStream {
                    object: reference,
                    reason: "missing /Length".to_string(),
                })
            },
        };

        let length = usize::try_from(length).map_err(|_| Error::TruncatedStream {
            object: reference,
            reason: format!("negative /Length {}", length),
        })?;
        let end = self.pos.checked_add(length).filter(|&end| end <= data.len()).ok_or_else(|| {
            Error::TruncatedStream {
                object: reference,
                reason: format!(
                    "/Length {} runs past end of file ({} bytes left)",
                    length,
                    data.len() - self.pos
                ),
            }
        })?;

        let body = bytes::Bytes::copy_from_slice(&data[self.pos..end]);
        self.pos = end;

        if !self.at_keyword(b"endstream") {
            return Err(Error::TruncatedStream {
                object: reference,
                reason: format!("no endstream after {} bytes of data", length),
            });
        }
        self.expect_keyword(b"endstream")?;

        Ok(Stream::new(dict, body))
    }
}

/// Parse a single direct object from the start of `input`.
pub fn parse_object(input: &[u8]) -> Result<Object> {
    ObjectParser::new(input, 0).parse_object()
}
