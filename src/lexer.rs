//! PDF lexer (tokenizer).
//!
//! Splits a byte buffer into PDF tokens with nom. String and name escapes are resolved
//! here, so the parser only ever sees finished values:
//! - Numbers: `42`, `-17`, `+.5`, `3.`
//! - Literal strings `(a \(b\) \101)` and hex strings `<4142>`
//! - Names `/Type`, `/A#20B`
//! - Delimiters `[`, `]`, `<<`, `>>`
//! - Bare keywords (`obj`, `R`, `true`, `stream`, `trailer`, ...)
//!
//! Whitespace and `%` comments between tokens are skipped by [`skip_ws`].

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, opt, recognize},
    sequence::{pair, tuple},
    IResult,
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number
    Integer(i64),
    /// Real number
    Real(f64),
    /// String bytes with escapes already decoded (literal or hex form)
    String(Vec<u8>),
    /// Name without the leading slash, `#XX` escapes decoded
    Name(String),
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// Any run of regular characters: `obj`, `endobj`, `R`, `true`, `null`, ...
    Keyword(&'a [u8]),
}

/// PDF whitespace: NUL, TAB, LF, FF, CR and SPACE.
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// PDF delimiter characters.
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Anything that is neither whitespace nor a delimiter.
pub fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

/// Skip whitespace and comments. Never fails.
pub fn skip_ws(input: &[u8]) -> &[u8] {
    let mut rest = input;
    loop {
        match rest.first() {
            Some(&c) if is_whitespace(c) => rest = &rest[1..],
            Some(b'%') => {
                let end = rest
                    .iter()
                    .position(|&c| c == b'\r' || c == b'\n')
                    .unwrap_or(rest.len());
                rest = &rest[end..];
            },
            _ => return rest,
        }
    }
}

fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(tuple((digit1, opt(pair(char('.'), digit0))))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)?;

    // Digits followed directly by a regular character ("12abc") are not a number.
    if rest.first().is_some_and(|&c| is_regular(c)) {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)));
    }

    // Only ASCII digits, signs and dots got this far.
    let text = std::str::from_utf8(text).unwrap_or("0");
    let token = if text.contains('.') {
        Token::Real(parse_real(text))
    } else {
        match text.parse::<i64>() {
            Ok(i) => Token::Integer(i),
            Err(_) => Token::Real(parse_real(text)),
        }
    };
    Ok((rest, token))
}

fn parse_real(text: &str) -> f64 {
    let trimmed = text.strip_prefix('+').unwrap_or(text);
    let normalized = if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    };
    normalized.parse().unwrap_or(0.0)
}

/// Literal string with balanced parentheses; escapes are decoded on the way.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut out = Vec::new();
    let mut depth = 1usize;
    let mut i = 0;

    while i < body.len() {
        let c = body[i];
        i += 1;
        match c {
            b'(' => {
                depth += 1;
                out.push(c);
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[i..], Token::String(out)));
                }
                out.push(c);
            },
            b'\\' => {
                let Some(&e) = body.get(i) else { break };
                i += 1;
                match e {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'0'..=b'7' => {
                        let mut value = (e - b'0') as u32;
                        for _ in 0..2 {
                            match body.get(i) {
                                Some(&d @ b'0'..=b'7') => {
                                    value = value * 8 + (d - b'0') as u32;
                                    i += 1;
                                },
                                _ => break,
                            }
                        }
                        out.push((value & 0xFF) as u8);
                    },
                    // Line continuation
                    b'\r' => {
                        if body.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    },
                    b'\n' => {},
                    other => out.push(other),
                }
            },
            // End-of-line markers inside strings read as a single LF.
            b'\r' => {
                if body.get(i) == Some(&b'\n') {
                    i += 1;
                }
                out.push(b'\n');
            },
            _ => out.push(c),
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof)))
}

fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, _) = char('<')(input)?;
    let (rest, digits) = take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c))(rest)?;
    let (rest, _) = char('>')(rest)?;
    Ok((rest, Token::String(decode_hex(digits))))
}

/// Decode hex digits, skipping whitespace and padding an odd final digit with 0.
pub fn decode_hex(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|&c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, _) = char('/')(input)?;
    let (rest, raw) = take_while(is_regular)(rest)?;
    Ok((rest, Token::Name(decode_name(raw))))
}

/// Names whose bytes are not UTF-8 carry each byte >= 0x80 as the code point
/// `RAW_NAME_BYTE + byte`, so [`name_bytes`] can restore the exact bytes.
const RAW_NAME_BYTE: u32 = 0x10_FF00;

fn raw_name_byte(c: char) -> Option<u8> {
    u8::try_from(u32::from(c).checked_sub(RAW_NAME_BYTE)?)
        .ok()
        .filter(|b| *b >= 0x80)
}

/// Decode `#XX` escapes in a raw name. Malformed escapes are kept literally.
///
/// UTF-8 names decode to their text. Any other byte sequence decodes losslessly:
/// ASCII bytes stay as they are and every other byte maps to a private-use code point,
/// so writing the name back produces the bytes that were read.
pub fn decode_name(raw: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let hex = &raw[i + 1..i + 3];
            if hex.iter().all(u8::is_ascii_hexdigit) {
                bytes.push(decode_hex(hex)[0]);
                i += 3;
                continue;
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }
    match std::str::from_utf8(&bytes) {
        Ok(text) if !text.chars().any(|c| raw_name_byte(c).is_some()) => text.to_string(),
        _ => bytes
            .iter()
            .map(|&b| match b {
                0..=0x7F => char::from(b),
                _ => char::from_u32(RAW_NAME_BYTE + u32::from(b)).unwrap_or(char::REPLACEMENT_CHARACTER),
            })
            .collect(),
    }
}

/// The bytes a name had in the file, inverting [`decode_name`].
pub fn name_bytes(name: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(name.len());
    for c in name.chars() {
        match raw_name_byte(c) {
            Some(b) => bytes.push(b),
            None => bytes.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
        }
    }
    bytes
}

fn parse_delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        map(tag("<<"), |_| Token::DictStart),
        map(tag(">>"), |_| Token::DictEnd),
        map(char('['), |_| Token::ArrayStart),
        map(char(']'), |_| Token::ArrayEnd),
    ))(input)
}

fn parse_keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(take_while1(is_regular), Token::Keyword)(input)
}

/// Read one token after skipping leading whitespace and comments.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    alt((
        parse_delimiter,
        parse_name,
        parse_literal_string,
        parse_hex_string,
        parse_number,
        parse_keyword,
    ))(input)
}

/// True if `input` (after whitespace) starts with keyword `kw` as a whole token.
pub fn peek_keyword(input: &[u8], kw: &[u8]) -> bool {
    matches!(token(input), Ok((_, Token::Keyword(k))) if k == kw)
}

/// Consume keyword `kw`, failing if the next token is anything else.
pub fn expect_keyword<'a>(input: &'a [u8], kw: &'static [u8]) -> IResult<&'a [u8], ()> {
    match token(input) {
        Ok((rest, Token::Keyword(k))) if k == kw => Ok((rest, ())),
        _ => Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))),
    }
}
