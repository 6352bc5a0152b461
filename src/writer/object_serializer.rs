//! PDF object serialization.
//!
//! Serializes PDF objects to their byte representation according to
//! PDF specification ISO 32000-1:2008, Section 7.3.

use crate::object::{Dictionary, Object, ObjectRef, Stream};

/// Serializer for PDF objects.
///
/// Converts PDF Object types to their byte representation following
/// the PDF specification syntax rules. Dictionary keys are written in sorted
/// order so equal documents serialize to equal bytes.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a new object serializer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj);
        buf
    }

    /// Append an indirect object definition to `buf`.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn write_indirect(&self, buf: &mut Vec<u8>, reference: ObjectRef, obj: &Object) {
        buf.extend_from_slice(format!("{} {} obj\n", reference.id, reference.gen).as_bytes());
        self.write_object(buf, obj);
        buf.extend_from_slice(b"\nendobj\n");
    }

    /// Write an object to a buffer.
    pub fn write_object(&self, w: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Null => w.extend_from_slice(b"null"),
            Object::Boolean(b) => w.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => w.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => write_real(w, *r),
            Object::String(s) => write_string(w, s),
            Object::Name(n) => write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream(stream) => self.write_stream(w, stream),
            Object::Reference(r) => {
                w.extend_from_slice(format!("{} {} R", r.id, r.gen).as_bytes())
            },
        }
    }

    /// Write a PDF array.
    fn write_array(&self, w: &mut Vec<u8>, arr: &[Object]) {
        w.push(b'[');
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                w.push(b' ');
            }
            self.write_object(w, obj);
        }
        w.push(b']');
    }

    /// Write a PDF dictionary.
    pub fn write_dictionary(&self, w: &mut Vec<u8>, dict: &Dictionary) {
        w.extend_from_slice(b"<<");

        // Sort keys for deterministic output
        let mut keys: Vec<_> = dict.keys().collect();
        keys.sort();

        for key in keys {
            if let Some(value) = dict.get(key) {
                if self.compact {
                    w.push(b' ');
                } else {
                    w.extend_from_slice(b"\n  ");
                }
                write_name(w, key);
                w.push(b' ');
                self.write_object(w, value);
            }
        }

        if self.compact {
            w.push(b' ');
        } else if !dict.is_empty() {
            w.push(b'\n');
        }
        w.extend_from_slice(b">>");
    }

    /// Write a PDF stream.
    ///
    /// `/Length` is always set to the length of the data written.
    fn write_stream(&self, w: &mut Vec<u8>, stream: &Stream) {
        let mut dict = stream.dict.clone();
        dict.insert("Length".to_string(), Object::Integer(stream.data.len() as i64));

        self.write_dictionary(w, &dict);
        w.extend_from_slice(b"\nstream\n");
        w.extend_from_slice(&stream.data);
        w.extend_from_slice(b"\nendstream");
    }
}

/// Write a real number without exponent, using the shortest digits that read back
/// as the same value.
fn write_real(w: &mut Vec<u8>, value: f64) {
    if !value.is_finite() || value == 0.0 {
        w.push(b'0');
    } else {
        w.extend_from_slice(value.to_string().as_bytes());
    }
}

/// Write a PDF string.
///
/// Uses literal string syntax `(...)` with proper escaping,
/// or hex string syntax `<...>` for binary data.
fn write_string(w: &mut Vec<u8>, data: &[u8]) {
    let is_printable = data
        .iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

    if is_printable {
        w.push(b'(');
        for &byte in data {
            match byte {
                b'(' => w.extend_from_slice(b"\\("),
                b')' => w.extend_from_slice(b"\\)"),
                b'\\' => w.extend_from_slice(b"\\\\"),
                b'\n' => w.extend_from_slice(b"\\n"),
                b'\r' => w.extend_from_slice(b"\\r"),
                b'\t' => w.extend_from_slice(b"\\t"),
                _ => w.push(byte),
            }
        }
        w.push(b')');
    } else {
        w.push(b'<');
        for byte in data {
            w.extend_from_slice(format!("{:02X}", byte).as_bytes());
        }
        w.push(b'>');
    }
}

/// Write a PDF name.
///
/// Names start with `/`; delimiters, whitespace, `#` and bytes outside the
/// printable ASCII range are escaped as `#xx`. Names that were not UTF-8 in the
/// source are written with their original bytes.
fn write_name(w: &mut Vec<u8>, name: &str) {
    w.push(b'/');
    for byte in crate::lexer::name_bytes(name) {
        let regular = (0x21..=0x7E).contains(&byte)
            && byte != b'#'
            && !crate::lexer::is_delimiter(byte);
        if regular {
            w.push(byte);
        } else {
            w.extend_from_slice(format!("#{:02X}", byte).as_bytes());
        }
    }
}
