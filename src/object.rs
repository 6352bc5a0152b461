//! PDF object types.
//!
//! Objects form a closed enum mirroring the PDF grammar. Indirect objects refer to each
//! other through [`ObjectRef`] values, which are plain keys into an
//! [`ObjectTable`](crate::object_table::ObjectTable) and never own their target.

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use indexmap::IndexMap;

use crate::decoders::{self, DecodeParams};
use crate::error::{Error, Result};

/// Dictionary keyed by name (without the leading slash).
///
/// Keys keep the order they were parsed or inserted in, which keeps written output stable.
pub type Dictionary = IndexMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + data)
    Stream(Stream),
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

/// Stream object: a dictionary plus the raw bytes exactly as stored in the file.
///
/// Filters are not applied when the stream is parsed. [`Stream::decoded`] runs the filter
/// chain the first time it is called and keeps the result, so content that no transform
/// looks at is never decompressed.
#[derive(Debug, Clone)]
pub struct Stream {
    /// Stream dictionary
    pub dict: Dictionary,
    /// Raw (still encoded) stream data
    pub data: Bytes,
    decoded: OnceLock<Vec<u8>>,
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.dict == other.dict && self.data == other.data
    }
}

impl Stream {
    /// Create a stream from its dictionary and raw bytes.
    pub fn new(dict: Dictionary, data: impl Into<Bytes>) -> Self {
        Self {
            dict,
            data: data.into(),
            decoded: OnceLock::new(),
        }
    }

    /// Filter names from `/Filter`, in application order.
    pub fn filters(&self) -> Vec<String> {
        match self.dict.get("Filter") {
            Some(Object::Name(name)) => vec![name.clone()],
            Some(Object::Array(arr)) => arr
                .iter()
                .filter_map(|obj| obj.as_name().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True when the stream has at least one filter.
    pub fn is_filtered(&self) -> bool {
        !self.filters().is_empty()
    }

    /// Decode the stream data, caching the result.
    pub fn decoded(&self) -> Result<&[u8]> {
        self.decoded_with_limit(0)
    }

    /// Decode the stream data, refusing outputs larger than `max_size` bytes (0 = no limit).
    pub fn decoded_with_limit(&self, max_size: usize) -> Result<&[u8]> {
        if let Some(data) = self.decoded.get() {
            return Ok(data);
        }

        let filters = self.filters();
        let decoded = if filters.is_empty() {
            self.data.to_vec()
        } else {
            let params = self.decode_params(filters.len());
            log::debug!("Decoding stream through {:?} ({} bytes)", filters, self.data.len());
            decoders::decode_stream(&self.data, &filters, &params, max_size)?
        };

        Ok(self.decoded.get_or_init(|| decoded))
    }

    /// True once [`Stream::decoded`] has run successfully.
    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    /// Per-filter decode parameters from `/DecodeParms`.
    fn decode_params(&self, count: usize) -> Vec<Option<DecodeParams>> {
        match self.dict.get("DecodeParms") {
            Some(Object::Array(arr)) => (0..count)
                .map(|i| arr.get(i).and_then(Object::as_dict).map(DecodeParams::from_dict))
                .collect(),
            Some(Object::Dictionary(d)) => {
                let mut params = vec![None; count];
                if let Some(first) = params.first_mut() {
                    *first = Some(DecodeParams::from_dict(d));
                }
                params
            },
            _ => vec![None; count],
        }
    }
}

impl Object {
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Build a name object.
    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or real as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Mutable dictionary access. Works for both Dictionary and Stream objects.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&mut s.dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to stream.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Dictionary accessor that fails with [`Error::TypeMismatch`].
    pub fn try_dict(&self) -> Result<&Dictionary> {
        self.as_dict().ok_or_else(|| self.mismatch("Dictionary"))
    }

    /// Mutable dictionary accessor that fails with [`Error::TypeMismatch`].
    pub fn try_dict_mut(&mut self) -> Result<&mut Dictionary> {
        let found = self.type_name();
        self.as_dict_mut().ok_or(Error::TypeMismatch {
            expected: "Dictionary",
            found,
        })
    }

    /// Array accessor that fails with [`Error::TypeMismatch`].
    pub fn try_array(&self) -> Result<&Vec<Object>> {
        self.as_array().ok_or_else(|| self.mismatch("Array"))
    }

    /// Integer accessor that fails with [`Error::TypeMismatch`].
    pub fn try_integer(&self) -> Result<i64> {
        self.as_integer().ok_or_else(|| self.mismatch("Integer"))
    }

    /// Name accessor that fails with [`Error::TypeMismatch`].
    pub fn try_name(&self) -> Result<&str> {
        self.as_name().ok_or_else(|| self.mismatch("Name"))
    }

    /// Reference accessor that fails with [`Error::TypeMismatch`].
    pub fn try_reference(&self) -> Result<ObjectRef> {
        self.as_reference().ok_or_else(|| self.mismatch("Reference"))
    }

    /// Stream accessor that fails with [`Error::TypeMismatch`].
    pub fn try_stream(&self) -> Result<&Stream> {
        self.as_stream().ok_or_else(|| self.mismatch("Stream"))
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }

    /// The `/Type` name of a dictionary or stream.
    pub fn dict_type(&self) -> Option<&str> {
        self.as_dict()?.get("Type")?.as_name()
    }

    /// Visit every reference contained in this object, depth first.
    ///
    /// References are reported, not followed: the walk stays inside this object.
    pub fn walk_references<F: FnMut(ObjectRef)>(&self, visit: &mut F) {
        match self {
            Object::Reference(r) => visit(*r),
            Object::Array(arr) => {
                for item in arr {
                    item.walk_references(visit);
                }
            },
            Object::Dictionary(dict) => walk_dict(dict, visit),
            Object::Stream(stream) => walk_dict(&stream.dict, visit),
            _ => {},
        }
    }

    /// All references contained in this object, in walk order.
    pub fn references(&self) -> Vec<ObjectRef> {
        let mut refs = Vec::new();
        self.walk_references(&mut |r| refs.push(r));
        refs
    }

    /// Replace every contained reference with whatever `f` returns for it.
    pub fn map_references<F: FnMut(ObjectRef) -> Object>(&mut self, f: &mut F) {
        match self {
            Object::Reference(r) => {
                let replacement = f(*r);
                *self = replacement;
            },
            Object::Array(arr) => {
                for item in arr {
                    item.map_references(f);
                }
            },
            Object::Dictionary(dict) => map_dict(dict, f),
            Object::Stream(stream) => map_dict(&mut stream.dict, f),
            _ => {},
        }
    }

    /// Rewrite references through `mapping`; references not in the map are left alone.
    pub fn remap_references(&mut self, mapping: &HashMap<ObjectRef, ObjectRef>) {
        self.map_references(&mut |r| Object::Reference(mapping.get(&r).copied().unwrap_or(r)));
    }
}

fn walk_dict<F: FnMut(ObjectRef)>(dict: &Dictionary, visit: &mut F) {
    for value in dict.values() {
        value.walk_references(visit);
    }
}

fn map_dict<F: FnMut(ObjectRef) -> Object>(dict: &mut Dictionary, f: &mut F) {
    for value in dict.values_mut() {
        value.map_references(f);
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Object::Real(value)
    }
}

impl From<ObjectRef> for Object {
    fn from(value: ObjectRef) -> Self {
        Object::Reference(value)
    }
}

impl From<Vec<Object>> for Object {
    fn from(value: Vec<Object>) -> Self {
        Object::Array(value)
    }
}

impl From<Dictionary> for Object {
    fn from(value: Dictionary) -> Self {
        Object::Dictionary(value)
    }
}

impl From<Stream> for Object {
    fn from(value: Stream) -> Self {
        Object::Stream(value)
    }
}
