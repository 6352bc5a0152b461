//! Whole-document serialization.
//!
//! Writes a [`Document`] as a fresh file: header, body, one complete
//! cross-reference section and the trailer. Nothing of the input file layout
//! survives, incremental updates included.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::path::Path;

use md5::{Digest, Md5};

use super::object_serializer::ObjectSerializer;
use crate::decoders::encode_flate;
use crate::document::Document;
use crate::error::Result;
use crate::object::{Dictionary, Object, ObjectRef, Stream};

/// Configuration for PDF output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterConfig {
    /// Header version; the document's own version when unset
    pub version: Option<String>,
    /// Flate-encode streams that have no filter and write dictionaries on one line
    pub compress: bool,
    /// Write a cross-reference stream instead of a classic table (PDF 1.5+)
    pub xref_stream: bool,
}

impl WriterConfig {
    /// Override the header version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Enable or disable stream compression.
    ///
    /// When enabled, streams without a filter are compressed using FlateDecode
    /// (zlib/deflate). Streams that already carry a filter are written as they are.
    /// Dictionaries are written without line breaks.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Write the cross-reference section as a stream.
    ///
    /// The header version is raised to 1.5 if it is lower.
    pub fn with_xref_stream(mut self, xref_stream: bool) -> Self {
        self.xref_stream = xref_stream;
        self
    }
}

/// Serialize `doc` into a byte vector.
pub fn write_to_vec(doc: &Document, config: &WriterConfig) -> Result<Vec<u8>> {
    DocumentWriter::new(doc, config).write()
}

/// Serialize `doc` into `out`.
///
/// The whole file is assembled in memory first, so nothing reaches `out` when
/// serialization fails.
pub fn write_to<W: Write>(doc: &Document, out: &mut W, config: &WriterConfig) -> Result<()> {
    let bytes = write_to_vec(doc, config)?;
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(())
}

/// Write `doc` to `path` atomically.
///
/// The file is written to a temporary file in the destination directory and renamed
/// over `path` only once it is complete, so a failure leaves any existing file
/// untouched.
pub fn save(doc: &Document, path: impl AsRef<Path>, config: &WriterConfig) -> Result<()> {
    let path = path.as_ref();
    let bytes = write_to_vec(doc, config)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    log::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Writes one document.
struct DocumentWriter<'a> {
    doc: &'a Document,
    config: &'a WriterConfig,
    serializer: ObjectSerializer,
}

impl<'a> DocumentWriter<'a> {
    fn new(doc: &'a Document, config: &'a WriterConfig) -> Self {
        Self {
            doc,
            config,
            serializer: if config.compress {
                ObjectSerializer::compact()
            } else {
                ObjectSerializer::new()
            },
        }
    }

    fn write(&self) -> Result<Vec<u8>> {
        let encrypted = self.doc.is_encrypted();
        let order = self.live_objects()?;

        // Encrypted documents keep their numbering: string and stream keys are
        // derived from the object number and generation.
        let mapping: HashMap<ObjectRef, ObjectRef> = if encrypted {
            order.iter().map(|r| (*r, *r)).collect()
        } else {
            order
                .iter()
                .enumerate()
                .map(|(i, r)| (*r, ObjectRef::new(i as u32 + 1, 0)))
                .collect()
        };

        let version = self.output_version();
        let mut out = Vec::new();
        out.extend_from_slice(format!("%PDF-{}\n", version).as_bytes());
        // Binary marker (recommended for binary content)
        out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut offsets: HashMap<u32, (u64, u16)> = HashMap::with_capacity(order.len());
        let mut written: Vec<ObjectRef> = Vec::with_capacity(order.len());
        for old in &order {
            let new = mapping[old];
            let object = self.prepare(*old, &mapping, encrypted)?;
            offsets.insert(new.id, (out.len() as u64, new.gen));
            self.serializer.write_indirect(&mut out, new, &object);
            written.push(new);
        }

        let trailer = self.trailer(&mapping, &out[..]);
        let size = written.iter().map(|r| r.id).max().unwrap_or(0) + 1;

        let xref_offset = out.len();
        if self.config.xref_stream {
            self.write_xref_stream(&mut out, trailer, &offsets, size)?;
        } else {
            write_xref_table(&mut out, &offsets, size);
            let mut trailer = trailer;
            trailer.insert("Size".to_string(), Object::Integer(size as i64));
            out.extend_from_slice(b"trailer\n");
            self.serializer.write_dictionary(&mut out, &trailer);
            out.push(b'\n');
        }
        out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        log::debug!(
            "Serialized {} of {} objects ({} bytes)",
            written.len(),
            self.doc.objects.len(),
            out.len()
        );
        Ok(out)
    }

    fn output_version(&self) -> String {
        let version = self
            .config
            .version
            .clone()
            .unwrap_or_else(|| self.doc.version.clone());
        if self.config.xref_stream && version_number(&version) < (1, 5) {
            log::debug!("Raising version {} to 1.5 for the xref stream", version);
            return "1.5".to_string();
        }
        version
    }

    /// Objects reachable from the trailer, breadth first.
    ///
    /// A stream's indirect `/Length` is not followed: the serializer writes the
    /// actual length directly.
    fn live_objects(&self) -> Result<Vec<ObjectRef>> {
        let objects = &self.doc.objects;
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<ObjectRef> = VecDeque::new();
        for root in self.doc.roots() {
            if seen.insert(root) {
                queue.push_back(root);
            }
        }

        while let Some(reference) = queue.pop_front() {
            let object = objects.require(reference)?;
            order.push(reference);
            let mut visit = |child: ObjectRef| {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            };
            match object {
                Object::Stream(stream) => {
                    for (key, value) in &stream.dict {
                        if key != "Length" {
                            value.walk_references(&mut visit);
                        }
                    }
                },
                other => other.walk_references(&mut visit),
            }
        }
        Ok(order)
    }

    /// Copy of the object ready for output: renumbered, and compressed if asked.
    fn prepare(
        &self,
        reference: ObjectRef,
        mapping: &HashMap<ObjectRef, ObjectRef>,
        encrypted: bool,
    ) -> Result<Object> {
        let mut object = self.doc.objects.require(reference)?.clone();
        if let Object::Stream(stream) = &mut object {
            stream.dict.shift_remove("Length");
            // Compressing ciphertext would put the filter on the wrong side of
            // the encryption.
            if self.config.compress && !encrypted && !stream.is_filtered() {
                let compressed = encode_flate(&stream.data)?;
                if compressed.len() < stream.data.len() {
                    let mut dict = std::mem::take(&mut stream.dict);
                    dict.insert("Filter".to_string(), Object::name("FlateDecode"));
                    dict.shift_remove("DecodeParms");
                    *stream = Stream::new(dict, compressed);
                }
            }
        }
        object.remap_references(mapping);
        Ok(object)
    }

    fn trailer(&self, mapping: &HashMap<ObjectRef, ObjectRef>, body: &[u8]) -> Dictionary {
        let mut trailer = Dictionary::new();
        for key in ["Root", "Info", "Encrypt"] {
            if let Some(value) = self.doc.trailer.get(key) {
                let mut value = value.clone();
                value.remap_references(mapping);
                trailer.insert(key.to_string(), value);
            }
        }

        let id = match self.doc.trailer.get("ID") {
            Some(id) => id.clone(),
            None => {
                let digest = Md5::digest(body).to_vec();
                Object::Array(vec![Object::String(digest.clone()), Object::String(digest)])
            },
        };
        trailer.insert("ID".to_string(), id);
        trailer
    }

    fn write_xref_stream(
        &self,
        out: &mut Vec<u8>,
        mut dict: Dictionary,
        offsets: &HashMap<u32, (u64, u16)>,
        size: u32,
    ) -> Result<()> {
        // The stream is the last object and lists itself.
        let own = ObjectRef::new(size, 0);
        let own_offset = out.len() as u64;
        let size = size + 1;

        let width = offset_width(own_offset);
        let mut data = Vec::with_capacity(size as usize * (3 + width));
        let free = free_list(offsets, size);
        for id in 0..size {
            let (kind, field2, gen) = if id == own.id {
                (1u8, own_offset, 0u16)
            } else if let Some((offset, gen)) = offsets.get(&id) {
                (1u8, *offset, *gen)
            } else {
                let (next, gen) = free.get(&id).copied().unwrap_or((0, 0));
                (0u8, u64::from(next), gen)
            };
            data.push(kind);
            data.extend_from_slice(&field2.to_be_bytes()[8 - width..]);
            data.extend_from_slice(&gen.to_be_bytes());
        }

        dict.insert("Type".to_string(), Object::name("XRef"));
        dict.insert("Size".to_string(), Object::Integer(i64::from(size)));
        dict.insert(
            "W".to_string(),
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(width as i64),
                Object::Integer(2),
            ]),
        );
        let data = if self.config.compress {
            dict.insert("Filter".to_string(), Object::name("FlateDecode"));
            encode_flate(&data)?
        } else {
            data
        };

        self.serializer
            .write_indirect(out, own, &Object::Stream(Stream::new(dict, data)));
        Ok(())
    }
}

/// Classic cross-reference table covering object numbers `0..size`.
fn write_xref_table(out: &mut Vec<u8>, offsets: &HashMap<u32, (u64, u16)>, size: u32) {
    let free = free_list(offsets, size);
    out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
    for id in 0..size {
        // Each entry is exactly 20 bytes including the two-byte end of line.
        let line = match offsets.get(&id) {
            Some((offset, gen)) => format!("{:010} {:05} n \n", offset, gen),
            None => {
                let (next, gen) = free.get(&id).copied().unwrap_or((0, 0));
                format!("{:010} {:05} f \n", next, gen)
            },
        };
        out.extend_from_slice(line.as_bytes());
    }
}

/// Linked list of free object numbers: each maps to (next free number, generation).
fn free_list(offsets: &HashMap<u32, (u64, u16)>, size: u32) -> HashMap<u32, (u32, u16)> {
    let free: Vec<u32> = (0..size).filter(|id| !offsets.contains_key(id)).collect();
    free.iter()
        .enumerate()
        .map(|(i, &id)| {
            let next = free.get(i + 1).copied().unwrap_or(0);
            let gen = if id == 0 { 65535 } else { 0 };
            (id, (next, gen))
        })
        .collect()
}

/// Bytes needed to store any offset up to `max`, at least 4.
fn offset_width(max: u64) -> usize {
    let needed = (64 - max.leading_zeros() as usize).div_ceil(8);
    needed.max(4)
}

fn version_number(version: &str) -> (u8, u8) {
    let mut parts = version.splitn(2, '.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor)
}
