//! PDF document model.
//!
//! A [`Document`] is the whole file held in memory: the header version, every indirect
//! object reachable from the trailer, and the trailer itself. Loading is eager: once
//! [`Document::from_bytes`] returns, no byte of the input is needed again, and
//! transforms work on the object table alone.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::object_table::ObjectTable;
use crate::objstm::ObjectStream;
use crate::parser::ObjectParser;
use crate::parser_config::ParserOptions;
use crate::xref::{find_startxref, parse_xref_chain, CrossRefTable, XRefEntryType};

/// The header must start within this many bytes of the beginning of the file.
const HEADER_SEARCH_LIMIT: usize = 1024;

/// Maximum nesting of indirect `/Length` lookups while loading one object.
const MAX_LOAD_DEPTH: usize = 32;

/// Trailer keys that describe the cross-reference data of the file that was read.
/// They are meaningless once the document is rewritten.
const XREF_TRAILER_KEYS: &[&str] = &["Size", "Prev", "XRefStm"];

/// A PDF document held in memory.
///
/// # Example
///
/// ```no_run
/// use pdfh::document::Document;
///
/// let doc = Document::open("sample.pdf")?;
/// println!("PDF version: {}", doc.version);
/// println!("Page count: {}", doc.page_count()?);
/// # Ok::<(), pdfh::error::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Header version, e.g. `"1.7"`
    pub version: String,
    /// Every indirect object of the document
    pub objects: ObjectTable,
    /// Trailer dictionary (`/Root`, `/Info`, `/ID`, `/Encrypt`)
    pub trailer: Dictionary,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A PDF 1.7 document with a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut objects = ObjectTable::new();

        let mut pages = Dictionary::new();
        pages.insert("Type".to_string(), Object::name("Pages"));
        pages.insert("Kids".to_string(), Object::Array(Vec::new()));
        pages.insert("Count".to_string(), Object::Integer(0));
        let pages_ref = objects.add(Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.insert("Type".to_string(), Object::name("Catalog"));
        catalog.insert("Pages".to_string(), Object::Reference(pages_ref));
        let catalog_ref = objects.add(Object::Dictionary(catalog));

        let mut trailer = Dictionary::new();
        trailer.insert("Root".to_string(), Object::Reference(catalog_ref));

        Self {
            version: "1.7".to_string(),
            objects,
            trailer,
        }
    }

    /// Open a PDF file with strict [`ParserOptions`].
    ///
    /// The whole file is read into memory before parsing starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or anything
    /// [`Document::from_bytes`] rejects.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, &ParserOptions::default())
    }

    /// Open a PDF file with explicit parser options.
    pub fn open_with_options(path: impl AsRef<Path>, options: &ParserOptions) -> Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        if options.max_file_size > 0 && size > options.max_file_size as u64 {
            return Err(Error::Unsupported(format!(
                "{} is {} bytes, larger than the {} byte limit",
                path.display(),
                size,
                options.max_file_size
            )));
        }

        log::info!("Opening {}", path.display());
        let data = std::fs::read(path)?;
        Self::from_bytes_with_options(&data, options)
    }

    /// Parse a complete PDF file held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, &ParserOptions::default())
    }

    /// Parse a complete PDF file held in memory with explicit parser options.
    ///
    /// Steps:
    /// 1. find the `%PDF-x.y` header within the first 1024 bytes
    /// 2. follow `startxref` and the `/Prev` chain of cross-reference sections
    /// 3. load every object reachable from `/Root`, `/Info` and `/Encrypt`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidHeader`], [`Error::MalformedTrailer`],
    /// [`Error::UnresolvableReference`], [`Error::TruncatedStream`],
    /// [`Error::ParseError`] and decoder errors for xref and object streams.
    pub fn from_bytes_with_options(data: &[u8], options: &ParserOptions) -> Result<Self> {
        if options.max_file_size > 0 && data.len() > options.max_file_size {
            return Err(Error::Unsupported(format!(
                "input is {} bytes, larger than the {} byte limit",
                data.len(),
                options.max_file_size
            )));
        }

        let (base, version) = parse_header(data)?;
        let start = find_startxref(data)?;
        let xref = parse_xref_chain(data, start, base, options)?;

        let mut trailer = xref.trailer().clone();
        for key in XREF_TRAILER_KEYS {
            trailer.shift_remove(*key);
        }

        let mut loader = Loader {
            data,
            base,
            xref,
            options,
            encrypted: trailer.contains_key("Encrypt"),
            object_streams: HashMap::new(),
            depth: 0,
        };

        let roots: Vec<ObjectRef> = trailer_roots(&trailer);
        if roots.is_empty() {
            return Err(Error::MalformedTrailer("/Root is not a reference".to_string()));
        }

        let mut objects = ObjectTable::new();
        let mut queue: VecDeque<ObjectRef> = roots.into_iter().collect();
        while let Some(reference) = queue.pop_front() {
            if objects.contains(reference) {
                continue;
            }
            let object = loader.load(reference)?;
            object.walk_references(&mut |child| {
                if !objects.contains(child) {
                    queue.push_back(child);
                }
            });
            objects.insert(reference, object);
        }

        log::debug!(
            "Loaded {} objects (PDF {}, {} object streams)",
            objects.len(),
            version,
            loader.object_streams.len()
        );

        Ok(Self {
            version,
            objects,
            trailer,
        })
    }

    /// Reference to the document catalog (`/Root`).
    pub fn catalog_ref(&self) -> Result<ObjectRef> {
        self.trailer
            .get("Root")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::MalformedTrailer("/Root is not a reference".to_string()))
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<&Dictionary> {
        self.objects.get_dict(self.catalog_ref()?)
    }

    /// The document catalog, for modification.
    pub fn catalog_mut(&mut self) -> Result<&mut Dictionary> {
        let reference = self.catalog_ref()?;
        self.objects.get_dict_mut(reference)
    }

    /// Reference to the document information dictionary, if any.
    pub fn info_ref(&self) -> Option<ObjectRef> {
        self.trailer.get("Info").and_then(Object::as_reference)
    }

    /// True if the trailer carries an `/Encrypt` dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.trailer.contains_key("Encrypt")
    }

    /// Trailer references everything else hangs off: `/Root`, `/Info`, `/Encrypt`.
    pub fn roots(&self) -> Vec<ObjectRef> {
        trailer_roots(&self.trailer)
    }

    /// Number of pages in the page tree.
    pub fn page_count(&self) -> Result<usize> {
        crate::page_tree::page_count(self)
    }

    /// Drop every object that is no longer reachable from the trailer.
    ///
    /// Returns the number of objects removed.
    pub fn prune_unreachable(&mut self) -> Result<usize> {
        let reachable: std::collections::HashSet<ObjectRef> =
            self.objects.reachable_from(self.roots())?.into_iter().collect();
        let before = self.objects.len();
        self.objects.retain(|r, _| reachable.contains(&r));
        let removed = before - self.objects.len();
        if removed > 0 {
            log::debug!("Pruned {} unreachable objects", removed);
        }
        Ok(removed)
    }

    /// Header version as `(major, minor)`; unparseable parts read as 0.
    pub fn version_number(&self) -> (u8, u8) {
        let mut parts = self.version.splitn(2, '.');
        let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        (major, minor)
    }
}

fn trailer_roots(trailer: &Dictionary) -> Vec<ObjectRef> {
    ["Root", "Info", "Encrypt"]
        .iter()
        .filter_map(|key| trailer.get(*key).and_then(Object::as_reference))
        .collect()
}

/// Locate `%PDF-x.y`, returning its offset and the version string.
fn parse_header(data: &[u8]) -> Result<(usize, String)> {
    const MARKER: &[u8] = b"%PDF-";

    let window = &data[..data.len().min(HEADER_SEARCH_LIMIT)];
    let found = || String::from_utf8_lossy(&data[..data.len().min(16)]).into_owned();

    let base = window
        .windows(MARKER.len())
        .position(|w| w == MARKER)
        .ok_or_else(|| Error::InvalidHeader(found()))?;

    let after = &data[base + MARKER.len()..];
    let len = after
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .count();
    let version = std::str::from_utf8(&after[..len]).unwrap_or_default();

    let mut parts = version.split('.');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(major), Some(minor), None) if !major.is_empty() && !minor.is_empty()
    );
    if !valid {
        return Err(Error::InvalidHeader(found()));
    }

    if base > 0 {
        log::warn!("{} bytes of junk before the PDF header", base);
    }
    Ok((base, version.to_string()))
}

/// Materializes objects through the cross-reference table.
struct Loader<'a> {
    data: &'a [u8],
    base: usize,
    xref: CrossRefTable,
    options: &'a ParserOptions,
    encrypted: bool,
    object_streams: HashMap<u32, ObjectStream>,
    depth: usize,
}

impl<'a> Loader<'a> {
    fn load(&mut self, reference: ObjectRef) -> Result<Object> {
        let entry = *self
            .xref
            .lookup(reference)
            .ok_or(Error::UnresolvableReference(reference))?;

        match entry.entry_type {
            XRefEntryType::Uncompressed => {
                self.load_uncompressed(reference, entry.offset as usize + self.base)
            },
            XRefEntryType::Compressed => {
                self.load_compressed(reference, entry.offset as u32, entry.generation as usize)
            },
            XRefEntryType::Free => Err(Error::UnresolvableReference(reference)),
        }
    }

    fn load_uncompressed(&mut self, reference: ObjectRef, offset: usize) -> Result<Object> {
        if self.depth >= MAX_LOAD_DEPTH {
            return Err(Error::parse(offset, "indirect /Length lookups nest too deeply"));
        }
        self.depth += 1;

        let data = self.data;
        let max_nesting = self.options.max_nesting;
        let allow_missing_endobj = self.options.allow_missing_endobj;
        let mut parser = ObjectParser::new(data, offset).with_max_nesting(max_nesting);
        let mut resolve_length = |length_ref: ObjectRef| -> Result<i64> {
            let length = self.load(length_ref)?;
            length.try_integer()
        };
        let parsed = parser.parse_indirect_object(&mut resolve_length, allow_missing_endobj);
        self.depth -= 1;

        let (found, object) = parsed?;
        if found != reference {
            return Err(Error::parse(
                offset,
                format!("expected object {} but found {}", reference, found),
            ));
        }
        Ok(object)
    }

    fn load_compressed(&mut self, reference: ObjectRef, container: u32, index: usize) -> Result<Object> {
        if self.encrypted {
            return Err(Error::Unsupported(format!(
                "object {} is stored in an object stream of an encrypted document",
                reference
            )));
        }

        if !self.object_streams.contains_key(&container) {
            let container_ref = ObjectRef::new(container, 0);
            let offset = match self.xref.lookup(container_ref) {
                Some(e) if e.entry_type == XRefEntryType::Uncompressed => e.offset as usize + self.base,
                _ => return Err(Error::UnresolvableReference(container_ref)),
            };
            let stream_obj = self.load_uncompressed(container_ref, offset)?;
            let stream = stream_obj.try_stream()?;
            let parsed = ObjectStream::parse(container_ref, stream, self.options)?;
            self.object_streams.insert(container, parsed);
        }

        self.object_streams
            .get(&container)
            .and_then(|stream| stream.get(reference.id, index))
            .cloned()
            .ok_or(Error::UnresolvableReference(reference))
    }
}
