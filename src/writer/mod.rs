//! PDF writing module.
//!
//! ## Architecture
//!
//! ```text
//! Document
//!     ↓
//! [document_writer] (garbage collection, renumbering, xref, trailer)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! Every write produces a complete file with a single cross-reference section.
//! Objects that are not reachable from the trailer are left out, and objects are
//! numbered from 1 in the order they are reached.
//!
//! ```no_run
//! use pdfh::writer::{self, WriterConfig};
//! use pdfh::Document;
//!
//! let doc = Document::open("in.pdf")?;
//! writer::save(&doc, "out.pdf", &WriterConfig::default().with_compress(true))?;
//! # Ok::<(), pdfh::Error>(())
//! ```

mod document_writer;
mod object_serializer;

pub use document_writer::{save, write_to, write_to_vec, WriterConfig};
pub use object_serializer::ObjectSerializer;
