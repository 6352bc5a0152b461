#![allow(clippy::type_complexity)]
#![allow(clippy::enum_variant_names)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # pdfh
//!
//! Page-level PDF manipulation: load a document into memory, rearrange its pages and
//! write it back out as a fresh, self-consistent file.
//!
//! ## Core Features
//!
//! - **Parsing**: classic cross-reference tables and cross-reference streams,
//!   incremental updates, object streams, indirect stream lengths
//! - **Page tree**: flattening with inherited attributes (`/Resources`, `/MediaBox`,
//!   `/CropBox`, `/Rotate`) and rebuilding as a single flat node
//! - **Transforms**: delete, extract, reverse, rotate, dupe, merge and split
//! - **Writing**: garbage collection of unreachable objects, renumbering, optional
//!   Flate compression and cross-reference streams, atomic saves
//!
//! ## Architecture
//!
//! ```text
//! bytes ─► [xref] + [parser] ─► Document (ObjectTable + trailer)
//!                                  │
//!                     [page_tree::flatten] ─► PageList
//!                                  │
//!                           [transform] ops
//!                                  │
//!                     [page_tree::rebuild] + consistency check
//!                                  │
//!                              [writer] ─► bytes
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfh::transform::{self, PageSelection};
//! use pdfh::writer::{self, WriterConfig};
//! use pdfh::Document;
//!
//! # fn main() -> pdfh::Result<()> {
//! let a = Document::open("a.pdf")?;
//! let b = Document::open("b.pdf")?;
//! let merged = transform::merge(vec![a, b])?;
//! let trimmed = transform::delete(merged, &"1".parse::<PageSelection>()?, false)?;
//! writer::save(&trimmed, "out.pdf", &WriterConfig::default())?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
/// In-memory table of indirect objects
pub mod object_table;
pub mod objstm;
pub mod parser;
/// Parser configuration options
pub mod parser_config;
pub mod xref;

// Stream decoders
pub mod decoders;

// Page tree flattening and rebuilding
pub mod page_tree;

// Page operations
pub mod transform;

// PDF output
pub mod writer;

// Re-exports
pub use document::Document;
pub use error::{Error, ErrorCategory, Result};
pub use object::{Dictionary, Object, ObjectRef, Stream};
pub use object_table::ObjectTable;
pub use parser_config::ParserOptions;
