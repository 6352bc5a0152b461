//! Error types for pdfh.
//!
//! Every failure the library can report is a variant of [`Error`]. Variants are grouped
//! into an [`ErrorCategory`] so callers (the `pdfh` binary, batch scripts) can branch on
//! the kind of failure without matching every variant.

use crate::object::ObjectRef;

/// Result type alias for pdfh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure kinds, each with its own process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The input is unreadable, not a PDF, or structurally corrupt.
    Input,
    /// The caller asked for something the document cannot satisfy.
    Parameter,
    /// The engine broke one of its own invariants. Always a bug.
    Internal,
    /// Reading or writing the file system failed.
    Io,
}

impl ErrorCategory {
    /// Exit code reported by the `pdfh` binary for this category.
    ///
    /// Code 2 is left to the argument parser for usage errors.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Input => 3,
            ErrorCategory::Parameter => 4,
            ErrorCategory::Internal => 5,
            ErrorCategory::Io => 6,
        }
    }

    /// Short human readable label.
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Input => "input error",
            ErrorCategory::Parameter => "parameter error",
            ErrorCategory::Internal => "internal error",
            ErrorCategory::Io => "I/O error",
        }
    }
}

/// Error types that can occur while reading, transforming or writing a PDF.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Input errors
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// The startxref marker, cross-reference section or trailer is missing or corrupt
    #[error("Malformed trailer: {0}")]
    MalformedTrailer(String),

    /// A reference that the cross-reference data cannot satisfy
    #[error("Unresolvable reference: {0}")]
    UnresolvableReference(ObjectRef),

    /// Stream filter without a decoder
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Stream body shorter than its declared length, or missing `endstream`
    #[error("Truncated stream in object {object}: {reason}")]
    TruncatedStream {
        /// Object holding the stream
        object: ObjectRef,
        /// What was wrong with the stream body
        reason: String,
    },

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Object has the wrong variant for the requested accessor
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected object type
        expected: &'static str,
        /// Actual object type found
        found: &'static str,
    },

    /// Page tree node that is neither a Page nor a Pages node, or a missing root
    #[error("Invalid page tree: {0}")]
    InvalidPageTree(String),

    /// Input uses a feature pdfh cannot carry through
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    // Parameter errors
    /// 1-based page index outside the document
    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    IndexOutOfRange {
        /// Offending index
        index: usize,
        /// Number of pages in the document
        page_count: usize,
    },

    /// The operation would produce a document without pages
    #[error("Resulting document would have no pages ({0})")]
    EmptyResult(String),

    /// Split group sizes that do not partition the document
    #[error("Invalid group sizes {sizes:?}: {reason}")]
    InvalidGroupSizes {
        /// Requested group sizes
        sizes: Vec<usize>,
        /// Why they were rejected
        reason: String,
    },

    /// Rotation that is not a multiple of 90 degrees
    #[error("Invalid rotation {0}: degrees must be a multiple of 90")]
    InvalidRotation(i64),

    /// Repeat count outside the accepted range
    #[error("Invalid count {0}: must be at least 1")]
    InvalidCount(usize),

    /// Page selection that cannot be parsed or applied
    #[error("Invalid page selection '{0}'")]
    InvalidSelection(String),

    // Internal errors
    /// A transform left a reference to an object that is not in the table
    #[error("Internal error: reference {reference} dangles after transform (from {holder})")]
    ReferenceDanglingAfterTransform {
        /// Missing target
        reference: ObjectRef,
        /// Object holding the reference
        holder: ObjectRef,
    },

    /// The page tree visits the same node twice on one path
    #[error("Internal error: cyclic page tree at {0}")]
    CyclicPageTree(ObjectRef),

    /// The same page object appears twice in a rebuilt page tree
    #[error("Internal error: page {0} listed more than once")]
    DuplicatePageEntry(ObjectRef),

    /// A `/Pages` node whose `/Count` disagrees with the leaves below it
    #[error("Internal error: {node} declares /Count {declared} but holds {actual} pages")]
    PageCountMismatch {
        /// The `/Pages` node
        node: ObjectRef,
        /// Value of its `/Count`
        declared: i64,
        /// Leaves actually below it
        actual: usize,
    },

    // I/O errors
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidHeader(_)
            | Error::MalformedTrailer(_)
            | Error::UnresolvableReference(_)
            | Error::UnsupportedFilter(_)
            | Error::TruncatedStream { .. }
            | Error::ParseError { .. }
            | Error::Decode(_)
            | Error::TypeMismatch { .. }
            | Error::InvalidPageTree(_)
            | Error::Unsupported(_) => ErrorCategory::Input,
            Error::IndexOutOfRange { .. }
            | Error::EmptyResult(_)
            | Error::InvalidGroupSizes { .. }
            | Error::InvalidRotation(_)
            | Error::InvalidCount(_)
            | Error::InvalidSelection(_) => ErrorCategory::Parameter,
            Error::ReferenceDanglingAfterTransform { .. }
            | Error::CyclicPageTree(_)
            | Error::DuplicatePageEntry(_)
            | Error::PageCountMismatch { .. } => ErrorCategory::Internal,
            Error::Io(_) => ErrorCategory::Io,
        }
    }

    /// Shorthand for [`Error::ParseError`].
    pub(crate) fn parse(offset: usize, reason: impl Into<String>) -> Self {
        Error::ParseError {
            offset,
            reason: reason.into(),
        }
    }
}
