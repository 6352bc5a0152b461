//! Parser options.
//!
//! pdfh refuses to guess its way through broken files: a corrupt cross-reference
//! section or a stream that does not match its `/Length` aborts loading. The options
//! here are resource limits plus the one harmless leniency real files need.
//!
//! # Example
//!
//! ```
//! use pdfh::parser_config::ParserOptions;
//!
//! let options = ParserOptions {
//!     max_file_size: 50 * 1024 * 1024,
//!     ..ParserOptions::default()
//! };
//! assert!(!options.allow_missing_endobj);
//! ```

/// Limits and switches for [`Document`](crate::document::Document) loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Maximum array/dictionary nesting depth
    ///
    /// PDF Spec: ISO 32000-1:2008, Section H.1 - Implementation Limits
    pub max_nesting: usize,

    /// Maximum number of cross-reference sections followed through `/Prev`
    pub max_xref_sections: usize,

    /// Maximum decoded size of a stream the parser has to decode (xref and object
    /// streams). 0 disables the check.
    pub max_decompressed_size: usize,

    /// Maximum input size in bytes. 0 disables the check.
    pub max_file_size: usize,

    /// Accept objects whose `endobj` keyword is missing
    pub allow_missing_endobj: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::strict()
    }
}

impl ParserOptions {
    /// Every structural rule enforced.
    pub fn strict() -> Self {
        Self {
            max_nesting: 100,
            max_xref_sections: 100,
            max_decompressed_size: 100 * 1024 * 1024,
            max_file_size: 1024 * 1024 * 1024,
            allow_missing_endobj: false,
        }
    }

    /// Strict, except that a missing `endobj` is logged instead of rejected.
    pub fn lenient() -> Self {
        Self {
            allow_missing_endobj: true,
            ..Self::strict()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_strict() {
        assert_eq!(ParserOptions::default(), ParserOptions::strict());
        assert!(ParserOptions::lenient().allow_missing_endobj);
        assert_eq!(ParserOptions::lenient().max_nesting, 100);
    }
}
