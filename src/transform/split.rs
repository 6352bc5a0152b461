//! Splitting a document into several.

use rayon::prelude::*;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::page_tree::{self, FlatPage};

/// How [`split`] partitions the pages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Grouping {
    /// One page per output
    #[default]
    Single,
    /// Groups of `n` pages; the last group may be shorter
    Chunks(usize),
    /// Explicit group sizes, which must add up to the page count
    Groups(Vec<usize>),
}

impl Grouping {
    /// Group sizes for a document of `page_count` pages.
    pub fn sizes(&self, page_count: usize) -> Result<Vec<usize>> {
        match self {
            Grouping::Single => Ok(vec![1; page_count]),
            Grouping::Chunks(0) => Err(Error::InvalidGroupSizes {
                sizes: vec![0],
                reason: "chunk size must be at least 1".to_string(),
            }),
            Grouping::Chunks(n) => {
                let mut sizes = vec![*n; page_count / n];
                if page_count % n != 0 {
                    sizes.push(page_count % n);
                }
                Ok(sizes)
            },
            Grouping::Groups(sizes) => {
                if sizes.iter().any(|s| *s == 0) {
                    return Err(Error::InvalidGroupSizes {
                        sizes: sizes.clone(),
                        reason: "every group needs at least one page".to_string(),
                    });
                }
                let total: usize = sizes.iter().sum();
                if total != page_count {
                    return Err(Error::InvalidGroupSizes {
                        sizes: sizes.clone(),
                        reason: format!("sizes add up to {} but the document has {} pages", total, page_count),
                    });
                }
                Ok(sizes.clone())
            },
        }
    }
}

/// Partition `doc` into one document per group of consecutive pages.
///
/// Each output keeps the catalog and `/Info` of the input plus only the objects its
/// own pages reach. Outputs are built in parallel.
///
/// # Errors
///
/// - [`Error::EmptyResult`] for a document without pages
/// - [`Error::InvalidGroupSizes`] if `grouping` does not partition the pages
pub fn split(doc: &Document, grouping: &Grouping) -> Result<Vec<Document>> {
    let pages = page_tree::flatten(doc)?;
    if pages.is_empty() {
        return Err(Error::EmptyResult("cannot split a document without pages".to_string()));
    }

    let sizes = grouping.sizes(pages.len())?;
    let mut groups: Vec<&[FlatPage]> = Vec::with_capacity(sizes.len());
    let mut start = 0;
    for size in sizes {
        groups.push(&pages[start..start + size]);
        start += size;
    }

    log::info!("Splitting {} pages into {} documents", pages.len(), groups.len());
    groups
        .into_par_iter()
        .map(|group| {
            let mut part = doc.clone();
            if !part.is_encrypted() {
                part.trailer.shift_remove("ID");
            }
            page_tree::rebuild(&mut part, group)?;
            super::finish(part)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::tests::{contents, doc_with_pages};

    #[test]
    fn test_split_one_page_each() {
        let parts = split(&doc_with_pages(3), &Grouping::Single).unwrap();
        let all: Vec<Vec<String>> = parts.iter().map(contents).collect();
        assert_eq!(all, vec![vec!["page 1"], vec!["page 2"], vec!["page 3"]]);
    }

    #[test]
    fn test_split_drops_other_pages_objects() {
        let doc = doc_with_pages(3);
        let parts = split(&doc, &Grouping::Single).unwrap();
        for part in &parts {
            // catalog, pages node, one page, one content stream
            assert_eq!(part.objects.len(), 4);
        }
    }

    #[test]
    fn test_split_chunks() {
        let parts = split(&doc_with_pages(5), &Grouping::Chunks(2)).unwrap();
        let counts: Vec<usize> = parts.iter().map(|p| p.page_count().unwrap()).collect();
        assert_eq!(counts, vec![2, 2, 1]);
        assert_eq!(contents(&parts[2]), vec!["page 5"]);
    }

    #[test]
    fn test_split_explicit_groups() {
        let parts = split(&doc_with_pages(4), &Grouping::Groups(vec![1, 3])).unwrap();
        assert_eq!(contents(&parts[1]), vec!["page 2", "page 3", "page 4"]);
    }

    #[test]
    fn test_invalid_groups() {
        let doc = doc_with_pages(3);
        for grouping in [
            Grouping::Groups(vec![1, 1]),
            Grouping::Groups(vec![3, 0]),
            Grouping::Chunks(0),
        ] {
            assert!(matches!(
                split(&doc, &grouping),
                Err(Error::InvalidGroupSizes { .. })
            ));
        }
    }

    #[test]
    fn test_split_empty_document() {
        assert!(matches!(
            split(&Document::new(), &Grouping::Single),
            Err(Error::EmptyResult(_))
        ));
    }
}
