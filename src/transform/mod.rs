//! Page-level transformations.
//!
//! Every operation follows the same pipeline:
//! 1. flatten the page tree into a [`PageList`](crate::page_tree::PageList)
//! 2. rearrange, drop or clone entries of the list
//! 3. rebuild a flat page tree from the new list
//! 4. run [`check_consistency`] and drop objects nothing references any more
//!
//! Operations take their input documents by value and return new documents. A
//! failed operation leaves nothing half-done behind because the caller's copy is
//! gone only on success.
//!
//! # Example
//!
//! ```no_run
//! use pdfh::document::Document;
//! use pdfh::transform::{self, PageSelection, Rotation};
//!
//! let doc = Document::open("in.pdf")?;
//! let doc = transform::delete(doc, &PageSelection::parse("2-3")?, false)?;
//! let doc = transform::rotate(doc, Rotation::from_degrees(90)?, &PageSelection::All)?;
//! pdfh::writer::save(&doc, "out.pdf", &Default::default())?;
//! # Ok::<(), pdfh::error::Error>(())
//! ```

mod clone;
mod consistency;
mod merge;
mod rotation;
mod selection;
mod split;

use std::collections::HashSet;

pub use clone::PageCloner;
pub use consistency::{check_consistency, TRAILER_HOLDER};
pub use merge::merge;
pub use rotation::Rotation;
pub use selection::{PageRange, PageSelection};
pub use split::{split, Grouping};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::page_tree::{self, FlatPage};

/// Remove the selected pages.
///
/// With `negate` the selection is inverted: the selected pages are kept and all
/// others removed.
///
/// # Errors
///
/// - [`Error::IndexOutOfRange`] for a selected page outside the document
/// - [`Error::EmptyResult`] if no page would remain
pub fn delete(mut doc: Document, selection: &PageSelection, negate: bool) -> Result<Document> {
    let pages = page_tree::flatten(&doc)?;
    let selected: HashSet<usize> = selection.resolve(pages.len())?.into_iter().collect();

    let kept: Vec<FlatPage> = pages
        .into_iter()
        .enumerate()
        .filter(|(i, _)| selected.contains(&(i + 1)) == negate)
        .map(|(_, page)| page)
        .collect();

    if kept.is_empty() {
        return Err(Error::EmptyResult(format!("deleting {} removes every page", selection)));
    }

    log::info!("Keeping {} pages after deleting {}", kept.len(), selection);
    page_tree::rebuild(&mut doc, &kept)?;
    finish(doc)
}

/// Keep only the selected pages, in the order they were requested.
///
/// A page requested more than once is deep-cloned for each repeat, so the copies
/// can later be edited independently.
///
/// # Errors
///
/// - [`Error::IndexOutOfRange`] for a selected page outside the document
/// - [`Error::EmptyResult`] if the selection picks no page
/// - [`Error::Unsupported`] for a repeated page in an encrypted document
pub fn extract(mut doc: Document, selection: &PageSelection) -> Result<Document> {
    let pages = page_tree::flatten(&doc)?;
    let indices = selection.resolve(pages.len())?;
    if indices.is_empty() {
        return Err(Error::EmptyResult(format!("{} selects no page", selection)));
    }

    let mut unique = HashSet::new();
    let first_uses: Vec<FlatPage> = indices
        .iter()
        .filter(|i| unique.insert(**i))
        .map(|i| pages[i - 1].clone())
        .collect();
    let repeats = indices.len() > first_uses.len();
    if repeats {
        reject_encrypted(&doc, "repeating pages of")?;
    }
    let cloner = if repeats {
        PageCloner::new(&doc, &first_uses)?
    } else {
        PageCloner::default()
    };

    let mut used = HashSet::new();
    let mut kept = Vec::with_capacity(indices.len());
    for index in indices {
        let page = &pages[index - 1];
        if used.insert(index) {
            kept.push(page.clone());
        } else {
            kept.push(cloner.clone_page(&mut doc, page)?);
        }
    }

    log::info!("Extracted {} pages", kept.len());
    page_tree::rebuild(&mut doc, &kept)?;
    finish(doc)
}

/// Reverse the page order.
pub fn reverse(mut doc: Document) -> Result<Document> {
    let mut pages = page_tree::flatten(&doc)?;
    pages.reverse();
    page_tree::rebuild(&mut doc, &pages)?;
    finish(doc)
}

/// Add `rotation` to the effective rotation of the selected pages.
///
/// The effective rotation includes a `/Rotate` inherited from the page tree. Use
/// [`PageSelection::All`] to rotate every page.
pub fn rotate(mut doc: Document, rotation: Rotation, selection: &PageSelection) -> Result<Document> {
    let mut pages = page_tree::flatten(&doc)?;
    let selected: HashSet<usize> = selection.resolve(pages.len())?.into_iter().collect();

    for (i, page) in pages.iter_mut().enumerate() {
        if !selected.contains(&(i + 1)) {
            continue;
        }
        let degrees = rotation.apply_to(page.inherited.rotation());
        page.inherited.rotate = Some(degrees);
        doc.objects
            .get_dict_mut(page.reference)?
            .insert("Rotate".to_string(), Object::Integer(degrees));
    }

    log::info!("Rotated {} pages by {}", selected.len(), rotation);
    page_tree::rebuild(&mut doc, &pages)?;
    finish(doc)
}

/// Repeat the whole page sequence `n` times.
///
/// Copies 2..n are deep clones: objects only one page uses are duplicated, objects
/// several pages share stay shared.
///
/// # Errors
///
/// - [`Error::InvalidCount`] for `n == 0`
/// - [`Error::Unsupported`] for encrypted documents
pub fn dupe(mut doc: Document, n: usize) -> Result<Document> {
    if n == 0 {
        return Err(Error::InvalidCount(n));
    }
    if n == 1 {
        check_consistency(&doc)?;
        return Ok(doc);
    }
    reject_encrypted(&doc, "duplicating pages of")?;

    let pages = page_tree::flatten(&doc)?;
    let cloner = PageCloner::new(&doc, &pages)?;
    let mut all = Vec::with_capacity(pages.len() * n);
    all.extend(pages.iter().cloned());
    for _ in 1..n {
        for page in &pages {
            all.push(cloner.clone_page(&mut doc, page)?);
        }
    }

    log::info!("Duplicated {} pages {} times", pages.len(), n);
    page_tree::rebuild(&mut doc, &all)?;
    finish(doc)
}

fn reject_encrypted(doc: &Document, action: &str) -> Result<()> {
    if doc.is_encrypted() {
        return Err(Error::Unsupported(format!(
            "{} an encrypted document",
            action
        )));
    }
    Ok(())
}

/// Consistency check, then garbage collection.
fn finish(mut doc: Document) -> Result<Document> {
    check_consistency(&doc)?;
    doc.prune_unreachable()?;
    Ok(doc)
}
