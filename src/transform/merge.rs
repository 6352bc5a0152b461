//! Concatenating documents.

use std::collections::HashMap;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::page_tree::{self, FlatPage, InheritedAttributes};

/// Concatenate the pages of `docs` in order.
///
/// Each input after the first is renumbered above the objects already collected, so
/// the object tables never collide. The first input supplies the catalog and
/// `/Info`; its outline is dropped when more than one document is merged since the
/// entries would only cover part of the result. `/ID` is removed so the writer
/// generates a fresh one. The output version is the highest input version.
///
/// # Errors
///
/// - [`Error::EmptyResult`] for an empty input list, or inputs without pages
/// - [`Error::Unsupported`] if any input is encrypted, or the combined object numbers
///   do not fit in 32 bits
pub fn merge(docs: Vec<Document>) -> Result<Document> {
    if let Some(index) = docs.iter().position(Document::is_encrypted) {
        return Err(Error::Unsupported(format!(
            "merging encrypted document (input {})",
            index + 1
        )));
    }

    let input_count = docs.len();
    let mut inputs = docs.into_iter();
    let mut out = inputs
        .next()
        .ok_or_else(|| Error::EmptyResult("no input documents".to_string()))?;
    let mut pages = page_tree::flatten(&out)?;

    for doc in inputs {
        let doc_pages = page_tree::flatten(&doc)?;
        if doc.version_number() > out.version_number() {
            out.version.clone_from(&doc.version);
        }
        let offset = out.objects.max_id();
        let mapping = doc
            .objects
            .iter()
            .map(|(r, _)| match r.id.checked_add(offset) {
                Some(id) => Ok((r, ObjectRef::new(id, r.gen))),
                None => Err(Error::Unsupported(format!(
                    "renumbering object {} above {} exceeds the object number range",
                    r, offset
                ))),
            })
            .collect::<Result<HashMap<ObjectRef, ObjectRef>>>()?;

        for (reference, mut object) in doc.objects {
            object.remap_references(&mapping);
            out.objects.insert(mapping[&reference], object);
        }
        for page in doc_pages {
            pages.push(FlatPage {
                reference: mapping.get(&page.reference).copied().unwrap_or(page.reference),
                inherited: remap_inherited(page.inherited, &mapping),
            });
        }
    }

    if pages.is_empty() {
        return Err(Error::EmptyResult("merged inputs have no pages".to_string()));
    }

    if input_count > 1 {
        out.catalog_mut()?.shift_remove("Outlines");
    }
    out.trailer.shift_remove("ID");

    log::info!("Merged {} documents into {} pages", input_count, pages.len());
    page_tree::rebuild(&mut out, &pages)?;
    super::finish(out)
}

fn remap_inherited(
    inherited: InheritedAttributes,
    mapping: &HashMap<ObjectRef, ObjectRef>,
) -> InheritedAttributes {
    let remap = |value: Option<Object>| {
        value.map(|mut v| {
            v.remap_references(mapping);
            v
        })
    };
    InheritedAttributes {
        resources: remap(inherited.resources),
        media_box: remap(inherited.media_box),
        crop_box: remap(inherited.crop_box),
        rotate: inherited.rotate,
    }
}
