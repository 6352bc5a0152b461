//! Deep copies of pages.
//!
//! A copy of a page gets its own copy of everything that belongs to that page alone
//! (content streams, annotations, private resources), while objects several pages
//! use (fonts, shared images, a common resource dictionary) stay shared. Ownership is
//! decided by counting how many pages reach each object. Walks never follow `/Parent`
//! and stop at other page tree nodes, so a link annotation pointing at another page
//! does not make that page part of this one.

use std::collections::{HashMap, HashSet};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::object_table::ObjectTable;
use crate::page_tree::FlatPage;

/// Clones pages, sharing objects that more than one page reaches.
#[derive(Debug, Clone, Default)]
pub struct PageCloner {
    reach: HashMap<ObjectRef, usize>,
}

impl PageCloner {
    /// Count, for every object, how many of `pages` reach it.
    pub fn new(doc: &Document, pages: &[FlatPage]) -> Result<Self> {
        let mut reach: HashMap<ObjectRef, usize> = HashMap::new();
        let mut counted = HashSet::new();
        for page in pages {
            if !counted.insert(page.reference) {
                continue;
            }
            for object in owned_objects(&doc.objects, page.reference)? {
                *reach.entry(object).or_default() += 1;
            }
        }
        Ok(Self { reach })
    }

    /// Number of counted pages that reach `reference`.
    pub fn reach_count(&self, reference: ObjectRef) -> usize {
        self.reach.get(&reference).copied().unwrap_or(0)
    }

    /// True if more than one page reaches `reference`.
    pub fn is_shared(&self, reference: ObjectRef) -> bool {
        self.reach_count(reference) > 1
    }

    /// Copy `page` and the objects only it reaches into fresh table slots.
    ///
    /// References to the source page inside the copied objects point at the copy.
    pub fn clone_page(&self, doc: &mut Document, page: &FlatPage) -> Result<FlatPage> {
        let private: Vec<ObjectRef> = owned_objects(&doc.objects, page.reference)?
            .into_iter()
            .filter(|r| !self.is_shared(*r))
            .collect();

        let mut mapping = HashMap::with_capacity(private.len() + 1);
        mapping.insert(page.reference, doc.objects.allocate());
        for &old in &private {
            mapping.insert(old, doc.objects.allocate());
        }

        for (&old, &new) in &mapping {
            let mut copy = doc.objects.require(old)?.clone();
            copy.remap_references(&mapping);
            doc.objects.insert(new, copy);
        }

        log::debug!(
            "Cloned page {} as {} ({} private objects)",
            page.reference,
            mapping[&page.reference],
            private.len()
        );

        Ok(FlatPage {
            reference: mapping[&page.reference],
            inherited: page.inherited.clone(),
        })
    }
}

/// Objects reachable from `page` without crossing `/Parent` or another page tree node.
///
/// The page itself is not included.
fn owned_objects(objects: &ObjectTable, page: ObjectRef) -> Result<Vec<ObjectRef>> {
    let mut seen = HashSet::new();
    seen.insert(page);
    let mut stack = vec![page];
    let mut owned = Vec::new();

    while let Some(current) = stack.pop() {
        let object = objects.require(current)?;
        let mut children = Vec::new();
        collect_children(object, &mut children);
        for child in children {
            if !seen.insert(child) {
                continue;
            }
            let target = objects.get(child).ok_or(Error::UnresolvableReference(child))?;
            if matches!(target.dict_type(), Some("Page") | Some("Pages")) {
                continue;
            }
            owned.push(child);
            stack.push(child);
        }
    }

    Ok(owned)
}

/// References held by `object`, skipping every `/Parent` entry.
fn collect_children(object: &Object, out: &mut Vec<ObjectRef>) {
    match object {
        Object::Reference(r) => out.push(*r),
        Object::Array(items) => {
            for item in items {
                collect_children(item, out);
            }
        },
        Object::Dictionary(_) | Object::Stream(_) => {
            if let Some(dict) = object.as_dict() {
                for (key, value) in dict {
                    if key != "Parent" {
                        collect_children(value, out);
                    }
                }
            }
        },
        _ => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dictionary, Stream};
    use crate::page_tree::{flatten, rebuild};

    fn r(id: u32) -> ObjectRef {
        ObjectRef::new(id, 0)
    }

    fn dict(entries: Vec<(&str, Object)>) -> Dictionary {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Two pages sharing font 10; page 3 has content 11 and an annotation 12 whose /P
    /// points back at the page and whose /Dest points at page 4.
    fn two_page_doc() -> Document {
        let mut doc = Document::new();
        doc.objects = ObjectTable::new();
        doc.objects.insert(
            r(1),
            Object::Dictionary(dict(vec![
                ("Type", Object::name("Catalog")),
                ("Pages", Object::Reference(r(2))),
            ])),
        );
        doc.objects.insert(
            r(2),
            Object::Dictionary(dict(vec![
                ("Type", Object::name("Pages")),
                ("Kids", Object::Array(vec![Object::Reference(r(3)), Object::Reference(r(4))])),
                ("Count", Object::Integer(2)),
            ])),
        );
        let resources = || {
            Object::Dictionary(dict(vec![(
                "Font",
                Object::Dictionary(dict(vec![("F1", Object::Reference(r(10)))])),
            )]))
        };
        doc.objects.insert(
            r(3),
            Object::Dictionary(dict(vec![
                ("Type", Object::name("Page")),
                ("Parent", Object::Reference(r(2))),
                ("Resources", resources()),
                ("Contents", Object::Reference(r(11))),
                ("Annots", Object::Array(vec![Object::Reference(r(12))])),
            ])),
        );
        doc.objects.insert(
            r(4),
            Object::Dictionary(dict(vec![
                ("Type", Object::name("Page")),
                ("Parent", Object::Reference(r(2))),
                ("Resources", resources()),
            ])),
        );
        doc.objects.insert(r(10), Object::Dictionary(dict(vec![("Type", Object::name("Font"))])));
        doc.objects.insert(r(11), Object::Stream(Stream::new(Dictionary::new(), b"BT ET".to_vec())));
        doc.objects.insert(
            r(12),
            Object::Dictionary(dict(vec![
                ("Type", Object::name("Annot")),
                ("P", Object::Reference(r(3))),
                ("Dest", Object::Array(vec![Object::Reference(r(4)), Object::name("Fit")])),
            ])),
        );
        doc.trailer.insert("Root".to_string(), Object::Reference(r(1)));
        doc
    }

    #[test]
    fn test_reach_counts() {
        let doc = two_page_doc();
        let pages = flatten(&doc).unwrap();
        let cloner = PageCloner::new(&doc, &pages).unwrap();
        assert_eq!(cloner.reach_count(r(10)), 2);
        assert_eq!(cloner.reach_count(r(11)), 1);
        assert_eq!(cloner.reach_count(r(12)), 1);
        // Pages are never counted as owned objects.
        assert_eq!(cloner.reach_count(r(4)), 0);
        assert_eq!(cloner.reach_count(r(2)), 0);
    }

    #[test]
    fn test_clone_copies_private_and_shares_common() {
        let mut doc = two_page_doc();
        let pages = flatten(&doc).unwrap();
        let cloner = PageCloner::new(&doc, &pages).unwrap();
        let copy = cloner.clone_page(&mut doc, &pages[0]).unwrap();
        assert_ne!(copy.reference, r(3));

        let page = doc.objects.get_dict(copy.reference).unwrap().clone();
        let contents = page.get("Contents").and_then(Object::as_reference).unwrap();
        assert_ne!(contents, r(11));
        assert_eq!(doc.objects.get(contents), doc.objects.get(r(11)));

        let font = page
            .get("Resources")
            .and_then(Object::as_dict)
            .and_then(|res| res.get("Font"))
            .and_then(Object::as_dict)
            .and_then(|fonts| fonts.get("F1"))
            .and_then(Object::as_reference);
        assert_eq!(font, Some(r(10)));

        let annot_ref = page.get("Annots").and_then(Object::as_array).unwrap()[0]
            .as_reference()
            .unwrap();
        assert_ne!(annot_ref, r(12));
        let annot = doc.objects.get_dict(annot_ref).unwrap();
        assert_eq!(annot.get("P"), Some(&Object::Reference(copy.reference)));
        assert_eq!(
            annot.get("Dest"),
            Some(&Object::Array(vec![Object::Reference(r(4)), Object::name("Fit")]))
        );

        let mut list = pages.clone();
        list.push(copy);
        rebuild(&mut doc, &list).unwrap();
        assert_eq!(flatten(&doc).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_object_is_reported() {
        let mut doc = two_page_doc();
        doc.objects.remove(r(11));
        let pages = flatten(&doc).unwrap();
        assert!(matches!(
            PageCloner::new(&doc, &pages),
            Err(Error::UnresolvableReference(m)) if m == r(11)
        ));
    }
}
