//! Post-transform structural check.
//!
//! Every transform result passes through [`check_consistency`] before it is handed
//! back. A failure here means a transform is wrong, not that the input was bad, so
//! all errors are in the internal category.

use std::collections::{HashSet, VecDeque};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::page_tree::root_pages_ref;

/// Holder reported for references made directly by the trailer.
pub const TRAILER_HOLDER: ObjectRef = ObjectRef { id: 0, gen: 0 };

/// Verify that `doc` is structurally sound.
///
/// - every reference reachable from the trailer resolves
/// - the page tree has no cycles
/// - every `/Pages` node's `/Count` equals the number of leaves below it
pub fn check_consistency(doc: &Document) -> Result<()> {
    check_references(doc)?;
    let root = root_pages_ref(doc)?;
    let mut path = Vec::new();
    count_leaves(doc, root, &mut path)?;
    Ok(())
}

fn check_references(doc: &Document) -> Result<()> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    for root in doc.roots() {
        if seen.insert(root) {
            queue.push_back((root, TRAILER_HOLDER));
        }
    }

    while let Some((reference, holder)) = queue.pop_front() {
        let object = doc
            .objects
            .get(reference)
            .ok_or(Error::ReferenceDanglingAfterTransform { reference, holder })?;
        object.walk_references(&mut |child| {
            if seen.insert(child) {
                queue.push_back((child, reference));
            }
        });
    }
    Ok(())
}

fn count_leaves(doc: &Document, node_ref: ObjectRef, path: &mut Vec<ObjectRef>) -> Result<usize> {
    if path.contains(&node_ref) {
        return Err(Error::CyclicPageTree(node_ref));
    }
    let node = doc.objects.get_dict(node_ref)?;
    if node.get("Type").and_then(Object::as_name) == Some("Page") {
        return Ok(1);
    }

    path.push(node_ref);
    let mut leaves = 0;
    if let Some(kids) = node.get("Kids") {
        for kid in doc.objects.resolve(kids)?.try_array()? {
            leaves += count_leaves(doc, kid.try_reference()?, path)?;
        }
    }
    path.pop();

    let declared = node.get("Count").and_then(Object::as_integer).unwrap_or(-1);
    if declared != leaves as i64 {
        return Err(Error::PageCountMismatch {
            node: node_ref,
            declared,
            actual: leaves,
        });
    }
    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages_node(doc: &Document) -> ObjectRef {
        root_pages_ref(doc).unwrap()
    }

    #[test]
    fn test_new_document_is_consistent() {
        check_consistency(&Document::new()).unwrap();
    }

    #[test]
    fn test_dangling_reference() {
        let mut doc = Document::new();
        let missing = ObjectRef::new(40, 0);
        doc.catalog_mut()
            .unwrap()
            .insert("Metadata".to_string(), Object::Reference(missing));
        let catalog = doc.catalog_ref().unwrap();
        match check_consistency(&doc) {
            Err(Error::ReferenceDanglingAfterTransform { reference, holder }) => {
                assert_eq!(reference, missing);
                assert_eq!(holder, catalog);
            },
            other => panic!("expected dangling reference, got {:?}", other),
        }
    }

    #[test]
    fn test_count_mismatch() {
        let mut doc = Document::new();
        let node = pages_node(&doc);
        doc.objects
            .get_dict_mut(node)
            .unwrap()
            .insert("Count".to_string(), Object::Integer(2));
        assert!(matches!(
            check_consistency(&doc),
            Err(Error::PageCountMismatch { declared: 2, actual: 0, .. })
        ));
    }

    #[test]
    fn test_cycle() {
        let mut doc = Document::new();
        let node = pages_node(&doc);
        let dict = doc.objects.get_dict_mut(node).unwrap();
        dict.insert("Kids".to_string(), Object::Array(vec![Object::Reference(node)]));
        assert!(matches!(check_consistency(&doc), Err(Error::CyclicPageTree(c)) if c == node));
    }

    #[test]
    fn test_missing_root_names_trailer() {
        let mut doc = Document::new();
        let catalog = doc.catalog_ref().unwrap();
        doc.objects.remove(catalog);
        assert!(matches!(
            check_consistency(&doc),
            Err(Error::ReferenceDanglingAfterTransform { holder, .. }) if holder == TRAILER_HOLDER
        ));
    }
}
