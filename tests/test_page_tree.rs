//! Integration tests for page tree flattening and rebuilding.

mod common;

use common::{nested_pdf, page_contents, PdfBuilder};
use pdfh::page_tree;
use pdfh::transform::check_consistency;
use pdfh::{Document, Error, Object, ObjectRef};

fn media_box(width: i64, height: i64) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(width),
        Object::Integer(height),
    ])
}

#[test]
fn test_flatten_nested_tree() {
    let doc = Document::from_bytes(&nested_pdf().build()).unwrap();
    let pages = page_tree::flatten(&doc).unwrap();

    let refs: Vec<u32> = pages.iter().map(|p| p.reference.id).collect();
    assert_eq!(refs, vec![4, 5, 6]);

    // Nearest ancestor wins
    assert_eq!(pages[0].inherited.media_box, Some(media_box(595, 842)));
    assert_eq!(pages[2].inherited.media_box, Some(media_box(612, 792)));
    assert_eq!(
        pages[1].inherited.resources,
        Some(Object::Reference(ObjectRef::new(10, 0)))
    );

    // The page's own value overrides the inherited one
    assert_eq!(pages[0].inherited.rotation(), 90);
    assert_eq!(pages[2].inherited.rotation(), 180);
}

#[test]
fn test_rebuild_materializes_inherited_attributes() {
    let mut doc = Document::from_bytes(&nested_pdf().build()).unwrap();
    let pages = page_tree::flatten(&doc).unwrap();
    let root = page_tree::rebuild(&mut doc, &pages).unwrap();
    check_consistency(&doc).unwrap();
    doc.prune_unreachable().unwrap();

    let node = doc.objects.get_dict(root).unwrap();
    assert_eq!(node.get("Count"), Some(&Object::Integer(3)));
    // The old intermediate nodes are gone
    assert!(!doc.objects.contains(ObjectRef::new(2, 0)));
    assert!(!doc.objects.contains(ObjectRef::new(3, 0)));

    let first = doc.objects.get_dict(ObjectRef::new(4, 0)).unwrap();
    assert_eq!(first.get("MediaBox"), Some(&media_box(595, 842)));
    assert_eq!(first.get("Rotate"), Some(&Object::Integer(90)));
    assert_eq!(first.get("Parent"), Some(&Object::Reference(root)));
    assert_eq!(
        first.get("Resources"),
        Some(&Object::Reference(ObjectRef::new(10, 0)))
    );

    // Rebuilding changes structure, not what the pages look like
    let again = page_tree::flatten(&doc).unwrap();
    assert_eq!(again.len(), 3);
    assert_eq!(again[0].inherited.media_box, pages[0].inherited.media_box);
    assert_eq!(again[2].inherited.rotation(), 180);
    assert_eq!(page_contents(&doc), vec!["page 1", "page 2", "page 3"]);
}

#[test]
fn test_pages_node_without_type() {
    let bytes = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R >>")
        .build();
    let doc = Document::from_bytes(&bytes).unwrap();
    assert_eq!(doc.page_count().unwrap(), 1);
}

#[test]
fn test_unknown_node_type() {
    let bytes = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Annot >>")
        .build();
    let doc = Document::from_bytes(&bytes).unwrap();
    assert!(matches!(
        page_tree::flatten(&doc),
        Err(Error::InvalidPageTree(_))
    ));
}

#[test]
fn test_cyclic_tree() {
    let bytes = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Pages /Parent 2 0 R /Kids [2 0 R] /Count 1 >>")
        .build();
    let doc = Document::from_bytes(&bytes).unwrap();
    assert!(matches!(
        page_tree::flatten(&doc),
        Err(Error::CyclicPageTree(_))
    ));
}

#[test]
fn test_empty_tree() {
    let bytes = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .build();
    let doc = Document::from_bytes(&bytes).unwrap();
    assert_eq!(doc.page_count().unwrap(), 0);
}
