//! Integration tests for page transforms, from file bytes to file bytes.

mod common;

use common::{nested_pdf, page_contents, simple_pdf};
use pdfh::transform::{self, Grouping, PageSelection, Rotation};
use pdfh::writer::{write_to_vec, WriterConfig};
use pdfh::{page_tree, Document, Error, ErrorCategory, Object};

fn load(bytes: &[u8]) -> Document {
    Document::from_bytes(bytes).unwrap()
}

/// Write and read back, so every assertion also covers the writer.
fn round_trip(doc: &Document) -> Document {
    load(&write_to_vec(doc, &WriterConfig::default()).unwrap())
}

fn selection(s: &str) -> PageSelection {
    s.parse().unwrap()
}

fn rotations(doc: &Document) -> Vec<i64> {
    page_tree::flatten(doc)
        .unwrap()
        .iter()
        .map(|p| p.inherited.rotation())
        .collect()
}

#[test]
fn test_delete_pages() {
    let doc = load(&simple_pdf(5).build());
    let out = round_trip(&transform::delete(doc, &selection("2-3"), false).unwrap());
    assert_eq!(page_contents(&out), vec!["page 1", "page 4", "page 5"]);
    // catalog, pages node, three pages, three content streams
    assert_eq!(out.objects.len(), 8);
}

#[test]
fn test_delete_negated_keeps_selection() {
    let doc = load(&simple_pdf(5).build());
    let out = transform::delete(doc, &PageSelection::Every(2), true).unwrap();
    assert_eq!(page_contents(&out), vec!["page 2", "page 4"]);
}

#[test]
fn test_delete_everything_fails() {
    let doc = load(&simple_pdf(2).build());
    let err = transform::delete(doc, &PageSelection::All, false).unwrap_err();
    assert!(matches!(err, Error::EmptyResult(_)));
    assert_eq!(err.category().exit_code(), 4);
}

#[test]
fn test_delete_out_of_range() {
    let doc = load(&simple_pdf(2).build());
    assert!(matches!(
        transform::delete(doc, &selection("3"), false),
        Err(Error::IndexOutOfRange { index: 3, page_count: 2 })
    ));
}

#[test]
fn test_extract_in_request_order_with_repeats() {
    let doc = load(&simple_pdf(3).build());
    let out = round_trip(&transform::extract(doc, &selection("3,1,3")).unwrap());
    assert_eq!(page_contents(&out), vec!["page 3", "page 1", "page 3"]);

    // The repeat is a copy, not the same page object twice
    let pages = page_tree::flatten(&out).unwrap();
    assert_ne!(pages[0].reference, pages[2].reference);
}

#[test]
fn test_reverse_nested_tree_keeps_inherited_attributes() {
    let doc = load(&nested_pdf().build());
    let out = round_trip(&transform::reverse(doc).unwrap());
    assert_eq!(page_contents(&out), vec!["page 3", "page 2", "page 1"]);
    assert_eq!(rotations(&out), vec![180, 90, 90]);

    // Shared resources survive the removal of the node that held them
    let pages = page_tree::flatten(&out).unwrap();
    let resources = pages[0].inherited.resources.as_ref().unwrap();
    let resources = out.objects.resolve(resources).unwrap();
    assert!(resources.as_dict().unwrap().contains_key("Font"));
}

#[test]
fn test_reverse_twice_is_identity() {
    let doc = load(&nested_pdf().build());
    let once = transform::reverse(doc.clone()).unwrap();
    let twice = transform::reverse(once).unwrap();
    assert_eq!(page_contents(&twice), page_contents(&doc));
}

#[test]
fn test_rotate_adds_to_inherited_rotation() {
    let doc = load(&nested_pdf().build());
    let out = transform::rotate(doc, Rotation::from_degrees(-90).unwrap(), &selection("1,3")).unwrap();
    assert_eq!(rotations(&out), vec![0, 90, 90]);
}

#[test]
fn test_rotate_full_turn_is_identity() {
    let doc = load(&nested_pdf().build());
    let before = rotations(&doc);
    let mut out = doc;
    for _ in 0..4 {
        out = transform::rotate(out, Rotation::from_degrees(90).unwrap(), &PageSelection::All).unwrap();
    }
    assert_eq!(rotations(&out), before);
}

#[test]
fn test_rotate_rejects_odd_angles() {
    let err = Rotation::from_degrees(45).unwrap_err();
    assert!(matches!(err, Error::InvalidRotation(45)));
    assert_eq!(err.category(), ErrorCategory::Parameter);
}

#[test]
fn test_dupe_repeats_sequence_and_shares_resources() {
    let doc = load(&nested_pdf().build());
    let out = round_trip(&transform::dupe(doc, 2).unwrap());
    assert_eq!(
        page_contents(&out),
        vec!["page 1", "page 2", "page 3", "page 1", "page 2", "page 3"]
    );

    let pages = page_tree::flatten(&out).unwrap();
    let font_dicts: Vec<_> = pages
        .iter()
        .map(|p| p.inherited.resources.clone().unwrap())
        .collect();
    // The font resources are used by every page, so every copy points at the same object
    assert!(font_dicts.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_dupe_copies_are_independent() {
    let doc = load(&simple_pdf(2).build());
    let duped = transform::dupe(doc, 3).unwrap();
    assert_eq!(duped.page_count().unwrap(), 6);

    let out = transform::rotate(duped, Rotation::from_degrees(90).unwrap(), &selection("1")).unwrap();
    assert_eq!(rotations(&out), vec![90, 0, 0, 0, 0, 0]);
}

#[test]
fn test_dupe_zero_is_invalid() {
    let doc = load(&simple_pdf(1).build());
    assert!(matches!(transform::dupe(doc, 0), Err(Error::InvalidCount(0))));
}

#[test]
fn test_merge_files() {
    let a = load(&simple_pdf(2).build());
    let b = load(&nested_pdf().version("1.4").build());
    let out = round_trip(&transform::merge(vec![a, b]).unwrap());
    assert_eq!(out.version, "1.7");
    assert_eq!(
        page_contents(&out),
        vec!["page 1", "page 2", "page 1", "page 2", "page 3"]
    );
    assert_eq!(rotations(&out), vec![0, 0, 90, 90, 180]);
}

#[test]
fn test_merge_then_split_restores_inputs() {
    let a = load(&simple_pdf(2).build());
    let b = load(&simple_pdf(3).build());
    let merged = transform::merge(vec![a, b]).unwrap();
    let parts = transform::split(&merged, &Grouping::Groups(vec![2, 3])).unwrap();

    assert_eq!(page_contents(&parts[0]), vec!["page 1", "page 2"]);
    assert_eq!(page_contents(&parts[1]), vec!["page 1", "page 2", "page 3"]);
}

#[test]
fn test_split_outputs_hold_only_their_objects() {
    let doc = load(&simple_pdf(4).build());
    let parts = transform::split(&doc, &Grouping::Chunks(3)).unwrap();
    assert_eq!(parts.len(), 2);
    let written = round_trip(&parts[1]);
    assert_eq!(page_contents(&written), vec!["page 4"]);
    assert_eq!(written.objects.len(), 4);
}

#[test]
fn test_transform_output_is_consistent() {
    let doc = load(&nested_pdf().build());
    let out = transform::extract(doc, &selection("2")).unwrap();
    transform::check_consistency(&out).unwrap();
    let root = page_tree::root_pages_ref(&out).unwrap();
    let node = out.objects.get_dict(root).unwrap();
    assert_eq!(node.get("Count"), Some(&Object::Integer(1)));
}
