//! Page tree flattening and rebuilding.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.7.3 - Page Tree
//!
//! Transforms never edit the tree in place. They [`flatten`] it into an ordered
//! [`PageList`], rearrange the list, and [`rebuild`] a single flat `/Pages` node from
//! the result. Attributes a page inherits from its ancestors are captured during
//! flattening and written onto the page during rebuilding, so dropping the old
//! intermediate nodes loses nothing.

use std::collections::HashSet;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};

/// Attributes a page may inherit from an ancestor `/Pages` node.
pub const INHERITABLE_KEYS: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Deepest page tree accepted.
const MAX_TREE_DEPTH: usize = 256;

/// Effective values of the inheritable page attributes.
///
/// Each field holds the page's own value when it defines one, otherwise the value of
/// the nearest ancestor that does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InheritedAttributes {
    /// `/Resources`
    pub resources: Option<Object>,
    /// `/MediaBox`
    pub media_box: Option<Object>,
    /// `/CropBox`
    pub crop_box: Option<Object>,
    /// `/Rotate`, resolved to an integer
    pub rotate: Option<i64>,
}

impl InheritedAttributes {
    /// Value for one of [`INHERITABLE_KEYS`].
    pub fn get(&self, key: &str) -> Option<Object> {
        match key {
            "Resources" => self.resources.clone(),
            "MediaBox" => self.media_box.clone(),
            "CropBox" => self.crop_box.clone(),
            "Rotate" => self.rotate.map(Object::Integer),
            _ => None,
        }
    }

    /// Effective rotation in degrees, 0 when nothing defines one.
    pub fn rotation(&self) -> i64 {
        self.rotate.unwrap_or(0)
    }

    /// Overlay the attributes `node` defines on top of the ones inherited so far.
    fn overlay(&self, node: &Dictionary, doc: &Document) -> Result<Self> {
        let mut next = self.clone();
        if let Some(v) = node.get("Resources") {
            next.resources = Some(v.clone());
        }
        if let Some(v) = node.get("MediaBox") {
            next.media_box = Some(v.clone());
        }
        if let Some(v) = node.get("CropBox") {
            next.crop_box = Some(v.clone());
        }
        if let Some(v) = node.get("Rotate") {
            let degrees = doc.objects.resolve(v)?;
            // Real is tolerated for /Rotate 90.0
            let degrees = match degrees {
                Object::Real(r) => *r as i64,
                other => other.try_integer()?,
            };
            next.rotate = Some(degrees);
        }
        Ok(next)
    }
}

/// One page of a flattened page tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatPage {
    /// The page object
    pub reference: ObjectRef,
    /// Effective inheritable attributes
    pub inherited: InheritedAttributes,
}

/// Pages in document order.
pub type PageList = Vec<FlatPage>;

/// Reference to the root `/Pages` node of `doc`.
pub fn root_pages_ref(doc: &Document) -> Result<ObjectRef> {
    doc.catalog()?
        .get("Pages")
        .and_then(Object::as_reference)
        .ok_or_else(|| Error::InvalidPageTree("catalog has no /Pages reference".to_string()))
}

/// Collect every page leaf in document order, depth first, left to right.
///
/// # Errors
///
/// - [`Error::CyclicPageTree`] if a node is its own ancestor
/// - [`Error::InvalidPageTree`] for a kid that is neither a Page nor a Pages node, or
///   a page listed twice
/// - [`Error::UnresolvableReference`] for a kid that is not in the object table
pub fn flatten(doc: &Document) -> Result<PageList> {
    let root = root_pages_ref(doc)?;
    let mut walker = Flattener {
        doc,
        path: Vec::new(),
        emitted: HashSet::new(),
        pages: Vec::new(),
    };
    walker.visit(root, &InheritedAttributes::default())?;
    log::debug!("Flattened page tree: {} pages", walker.pages.len());
    Ok(walker.pages)
}

/// Number of pages in `doc`.
pub fn page_count(doc: &Document) -> Result<usize> {
    Ok(flatten(doc)?.len())
}

struct Flattener<'d> {
    doc: &'d Document,
    path: Vec<ObjectRef>,
    emitted: HashSet<ObjectRef>,
    pages: PageList,
}

impl Flattener<'_> {
    fn visit(&mut self, node_ref: ObjectRef, inherited: &InheritedAttributes) -> Result<()> {
        if self.path.contains(&node_ref) {
            return Err(Error::CyclicPageTree(node_ref));
        }
        if self.path.len() >= MAX_TREE_DEPTH {
            return Err(Error::InvalidPageTree(format!(
                "page tree deeper than {} levels",
                MAX_TREE_DEPTH
            )));
        }

        let doc = self.doc;
        let node = doc.objects.get_dict(node_ref)?;
        let attributes = inherited.overlay(node, doc)?;

        match node_kind(node) {
            Some(NodeKind::Page) => {
                if !self.emitted.insert(node_ref) {
                    return Err(Error::InvalidPageTree(format!(
                        "page {} appears more than once",
                        node_ref
                    )));
                }
                self.pages.push(FlatPage {
                    reference: node_ref,
                    inherited: attributes,
                });
            },
            Some(NodeKind::Pages) => {
                let kids = match node.get("Kids") {
                    Some(kids) => doc.objects.resolve(kids)?.try_array()?,
                    None => return Ok(()),
                };
                self.path.push(node_ref);
                for kid in kids {
                    let kid_ref = kid.as_reference().ok_or_else(|| {
                        Error::InvalidPageTree(format!(
                            "/Kids of {} holds a direct {}",
                            node_ref,
                            kid.type_name()
                        ))
                    })?;
                    self.visit(kid_ref, &attributes)?;
                }
                self.path.pop();
            },
            None => {
                return Err(Error::InvalidPageTree(format!(
                    "{} is neither a Page nor a Pages node",
                    node_ref
                )))
            },
        }
        Ok(())
    }
}

enum NodeKind {
    Page,
    Pages,
}

fn node_kind(node: &Dictionary) -> Option<NodeKind> {
    match node.get("Type").and_then(Object::as_name) {
        Some("Page") => Some(NodeKind::Page),
        Some("Pages") => Some(NodeKind::Pages),
        // Some writers omit /Type on intermediate nodes
        None if node.contains_key("Kids") => Some(NodeKind::Pages),
        _ => None,
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    matches!(object, Object::Dictionary(_))
        && matches!(object.dict_type(), Some("Page") | Some("Pages"))
}

/// Replace the page tree of `doc` with one flat `/Pages` node listing `pages` in order.
///
/// Every page gets `/Parent` pointing at the new node and receives the inherited
/// attributes it does not define itself. Page tree nodes that are not in `pages` are
/// removed from the table, and references to them elsewhere become `null`.
///
/// Returns the reference of the new `/Pages` node.
///
/// # Errors
///
/// - [`Error::DuplicatePageEntry`] if a reference appears twice in `pages`
/// - [`Error::UnresolvableReference`] if a page is not in the table
pub fn rebuild(doc: &mut Document, pages: &[FlatPage]) -> Result<ObjectRef> {
    let mut listed = HashSet::with_capacity(pages.len());
    for page in pages {
        if !listed.insert(page.reference) {
            return Err(Error::DuplicatePageEntry(page.reference));
        }
        doc.objects.get_dict(page.reference)?;
    }

    let stale: HashSet<ObjectRef> = doc
        .objects
        .iter()
        .filter(|(r, obj)| !listed.contains(r) && is_page_tree_node(obj))
        .map(|(r, _)| r)
        .collect();

    if !stale.is_empty() {
        for (_, object) in doc.objects.iter_mut() {
            object.map_references(&mut |r| {
                if stale.contains(&r) {
                    Object::Null
                } else {
                    Object::Reference(r)
                }
            });
        }
        doc.objects.retain(|r, _| !stale.contains(&r));
        log::debug!("Dropped {} page tree nodes", stale.len());
    }

    let node_ref = doc.objects.allocate();
    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let dict = doc.objects.get_dict_mut(page.reference)?;
        dict.insert("Parent".to_string(), Object::Reference(node_ref));
        for key in INHERITABLE_KEYS {
            if !dict.contains_key(key) {
                if let Some(value) = page.inherited.get(key) {
                    dict.insert(key.to_string(), value);
                }
            }
        }
        kids.push(Object::Reference(page.reference));
    }

    let mut node = Dictionary::new();
    node.insert("Type".to_string(), Object::name("Pages"));
    node.insert("Kids".to_string(), Object::Array(kids));
    node.insert("Count".to_string(), Object::Integer(pages.len() as i64));
    doc.objects.insert(node_ref, Object::Dictionary(node));

    doc.catalog_mut()?
        .insert("Pages".to_string(), Object::Reference(node_ref));

    Ok(node_ref)
}
