//! Indirect object table.
//!
//! Every indirect object of a document lives here, keyed by its [`ObjectRef`].
//! References between objects are plain keys into this table, so an object graph
//! with shared resources and back-pointers (`/Parent`) needs no shared ownership.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};

/// Longest reference chain [`ObjectTable::resolve`] follows.
const MAX_RESOLVE_DEPTH: usize = 32;

/// Owning map from object references to objects, iterated in reference order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectTable {
    objects: BTreeMap<ObjectRef, Object>,
}

impl ObjectTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an object.
    pub fn get(&self, reference: ObjectRef) -> Option<&Object> {
        self.objects.get(&reference)
    }

    /// Look up an object for modification.
    pub fn get_mut(&mut self, reference: ObjectRef) -> Option<&mut Object> {
        self.objects.get_mut(&reference)
    }

    /// Look up an object, failing with [`Error::UnresolvableReference`] when it is absent.
    pub fn require(&self, reference: ObjectRef) -> Result<&Object> {
        self.get(reference)
            .ok_or(Error::UnresolvableReference(reference))
    }

    /// Insert or replace an object, returning the previous one.
    pub fn insert(&mut self, reference: ObjectRef, object: Object) -> Option<Object> {
        self.objects.insert(reference, object)
    }

    /// Remove an object.
    pub fn remove(&mut self, reference: ObjectRef) -> Option<Object> {
        self.objects.remove(&reference)
    }

    /// True if the table holds `reference`.
    pub fn contains(&self, reference: ObjectRef) -> bool {
        self.objects.contains_key(&reference)
    }

    /// Follow `object` through references until a direct object is reached.
    ///
    /// A direct object is returned as is. Chains longer than a fixed limit are treated
    /// as cycles.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        let mut current = object;
        for _ in 0..MAX_RESOLVE_DEPTH {
            match current {
                Object::Reference(r) => current = self.require(*r)?,
                direct => return Ok(direct),
            }
        }
        Err(Error::parse(
            0,
            format!("reference chain starting at {:?} is too long or cyclic", object.as_reference()),
        ))
    }

    /// Dictionary (or stream dictionary) stored at `reference`.
    pub fn get_dict(&self, reference: ObjectRef) -> Result<&Dictionary> {
        self.resolve(self.require(reference)?)?.try_dict()
    }

    /// Mutable dictionary (or stream dictionary) stored at `reference`.
    pub fn get_dict_mut(&mut self, reference: ObjectRef) -> Result<&mut Dictionary> {
        self.objects
            .get_mut(&reference)
            .ok_or(Error::UnresolvableReference(reference))?
            .try_dict_mut()
    }

    /// Reserve the next unused object number.
    ///
    /// The slot holds `null` until it is overwritten with [`ObjectTable::insert`].
    pub fn allocate(&mut self) -> ObjectRef {
        let reference = ObjectRef::new(self.max_id() + 1, 0);
        self.objects.insert(reference, Object::Null);
        reference
    }

    /// Store `object` under a freshly allocated reference.
    pub fn add(&mut self, object: Object) -> ObjectRef {
        let reference = self.allocate();
        self.objects.insert(reference, object);
        reference
    }

    /// Highest object number in use (0 for an empty table).
    pub fn max_id(&self) -> u32 {
        self.objects.keys().next_back().map_or(0, |r| r.id)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate in reference order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, &Object)> {
        self.objects.iter().map(|(r, o)| (*r, o))
    }

    /// Iterate mutably in reference order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectRef, &mut Object)> {
        self.objects.iter_mut().map(|(r, o)| (*r, o))
    }

    /// Keep only the objects for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(ObjectRef, &Object) -> bool) {
        self.objects.retain(|r, o| keep(*r, o));
    }

    /// Every object reachable from `roots`, in breadth-first discovery order.
    ///
    /// Roots come first, in the order given. Fails with
    /// [`Error::UnresolvableReference`] on the first reference the table cannot satisfy.
    pub fn reachable_from(
        &self,
        roots: impl IntoIterator<Item = ObjectRef>,
    ) -> Result<Vec<ObjectRef>> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        for root in roots {
            if seen.insert(root) {
                queue.push_back(root);
            }
        }

        while let Some(reference) = queue.pop_front() {
            let object = self.require(reference)?;
            order.push(reference);
            object.walk_references(&mut |child| {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            });
        }

        Ok(order)
    }
}

impl FromIterator<(ObjectRef, Object)> for ObjectTable {
    fn from_iter<I: IntoIterator<Item = (ObjectRef, Object)>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ObjectTable {
    type Item = (ObjectRef, Object);
    type IntoIter = std::collections::btree_map::IntoIter<ObjectRef, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: u32) -> ObjectRef {
        ObjectRef::new(id, 0)
    }

    fn dict(entries: &[(&str, Object)]) -> Object {
        Object::Dictionary(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_allocate_uses_next_id() {
        let mut table = ObjectTable::new();
        assert_eq!(table.max_id(), 0);
        table.insert(r(7), Object::Integer(1));
        let a = table.allocate();
        let b = table.add(Object::Boolean(true));
        assert_eq!(a, r(8));
        assert_eq!(b, r(9));
        assert_eq!(table.get(a), Some(&Object::Null));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_resolve_follows_chain() {
        let mut table = ObjectTable::new();
        table.insert(r(1), Object::Reference(r(2)));
        table.insert(r(2), Object::Integer(42));
        let start = Object::Reference(r(1));
        assert_eq!(table.resolve(&start).unwrap(), &Object::Integer(42));
    }

    #[test]
    fn test_resolve_detects_cycle() {
        let mut table = ObjectTable::new();
        table.insert(r(1), Object::Reference(r(2)));
        table.insert(r(2), Object::Reference(r(1)));
        assert!(table.resolve(&Object::Reference(r(1))).is_err());
    }

    #[test]
    fn test_get_dict_errors() {
        let mut table = ObjectTable::new();
        table.insert(r(1), Object::Integer(3));
        assert!(matches!(table.get_dict(r(1)), Err(Error::TypeMismatch { .. })));
        assert!(matches!(table.get_dict(r(2)), Err(Error::UnresolvableReference(_))));
    }

    #[test]
    fn test_reachable_from_is_breadth_first() {
        let mut table = ObjectTable::new();
        table.insert(r(1), dict(&[("A", Object::Reference(r(2))), ("B", Object::Reference(r(3)))]));
        table.insert(r(2), dict(&[("C", Object::Reference(r(4)))]));
        table.insert(r(3), Object::Array(vec![Object::Reference(r(1))]));
        table.insert(r(4), Object::Integer(0));
        table.insert(r(5), Object::Integer(0));

        let order = table.reachable_from([r(1)]).unwrap();
        assert_eq!(order, vec![r(1), r(2), r(3), r(4)]);
    }

    #[test]
    fn test_reachable_from_reports_dangling() {
        let mut table = ObjectTable::new();
        table.insert(r(1), dict(&[("Missing", Object::Reference(r(9)))]));
        match table.reachable_from([r(1)]) {
            Err(Error::UnresolvableReference(missing)) => assert_eq!(missing, r(9)),
            other => panic!("expected UnresolvableReference, got {:?}", other),
        }
    }
}
