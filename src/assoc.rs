//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Adapters for two-dimensional (associative) containers.
//!
//! Maps and multimaps are encoded as a list branch holding each pair as two
//! adjacent children: the key with tag 0 followed by the value with tag 1.

use std::collections::{BTreeMap, HashMap};
use std::collections::btree_map;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use adapt::{ByValue, Element, Storage};
use creator::NodeCreator;
use marshal::{Error, Marshalable, Result};
use node::{Branch, BranchKind, ListBranch, Node};
use wire::Tag;

/// A sorted map which may hold several values per key.
///
/// Values under the same key keep their insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultiMap<K, V> {
    map: BTreeMap<K, Vec<V>>,
    len: usize,
}

impl<K : Ord, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        MultiMap { map: BTreeMap::new(), len: 0 }
    }
}

impl<K : Ord, V> MultiMap<K, V> {
    /// Creates an empty multimap.
    pub fn new() -> Self {
        MultiMap::default()
    }

    /// Adds `value` under `key` after any values already there.
    pub fn insert(&mut self, key: K, value: V) {
        self.map.entry(key).or_insert_with(Vec::new).push(value);
        self.len += 1;
    }

    /// Returns the values under `key`, oldest first.
    pub fn get(&self, key: &K) -> &[V] {
        self.map.get(key).map(|v| &v[..]).unwrap_or(&[])
    }

    /// Returns the total number of values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether there are no values.
    pub fn is_empty(&self) -> bool {
        0 == self.len
    }

    /// Returns the number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.map.len()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.map.clear();
        self.len = 0;
    }

    /// Iterates over every key/value pair in key order.
    pub fn iter(&self) -> Iter<K, V> {
        Iter { outer: self.map.iter(), inner: None }
    }
}

/// Iterator over the pairs of a `MultiMap`.
#[derive(Debug, Clone)]
pub struct Iter<'a, K : 'a, V : 'a> {
    outer: btree_map::Iter<'a, K, Vec<V>>,
    inner: Option<(&'a K, ::std::slice::Iter<'a, V>)>,
}

impl<'a, K : 'a, V : 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        loop {
            if let Some((ref key, ref mut values)) = self.inner {
                if let Some(value) = values.next() {
                    return Some((*key, value));
                }
            }

            match self.outer.next() {
                Some((key, values)) => self.inner = Some((key, values.iter())),
                None => return None,
            }
        }
    }
}

/// Containers of key/value pairs which adapters can fill.
pub trait Associative {
    /// The key type.
    type Key;
    /// The stored value type.
    type Val;

    /// Returns the number of pairs.
    fn pair_count(&self) -> usize;
    /// Calls `f` on each pair, stopping at the first error.
    fn try_each_pair<F>(&self, f: F) -> Result<()>
    where F : FnMut(&Self::Key, &Self::Val) -> Result<()>;
    /// Calls `f` on each value.
    fn each_val_mut<F>(&mut self, f: F)
    where F : FnMut(&mut Self::Val);
    /// Adds a pair. Maps replace any existing value for `key`.
    fn insert_pair(&mut self, key: Self::Key, val: Self::Val);
    /// Removes and drops every pair.
    fn clear_pairs(&mut self);
}

impl<K : Ord, V> Associative for BTreeMap<K, V> {
    type Key = K;
    type Val = V;

    fn pair_count(&self) -> usize { self.len() }

    fn try_each_pair<F>(&self, mut f: F) -> Result<()>
    where F : FnMut(&K, &V) -> Result<()> {
        for (k, v) in self { f(k, v)?; }
        Ok(())
    }

    fn each_val_mut<F>(&mut self, f: F) where F : FnMut(&mut V) {
        self.values_mut().for_each(f);
    }

    fn insert_pair(&mut self, key: K, val: V) { self.insert(key, val); }
    fn clear_pairs(&mut self) { self.clear(); }
}

impl<K : Eq + Hash, V, H : BuildHasher> Associative for HashMap<K, V, H> {
    type Key = K;
    type Val = V;

    fn pair_count(&self) -> usize { self.len() }

    fn try_each_pair<F>(&self, mut f: F) -> Result<()>
    where F : FnMut(&K, &V) -> Result<()> {
        for (k, v) in self { f(k, v)?; }
        Ok(())
    }

    fn each_val_mut<F>(&mut self, f: F) where F : FnMut(&mut V) {
        self.values_mut().for_each(f);
    }

    fn insert_pair(&mut self, key: K, val: V) { self.insert(key, val); }
    fn clear_pairs(&mut self) { self.clear(); }
}

impl<K : Ord, V> Associative for MultiMap<K, V> {
    type Key = K;
    type Val = V;

    fn pair_count(&self) -> usize { self.len() }

    fn try_each_pair<F>(&self, mut f: F) -> Result<()>
    where F : FnMut(&K, &V) -> Result<()> {
        for (k, v) in self.iter() { f(k, v)?; }
        Ok(())
    }

    fn each_val_mut<F>(&mut self, mut f: F) where F : FnMut(&mut V) {
        for values in self.map.values_mut() {
            values.iter_mut().for_each(&mut f);
        }
    }

    fn insert_pair(&mut self, key: K, val: V) { self.insert(key, val); }
    fn clear_pairs(&mut self) { self.clear(); }
}

const KEY_TAG: Tag = 0;
const VALUE_TAG: Tag = 1;

fn encode_pairs<A, KC, VC, E>(keys: &KC, vals: &VC, src: &A,
                              dst: &mut ListBranch) -> Result<()>
where A : Associative<Key = KC::Value, Val = E::Stored>,
      E : Element<Value = VC::Value>,
      KC : NodeCreator, KC::Value : Sized,
      VC : NodeCreator, VC::Value : Sized {
    src.try_each_pair(|k, v| {
        dst.push(keys.make_node(k, KEY_TAG)?);
        dst.push(vals.make_node(E::convert(v), VALUE_TAG)?);
        Ok(())
    })
}

fn decode_pairs<A, KC, VC, E>(keys: &KC, vals: &VC, src: &ListBranch,
                              dst: &mut A) -> Result<()>
where A : Associative<Key = KC::Value, Val = E::Stored>,
      E : Element<Value = VC::Value>,
      KC : NodeCreator, KC::Value : Default,
      VC : NodeCreator, VC::Value : Default {
    let children = src.children();
    for pair in children.chunks(2) {
        let mut key = KC::Value::default();
        keys.fill_from(&pair[0], &mut key)?;
        let mut val = VC::Value::default();
        vals.fill_from(&pair[1], &mut val)?;
        dst.insert_pair(key, E::adopt(val));
    }
    Ok(())
}

fn check_paired(src: &ListBranch) -> Result<()> {
    if 0 == src.len() % 2 {
        Ok(())
    } else {
        Err(Error::UnpairedKey(src.len()))
    }
}

fn clear_pairs<A, VC, E>(vals: &VC, dst: &mut A)
where A : Associative<Val = E::Stored>,
      E : Element<Value = VC::Value>,
      VC : NodeCreator, VC::Value : Sized {
    if !E::OWNS_POINTER {
        dst.each_val_mut(|v| vals.clear(E::convert_mut(v)));
    }
    dst.clear_pairs();
}

/// Makes a map or multimap `Marshalable`.
///
/// `KC` encodes keys and `VC` encodes values; `E` describes how the
/// container stores its values.
pub struct AssocAdapter<'a, A : 'a, KC, VC, E> {
    storage: Storage<'a, A>,
    keys: KC,
    vals: VC,
    _element: PhantomData<E>,
}

impl<'a, A : 'a, KC, VC, E> AssocAdapter<'a, A, KC, VC, E>
where A : Associative<Key = KC::Value, Val = E::Stored>,
      E : Element<Value = VC::Value>,
      KC : NodeCreator, KC::Value : Default,
      VC : NodeCreator, VC::Value : Default {
    /// Creates a native adapter around an empty container.
    pub fn native(keys: KC, vals: VC) -> Self where A : Default {
        AssocAdapter::owning(A::default(), keys, vals)
    }

    /// Creates a native adapter which takes ownership of `container`.
    pub fn owning(container: A, keys: KC, vals: VC) -> Self {
        AssocAdapter {
            storage: Storage::Owned(container),
            keys: keys,
            vals: vals,
            _element: PhantomData,
        }
    }

    /// Creates an adapter over a container owned by the caller.
    ///
    /// Decoding inserts into `container` without removing anything.
    pub fn borrowing(container: &'a mut A, keys: KC, vals: VC) -> Self {
        AssocAdapter {
            storage: Storage::Borrowed(container),
            keys: keys,
            vals: vals,
            _element: PhantomData,
        }
    }

    /// Returns whether this adapter owns its container.
    pub fn is_native(&self) -> bool {
        self.storage.is_owned()
    }

    /// Returns the container.
    pub fn get(&self) -> &A {
        self.storage.get()
    }

    /// Returns the container if it is owned by this adapter.
    pub fn into_inner(self) -> Option<A> {
        match self.storage {
            Storage::Owned(a) => Some(a),
            Storage::Borrowed(_) => None,
        }
    }

    /// Releases every pair of a native container.
    pub fn clear(&mut self) {
        if let Storage::Owned(ref mut a) = self.storage {
            clear_pairs::<A, VC, E>(&self.vals, a);
        }
    }
}

impl<'a, A : 'a, KC, VC, E> Marshalable for AssocAdapter<'a, A, KC, VC, E>
where A : Associative<Key = KC::Value, Val = E::Stored>,
      E : Element<Value = VC::Value>,
      KC : NodeCreator, KC::Value : Default,
      VC : NodeCreator, VC::Value : Default {
    fn branch_kind(&self) -> BranchKind { BranchKind::List }

    fn class_to_tree(&self, dst: &mut Branch) -> Result<()> {
        encode_pairs::<A, KC, VC, E>(&self.keys, &self.vals,
                                     self.storage.get(),
                                     dst.expect_list_mut()?)
    }

    fn tree_to_class(&mut self, src: &Branch) -> Result<()> {
        let list = src.expect_list()?;
        check_paired(list)?;
        self.clear();
        decode_pairs::<A, KC, VC, E>(&self.keys, &self.vals, list,
                                     self.storage.get_mut())
    }
}

/// Creator for maps and multimaps nested inside other values.
///
/// Decoding always replaces the previous content.
pub struct AssocCreator<A, KC, VC, E> {
    keys: KC,
    vals: VC,
    _marker: PhantomData<(A, E)>,
}

impl<A, KC, VC, E> AssocCreator<A, KC, VC, E> {
    /// Returns a creator using `keys` and `vals` for each pair.
    pub fn new(keys: KC, vals: VC) -> Self {
        AssocCreator { keys: keys, vals: vals, _marker: PhantomData }
    }
}

impl<A, KC, VC, E> NodeCreator for AssocCreator<A, KC, VC, E>
where A : Associative<Key = KC::Value, Val = E::Stored>,
      E : Element<Value = VC::Value>,
      KC : NodeCreator, KC::Value : Default,
      VC : NodeCreator, VC::Value : Default {
    type Value = A;

    fn make_node(&self, value: &A, tag: Tag) -> Result<Node> {
        let mut list = ListBranch::with_capacity(2 * value.pair_count());
        encode_pairs::<A, KC, VC, E>(&self.keys, &self.vals, value,
                                     &mut list)?;
        Ok(Node::branch(tag, Branch::List(list)))
    }

    fn fill_from(&self, node: &Node, out: &mut A) -> Result<()> {
        let list = node.expect_branch(BranchKind::List)?.expect_list()?;
        check_paired(list)?;
        self.clear(out);
        decode_pairs::<A, KC, VC, E>(&self.keys, &self.vals, list, out)
    }

    fn clear(&self, value: &mut A) {
        clear_pairs::<A, VC, E>(&self.vals, value);
    }
}

/// Returns a creator for `BTreeMap`s.
pub fn map_of<KC, VC>(keys: KC, vals: VC)
                      -> AssocCreator<BTreeMap<KC::Value, VC::Value>,
                                      KC, VC, ByValue<VC::Value>>
where KC : NodeCreator, KC::Value : Default + Ord,
      VC : NodeCreator, VC::Value : Default {
    AssocCreator::new(keys, vals)
}

/// Returns a creator for `MultiMap`s.
pub fn multimap_of<KC, VC>(keys: KC, vals: VC)
                           -> AssocCreator<MultiMap<KC::Value, VC::Value>,
                                           KC, VC, ByValue<VC::Value>>
where KC : NodeCreator, KC::Value : Default + Ord,
      VC : NodeCreator, VC::Value : Default {
    AssocCreator::new(keys, vals)
}

#[cfg(test)]
mod test {
    use super::*;
    use adapt::Boxed;
    use creator::{MarshalableCreator, ScalarCreator, StringCreator};
    use marshal::{from_bytes, to_bytes};
    use node::Config;
    use test_helpers::{self, parse, Tracked};

    #[test]
    fn map_pairs_are_adjacent_siblings() {
        let mut src = BTreeMap::new();
        src.insert(2u8, "b".to_owned());
        src.insert(1u8, "a".to_owned());
        let adapter = AssocAdapter::<_, _, _, ByValue<String>>::owning(
            src, ScalarCreator::<u8>::new(), StringCreator);

        assert_eq!(&parse("0C 00 00 00 00 1A
                           04 00 00 00 00 01 08 01 00 00 00 01 'a'
                           04 00 00 00 00 02 08 01 00 00 00 01 'b'")[..],
                   &to_bytes(&adapter).unwrap()[..]);
    }

    #[test]
    fn map_round_trip() {
        let mut src = HashMap::new();
        src.insert("tuner".to_owned(), 3u32);
        src.insert("hdmi".to_owned(), 1u32);
        src.insert(String::new(), 0u32);
        let bytes = to_bytes(&AssocAdapter::<_, _, _, ByValue<u32>>::owning(
            src.clone(), StringCreator, ScalarCreator::<u32>::new())).unwrap();

        let mut dst = AssocAdapter::<HashMap<String, u32>, _, _,
                                     ByValue<u32>>::native(
            StringCreator, ScalarCreator::<u32>::new());
        from_bytes(&bytes, &Config::default(), &mut dst).unwrap();
        assert_eq!(&src, dst.get());
    }

    #[test]
    fn empty_map_round_trip() {
        let adapter = AssocAdapter::<BTreeMap<u32, u32>, _, _,
                                     ByValue<u32>>::native(
            ScalarCreator::<u32>::new(), ScalarCreator::<u32>::new());
        let bytes = to_bytes(&adapter).unwrap();
        assert_eq!(&parse("0C 00 00 00 00 00")[..], &bytes[..]);

        let mut seeded = BTreeMap::new();
        seeded.insert(1u32, 1u32);
        let mut dst = AssocAdapter::<_, _, _, ByValue<u32>>::owning(
            seeded, ScalarCreator::<u32>::new(), ScalarCreator::<u32>::new());
        from_bytes(&bytes, &Config::default(), &mut dst).unwrap();
        assert!(dst.get().is_empty());
    }

    #[test]
    fn duplicate_keys_keep_last_value_in_map() {
        let mut src = MultiMap::new();
        src.insert(1u32, 10u32);
        src.insert(1u32, 11u32);
        src.insert(2u32, 20u32);
        let bytes = to_bytes(&AssocAdapter::<_, _, _, ByValue<u32>>::owning(
            src.clone(), ScalarCreator::<u32>::new(),
            ScalarCreator::<u32>::new())).unwrap();

        let mut map = AssocAdapter::<BTreeMap<u32, u32>, _, _,
                                     ByValue<u32>>::native(
            ScalarCreator::<u32>::new(), ScalarCreator::<u32>::new());
        from_bytes(&bytes, &Config::default(), &mut map).unwrap();
        assert_eq!(2, map.get().len());
        assert_eq!(Some(&11), map.get().get(&1));

        let mut multi = AssocAdapter::<MultiMap<u32, u32>, _, _,
                                       ByValue<u32>>::native(
            ScalarCreator::<u32>::new(), ScalarCreator::<u32>::new());
        from_bytes(&bytes, &Config::default(), &mut multi).unwrap();
        assert_eq!(&src, multi.get());
        assert_eq!(&[10u32, 11][..], multi.get().get(&1));
    }

    #[test]
    fn odd_child_count_rejected_before_decoding() {
        let mut list = ListBranch::new();
        list.push(Node::fixed(0, 1));
        list.push(Node::fixed(1, 2));
        list.push(Node::fixed(0, 3));

        let mut seeded = BTreeMap::new();
        seeded.insert(9u32, 9u32);
        let mut dst = AssocAdapter::<_, _, _, ByValue<u32>>::owning(
            seeded, ScalarCreator::<u32>::new(), ScalarCreator::<u32>::new());
        match dst.tree_to_class(&Branch::List(list)) {
            Err(Error::UnpairedKey(3)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        assert_eq!(Some(&9), dst.get().get(&9));
    }

    #[test]
    fn borrowed_map_is_merged_into() {
        let mut src = BTreeMap::new();
        src.insert(1u32, "new".to_owned());
        let bytes = to_bytes(&AssocAdapter::<_, _, _, ByValue<String>>::owning(
            src, ScalarCreator::<u32>::new(), StringCreator)).unwrap();

        let mut target = BTreeMap::new();
        target.insert(1u32, "old".to_owned());
        target.insert(2u32, "kept".to_owned());
        {
            let mut dst = AssocAdapter::<_, _, _, ByValue<String>>::borrowing(
                &mut target, ScalarCreator::<u32>::new(), StringCreator);
            assert!(!dst.is_native());
            from_bytes(&bytes, &Config::default(), &mut dst).unwrap();
        }
        assert_eq!("new", target[&1]);
        assert_eq!("kept", target[&2]);
    }

    #[test]
    fn boxed_values_are_freed_on_refill() {
        let bytes = {
            let mut src = BTreeMap::new();
            src.insert(1u32, Box::new(Tracked::new(1, "a")));
            src.insert(2u32, Box::new(Tracked::new(2, "b")));
            to_bytes(&AssocAdapter::<_, _, _, Boxed<Tracked>>::owning(
                src, ScalarCreator::<u32>::new(), MarshalableCreator::new()))
                .unwrap()
        };

        test_helpers::reset_counters();
        {
            let mut dst = AssocAdapter::<BTreeMap<u32, Box<Tracked>>, _, _,
                                         Boxed<Tracked>>::native(
                ScalarCreator::<u32>::new(), MarshalableCreator::new());
            from_bytes(&bytes, &Config::default(), &mut dst).unwrap();
            from_bytes(&bytes, &Config::default(), &mut dst).unwrap();
            assert_eq!("b", dst.get()[&2].label);
            assert_eq!(4, test_helpers::allocated());
            assert_eq!(2, test_helpers::live());
        }
        assert_eq!(0, test_helpers::live());
    }

    #[test]
    fn nested_map_creator() {
        let creator = map_of(StringCreator, multimap_of(
            ScalarCreator::<u8>::new(), StringCreator));

        let mut inner = MultiMap::new();
        inner.insert(1u8, "x".to_owned());
        inner.insert(1u8, "y".to_owned());
        let mut src = BTreeMap::new();
        src.insert("k".to_owned(), inner);
        src.insert("empty".to_owned(), MultiMap::new());

        let node = creator.make_node(&src, 3).unwrap();
        let mut dst = BTreeMap::new();
        dst.insert("stale".to_owned(), MultiMap::new());
        creator.fill_from(&node, &mut dst).unwrap();
        assert_eq!(src, dst);
    }

    #[test]
    fn multimap_iterates_in_key_order() {
        let mut m = MultiMap::new();
        m.insert(2, 'c');
        m.insert(1, 'a');
        m.insert(1, 'b');
        assert_eq!(3, m.len());
        assert_eq!(2, m.key_count());
        assert_eq!(vec![(&1, &'a'), (&1, &'b'), (&2, &'c')],
                   m.iter().collect::<Vec<_>>());
        assert!(m.get(&3).is_empty());
    }
}
