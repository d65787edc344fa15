//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Adapters which make one-dimensional containers marshalable.
//!
//! A container is encoded as a list branch. If the element creator is
//! array-shaped, the whole container is packed into a single variable leaf
//! child whose length implies the element count; otherwise each element
//! becomes its own child.
//!
//! Adapters either own their container ("native"), in which case they
//! release every element before refilling it, or borrow a container supplied
//! by the caller, in which case decoded elements are appended and nothing
//! already present is touched.

use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use creator::NodeCreator;
use marshal::{Error, Marshalable, Result};
use node::{Branch, BranchKind, ListBranch, Node};
use wire::{NodeKind, Tag};

/// Where an adapter keeps its container.
#[derive(Debug)]
pub enum Storage<'a, S : 'a> {
    /// The adapter owns the container and manages its elements.
    Owned(S),
    /// The container belongs to the caller.
    Borrowed(&'a mut S),
}

impl<'a, S : 'a> Storage<'a, S> {
    /// Returns whether the container is owned.
    pub fn is_owned(&self) -> bool {
        match *self {
            Storage::Owned(_) => true,
            Storage::Borrowed(_) => false,
        }
    }

    /// Returns the container.
    pub fn get(&self) -> &S {
        match *self {
            Storage::Owned(ref s) => s,
            Storage::Borrowed(ref s) => s,
        }
    }

    /// Returns the container mutably.
    pub fn get_mut(&mut self) -> &mut S {
        match *self {
            Storage::Owned(ref mut s) => s,
            Storage::Borrowed(ref mut s) => s,
        }
    }
}

/// Describes how a container stores each element.
///
/// Elements are either held by value or through an owning pointer. Creators
/// always work in terms of `Value`; `convert` maps stored elements to values
/// for encoding and `adopt` wraps decoded values for storage.
pub trait Element {
    /// The type the element creator handles.
    type Value;
    /// The type the container holds.
    type Stored;
    /// Whether `Stored` is an owning pointer.
    const OWNS_POINTER: bool;

    /// Borrows the value of a stored element.
    fn convert(stored: &Self::Stored) -> &Self::Value;
    /// Mutably borrows the value of a stored element.
    fn convert_mut(stored: &mut Self::Stored) -> &mut Self::Value;
    /// Wraps a decoded value for storage.
    fn adopt(value: Self::Value) -> Self::Stored;
}

/// Elements stored directly.
#[derive(Debug)]
pub struct ByValue<T>(PhantomData<T>);

impl<T> Element for ByValue<T> {
    type Value = T;
    type Stored = T;
    const OWNS_POINTER: bool = false;

    fn convert(stored: &T) -> &T { stored }
    fn convert_mut(stored: &mut T) -> &mut T { stored }
    fn adopt(value: T) -> T { value }
}

/// Elements stored in a `Box`.
#[derive(Debug)]
pub struct Boxed<T>(PhantomData<T>);

impl<T> Element for Boxed<T> {
    type Value = T;
    type Stored = Box<T>;
    const OWNS_POINTER: bool = true;

    fn convert(stored: &Box<T>) -> &T { stored }
    fn convert_mut(stored: &mut Box<T>) -> &mut T { stored }
    fn adopt(value: T) -> Box<T> { Box::new(value) }
}

/// One-dimensional containers which adapters can fill.
///
/// Sets implement this too; inserting a duplicate simply has no effect.
pub trait Sequence {
    /// The stored element type.
    type Item;

    /// Returns the number of elements.
    fn item_count(&self) -> usize;
    /// Calls `f` on each element in iteration order, stopping at the first
    /// error.
    fn try_each_item<F>(&self, f: F) -> Result<()>
    where F : FnMut(&Self::Item) -> Result<()>;
    /// Calls `f` on each element which can be mutated in place.
    fn each_item_mut<F>(&mut self, f: F)
    where F : FnMut(&mut Self::Item);
    /// Adds an element at the end, or wherever the container places it.
    fn add_item(&mut self, item: Self::Item);
    /// Removes and drops every element.
    fn clear_items(&mut self);
    /// Hints that `n` more elements are about to be added.
    fn reserve_items(&mut self, _n: usize) { }
}

impl<T> Sequence for Vec<T> {
    type Item = T;

    fn item_count(&self) -> usize { self.len() }

    fn try_each_item<F>(&self, mut f: F) -> Result<()>
    where F : FnMut(&T) -> Result<()> {
        for item in self { f(item)?; }
        Ok(())
    }

    fn each_item_mut<F>(&mut self, f: F) where F : FnMut(&mut T) {
        self.iter_mut().for_each(f);
    }

    fn add_item(&mut self, item: T) { self.push(item); }
    fn clear_items(&mut self) { self.clear(); }
    fn reserve_items(&mut self, n: usize) { self.reserve(n); }
}

impl<T> Sequence for VecDeque<T> {
    type Item = T;

    fn item_count(&self) -> usize { self.len() }

    fn try_each_item<F>(&self, mut f: F) -> Result<()>
    where F : FnMut(&T) -> Result<()> {
        for item in self { f(item)?; }
        Ok(())
    }

    fn each_item_mut<F>(&mut self, f: F) where F : FnMut(&mut T) {
        self.iter_mut().for_each(f);
    }

    fn add_item(&mut self, item: T) { self.push_back(item); }
    fn clear_items(&mut self) { self.clear(); }
    fn reserve_items(&mut self, n: usize) { self.reserve(n); }
}

impl<T> Sequence for LinkedList<T> {
    type Item = T;

    fn item_count(&self) -> usize { self.len() }

    fn try_each_item<F>(&self, mut f: F) -> Result<()>
    where F : FnMut(&T) -> Result<()> {
        for item in self { f(item)?; }
        Ok(())
    }

    fn each_item_mut<F>(&mut self, f: F) where F : FnMut(&mut T) {
        self.iter_mut().for_each(f);
    }

    fn add_item(&mut self, item: T) { self.push_back(item); }
    fn clear_items(&mut self) { self.clear(); }
}

impl<T : Ord> Sequence for BTreeSet<T> {
    type Item = T;

    fn item_count(&self) -> usize { self.len() }

    fn try_each_item<F>(&self, mut f: F) -> Result<()>
    where F : FnMut(&T) -> Result<()> {
        for item in self { f(item)?; }
        Ok(())
    }

    fn each_item_mut<F>(&mut self, _f: F) where F : FnMut(&mut T) { }

    fn add_item(&mut self, item: T) { self.insert(item); }
    fn clear_items(&mut self) { self.clear(); }
}

impl<T : Eq + Hash, H : BuildHasher> Sequence for HashSet<T, H> {
    type Item = T;

    fn item_count(&self) -> usize { self.len() }

    fn try_each_item<F>(&self, mut f: F) -> Result<()>
    where F : FnMut(&T) -> Result<()> {
        for item in self { f(item)?; }
        Ok(())
    }

    fn each_item_mut<F>(&mut self, _f: F) where F : FnMut(&mut T) { }

    fn add_item(&mut self, item: T) { self.insert(item); }
    fn clear_items(&mut self) { self.clear(); }
    fn reserve_items(&mut self, n: usize) { self.reserve(n); }
}

/// Accumulates the children of a list branch for a run of elements.
struct ElementWriter<'c, 'd, C : NodeCreator + ?Sized + 'c> {
    creator: &'c C,
    dst: &'d mut ListBranch,
    packed: Option<Vec<u8>>,
}

impl<'c, 'd, C : NodeCreator + ?Sized + 'c> ElementWriter<'c, 'd, C> {
    fn new(creator: &'c C, dst: &'d mut ListBranch, count: usize) -> Self {
        let packed = if creator.is_array_shaped() {
            Some(Vec::with_capacity(count * creator.element_width()))
        } else {
            None
        };

        ElementWriter { creator: creator, dst: dst, packed: packed }
    }

    fn write(&mut self, value: &C::Value) -> Result<()> {
        match self.packed {
            Some(ref mut buf) => self.creator.pack(value, buf),
            None => self.dst.push_element(self.creator, value),
        }
    }

    fn finish(self, strip_terminator: bool) {
        if let Some(mut buf) = self.packed {
            let width = self.creator.element_width();
            if strip_terminator && self.creator.is_null_terminated_array() &&
                width > 0 && buf.len() >= width &&
                buf[buf.len() - width..].iter().all(|&b| 0 == b)
            {
                let len = buf.len() - width;
                buf.truncate(len);
            }
            self.dst.push(Node::var_owned(0, buf));
        }
    }
}

/// If `creator` is array-shaped, locates the packed elements in `list` and
/// returns them with their count.
fn packed_elements<'n, C : NodeCreator + ?Sized>
    (creator: &C, list: &'n ListBranch) -> Result<Option<(&'n [u8], usize)>>
{
    if !creator.is_array_shaped() {
        return Ok(None);
    }

    let width = creator.element_width();
    if 0 == width {
        return Err(Error::NotArrayShaped);
    }

    let node = match *list.children() {
        [ref node] => node,
        _ => return Err(Error::CountMismatch(1, list.len())),
    };
    let count = node.array_count(width).ok_or(
        Error::ShapeMismatch(NodeKind::VarLeaf, node.kind()))?;
    let blob = node.expect_blob()?;
    if count * width != blob.len() {
        return Err(Error::InvalidValue("partial packed element"));
    }

    Ok(Some((blob, count)))
}

fn encode_sequence<S, E, C>(creator: &C, src: &S, dst: &mut ListBranch)
                            -> Result<()>
where S : Sequence<Item = E::Stored>,
      E : Element<Value = C::Value>,
      C : NodeCreator + ?Sized,
      C::Value : Sized {
    let mut writer = ElementWriter::new(creator, dst, src.item_count());
    src.try_each_item(|item| writer.write(E::convert(item)))?;
    writer.finish(true);
    Ok(())
}

fn decode_sequence<S, E, C>(creator: &C, src: &ListBranch, dst: &mut S)
                            -> Result<()>
where S : Sequence<Item = E::Stored>,
      E : Element<Value = C::Value>,
      C : NodeCreator + ?Sized,
      C::Value : Default {
    if let Some((blob, count)) = packed_elements(creator, src)? {
        let terminated = creator.is_null_terminated_array();
        dst.reserve_items(count + terminated as usize);
        for chunk in blob.chunks(creator.element_width()) {
            let mut value = C::Value::default();
            creator.unpack(chunk, &mut value)?;
            dst.add_item(E::adopt(value));
        }
        if terminated {
            if let Some(terminator) = creator.terminator() {
                dst.add_item(E::adopt(terminator));
            }
        }
    } else {
        dst.reserve_items(src.len());
        for child in src.iter() {
            let mut value = C::Value::default();
            creator.fill_from(child, &mut value)?;
            dst.add_item(E::adopt(value));
        }
    }

    Ok(())
}

fn clear_sequence<S, E, C>(creator: &C, dst: &mut S)
where S : Sequence<Item = E::Stored>,
      E : Element<Value = C::Value>,
      C : NodeCreator + ?Sized,
      C::Value : Sized {
    if !E::OWNS_POINTER {
        dst.each_item_mut(|item| creator.clear(E::convert_mut(item)));
    }
    dst.clear_items();
}

/// Makes a one-dimensional container `Marshalable`.
///
/// `S` is the container, `E` describes how it stores elements, and `C`
/// encodes each element.
pub struct SequenceAdapter<'a, S : 'a, E, C> {
    storage: Storage<'a, S>,
    creator: C,
    _element: PhantomData<E>,
}

impl<'a, S : 'a, E, C> SequenceAdapter<'a, S, E, C>
where S : Sequence<Item = E::Stored>,
      E : Element<Value = C::Value>,
      C : NodeCreator,
      C::Value : Default {
    /// Creates a native adapter around an empty container.
    pub fn native(creator: C) -> Self where S : Default {
        SequenceAdapter::owning(S::default(), creator)
    }

    /// Creates a native adapter which takes ownership of `container`.
    pub fn owning(container: S, creator: C) -> Self {
        SequenceAdapter {
            storage: Storage::Owned(container),
            creator: creator,
            _element: PhantomData,
        }
    }

    /// Creates an adapter over a container owned by the caller.
    ///
    /// Decoding appends to `container` without removing anything.
    pub fn borrowing(container: &'a mut S, creator: C) -> Self {
        SequenceAdapter {
            storage: Storage::Borrowed(container),
            creator: creator,
            _element: PhantomData,
        }
    }

    /// Returns whether this adapter owns its container.
    pub fn is_native(&self) -> bool {
        self.storage.is_owned()
    }

    /// Returns the container.
    pub fn get(&self) -> &S {
        self.storage.get()
    }

    /// Returns the container mutably.
    pub fn get_mut(&mut self) -> &mut S {
        self.storage.get_mut()
    }

    /// Returns the container if it is owned by this adapter.
    pub fn into_inner(self) -> Option<S> {
        match self.storage {
            Storage::Owned(s) => Some(s),
            Storage::Borrowed(_) => None,
        }
    }

    /// Releases every element of a native container.
    ///
    /// Elements held by value are cleared through the element creator first,
    /// so nested containers are emptied recursively. Borrowed containers are
    /// left alone.
    pub fn clear(&mut self) {
        if let Storage::Owned(ref mut s) = self.storage {
            clear_sequence::<S, E, C>(&self.creator, s);
        }
    }
}

impl<'a, S : 'a, E, C> Marshalable for SequenceAdapter<'a, S, E, C>
where S : Sequence<Item = E::Stored>,
      E : Element<Value = C::Value>,
      C : NodeCreator,
      C::Value : Default {
    fn branch_kind(&self) -> BranchKind { BranchKind::List }

    fn class_to_tree(&self, dst: &mut Branch) -> Result<()> {
        encode_sequence::<S, E, C>(
            &self.creator, self.storage.get(), dst.expect_list_mut()?)
    }

    fn tree_to_class(&mut self, src: &Branch) -> Result<()> {
        let list = src.expect_list()?;
        self.clear();
        decode_sequence::<S, E, C>(
            &self.creator, list, self.storage.get_mut())
    }
}

/// Creator for one-dimensional containers nested inside other values.
///
/// Decoding always replaces the previous content.
pub struct SequenceCreator<S, E, C> {
    element: C,
    _marker: PhantomData<(S, E)>,
}

impl<S, E, C> SequenceCreator<S, E, C> {
    /// Returns a creator encoding each element with `element`.
    pub fn new(element: C) -> Self {
        SequenceCreator { element: element, _marker: PhantomData }
    }
}

impl<S, E, C> NodeCreator for SequenceCreator<S, E, C>
where S : Sequence<Item = E::Stored>,
      E : Element<Value = C::Value>,
      C : NodeCreator,
      C::Value : Default {
    type Value = S;

    fn make_node(&self, value: &S, tag: Tag) -> Result<Node> {
        let mut list = ListBranch::with_capacity(1);
        encode_sequence::<S, E, C>(&self.element, value, &mut list)?;
        Ok(Node::branch(tag, Branch::List(list)))
    }

    fn fill_from(&self, node: &Node, out: &mut S) -> Result<()> {
        let list = node.expect_branch(BranchKind::List)?.expect_list()?;
        self.clear(out);
        decode_sequence::<S, E, C>(&self.element, list, out)
    }

    fn clear(&self, value: &mut S) {
        clear_sequence::<S, E, C>(&self.element, value);
    }
}

/// Returns a creator for `Vec`s holding elements by value.
pub fn vec_of<C>(element: C)
                 -> SequenceCreator<Vec<C::Value>, ByValue<C::Value>, C>
where C : NodeCreator, C::Value : Default {
    SequenceCreator::new(element)
}

/// Returns a creator for `Vec`s holding boxed elements.
pub fn boxed_vec_of<C>(element: C)
                       -> SequenceCreator<Vec<Box<C::Value>>,
                                          Boxed<C::Value>, C>
where C : NodeCreator, C::Value : Default {
    SequenceCreator::new(element)
}

/// Returns a creator for `BTreeSet`s.
pub fn set_of<C>(element: C)
                 -> SequenceCreator<BTreeSet<C::Value>, ByValue<C::Value>, C>
where C : NodeCreator, C::Value : Default + Ord {
    SequenceCreator::new(element)
}

fn encode_slice<C>(creator: &C, src: &[C::Value], dst: &mut ListBranch)
                   -> Result<()>
where C : NodeCreator + ?Sized, C::Value : Sized {
    let mut writer = ElementWriter::new(creator, dst, src.len());
    for value in src {
        writer.write(value)?;
    }
    writer.finish(false);
    Ok(())
}

fn decode_slice<C>(creator: &C, src: &ListBranch, dst: &mut [C::Value])
                   -> Result<()>
where C : NodeCreator + ?Sized, C::Value : Sized {
    if let Some((blob, count)) = packed_elements(creator, src)? {
        if count != dst.len() {
            return Err(Error::CountMismatch(dst.len(), count));
        }
        for (chunk, value) in blob.chunks(creator.element_width())
            .zip(dst.iter_mut())
        {
            creator.unpack(chunk, value)?;
        }
    } else {
        if src.len() != dst.len() {
            return Err(Error::CountMismatch(dst.len(), src.len()));
        }
        for (child, value) in src.iter().zip(dst.iter_mut()) {
            creator.fill_from(child, value)?;
        }
    }

    Ok(())
}

/// The slice behind an `ArrayAdapter`.
#[derive(Debug)]
enum Slots<'a, T : 'a> {
    Shared(&'a [T]),
    Exclusive(&'a mut [T]),
}

/// Makes a caller-owned fixed-length array `Marshalable`.
///
/// Elements are matched by position and filled in place. The element count
/// is the length of the slice, and decoding fails with `CountMismatch` if
/// the tree holds a different number. Nothing is ever allocated or freed.
pub struct ArrayAdapter<'a, T : 'a, C> {
    items: Slots<'a, T>,
    creator: C,
}

impl<'a, T : 'a, C : NodeCreator<Value = T>> ArrayAdapter<'a, T, C> {
    /// Creates an adapter which can both encode and fill `items`.
    pub fn new(items: &'a mut [T], creator: C) -> Self {
        ArrayAdapter { items: Slots::Exclusive(items), creator: creator }
    }

    /// Creates an adapter which can only encode `items`.
    ///
    /// Decoding into it fails with `ReadOnly`.
    pub fn reading(items: &'a [T], creator: C) -> Self {
        ArrayAdapter { items: Slots::Shared(items), creator: creator }
    }

    /// Returns the elements.
    pub fn items(&self) -> &[T] {
        match self.items {
            Slots::Shared(items) => items,
            Slots::Exclusive(ref items) => &**items,
        }
    }
}

impl<'a, T : 'a, C : NodeCreator<Value = T>> Marshalable
for ArrayAdapter<'a, T, C> {
    fn branch_kind(&self) -> BranchKind { BranchKind::List }

    fn class_to_tree(&self, dst: &mut Branch) -> Result<()> {
        encode_slice(&self.creator, self.items(), dst.expect_list_mut()?)
    }

    fn tree_to_class(&mut self, src: &Branch) -> Result<()> {
        match self.items {
            Slots::Shared(_) => Err(Error::ReadOnly),
            Slots::Exclusive(ref mut items) =>
                decode_slice(&self.creator, src.expect_list()?, &mut **items),
        }
    }
}

/// Creator for fixed-length slices.
///
/// This is the creator behind length-prefixed call arguments; the
/// destination slice supplies the expected count.
#[derive(Debug, Clone, Default)]
pub struct ArrayCreator<C> {
    element: C,
}

impl<C> ArrayCreator<C> {
    /// Returns a creator encoding each element with `element`.
    pub fn new(element: C) -> Self {
        ArrayCreator { element: element }
    }
}

impl<C> NodeCreator for ArrayCreator<C>
where C : NodeCreator, C::Value : Sized {
    type Value = [C::Value];

    fn make_node(&self, value: &[C::Value], tag: Tag) -> Result<Node> {
        let mut list = ListBranch::with_capacity(1);
        encode_slice(&self.element, value, &mut list)?;
        Ok(Node::branch(tag, Branch::List(list)))
    }

    fn fill_from(&self, node: &Node, out: &mut [C::Value]) -> Result<()> {
        let list = node.expect_branch(BranchKind::List)?.expect_list()?;
        decode_slice(&self.element, list, out)
    }
}
