//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `Marshalable` contract and the helpers used to implement it.
//!
//! A `Marshalable` type describes itself as the children of a single branch.
//! Record-like types usually use a map branch and address each field by a
//! fixed tag with `MapBranch::write_field` and `MapBranch::read_field`;
//! sequence-like types use a list branch and rely on position alone.

use std::slice;

use bytes::Bytes;

use creator::NodeCreator;
use node::{self, Branch, BranchKind, Config, ListBranch, MapBranch, Node};
use wire::{NodeKind, Tag};

quick_error! {
    /// Errors produced when converting between trees and typed values.
    #[derive(Debug)]
    pub enum Error {
        /// The bytes could not be parsed into a tree.
        Node(err: node::Error) {
            description(err.description())
            display("{}", err)
            cause(err)
            from()
        }
        /// A node was of a different kind than the value being filled
        /// requires.
        ShapeMismatch(expected: NodeKind, actual: NodeKind) {
            description("node kind mismatch")
            display("expected {} node, found {}", expected, actual)
        }
        /// A required tag was absent from a map branch.
        MissingTag(tag: Tag) {
            description("required tag missing")
            display("required tag {} missing from map branch", tag)
        }
        /// A value was written to a map branch under a tag already in use.
        DuplicateTag(tag: Tag) {
            description("duplicate tag written")
            display("tag {} written more than once to map branch", tag)
        }
        /// A leaf held bytes which do not form a valid value of the
        /// requested type.
        InvalidValue(what: &'static str) {
            description("invalid value")
            display("invalid value: {}", what)
        }
        /// An associative container held an odd number of children, so the
        /// last key has no value.
        UnpairedKey(children: usize) {
            description("key without value")
            display("associative branch has odd child count {}", children)
        }
        /// A fixed-length destination and the tree disagree on the number of
        /// elements.
        CountMismatch(expected: usize, actual: usize) {
            description("element count mismatch")
            display("expected {} elements, found {}", expected, actual)
        }
        /// A reply held a different number of arguments than the call
        /// expects.
        ArgumentCount(expected: usize, actual: usize) {
            description("argument count mismatch")
            display("expected {} reply arguments, found {}",
                    expected, actual)
        }
        /// A value was decoded into an adapter which only permits encoding.
        ReadOnly {
            description("destination is read-only")
            display("cannot decode into a read-only adapter")
        }
        /// A packed-array operation was requested of a creator which does
        /// not support it.
        NotArrayShaped {
            description("creator is not array-shaped")
            display("creator is not array-shaped")
        }
    }
}

/// The result type for marshalling.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Trait for values which can convert themselves to and from a branch.
///
/// Implementations must satisfy the round-trip law: filling a value from
/// the branch produced by `class_to_tree` yields an equal value.
pub trait Marshalable {
    /// The kind of branch this value is represented by.
    ///
    /// By default this is `BranchKind::Map`.
    fn branch_kind(&self) -> BranchKind { BranchKind::Map }

    /// Writes the content of `self` as children of `dst`, which is an empty
    /// branch of the kind returned by `branch_kind()`.
    fn class_to_tree(&self, dst: &mut Branch) -> Result<()>;

    /// Updates `self` from the children of `src`.
    ///
    /// On failure, `self` may be left partially updated.
    fn tree_to_class(&mut self, src: &Branch) -> Result<()>;
}

impl Node {
    /// Fails with `ShapeMismatch` unless this node is of kind `expected`.
    pub fn expect_kind(&self, expected: NodeKind) -> Result<()> {
        if expected == self.kind() {
            Ok(())
        } else {
            Err(Error::ShapeMismatch(expected, self.kind()))
        }
    }

    /// Returns the scalar of this node if it is a fixed leaf.
    pub fn expect_fixed(&self) -> Result<u32> {
        self.fixed_value().ok_or_else(
            || Error::ShapeMismatch(NodeKind::FixedLeaf, self.kind()))
    }

    /// Returns the bytes of this node if it is a variable leaf.
    pub fn expect_blob(&self) -> Result<&[u8]> {
        match self.blob() {
            Some(data) => Ok(data),
            None => Err(Error::ShapeMismatch(NodeKind::VarLeaf, self.kind())),
        }
    }

    /// Returns this node as a branch, provided it is of the given kind.
    pub fn expect_branch(&self, kind: BranchKind) -> Result<&Branch> {
        match self.as_branch() {
            Some(b) if kind == b.kind() => Ok(b),
            _ => Err(Error::ShapeMismatch(kind.node_kind(), self.kind())),
        }
    }
}

impl Branch {
    /// Returns this branch as a list branch, or fails with `ShapeMismatch`.
    pub fn expect_list(&self) -> Result<&ListBranch> {
        let kind = self.kind().node_kind();
        self.as_list().ok_or(
            Error::ShapeMismatch(NodeKind::ListBranch, kind))
    }

    /// Returns this branch as a mutable list branch, or fails with
    /// `ShapeMismatch`.
    pub fn expect_list_mut(&mut self) -> Result<&mut ListBranch> {
        let kind = self.kind().node_kind();
        self.as_list_mut().ok_or(
            Error::ShapeMismatch(NodeKind::ListBranch, kind))
    }

    /// Returns this branch as a map branch, or fails with `ShapeMismatch`.
    pub fn expect_map(&self) -> Result<&MapBranch> {
        let kind = self.kind().node_kind();
        self.as_map().ok_or(
            Error::ShapeMismatch(NodeKind::MapBranch, kind))
    }

    /// Returns this branch as a mutable map branch, or fails with
    /// `ShapeMismatch`.
    pub fn expect_map_mut(&mut self) -> Result<&mut MapBranch> {
        let kind = self.kind().node_kind();
        self.as_map_mut().ok_or(
            Error::ShapeMismatch(NodeKind::MapBranch, kind))
    }
}

impl MapBranch {
    /// Encodes `value` with `creator` and adds it under `tag`.
    ///
    /// Fails with `DuplicateTag` if `tag` is already in use.
    ///
    /// ## Panics
    ///
    /// Panics if `tag` is greater than `wire::MAX_TAG`.
    pub fn write_field<C : NodeCreator + ?Sized>
        (&mut self, tag: Tag, creator: &C, value: &C::Value) -> Result<()>
    {
        if self.contains(tag) {
            return Err(Error::DuplicateTag(tag));
        }
        let node = creator.make_node(value, tag)?;
        self.insert(node);
        Ok(())
    }

    /// Fills `out` from the child with the given `tag`.
    ///
    /// Fails with `MissingTag` if there is no such child.
    pub fn read_field<C : NodeCreator + ?Sized>
        (&self, tag: Tag, creator: &C, out: &mut C::Value) -> Result<()>
    {
        if self.read_optional_field(tag, creator, out)? {
            Ok(())
        } else {
            Err(Error::MissingTag(tag))
        }
    }

    /// Fills `out` from the child with the given `tag` if present.
    ///
    /// Returns whether the child was present. `out` is left untouched if it
    /// was not.
    pub fn read_optional_field<C : NodeCreator + ?Sized>
        (&self, tag: Tag, creator: &C, out: &mut C::Value) -> Result<bool>
    {
        match self.get(tag) {
            Some(node) => {
                creator.fill_from(node, out)?;
                Ok(true)
            },
            None => Ok(false),
        }
    }
}

impl ListBranch {
    /// Encodes `value` with `creator` and appends it.
    pub fn push_element<C : NodeCreator + ?Sized>
        (&mut self, creator: &C, value: &C::Value) -> Result<()>
    {
        let node = creator.make_node(value, 0)?;
        self.push(node);
        Ok(())
    }

    /// Returns a cursor which reads the children of this branch in order.
    pub fn elements(&self) -> Elements {
        Elements {
            iter: self.children().iter(),
            consumed: 0,
            total: self.len(),
        }
    }
}

/// Reads the children of a `ListBranch` in order.
///
/// The Nth call to `read_next` decodes the Nth child.
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    iter: slice::Iter<'a, Node>,
    consumed: usize,
    total: usize,
}

impl<'a> Elements<'a> {
    /// Fills `out` from the next child.
    ///
    /// Fails with `CountMismatch` if all children have been consumed.
    pub fn read_next<C : NodeCreator + ?Sized>
        (&mut self, creator: &C, out: &mut C::Value) -> Result<()>
    {
        self.consumed += 1;
        match self.iter.next() {
            Some(node) => creator.fill_from(node, out),
            None => Err(Error::CountMismatch(self.consumed, self.total)),
        }
    }

    /// Returns the number of children not yet consumed.
    pub fn remaining(&self) -> usize {
        self.iter.len()
    }

    /// Fails with `CountMismatch` if any children were not consumed.
    pub fn finish(self) -> Result<()> {
        if self.consumed >= self.total {
            Ok(())
        } else {
            Err(Error::CountMismatch(self.consumed, self.total))
        }
    }
}

/// Converts `value` into a root node with tag 0.
pub fn to_tree<M : Marshalable + ?Sized>(value: &M) -> Result<Node> {
    let mut branch = Branch::new(value.branch_kind());
    value.class_to_tree(&mut branch)?;
    Ok(Node::branch(0, branch))
}

/// Updates `out` from the root node `src`.
pub fn from_tree<M : Marshalable + ?Sized>(src: &Node, out: &mut M)
                                           -> Result<()> {
    let branch = src.expect_branch(out.branch_kind())?;
    out.tree_to_class(branch)
}

/// Encodes `value` into a fresh buffer.
pub fn to_bytes<M : Marshalable + ?Sized>(value: &M) -> Result<Bytes> {
    let bytes = to_tree(value)?.encode();
    trace!(bytes = bytes.len(), "marshalled value");
    Ok(bytes)
}

/// Parses `data` and updates `out` from the resulting tree.
///
/// `data` must contain exactly one root node.
pub fn from_bytes<M : Marshalable + ?Sized>
    (data: &[u8], config: &Config, out: &mut M) -> Result<()>
{
    let root = Node::decode(data, config)?;
    from_tree(&root, out)
}

#[cfg(test)]
mod test {
    use super::*;
    use creator::{ScalarCreator, StringCreator};

    #[derive(Debug, Default, PartialEq)]
    struct Pair {
        left: u32,
        right: String,
    }

    impl Marshalable for Pair {
        fn class_to_tree(&self, dst: &mut Branch) -> Result<()> {
            let map = dst.expect_map_mut()?;
            map.write_field(3, &ScalarCreator::<u32>::new(), &self.left)?;
            map.write_field(5, &StringCreator, &self.right)
        }

        fn tree_to_class(&mut self, src: &Branch) -> Result<()> {
            let map = src.expect_map()?;
            map.read_field(3, &ScalarCreator::<u32>::new(), &mut self.left)?;
            map.read_field(5, &StringCreator, &mut self.right)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Positional(u32, u32);

    impl Marshalable for Positional {
        fn branch_kind(&self) -> BranchKind { BranchKind::List }

        fn class_to_tree(&self, dst: &mut Branch) -> Result<()> {
            let list = dst.expect_list_mut()?;
            let c = ScalarCreator::<u32>::new();
            list.push_element(&c, &self.0)?;
            list.push_element(&c, &self.1)
        }

        fn tree_to_class(&mut self, src: &Branch) -> Result<()> {
            let mut elements = src.expect_list()?.elements();
            let c = ScalarCreator::<u32>::new();
            elements.read_next(&c, &mut self.0)?;
            elements.read_next(&c, &mut self.1)?;
            elements.finish()
        }
    }

    #[test]
    fn record_round_trip() {
        let value = Pair { left: 42, right: "hello".to_owned() };
        let bytes = to_bytes(&value).unwrap();

        let mut out = Pair::default();
        from_bytes(&bytes, &Config::default(), &mut out).unwrap();
        assert_eq!(value, out);
    }

    #[test]
    fn positional_round_trip() {
        let value = Positional(7, 9);
        let tree = to_tree(&value).unwrap();
        assert_eq!(NodeKind::ListBranch, tree.kind());

        let mut out = Positional::default();
        from_tree(&tree, &mut out).unwrap();
        assert_eq!(value, out);
    }

    #[test]
    fn duplicate_field_rejected() {
        let mut map = MapBranch::new();
        let c = ScalarCreator::<u32>::new();
        map.write_field(1, &c, &1).unwrap();
        match map.write_field(1, &c, &2) {
            Err(Error::DuplicateTag(1)) => (),
            r => panic!("unexpected result {:?}", r),
        }
        assert_eq!(Some(1), map.get(1).and_then(Node::fixed_value));
    }

    #[test]
    fn missing_field_is_an_error() {
        let mut map = MapBranch::new();
        map.write_field(3, &ScalarCreator::<u32>::new(), &1).unwrap();
        let tree = Node::branch(0, Branch::Map(map));

        let mut out = Pair::default();
        match from_tree(&tree, &mut out) {
            Err(Error::MissingTag(5)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn optional_field_reports_presence() {
        let mut map = MapBranch::new();
        map.write_field(2, &StringCreator, &"x".to_owned()).unwrap();

        let mut s = "unchanged".to_owned();
        assert!(!map.read_optional_field(1, &StringCreator, &mut s).unwrap());
        assert_eq!("unchanged", s);
        assert!(map.read_optional_field(2, &StringCreator, &mut s).unwrap());
        assert_eq!("x", s);
    }

    #[test]
    fn wrong_branch_kind_rejected() {
        let tree = to_tree(&Positional(1, 2)).unwrap();
        let mut out = Pair::default();
        match from_tree(&tree, &mut out) {
            Err(Error::ShapeMismatch(NodeKind::MapBranch,
                                     NodeKind::ListBranch)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn too_few_positional_elements() {
        let mut list = ListBranch::new();
        list.push_element(&ScalarCreator::<u32>::new(), &1).unwrap();
        let tree = Node::branch(0, Branch::List(list));

        let mut out = Positional::default();
        match from_tree(&tree, &mut out) {
            Err(Error::CountMismatch(2, 1)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn too_many_positional_elements() {
        let mut list = ListBranch::new();
        let c = ScalarCreator::<u32>::new();
        for i in 0..3 {
            list.push_element(&c, &i).unwrap();
        }
        let tree = Node::branch(0, Branch::List(list));

        let mut out = Positional::default();
        match from_tree(&tree, &mut out) {
            Err(Error::CountMismatch(2, 3)) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn malformed_bytes_surface_as_node_error() {
        let mut out = Pair::default();
        match from_bytes(&[0x10, 0x00, 0x00], &Config::default(), &mut out) {
            Err(Error::Node(node::Error::UnexpectedEof(_))) => (),
            r => panic!("unexpected result {:?}", r),
        }
    }
}
