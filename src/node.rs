//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The tree of tagged nodes which sits between typed values and bytes.
//!
//! A `Node` is one of four kinds: a fixed leaf holding a 4-byte scalar, a
//! variable leaf owning a byte blob, a list branch whose children are
//! addressed by position, or a map branch whose children are addressed by
//! tag. Trees are built fresh for every encode pass and parsed once from
//! every received buffer.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::slice;

use bytes::{BufMut, Bytes, BytesMut};

use io::Input;
use wire::{self, Header, NodeKind, Tag};

quick_error! {
    /// Errors produced when parsing bytes into a tree.
    ///
    /// Every variant begins with a string indicating the tags and byte
    /// offsets of the branches enclosing the problem.
    #[derive(Debug)]
    pub enum Error {
        /// The input ended in the middle of a node.
        UnexpectedEof(wo: String) {
            description("unexpected end of input")
            display("unexpected end of input at {}", wo)
        }
        /// A header carried a kind code which does not denote any node kind.
        UnknownKind(wo: String, code: u8, pos: u64) {
            description("unknown node kind")
            display("unknown node kind {} at {}.{{{}}}", code, wo, pos)
        }
        /// Two children of the same map branch had the same tag.
        DuplicateTag(wo: String, tag: Tag) {
            description("duplicate tag in map branch")
            display("duplicate tag {} in map branch at {}", tag, wo)
        }
        /// Branches were nested more deeply than `Config::recursion_limit`.
        RecursionLimitExceeded(wo: String) {
            description("recursion limit exceeded")
            display("recursion limit exceeded at {}", wo)
        }
        /// A variable leaf was larger than `Config::max_blob`.
        BlobTooLarge(wo: String, len: usize) {
            description("blob size limit exceeded")
            display("blob of {} bytes exceeds size limit at {}", len, wo)
        }
        /// A branch had more children than `Config::max_children`.
        TooManyChildren(wo: String) {
            description("branch child limit exceeded")
            display("branch child limit exceeded at {}", wo)
        }
        /// Bytes remained after the root node.
        TrailingBytes(n: usize) {
            description("trailing bytes after root node")
            display("{} trailing bytes after root node", n)
        }
    }
}

/// The result type for tree parsing.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Run-time configuration for parsing trees.
#[derive(Debug, Clone)]
pub struct Config {
    /// The maximum branch nesting to allow.
    ///
    /// The default is 32.
    pub recursion_limit: usize,
    /// The maximum size of a variable leaf payload.
    ///
    /// The default is 16 MiB.
    pub max_blob: usize,
    /// The maximum number of children in a single branch.
    ///
    /// The default is 65536.
    pub max_children: usize,
    _non_public: (),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            recursion_limit: 32,
            max_blob: 16 << 20,
            max_children: 65536,
            _non_public: (),
        }
    }
}

/// Tracks contextual information while parsing.
///
/// This is used for constructing helpful error messages and controlling
/// recursion depth. A `Context` can be formatted with `Display` to show the
/// path to the current branch, including both tags and offsets.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    /// The context of the enclosing branch, if any.
    pub next: Option<&'a Context<'a>>,
    /// The tag of the branch being parsed at this level.
    pub tag: Tag,
    /// The offset of the header of the branch at this level.
    pub pos: u64,
    /// The recursion depth.
    pub depth: usize,
    /// The configuration in effect.
    pub config: &'a Config,
    _non_public: (),
}

impl<'a> Context<'a> {
    /// Returns a top-level context referencing the given config.
    pub fn top(config: &'a Config) -> Self {
        Context {
            next: None,
            tag: 0,
            pos: 0,
            depth: 0,
            config: config,
            _non_public: (),
        }
    }

    /// Creates a context for a child branch, provided it does not exceed the
    /// recursion limit.
    pub fn push(&'a self, tag: Tag, pos: u64) -> Result<Self> {
        if self.depth >= self.config.recursion_limit {
            Err(Error::RecursionLimitExceeded(self.to_string()))
        } else {
            Ok(Context {
                next: Some(self),
                tag: tag,
                pos: pos,
                depth: self.depth + 1,
                config: self.config,
                _non_public: (),
            })
        }
    }
}

impl<'a> fmt::Display for Context<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref next) = self.next {
            write!(f, "{}.{}{{{}}}", next, self.tag, self.pos)
        } else {
            write!(f, "{{{}}}", self.pos)
        }
    }
}

/// The two kinds of branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BranchKind {
    /// Children addressed by position.
    List,
    /// Children addressed by tag.
    Map,
}

impl BranchKind {
    /// Returns the node kind of a branch of this kind.
    pub fn node_kind(self) -> NodeKind {
        match self {
            BranchKind::List => NodeKind::ListBranch,
            BranchKind::Map => NodeKind::MapBranch,
        }
    }
}

/// An ordered sequence of child nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListBranch {
    children: Vec<Node>,
}

impl ListBranch {
    /// Creates an empty list branch.
    pub fn new() -> Self {
        ListBranch::default()
    }

    /// Creates an empty list branch with room for `n` children.
    pub fn with_capacity(n: usize) -> Self {
        ListBranch { children: Vec::with_capacity(n) }
    }

    /// Appends a child.
    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Returns the children in order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Returns an iterator over the children in order.
    pub fn iter(&self) -> slice::Iter<Node> {
        self.children.iter()
    }

    /// Returns the number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn wire_len(&self) -> usize {
        self.children.iter().map(Node::encoded_len).sum()
    }
}

/// Child nodes addressed by unique tag.
///
/// Children are serialised in ascending tag order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapBranch {
    children: BTreeMap<Tag, Node>,
}

impl MapBranch {
    /// Creates an empty map branch.
    pub fn new() -> Self {
        MapBranch::default()
    }

    /// Inserts a child under its own tag.
    ///
    /// If a child with the same tag is already present, the branch is left
    /// unchanged and `false` is returned.
    pub fn insert(&mut self, node: Node) -> bool {
        match self.children.entry(node.tag()) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(e) => {
                e.insert(node);
                true
            },
        }
    }

    /// Looks up the child with the given tag.
    pub fn get(&self, tag: Tag) -> Option<&Node> {
        self.children.get(&tag)
    }

    /// Returns whether a child with the given tag is present.
    pub fn contains(&self, tag: Tag) -> bool {
        self.children.contains_key(&tag)
    }

    /// Returns an iterator over the children in ascending tag order.
    pub fn iter(&self) -> btree_map::Values<Tag, Node> {
        self.children.values()
    }

    /// Returns the number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn wire_len(&self) -> usize {
        self.children.values().map(Node::encoded_len).sum()
    }
}

/// A node carrying children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    #[allow(missing_docs)]
    List(ListBranch),
    #[allow(missing_docs)]
    Map(MapBranch),
}

impl Branch {
    /// Creates an empty branch of the given kind.
    pub fn new(kind: BranchKind) -> Self {
        match kind {
            BranchKind::List => Branch::List(ListBranch::new()),
            BranchKind::Map => Branch::Map(MapBranch::new()),
        }
    }

    /// Returns the kind of this branch.
    pub fn kind(&self) -> BranchKind {
        match *self {
            Branch::List(_) => BranchKind::List,
            Branch::Map(_) => BranchKind::Map,
        }
    }

    /// Returns this branch as a list branch, if it is one.
    pub fn as_list(&self) -> Option<&ListBranch> {
        match *self {
            Branch::List(ref l) => Some(l),
            Branch::Map(_) => None,
        }
    }

    /// Returns this branch as a mutable list branch, if it is one.
    pub fn as_list_mut(&mut self) -> Option<&mut ListBranch> {
        match *self {
            Branch::List(ref mut l) => Some(l),
            Branch::Map(_) => None,
        }
    }

    /// Returns this branch as a map branch, if it is one.
    pub fn as_map(&self) -> Option<&MapBranch> {
        match *self {
            Branch::Map(ref m) => Some(m),
            Branch::List(_) => None,
        }
    }

    /// Returns this branch as a mutable map branch, if it is one.
    pub fn as_map_mut(&mut self) -> Option<&mut MapBranch> {
        match *self {
            Branch::Map(ref mut m) => Some(m),
            Branch::List(_) => None,
        }
    }

    /// Returns the number of children.
    pub fn len(&self) -> usize {
        match *self {
            Branch::List(ref l) => l.len(),
            Branch::Map(ref m) => m.len(),
        }
    }

    /// Returns whether there are no children.
    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    fn children_len(&self) -> usize {
        match *self {
            Branch::List(ref l) => l.wire_len(),
            Branch::Map(ref m) => m.wire_len(),
        }
    }
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A 4-byte scalar.
    Fixed(u32),
    /// An owned byte blob.
    Var(Vec<u8>),
    /// Child nodes.
    Branch(Branch),
}

/// A tagged node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    tag: Tag,
    value: Value,
}

impl Node {
    /// Creates a node with the given tag and payload.
    ///
    /// ## Panics
    ///
    /// Panics if `tag` is greater than `wire::MAX_TAG`.
    pub fn new(tag: Tag, value: Value) -> Self {
        assert!(tag <= wire::MAX_TAG, "tag {} out of range", tag);
        Node { tag: tag, value: value }
    }

    /// Creates a fixed leaf.
    ///
    /// ## Panics
    ///
    /// Panics if `tag` is greater than `wire::MAX_TAG`.
    pub fn fixed(tag: Tag, value: u32) -> Self {
        Node::new(tag, Value::Fixed(value))
    }

    /// Creates a variable leaf holding a copy of `data`.
    ///
    /// ## Panics
    ///
    /// Panics if `tag` is greater than `wire::MAX_TAG`.
    pub fn var(tag: Tag, data: &[u8]) -> Self {
        Node::new(tag, Value::Var(data.to_vec()))
    }

    /// Creates a variable leaf taking ownership of `data`.
    ///
    /// ## Panics
    ///
    /// Panics if `tag` is greater than `wire::MAX_TAG`.
    pub fn var_owned(tag: Tag, data: Vec<u8>) -> Self {
        Node::new(tag, Value::Var(data))
    }

    /// Creates a branch node.
    ///
    /// ## Panics
    ///
    /// Panics if `tag` is greater than `wire::MAX_TAG`.
    pub fn branch(tag: Tag, branch: Branch) -> Self {
        Node::new(tag, Value::Branch(branch))
    }

    /// Returns the tag of this node.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the kind of this node.
    pub fn kind(&self) -> NodeKind {
        match self.value {
            Value::Fixed(_) => NodeKind::FixedLeaf,
            Value::Var(_) => NodeKind::VarLeaf,
            Value::Branch(ref b) => b.kind().node_kind(),
        }
    }

    /// Returns the payload of this node.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes this node and returns its payload.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// If this is a fixed leaf, returns its scalar.
    pub fn fixed_value(&self) -> Option<u32> {
        match self.value {
            Value::Fixed(v) => Some(v),
            _ => None,
        }
    }

    /// If this is a variable leaf, returns its bytes.
    pub fn blob(&self) -> Option<&[u8]> {
        match self.value {
            Value::Var(ref data) => Some(data),
            _ => None,
        }
    }

    /// If this is a branch, returns it.
    pub fn as_branch(&self) -> Option<&Branch> {
        match self.value {
            Value::Branch(ref b) => Some(b),
            _ => None,
        }
    }

    /// Derives the number of `element_size`-byte elements packed into this
    /// variable leaf.
    ///
    /// Returns `None` if this is not a variable leaf or `element_size` is 0.
    /// Any partial trailing element is not counted.
    pub fn array_count(&self, element_size: usize) -> Option<usize> {
        if 0 == element_size { return None; }
        self.blob().map(|data| data.len() / element_size)
    }

    /// Returns the number of bytes following the header once serialised.
    pub fn wire_len(&self) -> usize {
        match self.value {
            Value::Fixed(_) => wire::FIXED_SIZE,
            Value::Var(ref data) => wire::LENGTH_SIZE + data.len(),
            Value::Branch(ref b) => wire::LENGTH_SIZE + b.children_len(),
        }
    }

    /// Returns the total number of bytes this node occupies once serialised.
    pub fn encoded_len(&self) -> usize {
        wire::HEADER_SIZE + self.wire_len()
    }

    /// Serialises this node and all its descendants to `dst`.
    ///
    /// ## Panics
    ///
    /// Panics if any payload is larger than 4 GiB.
    pub fn write_to<B : BufMut>(&self, dst: &mut B) {
        wire::encode_header(dst, Header { kind: self.kind(), tag: self.tag });
        match self.value {
            Value::Fixed(v) => dst.put_u32(v),
            Value::Var(ref data) => {
                wire::encode_length(dst, data.len());
                dst.put_slice(data);
            },
            Value::Branch(ref b) => {
                wire::encode_length(dst, b.children_len());
                match *b {
                    Branch::List(ref l) => for child in l.iter() {
                        child.write_to(dst);
                    },
                    Branch::Map(ref m) => for child in m.iter() {
                        child.write_to(dst);
                    },
                }
            },
        }
    }

    /// Serialises this node into a fresh buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Parses one node and its descendants from `input`.
    ///
    /// `context` describes the branch containing the node.
    pub fn read_from(input: &mut Input, context: &Context) -> Result<Node> {
        let pos = input.pos();
        let raw = input.read_u16().ok_or_else(
            || Error::UnexpectedEof(context.to_string()))?;
        let header = Header::unpack(raw).map_err(
            |code| Error::UnknownKind(context.to_string(), code, pos))?;

        if !header.kind.has_length() {
            let v = input.read_u32().ok_or_else(
                || Error::UnexpectedEof(context.to_string()))?;
            return Ok(Node::fixed(header.tag, v));
        }

        let len = input.read_u32().ok_or_else(
            || Error::UnexpectedEof(context.to_string()))? as usize;

        if NodeKind::VarLeaf == header.kind {
            if len > context.config.max_blob {
                return Err(Error::BlobTooLarge(context.to_string(), len));
            }
            let data = input.read_bytes(len).ok_or_else(
                || Error::UnexpectedEof(context.to_string()))?;
            return Ok(Node::var(header.tag, &data));
        }

        let mut body = input.sub(len).ok_or_else(
            || Error::UnexpectedEof(context.to_string()))?;
        let subcontext = context.push(header.tag, pos)?;
        let branch = if NodeKind::ListBranch == header.kind {
            let mut list = ListBranch::new();
            while !body.is_empty() {
                if list.len() >= context.config.max_children {
                    return Err(Error::TooManyChildren(subcontext.to_string()));
                }
                list.push(Node::read_from(&mut body, &subcontext)?);
            }
            Branch::List(list)
        } else {
            let mut map = MapBranch::new();
            while !body.is_empty() {
                if map.len() >= context.config.max_children {
                    return Err(Error::TooManyChildren(subcontext.to_string()));
                }
                let child = Node::read_from(&mut body, &subcontext)?;
                let tag = child.tag();
                if !map.insert(child) {
                    return Err(Error::DuplicateTag(
                        subcontext.to_string(), tag));
                }
            }
            Branch::Map(map)
        };

        Ok(Node::branch(header.tag, branch))
    }

    /// Parses a whole buffer holding exactly one root node.
    pub fn decode(data: &[u8], config: &Config) -> Result<Node> {
        let mut input = Input::from_slice(data);
        let root = Node::read_from(&mut input, &Context::top(config))?;
        if !input.is_empty() {
            return Err(Error::TrailingBytes(input.remaining()));
        }
        trace!(bytes = data.len(), kind = %root.kind(), "decoded tree");
        Ok(root)
    }
}
