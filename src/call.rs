//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Aggregation of the arguments of a single remote call.
//!
//! A `Call` records each argument together with its direction. Input
//! arguments are encoded in declaration order as the children of one root
//! list branch; the reply is a list branch whose children are decoded, in
//! declaration order, into the output arguments.
//!
//! ```
//! # use tctree::call::{Arg, Call};
//! # use tctree::creator::{ScalarCreator, StringCreator};
//! let channel = 7u32;
//! let mut name = String::new();
//!
//! let request = {
//!     let mut call = Call::new();
//!     call.push_value(ScalarCreator::new(), Arg::In(&channel));
//!     call.push_value(StringCreator, Arg::Out(&mut name));
//!     call.encode_all().unwrap()
//! };
//! # let _ = request;
//! ```

use std::fmt;

use bytes::Bytes;

use adapt::ArrayCreator;
use creator::{MarshalableCreator, NodeCreator};
use marshal::{Error, Marshalable, Result};
use node::{Branch, BranchKind, Config, ListBranch, Node};

/// The direction in which an argument travels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sent with the request only.
    In,
    /// Filled from the reply only.
    Out,
    /// Sent with the request and filled from the reply.
    InOut,
}

impl Direction {
    /// Returns whether arguments of this direction are sent.
    pub fn is_sent(self) -> bool {
        Direction::Out != self
    }

    /// Returns whether arguments of this direction are received.
    pub fn is_received(self) -> bool {
        Direction::In != self
    }
}

/// A reference to the storage of one argument, tagged with its direction.
#[derive(Debug)]
pub enum Arg<'a, T : ?Sized + 'a> {
    /// An argument which is only read.
    In(&'a T),
    /// An argument which is only written.
    Out(&'a mut T),
    /// An argument which is read and then written.
    InOut(&'a mut T),
}

impl<'a, T : ?Sized + 'a> Arg<'a, T> {
    /// Returns the direction of this argument.
    pub fn direction(&self) -> Direction {
        match *self {
            Arg::In(_) => Direction::In,
            Arg::Out(_) => Direction::Out,
            Arg::InOut(_) => Direction::InOut,
        }
    }

    fn get(&self) -> Option<&T> {
        match *self {
            Arg::In(v) => Some(v),
            Arg::Out(_) => None,
            Arg::InOut(ref v) => Some(&**v),
        }
    }

    fn get_mut(&mut self) -> Option<&mut T> {
        match *self {
            Arg::In(_) => None,
            Arg::Out(ref mut v) | Arg::InOut(ref mut v) => Some(&mut **v),
        }
    }
}

trait Item {
    fn direction(&self) -> Direction;
    fn encode(&self) -> Result<Option<Node>>;
    fn decode(&mut self, node: &Node) -> Result<()>;
}

struct CreatorItem<'a, C : NodeCreator> where C::Value : 'a {
    creator: C,
    arg: Arg<'a, C::Value>,
}

impl<'a, C : NodeCreator> Item for CreatorItem<'a, C>
where C::Value : 'a {
    fn direction(&self) -> Direction {
        self.arg.direction()
    }

    fn encode(&self) -> Result<Option<Node>> {
        match self.arg.get() {
            Some(value) => self.creator.make_node(value, 0).map(Some),
            None => Ok(None),
        }
    }

    fn decode(&mut self, node: &Node) -> Result<()> {
        let creator = &self.creator;
        match self.arg.get_mut() {
            Some(out) => creator.fill_from(node, out),
            None => Ok(()),
        }
    }
}

/// Collects the arguments of one call, builds the outbound buffer, and
/// fills output arguments from the reply.
pub struct Call<'a> {
    items: Vec<Box<Item + 'a>>,
    config: Config,
}

impl<'a> fmt::Debug for Call<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let directions: Vec<Direction> =
            self.items.iter().map(|i| i.direction()).collect();
        f.debug_struct("Call")
            .field("items", &directions)
            .field("config", &self.config)
            .finish()
    }
}

impl<'a> Default for Call<'a> {
    fn default() -> Self {
        Call::new()
    }
}

impl<'a> Call<'a> {
    /// Creates an empty call which parses replies with the default
    /// configuration.
    pub fn new() -> Self {
        Call::with_config(Config::default())
    }

    /// Creates an empty call which parses replies with `config`.
    pub fn with_config(config: Config) -> Self {
        Call { items: Vec::new(), config: config }
    }

    /// Returns the number of arguments declared.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether no arguments have been declared.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of arguments the reply must contain.
    pub fn received_count(&self) -> usize {
        self.items.iter().filter(|i| i.direction().is_received()).count()
    }

    /// Declares an argument encoded by `creator`.
    pub fn push_value<C : NodeCreator + 'a>(&mut self, creator: C,
                                            arg: Arg<'a, C::Value>) {
        self.items.push(Box::new(CreatorItem { creator: creator, arg: arg }));
    }

    /// Declares a length-prefixed array argument whose elements are encoded
    /// by `element`.
    ///
    /// The element count travels implicitly; an output array must be sized
    /// to exactly the count in the reply.
    pub fn push_length_array<C>(&mut self, element: C,
                                arg: Arg<'a, [C::Value]>)
    where C : NodeCreator + 'a, C::Value : Sized {
        self.push_value(ArrayCreator::new(element), arg);
    }

    /// Declares a nested `Marshalable` argument.
    pub fn push_marshalable<M : Marshalable + ?Sized + 'a>
        (&mut self, arg: Arg<'a, M>)
    {
        self.push_value(MarshalableCreator::new(), arg);
    }

    /// Encodes every input argument, in declaration order, into one buffer.
    pub fn encode_all(&self) -> Result<Bytes> {
        let mut list = ListBranch::with_capacity(self.items.len());
        for item in &self.items {
            if let Some(node) = item.encode()? {
                list.push(node);
            }
        }

        let sent = list.len();
        let bytes = Node::branch(0, Branch::List(list)).encode();
        trace!(arguments = sent, bytes = bytes.len(), "encoded call");
        Ok(bytes)
    }

    /// Decodes a reply into every output argument, in declaration order.
    ///
    /// The reply must hold exactly one child per output argument; otherwise
    /// this fails with `ArgumentCount` before anything is written.
    pub fn decode_all(&mut self, data: &[u8]) -> Result<()> {
        let root = Node::decode(data, &self.config)?;
        let list = root.expect_branch(BranchKind::List)?.expect_list()?;

        let expected = self.received_count();
        if expected != list.len() {
            debug!(expected, actual = list.len(),
                   "reply argument count mismatch");
            return Err(Error::ArgumentCount(expected, list.len()));
        }

        let mut children = list.iter();
        for item in &mut self.items {
            if item.direction().is_received() {
                if let Some(node) = children.next() {
                    item.decode(node)?;
                }
            }
        }

        trace!(arguments = expected, bytes = data.len(), "decoded reply");
        Ok(())
    }
}
