//-
// Copyright 2017, Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Low-level definitions for working with the wire format.
//!
//! Every node starts with a 2-byte header holding a 6-bit kind code and a
//! 10-bit tag. Fixed leaves follow it with exactly 4 bytes of payload;
//! variable leaves and branches follow it with a 4-byte length and then that
//! many bytes. All integers are big-endian.
//!
//! External code generally should not use things from this module; instead,
//! work in terms of `node::Node`.

use std::fmt;

use bytes::BufMut;

/// A node tag.
///
/// Only the low 10 bits are representable on the wire.
pub type Tag = u16;

/// The largest tag that can be encoded.
pub const MAX_TAG: Tag = 0x3FF;
/// The size of a node header.
pub const HEADER_SIZE: usize = 2;
/// The size of the length field preceding variable-length payloads.
pub const LENGTH_SIZE: usize = 4;
/// The size of the payload of a fixed leaf.
pub const FIXED_SIZE: usize = 4;

const TAG_BITS: u32 = 10;

/// The closed set of node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
#[repr(u8)]
pub enum NodeKind {
    FixedLeaf = 1,
    VarLeaf = 2,
    ListBranch = 3,
    MapBranch = 4,
}

impl NodeKind {
    /// Maps a 6-bit kind code back to a `NodeKind`.
    ///
    /// Returns `None` for codes which do not denote any kind.
    #[inline]
    pub fn from_code(code: u8) -> Option<Self> {
        use self::NodeKind::*;

        match code {
            1 => Some(FixedLeaf),
            2 => Some(VarLeaf),
            3 => Some(ListBranch),
            4 => Some(MapBranch),
            _ => None,
        }
    }

    /// Returns whether this kind carries child nodes.
    pub fn is_branch(self) -> bool {
        match self {
            NodeKind::ListBranch | NodeKind::MapBranch => true,
            NodeKind::FixedLeaf | NodeKind::VarLeaf => false,
        }
    }

    /// Returns whether the header is followed by a length field.
    pub fn has_length(self) -> bool {
        NodeKind::FixedLeaf != self
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            NodeKind::FixedLeaf => "FixedLeaf",
            NodeKind::VarLeaf => "VarLeaf",
            NodeKind::ListBranch => "ListBranch",
            NodeKind::MapBranch => "MapBranch",
        })
    }
}

/// A decoded node header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Header {
    /// The kind of the node.
    pub kind: NodeKind,
    /// The tag of the node, at most `MAX_TAG`.
    pub tag: Tag,
}

impl Header {
    /// Packs this header into its 16-bit wire representation.
    ///
    /// ## Panics
    ///
    /// Panics if `tag` is greater than `MAX_TAG`.
    pub fn pack(self) -> u16 {
        assert!(self.tag <= MAX_TAG, "tag {} out of range", self.tag);
        ((self.kind as u16) << TAG_BITS) | self.tag
    }

    /// Unpacks a 16-bit wire header.
    ///
    /// On failure, returns the kind code which was not understood.
    pub fn unpack(raw: u16) -> Result<Self, u8> {
        let code = (raw >> TAG_BITS) as u8;
        let tag = raw & MAX_TAG;
        NodeKind::from_code(code)
            .map(|kind| Header { kind: kind, tag: tag })
            .ok_or(code)
    }
}

/// Write a header to the given output.
pub fn encode_header<B : BufMut>(dst: &mut B, header: Header) {
    dst.put_u16(header.pack());
}

/// Write the length field of a variable-length payload.
///
/// ## Panics
///
/// Panics if `len` does not fit in 32 bits.
pub fn encode_length<B : BufMut>(dst: &mut B, len: usize) {
    assert!(len <= u32::max_value() as usize,
            "payload of {} bytes too large for the wire", len);
    dst.put_u32(len as u32);
}
