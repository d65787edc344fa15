//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Strategies for converting single values to and from nodes.
//!
//! Each `NodeCreator` handles one shape of value: scalars, enumerations,
//! strings of various encodings, and nested `Marshalable` objects. The
//! container creators in `adapt` and `assoc` are built on top of these by
//! delegating the encoding of each element.

use std::char;
use std::ffi::CString;
use std::marker::PhantomData;

use bytes::{Buf, BufMut};

use marshal::{Error, Marshalable, Result};
use node::{Branch, Node};
use wire::Tag;

/// A strategy for encoding one shape of value as a node.
///
/// Creators are small, usually stateless, values chosen when a field or
/// container is declared.
pub trait NodeCreator {
    /// The type of value this creator handles.
    type Value : ?Sized;

    /// Encodes `value` as a node with the given tag.
    ///
    /// ## Panics
    ///
    /// Panics if `tag` is greater than `wire::MAX_TAG`.
    fn make_node(&self, value: &Self::Value, tag: Tag) -> Result<Node>;

    /// Updates `out` from `node`.
    ///
    /// On failure, `out` may be left partially updated.
    fn fill_from(&self, node: &Node, out: &mut Self::Value) -> Result<()>;

    /// Whether values of this shape can be packed densely into a single
    /// variable leaf when they appear in a container.
    ///
    /// If this returns true, `element_width`, `pack` and `unpack` must be
    /// implemented.
    fn is_array_shaped(&self) -> bool { false }

    /// Whether containers of this shape carry one trailing zero element
    /// which is not transmitted.
    fn is_null_terminated_array(&self) -> bool { false }

    /// The number of bytes each packed element occupies.
    fn element_width(&self) -> usize { 0 }

    /// Appends the packed representation of `value` to `dst`.
    fn pack(&self, _value: &Self::Value, _dst: &mut Vec<u8>) -> Result<()> {
        Err(Error::NotArrayShaped)
    }

    /// Updates `out` from exactly `element_width()` packed bytes.
    fn unpack(&self, _src: &[u8], _out: &mut Self::Value) -> Result<()> {
        Err(Error::NotArrayShaped)
    }

    /// The terminator to append after decoding a packed container when
    /// `is_null_terminated_array()` is true.
    fn terminator(&self) -> Option<Self::Value> where Self::Value : Sized {
        None
    }

    /// Releases whatever `value` holds before it is refilled or discarded.
    ///
    /// Only containers do anything here.
    fn clear(&self, _value: &mut Self::Value) { }
}

/// Primitive types which travel as raw bits.
pub trait Scalar : Copy + Default {
    /// The number of bytes the type occupies in a packed array.
    const WIDTH: usize;

    /// Widens the value to 64 bits. Signed types are sign-extended.
    fn to_bits(self) -> u64;

    /// Narrows from 64 bits, truncating to `WIDTH` bytes.
    ///
    /// Returns `None` if the truncated bits do not form a valid value.
    fn from_bits(bits: u64) -> Option<Self>;
}

macro_rules! scalar_int {
    ($t:ty, $width:expr, $via:ty) => {
        impl Scalar for $t {
            const WIDTH: usize = $width;

            fn to_bits(self) -> u64 {
                self as $via as u64
            }

            fn from_bits(bits: u64) -> Option<Self> {
                Some(bits as $t)
            }
        }
    }
}

scalar_int!(u8, 1, u64);
scalar_int!(i8, 1, i64);
scalar_int!(u16, 2, u64);
scalar_int!(i16, 2, i64);
scalar_int!(u32, 4, u64);
scalar_int!(i32, 4, i64);
scalar_int!(u64, 8, u64);
scalar_int!(i64, 8, i64);

impl Scalar for bool {
    const WIDTH: usize = 1;

    fn to_bits(self) -> u64 {
        self as u64
    }

    fn from_bits(bits: u64) -> Option<Self> {
        match bits {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }
}

impl Scalar for char {
    const WIDTH: usize = 4;

    fn to_bits(self) -> u64 {
        self as u64
    }

    fn from_bits(bits: u64) -> Option<Self> {
        char::from_u32(bits as u32)
    }
}

impl Scalar for f32 {
    const WIDTH: usize = 4;

    fn to_bits(self) -> u64 {
        f32::to_bits(self) as u64
    }

    fn from_bits(bits: u64) -> Option<Self> {
        Some(f32::from_bits(bits as u32))
    }
}

impl Scalar for f64 {
    const WIDTH: usize = 8;

    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }

    fn from_bits(bits: u64) -> Option<Self> {
        Some(f64::from_bits(bits))
    }
}

/// Creator for primitive scalars.
///
/// Scalars of up to 4 bytes are carried in a fixed leaf and are packed when
/// they appear in containers. Wider ones are carried in an 8-byte variable
/// leaf and are never packed.
#[derive(Debug)]
pub struct ScalarCreator<T> {
    nul_terminated: bool,
    _marker: PhantomData<T>,
}

impl<T> Clone for ScalarCreator<T> {
    fn clone(&self) -> Self {
        ScalarCreator { nul_terminated: self.nul_terminated,
                        _marker: PhantomData }
    }
}

impl<T : Scalar> ScalarCreator<T> {
    /// Returns a creator for plain scalars.
    pub fn new() -> Self {
        ScalarCreator { nul_terminated: false, _marker: PhantomData }
    }

    /// Returns a creator for elements of containers which end with a zero
    /// terminator, such as character arrays.
    ///
    /// The terminator is dropped when a container is encoded and restored
    /// when it is decoded.
    pub fn nul_terminated() -> Self {
        ScalarCreator { nul_terminated: true, _marker: PhantomData }
    }
}

impl<T : Scalar> Default for ScalarCreator<T> {
    fn default() -> Self {
        ScalarCreator::new()
    }
}

impl<T : Scalar> NodeCreator for ScalarCreator<T> {
    type Value = T;

    fn make_node(&self, value: &T, tag: Tag) -> Result<Node> {
        let bits = value.to_bits();
        if T::WIDTH <= 4 {
            Ok(Node::fixed(tag, bits as u32))
        } else {
            let mut data = Vec::with_capacity(8);
            data.put_u64(bits);
            Ok(Node::var_owned(tag, data))
        }
    }

    fn fill_from(&self, node: &Node, out: &mut T) -> Result<()> {
        let bits = if T::WIDTH <= 4 {
            node.expect_fixed()? as u64
        } else {
            let mut data = node.expect_blob()?;
            if 8 != data.len() {
                return Err(Error::InvalidValue("wide scalar length"));
            }
            data.get_u64()
        };
        *out = T::from_bits(bits).ok_or(Error::InvalidValue("scalar bits"))?;
        Ok(())
    }

    fn is_array_shaped(&self) -> bool { T::WIDTH <= 4 }

    fn is_null_terminated_array(&self) -> bool { self.nul_terminated }

    fn element_width(&self) -> usize { T::WIDTH }

    fn pack(&self, value: &T, dst: &mut Vec<u8>) -> Result<()> {
        dst.put_uint(value.to_bits(), T::WIDTH);
        Ok(())
    }

    fn unpack(&self, mut src: &[u8], out: &mut T) -> Result<()> {
        if T::WIDTH != src.len() {
            return Err(Error::InvalidValue("packed element width"));
        }
        *out = T::from_bits(src.get_uint(T::WIDTH))
            .ok_or(Error::InvalidValue("scalar bits"))?;
        Ok(())
    }

    fn terminator(&self) -> Option<T> {
        if self.nul_terminated {
            T::from_bits(0)
        } else {
            None
        }
    }
}

/// C-like enumerations which travel as their raw discriminant.
///
/// Usually implemented with `marshal_enum!`.
pub trait Enumerated : Copy {
    /// Returns the raw discriminant.
    fn to_raw(self) -> u32;
    /// Maps a raw discriminant back to an enumerator, if it names one.
    fn from_raw(raw: u32) -> Option<Self>;
}

/// Creator for enumerations.
///
/// Decoding an unknown discriminant is not an error; the configured
/// fallback enumerator is substituted instead.
#[derive(Debug, Clone)]
pub struct EnumCreator<E> {
    fallback: E,
}

impl<E : Enumerated> EnumCreator<E> {
    /// Returns a creator which substitutes `fallback` for unknown values.
    pub fn new(fallback: E) -> Self {
        EnumCreator { fallback: fallback }
    }

    fn from_raw(&self, raw: u32) -> E {
        E::from_raw(raw).unwrap_or_else(|| {
            debug!(raw, "unknown enumerator, substituting fallback");
            self.fallback
        })
    }
}

impl<E : Enumerated> NodeCreator for EnumCreator<E> {
    type Value = E;

    fn make_node(&self, value: &E, tag: Tag) -> Result<Node> {
        Ok(Node::fixed(tag, value.to_raw()))
    }

    fn fill_from(&self, node: &Node, out: &mut E) -> Result<()> {
        *out = self.from_raw(node.expect_fixed()?);
        Ok(())
    }

    fn is_array_shaped(&self) -> bool { true }

    fn element_width(&self) -> usize { 4 }

    fn pack(&self, value: &E, dst: &mut Vec<u8>) -> Result<()> {
        dst.put_u32(value.to_raw());
        Ok(())
    }

    fn unpack(&self, mut src: &[u8], out: &mut E) -> Result<()> {
        if 4 != src.len() {
            return Err(Error::InvalidValue("packed element width"));
        }
        *out = self.from_raw(src.get_u32());
        Ok(())
    }
}

/// Creator for UTF-8 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCreator;

impl NodeCreator for StringCreator {
    type Value = String;

    fn make_node(&self, value: &String, tag: Tag) -> Result<Node> {
        Ok(Node::var(tag, value.as_bytes()))
    }

    fn fill_from(&self, node: &Node, out: &mut String) -> Result<()> {
        let data = node.expect_blob()?;
        *out = String::from_utf8(data.to_vec()).map_err(
            |_| Error::InvalidValue("invalid UTF-8"))?;
        Ok(())
    }
}

/// Creator for raw byte buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCreator;

impl NodeCreator for BytesCreator {
    type Value = Vec<u8>;

    fn make_node(&self, value: &Vec<u8>, tag: Tag) -> Result<Node> {
        Ok(Node::var(tag, value))
    }

    fn fill_from(&self, node: &Node, out: &mut Vec<u8>) -> Result<()> {
        let data = node.expect_blob()?;
        out.clear();
        out.extend_from_slice(data);
        Ok(())
    }
}

/// Creator for wide strings.
///
/// Each character is carried as a 4-byte code point, so the character count
/// is the payload length divided by 4.
#[derive(Debug, Clone, Copy, Default)]
pub struct WideStringCreator;

impl WideStringCreator {
    fn chars<'a>(data: &'a [u8]) -> impl Iterator<Item = Option<char>> + 'a {
        data.chunks(4).map(|mut unit| char::from_u32(unit.get_u32()))
    }
}

impl NodeCreator for WideStringCreator {
    type Value = String;

    fn make_node(&self, value: &String, tag: Tag) -> Result<Node> {
        let mut data = Vec::with_capacity(4 * value.chars().count());
        for ch in value.chars() {
            data.put_u32(ch as u32);
        }
        Ok(Node::var_owned(tag, data))
    }

    fn fill_from(&self, node: &Node, out: &mut String) -> Result<()> {
        let data = node.expect_blob()?;
        if 0 != data.len() % 4 {
            return Err(Error::InvalidValue("partial wide character"));
        }

        let mut utf8_len = 0;
        for ch in WideStringCreator::chars(data) {
            utf8_len += ch.ok_or(Error::InvalidValue("invalid code point"))?
                .len_utf8();
        }

        let mut s = String::with_capacity(utf8_len);
        s.extend(WideStringCreator::chars(data).filter_map(|ch| ch));
        *out = s;
        Ok(())
    }
}

/// Creator for nul-terminated byte strings.
///
/// The terminator is not transmitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct CStringCreator;

impl NodeCreator for CStringCreator {
    type Value = CString;

    fn make_node(&self, value: &CString, tag: Tag) -> Result<Node> {
        Ok(Node::var(tag, value.as_bytes()))
    }

    fn fill_from(&self, node: &Node, out: &mut CString) -> Result<()> {
        let data = node.expect_blob()?;
        let mut buf = Vec::with_capacity(data.len() + 1);
        buf.extend_from_slice(data);
        *out = CString::new(buf).map_err(
            |_| Error::InvalidValue("interior nul in C string"))?;
        Ok(())
    }
}

/// Creator for nested `Marshalable` objects, which become child branches.
pub struct MarshalableCreator<M : ?Sized> {
    _marker: PhantomData<M>,
}

impl<M : ?Sized> MarshalableCreator<M> {
    /// Returns the creator for `M`.
    pub fn new() -> Self {
        MarshalableCreator { _marker: PhantomData }
    }
}

impl<M : ?Sized> Default for MarshalableCreator<M> {
    fn default() -> Self {
        MarshalableCreator::new()
    }
}

impl<M : ?Sized> Clone for MarshalableCreator<M> {
    fn clone(&self) -> Self {
        MarshalableCreator::new()
    }
}

impl<M : Marshalable + ?Sized> NodeCreator for MarshalableCreator<M> {
    type Value = M;

    fn make_node(&self, value: &M, tag: Tag) -> Result<Node> {
        let mut branch = Branch::new(value.branch_kind());
        value.class_to_tree(&mut branch)?;
        Ok(Node::branch(tag, branch))
    }

    fn fill_from(&self, node: &Node, out: &mut M) -> Result<()> {
        let branch = node.expect_branch(out.branch_kind())?;
        out.tree_to_class(branch)
    }
}
