//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Specialised adapters for reading encoded trees.

use bytes::{Buf, Bytes};

/// A checked, position-tracking reader over a byte buffer.
///
/// Unlike using `Buf` directly, reads past the end of the input return
/// `None` instead of panicking. The position is the offset from where the
/// outermost `Input` started, and is preserved in sub-inputs created with
/// `sub()` so that error locations refer to the whole message.
#[derive(Debug, Clone)]
pub struct Input {
    buf: Bytes,
    pos: u64,
}

impl Input {
    /// Creates an input reading `buf` from offset 0.
    pub fn new<B : Into<Bytes>>(buf: B) -> Self {
        Input { buf: buf.into(), pos: 0 }
    }

    /// Creates an input over a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Input::new(Bytes::copy_from_slice(data))
    }

    /// Returns the current byte offset.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Returns whether all input has been consumed.
    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> Option<u16> {
        if self.remaining() < 2 { return None; }
        self.pos += 2;
        Some(self.buf.get_u16())
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 { return None; }
        self.pos += 4;
        Some(self.buf.get_u32())
    }

    /// Reads exactly `n` bytes.
    ///
    /// The returned buffer shares storage with this input.
    pub fn read_bytes(&mut self, n: usize) -> Option<Bytes> {
        if self.remaining() < n { return None; }
        self.pos += n as u64;
        Some(self.buf.split_to(n))
    }

    /// Splits the next `n` bytes off into their own `Input`, positioned at
    /// the current offset.
    pub fn sub(&mut self, n: usize) -> Option<Input> {
        let pos = self.pos;
        self.read_bytes(n).map(|buf| Input { buf: buf, pos: pos })
    }
}
