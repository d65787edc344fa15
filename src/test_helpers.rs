//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cell::Cell;

use creator::{ScalarCreator, StringCreator};

/// Parse the given text into a binary value.
///
/// Whitespace is ignored. Bytes are given as pairs of hexits. A single-quote
/// causes all characters up through the next single quote to be added
/// verbatim as UTF-8.
pub fn parse(text: &str) -> Vec<u8> {
    let mut data = Vec::new();
    let mut chars = text.chars();

    while let Some(first) = chars.next() {
        if first.is_whitespace() {
            continue;
        }

        if '\'' == first {
            for c in chars.by_ref().take_while(|&c| '\'' != c) {
                let mut buf = [0u8; 4];
                data.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            continue;
        }

        let second = chars.next().expect("odd number of hexits");
        let hi = first.to_digit(16).expect("invalid hexit");
        let lo = second.to_digit(16).expect("invalid hexit");
        data.push((hi << 4 | lo) as u8);
    }

    data
}

thread_local! {
    static ALLOCATED: Cell<usize> = Cell::new(0);
    static FREED: Cell<usize> = Cell::new(0);
}

/// Zeroes the allocation counters of the current thread.
pub fn reset_counters() {
    ALLOCATED.with(|c| c.set(0));
    FREED.with(|c| c.set(0));
}

/// The number of `Tracked` values created on this thread.
pub fn allocated() -> usize {
    ALLOCATED.with(Cell::get)
}

/// The number of `Tracked` values dropped on this thread.
pub fn freed() -> usize {
    FREED.with(Cell::get)
}

/// The number of `Tracked` values currently alive on this thread.
pub fn live() -> usize {
    allocated() - freed()
}

/// A two-field record which counts its own creation and destruction.
#[derive(Debug, PartialEq, Eq)]
pub struct Tracked {
    pub id: u32,
    pub label: String,
}

impl Tracked {
    pub fn new(id: u32, label: &str) -> Self {
        ALLOCATED.with(|c| c.set(c.get() + 1));
        Tracked { id: id, label: label.to_owned() }
    }
}

impl Default for Tracked {
    fn default() -> Self {
        Tracked::new(0, "")
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        Tracked::new(self.id, &self.label)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        FREED.with(|c| c.set(c.get() + 1));
    }
}

marshal_record!(Tracked {
    [0] id: ScalarCreator::<u32>::new(),
    [1] label: StringCreator,
});

#[test]
fn parse_hex_and_quoted_text() {
    assert_eq!(vec![0x0C, 0xAB, b'h', b'i', 0x01],
               parse("0C ab\n   'hi' 01"));
    assert_eq!(Vec::<u8>::new(), parse(" "));
}
