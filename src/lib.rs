//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A tagged-tree marshalling engine.
//!
//! Values are converted into a tree of `Node`s, each carrying a 10-bit tag
//! and one of four kinds: a fixed 32-bit leaf, a variable-length blob leaf,
//! an ordered list branch, or a map branch keyed by tag. The tree has a
//! single, length-prefixed binary encoding (see `wire`).
//!
//! The pieces fit together as follows:
//!
//! - `NodeCreator`s (`creator`) know how to turn one kind of Rust value into
//!   a node and back. Scalars, enums, strings, blobs and nested records all
//!   have creators.
//!
//! - `Marshalable` (`marshal`) is implemented by records and containers;
//!   they populate a branch with their fields and read them back. The
//!   `marshal_record!` and `marshal_enum!` macros generate the common cases.
//!
//! - Container adapters (`adapt`, `assoc`) bridge sequences, sets, fixed
//!   arrays and associative containers onto list branches, packing
//!   fixed-width elements into a single blob.
//!
//! - A `Call` (`call`) aggregates the directional arguments of one remote
//!   invocation and exchanges them as a single list branch.
//!
//! ```
//! #[macro_use] extern crate tctree;
//! use tctree::creator::{ScalarCreator, StringCreator};
//! use tctree::{from_bytes, to_bytes, Config};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Volume {
//!     level: u8,
//!     zone: String,
//! }
//!
//! marshal_record!(Volume {
//!     [0] level: ScalarCreator::<u8>::new(),
//!     [1] zone: StringCreator,
//! });
//!
//! # fn main() {
//! let orig = Volume { level: 12, zone: "den".to_owned() };
//! let bytes = to_bytes(&orig).unwrap();
//!
//! let mut decoded = Volume::default();
//! from_bytes(&bytes, &Config::default(), &mut decoded).unwrap();
//! assert_eq!(orig, decoded);
//! # }
//! ```

#![deny(missing_docs)]
#![recursion_limit = "1024"]

#[macro_use] extern crate quick_error;
#[macro_use] extern crate tracing;
extern crate bytes;

#[macro_use] mod sugar;

pub mod io;
pub mod wire;
pub mod node;
pub mod marshal;
pub mod creator;
pub mod adapt;
pub mod assoc;
pub mod call;

#[cfg(test)] mod test_helpers;
#[cfg(test)] mod builtin_tests;

pub use node::{Config, Node};
pub use marshal::{Marshalable, from_bytes, to_bytes};
pub use call::{Arg, Call};
