//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Implements `Marshalable` for a record struct.
///
/// Each field is listed with the tag it is stored under and the creator
/// which encodes it. The record becomes a map branch; every listed field is
/// required when decoding.
///
/// ```
/// #[macro_use] extern crate tctree;
/// use tctree::creator::{ScalarCreator, WideStringCreator};
///
/// #[derive(Default)]
/// struct Channel {
///     number: u32,
///     name: String,
/// }
///
/// marshal_record!(Channel {
///     [0] number: ScalarCreator::<u32>::new(),
///     [1] name: WideStringCreator,
/// });
/// # fn main() { }
/// ```
#[macro_export]
macro_rules! marshal_record {
    ($t:ty { $([$tag:expr] $field:ident : $creator:expr),* $(,)* }) => {
        impl $crate::marshal::Marshalable for $t {
            fn class_to_tree(&self, dst: &mut $crate::node::Branch)
                             -> $crate::marshal::Result<()> {
                let _map = dst.expect_map_mut()?;
                $(_map.write_field($tag, &$creator, &self.$field)?;)*
                Ok(())
            }

            fn tree_to_class(&mut self, src: &$crate::node::Branch)
                             -> $crate::marshal::Result<()> {
                let _map = src.expect_map()?;
                $(_map.read_field($tag, &$creator, &mut self.$field)?;)*
                Ok(())
            }
        }
    }
}

/// Implements `Enumerated` for a C-like enum.
///
/// Every enumerator which may travel must be listed. The enum must be
/// `Copy`.
///
/// ```
/// #[macro_use] extern crate tctree;
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Input { Tuner = 1, Hdmi1 = 0x10, Hdmi2 = 0x11 }
/// marshal_enum!(Input { Tuner, Hdmi1, Hdmi2 });
///
/// # fn main() {
/// use tctree::creator::Enumerated;
/// assert_eq!(Some(Input::Hdmi2), Input::from_raw(0x11));
/// assert_eq!(None, Input::from_raw(2));
/// # }
/// ```
#[macro_export]
macro_rules! marshal_enum {
    ($t:ident { $($variant:ident),* $(,)* }) => {
        impl $crate::creator::Enumerated for $t {
            fn to_raw(self) -> u32 {
                self as u32
            }

            fn from_raw(raw: u32) -> Option<Self> {
                $(if raw == $t::$variant as u32 {
                    return Some($t::$variant);
                })*
                None
            }
        }
    }
}
